//! Built-in jobs shipped with the worker.

pub mod sales;

use std::sync::Arc;

use crate::worker::JobRegistry;

pub use sales::{InitSale, OrderHandler, ReloadSession};

/// Register every built-in job.
pub fn register_builtin(registry: &JobRegistry) {
    registry.register_sync(Arc::new(InitSale));
    registry.register_sync(Arc::new(ReloadSession::new("applications.sales.validate")));
    registry.register_sync(Arc::new(ReloadSession::new("applications.sales.execute")));
    registry.register_sync(Arc::new(OrderHandler));

    tracing::info!("Registered {} built-in jobs", registry.count());
}
