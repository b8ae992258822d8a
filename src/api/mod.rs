//! Remote orchestration API: retrying transport, endpoint client, wire types.

pub mod client;
pub mod http;
pub mod types;

pub use client::{ApiClient, OrchestrationApi};
pub use http::{HttpReply, RetryPolicy, RetryingHttpClient};
pub use types::{Envelope, Retval, SessionStatusUpdate, TaskCatalog, WidgetSessionPayload};

#[cfg(test)]
pub(crate) mod testing;
