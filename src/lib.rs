//! Widget worker: job lifecycle synchronization with the orchestration API.

pub mod api;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod jobs;
pub mod model;
pub mod worker;
