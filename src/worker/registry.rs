//! Job registry: the set of job names this worker can execute.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::worker::job::Job;

/// Registry of available jobs.
pub struct JobRegistry {
    jobs: RwLock<HashMap<String, Arc<dyn Job>>>,
}

impl JobRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
        }
    }

    /// Register a job, replacing any job with the same name.
    pub async fn register(&self, job: Arc<dyn Job>) {
        let name = job.name().to_string();
        if self.jobs.write().await.insert(name.clone(), job).is_some() {
            tracing::warn!(job = %name, "Replaced previously registered job");
        }
        tracing::debug!("Registered job: {}", name);
    }

    /// Register a job (sync version for startup).
    pub fn register_sync(&self, job: Arc<dyn Job>) {
        let name = job.name().to_string();
        if let Ok(mut jobs) = self.jobs.try_write() {
            jobs.insert(name.clone(), job);
            tracing::debug!("Registered job: {}", name);
        } else {
            tracing::warn!(job = %name, "Job registry busy, registration skipped");
        }
    }

    /// Get a job by name.
    pub async fn get(&self, name: &str) -> Option<Arc<dyn Job>> {
        self.jobs.read().await.get(name).cloned()
    }

    /// Check if a job exists.
    pub async fn has(&self, name: &str) -> bool {
        self.jobs.read().await.contains_key(name)
    }

    /// All job names, sorted.
    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.jobs.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Get the number of registered jobs.
    pub fn count(&self) -> usize {
        self.jobs.try_read().map(|j| j.len()).unwrap_or(0)
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}
