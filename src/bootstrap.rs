//! Startup registration: announce every registered job to the orchestration API.

use crate::api::{OrchestrationApi, TaskCatalog};
use crate::error::Result;
use crate::worker::{JobGroup, JobRegistry};

/// Partition job names into the application and webhook lists.
///
/// Pass-through jobs are not announced. Both lists come out sorted.
pub fn catalog<I, S>(names: I) -> TaskCatalog
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut catalog = TaskCatalog::default();
    for name in names {
        let name = name.into();
        match JobGroup::classify(&name) {
            JobGroup::Application => catalog.application_task_codes.push(name),
            JobGroup::Webhook => catalog.webhook_task_codes.push(name),
            JobGroup::PassThrough => {}
        }
    }
    catalog.application_task_codes.sort();
    catalog.webhook_task_codes.sort();
    catalog
}

/// Register all jobs in `jobs` with the remote API.
///
/// Any failure is returned to the caller, which must not start consuming jobs.
pub async fn register(api: &dyn OrchestrationApi, jobs: &JobRegistry) -> Result<TaskCatalog> {
    let catalog = catalog(jobs.names().await);
    tracing::info!(
        applications = catalog.application_task_codes.len(),
        webhooks = catalog.webhook_task_codes.len(),
        "Registering tasks"
    );
    if let Err(e) = api.register_tasks(&catalog).await {
        tracing::error!(critical = true, error = %e, "Error registering tasks");
        return Err(e.into());
    }
    tracing::info!("Tasks registered");
    Ok(catalog)
}
