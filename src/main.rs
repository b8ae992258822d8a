use std::sync::Arc;

use anyhow::Context;
use tokio::io::BufReader;
use tokio::sync::mpsc;

use widget_worker::api::{ApiClient, OrchestrationApi};
use widget_worker::bootstrap;
use widget_worker::config::WorkerConfig;
use widget_worker::jobs;
use widget_worker::model::ControlRegistry;
use widget_worker::worker::{
    JobDeps, JobExecutor, JobRegistry, TaskLifecycleCoordinator, feed_lines,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    if let Err(e) = dotenvy::dotenv() {
        tracing::warn!("No .env file loaded: {}", e);
    }

    let config = WorkerConfig::from_env().context("invalid worker configuration")?;
    tracing::info!(
        api_url = %config.api_url,
        queues = ?config.queue_names(),
        max_parallel = config.max_parallel_jobs,
        "Worker configured"
    );

    let api: Arc<dyn OrchestrationApi> =
        Arc::new(ApiClient::new(&config).context("failed to build API client")?);

    let registry = Arc::new(JobRegistry::new());
    jobs::register_builtin(&registry);

    // Jobs the API has not heard of must never be served.
    if let Err(e) = bootstrap::register(api.as_ref(), &registry).await {
        eprintln!("Error: task registration failed: {e}");
        std::process::exit(1);
    }

    let deps = JobDeps {
        api: Arc::clone(&api),
        controls: Arc::new(ControlRegistry::new()),
    };
    let executor = Arc::new(JobExecutor::new(
        Arc::clone(&registry),
        Arc::new(TaskLifecycleCoordinator::new(Arc::clone(&api))),
        deps,
        config.max_parallel_jobs,
    ));

    let (tx, rx) = mpsc::channel(config.max_parallel_jobs * 4);
    let consumer = {
        let executor = Arc::clone(&executor);
        tokio::spawn(async move { executor.run_queue(rx).await })
    };

    tracing::info!("Reading job messages from stdin");
    let forwarded = feed_lines(BufReader::new(tokio::io::stdin()), tx)
        .await
        .context("failed to read job messages")?;
    tracing::info!(forwarded, "Input closed, draining running jobs");

    consumer.await.context("job consumer crashed")?;
    tracing::info!("Worker stopped");
    Ok(())
}
