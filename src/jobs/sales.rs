//! Sales application and webhook jobs.

use async_trait::async_trait;
use rand::Rng;
use serde_json::{Map, json};

use crate::error::{JobError, Result};
use crate::model::{Control, Item, Response, Session, Status, Step};
use crate::worker::{Job, JobContext, JobOutput};

/// Number of items `applications.sales.init` offers.
const ITEM_COUNT: usize = 10;

/// Fills the first check-box list of the session with generated goods.
///
/// The list on the current step wins; otherwise the first one in step order.
pub struct InitSale;

#[async_trait]
impl Job for InitSale {
    fn name(&self) -> &str {
        "applications.sales.init"
    }

    async fn run(&self, ctx: JobContext) -> Result<JobOutput> {
        let items = generate_items(&mut rand::thread_rng(), ITEM_COUNT);
        let mut session = ctx.load_session().await?;

        let target = first_check_box_list(&mut session).ok_or_else(|| JobError::Failed {
            job: ctx.job_name.clone(),
            reason: format!("session {} has no check-box list", session_guid(&ctx)),
        })?;
        *target = items;

        tracing::debug!(job = %ctx.job_name, items = ITEM_COUNT, "Filled check-box list");
        Ok(Response::new(session, Status::Success).into())
    }
}

/// Reloads the session and hands it back unchanged.
pub struct ReloadSession {
    name: &'static str,
}

impl ReloadSession {
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }
}

#[async_trait]
impl Job for ReloadSession {
    fn name(&self) -> &str {
        self.name
    }

    async fn run(&self, ctx: JobContext) -> Result<JobOutput> {
        let session = ctx.load_session().await?;
        Ok(Response::new(session, Status::Success).into())
    }
}

/// Accepts an order webhook and returns its payload.
pub struct OrderHandler;

#[async_trait]
impl Job for OrderHandler {
    fn name(&self) -> &str {
        "webhooks.sales.order_handler"
    }

    async fn run(&self, ctx: JobContext) -> Result<JobOutput> {
        let webhook = ctx.webhook()?;
        tracing::info!(job = %ctx.job_name, webhook = %webhook, "Order webhook received");
        Ok(JobOutput::Value(webhook.data))
    }
}

fn generate_items<R: Rng>(rng: &mut R, count: usize) -> Vec<Item> {
    (1..=count)
        .map(|i| {
            let mut describe = Map::new();
            describe.insert("count".into(), json!(rng.gen_range(1..=10).to_string()));
            describe.insert("uom".into(), json!("pcs"));
            Item::new(format!("Item {i}"), true)
                .with_style("primary")
                .with_description("Description goes here")
                .with_describe(describe)
        })
        .collect()
}

fn has_check_box_list(step: &Step) -> bool {
    step.controls
        .iter()
        .any(|c| matches!(c, Control::CheckBoxList(_)))
}

fn first_check_box_list(session: &mut Session) -> Option<&mut Vec<Item>> {
    let current = session
        .current_step()
        .filter(|step| has_check_box_list(step))
        .map(|step| step.guid.clone());
    let step = match current {
        Some(guid) => session.steps.iter_mut().find(|s| s.guid == guid)?,
        None => session.steps.iter_mut().find(|s| has_check_box_list(s))?,
    };
    step.controls.iter_mut().find_map(|c| match c {
        Control::CheckBoxList(list) => Some(&mut list.items),
        _ => None,
    })
}

fn session_guid(ctx: &JobContext) -> &str {
    ctx.required_str(crate::worker::job::WIDGET_SESSION_GUID)
        .unwrap_or("?")
}
