//! Job classification by leading namespace segment.

use serde::Serialize;

const APPLICATIONS: &str = "applications";
const WEBHOOKS: &str = "webhooks";

/// Lifecycle group of a job, taken from the first segment of its dotted name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobGroup {
    /// `applications.*`: synchronized with a user request and widget session.
    Application,
    /// `webhooks.*`: synchronized with a webhook request.
    Webhook,
    /// Anything else runs without lifecycle synchronization.
    PassThrough,
}

impl JobGroup {
    pub fn classify(job_name: &str) -> Self {
        match job_name.split('.').next() {
            Some(APPLICATIONS) => Self::Application,
            Some(WEBHOOKS) => Self::Webhook,
            _ => Self::PassThrough,
        }
    }

    /// Queue this group's jobs are routed to.
    pub fn queue_name(&self, application_guid: &str) -> String {
        match self {
            Self::Application => format!("application/{application_guid}"),
            Self::Webhook => format!("webhook/{application_guid}"),
            Self::PassThrough => "default".to_string(),
        }
    }
}

/// Final dotted segment of a job name, reported as the action type.
pub fn action_type(job_name: &str) -> &str {
    job_name.rsplit('.').next().unwrap_or(job_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_first_segment() {
        assert_eq!(JobGroup::classify("applications.sales.init"), JobGroup::Application);
        assert_eq!(
            JobGroup::classify("webhooks.sales.order_handler"),
            JobGroup::Webhook
        );
        assert_eq!(JobGroup::classify("maintenance.cleanup"), JobGroup::PassThrough);
        assert_eq!(JobGroup::classify("applicationsx.sales"), JobGroup::PassThrough);
        assert_eq!(JobGroup::classify(""), JobGroup::PassThrough);
    }

    #[test]
    fn action_is_last_segment() {
        assert_eq!(action_type("applications.sales.init"), "init");
        assert_eq!(action_type("standalone"), "standalone");
    }

    #[test]
    fn queue_names() {
        assert_eq!(JobGroup::Application.queue_name("app"), "application/app");
        assert_eq!(JobGroup::Webhook.queue_name("app"), "webhook/app");
        assert_eq!(JobGroup::PassThrough.queue_name("app"), "default");
    }
}
