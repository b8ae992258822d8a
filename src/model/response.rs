//! What an application job hands back to the post-run hook.

use serde::{Deserialize, Serialize};

use crate::model::session::Session;

/// Terminal status a job body attaches to its [`Response`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Nothing,
    Started,
    Success,
    Broken,
    Warning,
    Failure,
    Revoked,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Nothing => "nothing",
            Self::Started => "started",
            Self::Success => "success",
            Self::Broken => "broken",
            Self::Warning => "warning",
            Self::Failure => "failure",
            Self::Revoked => "revoked",
        };
        write!(f, "{s}")
    }
}

/// The (possibly mutated) session plus the status the job body settled on.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub session: Session,
    pub status: Status,
}

impl Response {
    pub fn new(session: Session, status: Status) -> Self {
        Self { session, status }
    }
}

impl From<Session> for Response {
    fn from(session: Session) -> Self {
        Self::new(session, Status::Nothing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_wire_names() {
        assert_eq!(serde_json::to_value(Status::Revoked).unwrap(), "revoked");
        let parsed: Status = serde_json::from_str("\"broken\"").unwrap();
        assert_eq!(parsed, Status::Broken);
        assert_eq!(Status::default(), Status::Nothing);
        assert_eq!(Status::Warning.to_string(), "warning");
    }
}
