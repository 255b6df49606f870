use std::time::Duration;

use thiserror::Error;

use crate::permissions::Action;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("{0} is not set")]
    MissingConfig(&'static str),

    #[error("invalid value for {name}: {reason}")]
    InvalidConfig { name: &'static str, reason: String },

    #[error("stack {0} already exists")]
    StackAlreadyExists(String),

    #[error("stack {0} does not exist")]
    StackNotFound(String),

    #[error("describe-stacks returned no status for {0}")]
    MissingStackStatus(String),

    #[error("{action} failed: {source}")]
    ControlPlane {
        action: Action,
        #[source]
        source: BoxError,
    },

    #[error("stack {stack_name} finished with {status}")]
    UnsuccessfulStatus { stack_name: String, status: String },

    #[error("workflow did not finish within {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("invalid state machine definition: {0}")]
    InvalidDefinition(String),

    #[error("least privilege violated: {0}")]
    PolicyViolation(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Http(#[from] lambda_http::http::Error),

    #[error("request rejected with status {}", .0.status())]
    HttpError(lambda_http::Response<String>),
}

impl Error {
    pub fn control_plane(action: Action, source: impl Into<BoxError>) -> Self {
        Self::ControlPlane {
            action,
            source: source.into(),
        }
    }

    /// Errors the caller can fix by changing the request.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidRequest(_) | Error::StackAlreadyExists(_) | Error::Json(_)
        )
    }
}
