use slide_client::TransportError;
use slide_protocol::ValidationError;
use thiserror::Error;

use crate::workflow::{Operation, Stage};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    /// Rejected before anything was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The operation is not reachable from the current stage.
    #[error("Cannot {operation} from the {stage} stage")]
    IllegalTransition { operation: Operation, stage: Stage },

    #[error("A {operation} request is already in progress")]
    OperationPending { operation: Operation },

    /// A completion arrived for an operation the workflow has since abandoned.
    #[error("Result of {operation} ignored after reset")]
    StaleResultIgnored { operation: Operation },
}

pub type Result<T> = std::result::Result<T, WorkflowError>;

impl WorkflowError {
    /// Errors a user should see. Stale results are internal bookkeeping.
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, WorkflowError::StaleResultIgnored { .. })
    }
}
