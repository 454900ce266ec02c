//! Generation workflow: the Form → Outline → Deck state machine and the
//! session that drives it against the deck service.

pub mod error;
pub mod session;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Result, WorkflowError};
pub use session::{Session, SessionEvent};
pub use workflow::{
    Applied, Completion, Operation, Outcome, PendingOperation, Stage, Ticket, Workflow,
    WorkflowState,
};
