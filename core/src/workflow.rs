//! Form → Outline → Deck state machine.
//!
//! Every remote operation is split in two synchronous halves. A `begin_*`
//! transition checks that the operation is legal, marks it pending and returns
//! a [`Ticket`]. Whoever runs the call hands the ticket back inside a
//! [`Completion`], and [`Workflow::apply`] folds the outcome into the state.
//! `reset` bumps the epoch, so completions of tickets issued before the reset
//! are discarded instead of being applied to an unrelated state.

use serde::Serialize;
use slide_client::TransportError;
use slide_protocol::{Deck, ExportResult, GenerationRequest, Outline};
use std::fmt;
use tracing::{debug, info, warn};

use crate::error::{Result, WorkflowError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Form,
    Outline,
    Deck,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Form => write!(f, "form"),
            Stage::Outline => write!(f, "outline"),
            Stage::Deck => write!(f, "deck"),
        }
    }
}

/// The generation slot. Export has its own flag, see [`WorkflowState::is_exporting`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingOperation {
    #[default]
    None,
    ProposingOutline,
    GeneratingDeck,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    ProposeOutline,
    GenerateDeck,
    ExportDeck,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::ProposeOutline => write!(f, "propose outline"),
            Operation::GenerateDeck => write!(f, "generate deck"),
            Operation::ExportDeck => write!(f, "export deck"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowState {
    stage: Stage,
    request: GenerationRequest,
    outline: Option<Outline>,
    deck: Option<Deck>,
    last_error: Option<String>,
    pending: PendingOperation,
    exporting: bool,
    last_export: Option<ExportResult>,
}

impl WorkflowState {
    fn new(request: GenerationRequest) -> Self {
        Self {
            stage: Stage::Form,
            request,
            outline: None,
            deck: None,
            last_error: None,
            pending: PendingOperation::None,
            exporting: false,
            last_export: None,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn request(&self) -> &GenerationRequest {
        &self.request
    }

    pub fn outline(&self) -> Option<&Outline> {
        self.outline.as_ref()
    }

    pub fn deck(&self) -> Option<&Deck> {
        self.deck.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn pending(&self) -> PendingOperation {
        self.pending
    }

    pub fn is_exporting(&self) -> bool {
        self.exporting
    }

    /// Most recent successful export of the current deck.
    pub fn last_export(&self) -> Option<&ExportResult> {
        self.last_export.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.pending != PendingOperation::None || self.exporting
    }
}

/// Proof that an operation was started, carried back with its result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    epoch: u64,
    operation: Operation,
    request: GenerationRequest,
}

impl Ticket {
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Snapshot of the request the operation must be sent with.
    pub fn request(&self) -> &GenerationRequest {
        &self.request
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Outline(std::result::Result<Outline, TransportError>),
    Deck(std::result::Result<Deck, TransportError>),
    Export(std::result::Result<ExportResult, TransportError>),
}

impl Outcome {
    fn operation(&self) -> Operation {
        match self {
            Outcome::Outline(_) => Operation::ProposeOutline,
            Outcome::Deck(_) => Operation::GenerateDeck,
            Outcome::Export(_) => Operation::ExportDeck,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub ticket: Ticket,
    pub outcome: Outcome,
}

/// What [`Workflow::apply`] did with a completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    OutlineReady,
    DeckReady,
    Exported(ExportResult),
    Failed { operation: Operation, message: String },
}

#[derive(Debug)]
pub struct Workflow {
    state: WorkflowState,
    epoch: u64,
    blank: GenerationRequest,
}

impl Default for Workflow {
    fn default() -> Self {
        Self::new()
    }
}

impl Workflow {
    pub fn new() -> Self {
        Self::with_blank_request(GenerationRequest::default())
    }

    /// `blank` is the request the form starts from, now and after every reset.
    pub fn with_blank_request(blank: GenerationRequest) -> Self {
        Self {
            state: WorkflowState::new(blank.clone()),
            epoch: 0,
            blank,
        }
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Form → ProposingOutline. An invalid request is recorded as the last
    /// error and nothing is started.
    pub fn begin_submit(&mut self, request: GenerationRequest) -> Result<Ticket> {
        let operation = Operation::ProposeOutline;
        self.require_stage(operation, Stage::Form)?;
        self.require_idle(operation)?;

        if let Err(err) = request.validate() {
            debug!(error = %err, "rejecting invalid request");
            self.state.last_error = Some(err.to_string());
            return Err(err.into());
        }

        self.state.request = request;
        self.state.pending = PendingOperation::ProposingOutline;
        self.state.last_error = None;
        info!(topic = %self.state.request.topic, slides = self.state.request.slide_count, "proposing outline");
        Ok(self.ticket(operation))
    }

    /// Outline → GeneratingDeck, reusing the submitted request.
    pub fn begin_generate(&mut self) -> Result<Ticket> {
        let operation = Operation::GenerateDeck;
        self.require_stage(operation, Stage::Outline)?;
        if self.state.outline.is_none() {
            return Err(WorkflowError::IllegalTransition {
                operation,
                stage: self.state.stage,
            });
        }
        self.require_idle(operation)?;

        self.state.pending = PendingOperation::GeneratingDeck;
        self.state.last_error = None;
        info!(topic = %self.state.request.topic, "generating deck");
        Ok(self.ticket(operation))
    }

    /// Raises the export flag. Allowed again after a failed export.
    pub fn begin_export(&mut self) -> Result<Ticket> {
        let operation = Operation::ExportDeck;
        self.require_stage(operation, Stage::Deck)?;
        if self.state.deck.is_none() {
            return Err(WorkflowError::IllegalTransition {
                operation,
                stage: self.state.stage,
            });
        }
        if self.state.exporting {
            return Err(WorkflowError::OperationPending { operation });
        }

        self.state.exporting = true;
        self.state.last_error = None;
        info!(topic = %self.state.request.topic, "exporting deck");
        Ok(self.ticket(operation))
    }

    /// Folds a finished call into the state. Completions from before the last
    /// reset, or that no longer match what is pending, come back as
    /// [`WorkflowError::StaleResultIgnored`] and change nothing.
    pub fn apply(&mut self, completion: Completion) -> Result<Applied> {
        let Completion { ticket, outcome } = completion;
        let operation = outcome.operation();
        if ticket.epoch != self.epoch || ticket.operation != operation || !self.awaits(operation) {
            warn!(%operation, ticket_epoch = ticket.epoch, epoch = self.epoch, "ignoring stale result");
            return Err(WorkflowError::StaleResultIgnored { operation });
        }

        let applied = match outcome {
            Outcome::Outline(Ok(outline)) => {
                info!(slides = outline.slides.len(), "outline ready");
                self.state.outline = Some(outline);
                self.state.stage = Stage::Outline;
                self.state.pending = PendingOperation::None;
                self.state.last_error = None;
                Applied::OutlineReady
            }
            Outcome::Deck(Ok(deck)) => {
                if !deck.is_aligned() {
                    warn!(
                        outline = deck.outline.slides.len(),
                        slides = deck.slides.len(),
                        "deck slides do not line up with its outline"
                    );
                }
                info!(slides = deck.slides.len(), "deck ready");
                self.state.deck = Some(deck);
                self.state.stage = Stage::Deck;
                self.state.pending = PendingOperation::None;
                self.state.last_error = None;
                Applied::DeckReady
            }
            Outcome::Export(Ok(export)) => {
                info!(filename = %export.filename, "export ready");
                self.state.exporting = false;
                self.state.last_export = Some(export.clone());
                Applied::Exported(export)
            }
            Outcome::Outline(Err(err)) | Outcome::Deck(Err(err)) => {
                warn!(%operation, error = %err, "operation failed");
                self.state.pending = PendingOperation::None;
                self.state.last_error = Some(err.message.clone());
                Applied::Failed {
                    operation,
                    message: err.message,
                }
            }
            Outcome::Export(Err(err)) => {
                warn!(error = %err, "export failed");
                self.state.exporting = false;
                self.state.last_error = Some(err.message.clone());
                Applied::Failed {
                    operation,
                    message: err.message,
                }
            }
        };
        Ok(applied)
    }

    /// Back to an empty form from anywhere. Outstanding calls keep running but
    /// their results will be ignored.
    pub fn reset(&mut self) {
        if self.state.is_busy() {
            debug!(pending = ?self.state.pending, exporting = self.state.exporting, "reset with calls in flight");
        }
        self.epoch = self.epoch.wrapping_add(1);
        self.state = WorkflowState::new(self.blank.clone());
        info!(epoch = self.epoch, "workflow reset");
    }

    pub fn dismiss_error(&mut self) {
        self.state.last_error = None;
    }

    fn ticket(&self, operation: Operation) -> Ticket {
        Ticket {
            epoch: self.epoch,
            operation,
            request: self.state.request.clone(),
        }
    }

    fn require_stage(&self, operation: Operation, stage: Stage) -> Result<()> {
        if self.state.stage == stage {
            Ok(())
        } else {
            Err(WorkflowError::IllegalTransition {
                operation,
                stage: self.state.stage,
            })
        }
    }

    fn require_idle(&self, operation: Operation) -> Result<()> {
        if self.state.pending == PendingOperation::None {
            Ok(())
        } else {
            Err(WorkflowError::OperationPending { operation })
        }
    }

    fn awaits(&self, operation: Operation) -> bool {
        match operation {
            Operation::ProposeOutline => {
                self.state.stage == Stage::Form
                    && self.state.pending == PendingOperation::ProposingOutline
            }
            Operation::GenerateDeck => {
                self.state.stage == Stage::Outline
                    && self.state.pending == PendingOperation::GeneratingDeck
            }
            Operation::ExportDeck => self.state.stage == Stage::Deck && self.state.exporting,
        }
    }
}
