//! Async driver around [`Workflow`].
//!
//! A session owns the state machine, the API client and a completion channel.
//! Transition methods return immediately after spawning the remote call, so the
//! owner stays free to handle input; results come back through
//! [`Session::next_event`].

use slide_client::{ApiClient, TransportError};
use slide_common::SlideConfig;
use slide_protocol::{Deck, DownloadLink, GenerationRequest, Outline};
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{Result, WorkflowError};
use crate::workflow::{Applied, Completion, Operation, Outcome, Ticket, Workflow, WorkflowState};

/// A completion as seen by the session owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    OutlineReady,
    DeckReady,
    ExportReady(DownloadLink),
    Failed { operation: Operation, message: String },
    /// Result of a call begun before a reset; nothing changed.
    Ignored { operation: Operation },
}

pub struct Session {
    workflow: Workflow,
    api: ApiClient,
    tx: mpsc::UnboundedSender<Completion>,
    rx: mpsc::UnboundedReceiver<Completion>,
    in_flight: usize,
}

impl Session {
    pub fn new(api: ApiClient) -> Self {
        Self::with_workflow(api, Workflow::new())
    }

    pub fn with_workflow(api: ApiClient, workflow: Workflow) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            workflow,
            api,
            tx,
            rx,
            in_flight: 0,
        }
    }

    /// HTTP-backed session using the configured base URL, timeout and form defaults.
    pub fn from_config(config: &SlideConfig) -> Result<Self> {
        let api = ApiClient::http(&config.base_url, config.timeout())?;
        Ok(Self::with_workflow(
            api,
            Workflow::with_blank_request(config.blank_request()),
        ))
    }

    pub fn state(&self) -> &WorkflowState {
        self.workflow.state()
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Calls spawned whose completion has not been received yet, including
    /// ones a reset has already orphaned.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn submit(&mut self, request: GenerationRequest) -> Result<()> {
        let ticket = self.workflow.begin_submit(request)?;
        self.spawn(ticket);
        Ok(())
    }

    pub fn generate(&mut self) -> Result<()> {
        let ticket = self.workflow.begin_generate()?;
        self.spawn(ticket);
        Ok(())
    }

    pub fn export(&mut self) -> Result<()> {
        let ticket = self.workflow.begin_export()?;
        self.spawn(ticket);
        Ok(())
    }

    pub fn reset(&mut self) {
        self.workflow.reset();
    }

    pub fn dismiss_error(&mut self) {
        self.workflow.dismiss_error();
    }

    /// Waits for the next finished call and applies it. Pends forever when
    /// nothing is in flight; check [`Session::in_flight`] first.
    pub async fn next_event(&mut self) -> SessionEvent {
        match self.rx.recv().await {
            Some(completion) => {
                self.in_flight = self.in_flight.saturating_sub(1);
                self.handle(completion)
            }
            // the session keeps a sender alive, so this never happens
            None => std::future::pending().await,
        }
    }

    /// Submits and waits for the outline.
    pub async fn submit_and_wait(&mut self, request: GenerationRequest) -> Result<Outline> {
        self.submit(request)?;
        self.wait_for(Operation::ProposeOutline).await?;
        self.state()
            .outline()
            .cloned()
            .ok_or(WorkflowError::StaleResultIgnored {
                operation: Operation::ProposeOutline,
            })
    }

    pub async fn generate_and_wait(&mut self) -> Result<Deck> {
        self.generate()?;
        self.wait_for(Operation::GenerateDeck).await?;
        self.state()
            .deck()
            .cloned()
            .ok_or(WorkflowError::StaleResultIgnored {
                operation: Operation::GenerateDeck,
            })
    }

    pub async fn export_and_wait(&mut self) -> Result<DownloadLink> {
        self.export()?;
        match self.wait_for(Operation::ExportDeck).await? {
            SessionEvent::ExportReady(link) => Ok(link),
            _ => Err(WorkflowError::StaleResultIgnored {
                operation: Operation::ExportDeck,
            }),
        }
    }

    async fn wait_for(&mut self, operation: Operation) -> Result<SessionEvent> {
        loop {
            match self.next_event().await {
                SessionEvent::Ignored { .. } => continue,
                SessionEvent::Failed {
                    operation: failed,
                    message,
                } if failed == operation => {
                    return Err(TransportError::new(message).into());
                }
                SessionEvent::Failed { .. } => continue,
                event @ SessionEvent::OutlineReady if operation == Operation::ProposeOutline => {
                    return Ok(event)
                }
                event @ SessionEvent::DeckReady if operation == Operation::GenerateDeck => {
                    return Ok(event)
                }
                event @ SessionEvent::ExportReady(_) if operation == Operation::ExportDeck => {
                    return Ok(event)
                }
                _ => continue,
            }
        }
    }

    fn handle(&mut self, completion: Completion) -> SessionEvent {
        let operation = completion.ticket.operation();
        match self.workflow.apply(completion) {
            Ok(Applied::OutlineReady) => SessionEvent::OutlineReady,
            Ok(Applied::DeckReady) => SessionEvent::DeckReady,
            Ok(Applied::Exported(export)) => SessionEvent::ExportReady(self.api.download_link(&export)),
            Ok(Applied::Failed { operation, message }) => SessionEvent::Failed { operation, message },
            Err(err) => {
                debug!(error = %err, "completion dropped");
                SessionEvent::Ignored { operation }
            }
        }
    }

    fn spawn(&mut self, ticket: Ticket) {
        let api = self.api.clone();
        let tx = self.tx.clone();
        self.in_flight += 1;
        debug!(operation = %ticket.operation(), epoch = ticket.epoch(), "spawning remote call");
        tokio::spawn(async move {
            let outcome = match ticket.operation() {
                Operation::ProposeOutline => Outcome::Outline(api.propose_outline(ticket.request()).await),
                Operation::GenerateDeck => Outcome::Deck(api.generate_deck(ticket.request()).await),
                Operation::ExportDeck => Outcome::Export(api.export_deck(ticket.request()).await),
            };
            let _ = tx.send(Completion { ticket, outcome });
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{json, sample_deck, sample_outline, ScriptedTransport};
    use crate::workflow::{PendingOperation, Stage};
    use pretty_assertions::assert_eq;
    use slide_protocol::{endpoints, ExportResult, Tone};
    use std::sync::Arc;
    use tokio::sync::Semaphore;

    fn climate() -> GenerationRequest {
        GenerationRequest::new("Climate Change", "Students", Tone::Academic, 5)
    }

    fn export_result() -> ExportResult {
        ExportResult {
            download_url: "/downloads/Climate_Change.pptx".to_string(),
            filename: "Climate_Change.pptx".to_string(),
        }
    }

    #[tokio::test]
    async fn test_climate_change_scenario() {
        let (transport, api) = ScriptedTransport::new()
            .reply(endpoints::PROPOSE_OUTLINE, Ok(json(&sample_outline(5))))
            .reply(endpoints::GENERATE_DECK, Ok(json(&sample_deck(5))))
            .into_api();
        let mut session = Session::new(api);

        let outline = session.submit_and_wait(climate()).await.unwrap();
        assert_eq!(outline.slides.len(), 5);
        assert_eq!(session.state().stage(), Stage::Outline);
        assert_eq!(session.state().request(), &climate());

        let deck = session.generate_and_wait().await.unwrap();
        assert_eq!(session.state().stage(), Stage::Deck);
        assert_eq!(deck.slides.len(), 5);
        assert_eq!(
            deck.slides.len(),
            session.state().outline().map(|o| o.slides.len()).unwrap()
        );

        assert_eq!(
            transport.calls(),
            vec![endpoints::PROPOSE_OUTLINE, endpoints::GENERATE_DECK]
        );
        let payloads = transport.payloads();
        assert_eq!(payloads[0], payloads[1]);
        assert_eq!(payloads[0], json(&climate()));
    }

    #[tokio::test]
    async fn test_rejected_outline_keeps_form() {
        let (_, api) = ScriptedTransport::new()
            .reply(
                endpoints::PROPOSE_OUTLINE,
                Err(TransportError::new("rate limited")),
            )
            .into_api();
        let mut session = Session::new(api);

        let err = session.submit_and_wait(climate()).await.unwrap_err();
        assert_eq!(err, WorkflowError::Transport(TransportError::new("rate limited")));
        assert_eq!(session.state().stage(), Stage::Form);
        assert_eq!(session.state().last_error(), Some("rate limited"));
        assert_eq!(session.state().pending(), PendingOperation::None);
    }

    #[tokio::test]
    async fn test_generate_from_form_never_reaches_transport() {
        let (transport, api) = ScriptedTransport::new().into_api();
        let mut session = Session::new(api);

        let err = session.generate().unwrap_err();
        assert!(matches!(err, WorkflowError::IllegalTransition { stage: Stage::Form, .. }));
        assert_eq!(session.in_flight(), 0);
        tokio::task::yield_now().await;
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_request_never_reaches_transport() {
        let (transport, api) = ScriptedTransport::new().into_api();
        let mut session = Session::new(api);

        let bad = GenerationRequest::new("Climate", "Students", Tone::Casual, 2);
        let err = session.submit(bad).unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));
        assert_eq!(session.in_flight(), 0);
        assert!(session.state().last_error().is_some());
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_result_arriving_after_reset_is_discarded() {
        let gate = Arc::new(Semaphore::new(0));
        let (transport, api) = ScriptedTransport::gated(gate.clone())
            .reply(endpoints::PROPOSE_OUTLINE, Ok(json(&sample_outline(5))))
            .into_api();
        let mut session = Session::new(api);

        session.submit(climate()).unwrap();
        assert_eq!(session.state().pending(), PendingOperation::ProposingOutline);
        session.reset();
        assert_eq!(session.state().pending(), PendingOperation::None);

        gate.add_permits(1);
        let event = session.next_event().await;
        assert_eq!(
            event,
            SessionEvent::Ignored {
                operation: Operation::ProposeOutline
            }
        );
        assert_eq!(session.in_flight(), 0);
        assert_eq!(session.state().stage(), Stage::Form);
        assert_eq!(session.state().outline(), None);
        assert_eq!(session.state().last_error(), None);
        assert_eq!(transport.calls(), vec![endpoints::PROPOSE_OUTLINE]);
    }

    #[tokio::test]
    async fn test_state_stays_usable_while_call_is_outstanding() {
        let gate = Arc::new(Semaphore::new(0));
        let (_, api) = ScriptedTransport::gated(gate.clone())
            .reply(endpoints::PROPOSE_OUTLINE, Ok(json(&sample_outline(4))))
            .into_api();
        let mut session = Session::new(api);

        session.submit(climate()).unwrap();
        assert!(session.state().is_busy());
        assert!(matches!(
            session.submit(climate()),
            Err(WorkflowError::OperationPending { .. })
        ));
        session.dismiss_error();
        assert_eq!(session.in_flight(), 1);

        gate.add_permits(1);
        assert_eq!(session.next_event().await, SessionEvent::OutlineReady);
        assert!(!session.state().is_busy());
        assert_eq!(session.state().outline(), Some(&sample_outline(4)));
    }

    #[tokio::test]
    async fn test_export_failure_then_retry() {
        let (transport, api) = ScriptedTransport::new()
            .reply(endpoints::PROPOSE_OUTLINE, Ok(json(&sample_outline(5))))
            .reply(endpoints::GENERATE_DECK, Ok(json(&sample_deck(5))))
            .reply(
                endpoints::EXPORT_PPTX,
                Err(TransportError::new("PPTX export failed: disk full")),
            )
            .reply(endpoints::EXPORT_PPTX, Ok(json(&export_result())))
            .into_api();
        let mut session = Session::new(api);
        session.submit_and_wait(climate()).await.unwrap();
        let deck = session.generate_and_wait().await.unwrap();

        let err = session.export_and_wait().await.unwrap_err();
        assert_eq!(err.to_string(), "PPTX export failed: disk full");
        assert_eq!(session.state().stage(), Stage::Deck);
        assert_eq!(session.state().deck(), Some(&deck));
        assert_eq!(session.state().last_error(), Some("PPTX export failed: disk full"));
        assert!(!session.state().is_exporting());

        let link = session.export_and_wait().await.unwrap();
        assert_eq!(link.url, "http://localhost:8000/downloads/Climate_Change.pptx");
        assert_eq!(link.filename, "Climate_Change.pptx");
        assert_eq!(session.state().last_error(), None);
        assert_eq!(session.state().last_export(), Some(&export_result()));
        assert_eq!(session.state().deck(), Some(&deck));

        let calls = transport.calls();
        assert_eq!(calls.iter().filter(|c| *c == endpoints::GENERATE_DECK).count(), 1);
        assert_eq!(calls.iter().filter(|c| *c == endpoints::EXPORT_PPTX).count(), 2);
    }

    #[tokio::test]
    async fn test_reset_during_export_discards_link() {
        let gate = Arc::new(Semaphore::new(2));
        let (_, api) = ScriptedTransport::gated(gate.clone())
            .reply(endpoints::PROPOSE_OUTLINE, Ok(json(&sample_outline(3))))
            .reply(endpoints::GENERATE_DECK, Ok(json(&sample_deck(3))))
            .reply(endpoints::EXPORT_PPTX, Ok(json(&export_result())))
            .into_api();
        let mut session = Session::new(api);
        session.submit_and_wait(climate()).await.unwrap();
        session.generate_and_wait().await.unwrap();

        session.export().unwrap();
        assert!(session.state().is_exporting());
        session.reset();
        gate.add_permits(1);

        assert_eq!(
            session.next_event().await,
            SessionEvent::Ignored {
                operation: Operation::ExportDeck
            }
        );
        assert_eq!(session.state().stage(), Stage::Form);
        assert_eq!(session.state().deck(), None);
        assert_eq!(session.state().last_export(), None);
    }
}
