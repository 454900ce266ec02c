use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use slide_core::{Session, SessionEvent, Stage, WorkflowError};
use slide_protocol::DownloadLink;

use crate::form::FormState;

pub struct App {
    pub(crate) session: Session,
    pub(crate) form: FormState,
    /// First visible line of the outline list.
    pub(crate) outline_scroll: u16,
    /// Slide shown on the deck screen.
    pub(crate) page: usize,
    pub(crate) download: Option<DownloadLink>,
    running: bool,
}

impl App {
    pub fn new(session: Session) -> Self {
        let form = FormState::from_request(session.state().request());
        Self {
            session,
            form,
            outline_scroll: 0,
            page: 0,
            download: None,
            running: true,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q'))
        {
            self.running = false;
            return;
        }
        if key.code == KeyCode::Esc {
            self.session.dismiss_error();
            return;
        }

        match self.session.state().stage() {
            Stage::Form => self.handle_form_key(key),
            Stage::Outline => self.handle_outline_key(key),
            Stage::Deck => self.handle_deck_key(key),
        }
    }

    pub fn handle_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::OutlineReady => self.outline_scroll = 0,
            SessionEvent::DeckReady => self.page = 0,
            SessionEvent::ExportReady(link) => {
                tracing::info!(url = %link.url, "export available");
                self.download = Some(link);
            }
            SessionEvent::Failed { operation, message } => {
                tracing::debug!(%operation, %message, "operation failed");
            }
            SessionEvent::Ignored { operation } => {
                tracing::debug!(%operation, "late result ignored");
            }
        }
    }

    fn handle_form_key(&mut self, key: KeyEvent) {
        if self.session.state().is_busy() {
            return;
        }
        match key.code {
            KeyCode::Enter => {
                let request = self.form.to_request();
                let result = self.session.submit(request);
                self.report(result);
            }
            KeyCode::Tab | KeyCode::Down => self.form.focus_next(),
            KeyCode::BackTab | KeyCode::Up => self.form.focus_previous(),
            KeyCode::Left => self.form.step(-1),
            KeyCode::Right => self.form.step(1),
            KeyCode::Backspace => self.form.backspace(),
            KeyCode::Char(c) => self.form.insert_char(c),
            _ => {}
        }
    }

    fn handle_outline_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('g') | KeyCode::Enter => {
                let result = self.session.generate();
                self.report(result);
            }
            KeyCode::Char('r') => self.reset(),
            KeyCode::Down | KeyCode::Char('j') => {
                self.outline_scroll = self.outline_scroll.saturating_add(1);
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.outline_scroll = self.outline_scroll.saturating_sub(1);
            }
            _ => {}
        }
    }

    fn handle_deck_key(&mut self, key: KeyEvent) {
        let pages = self.session.state().deck().map_or(0, |d| d.slides.len());
        match key.code {
            KeyCode::Char('e') => {
                let result = self.session.export();
                if result.is_ok() {
                    self.download = None;
                }
                self.report(result);
            }
            KeyCode::Char('r') => self.reset(),
            KeyCode::Right | KeyCode::Char('l') | KeyCode::Char(' ') => {
                if self.page + 1 < pages {
                    self.page += 1;
                }
            }
            KeyCode::Left | KeyCode::Char('h') => {
                self.page = self.page.saturating_sub(1);
            }
            _ => {}
        }
    }

    fn reset(&mut self) {
        self.session.reset();
        self.form = FormState::from_request(self.session.state().request());
        self.outline_scroll = 0;
        self.page = 0;
        self.download = None;
    }

    fn report(&self, result: slide_core::Result<()>) {
        // Validation and transport failures already show up as the last error.
        if let Err(
            err @ (WorkflowError::IllegalTransition { .. } | WorkflowError::OperationPending { .. }),
        ) = result
        {
            tracing::debug!(error = %err, "key ignored");
        }
    }
}
