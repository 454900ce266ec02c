use anyhow::Result;
use crossterm::{
    event::{Event, EventStream},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures_util::StreamExt;
use ratatui::prelude::*;
use slide_core::Session;
use std::io;

use crate::app::App;
use crate::view;

pub struct InteractiveApp {
    app: App,
}

impl InteractiveApp {
    pub fn new(session: Session) -> Self {
        Self {
            app: App::new(session),
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.event_loop(&mut terminal).await;

        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    async fn event_loop<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        let mut input = EventStream::new();

        while self.app.is_running() {
            terminal.draw(|f| view::draw(f, &self.app))?;

            let waiting = self.app.session().in_flight() > 0;
            tokio::select! {
                event = self.app.session_mut().next_event(), if waiting => {
                    self.app.handle_session_event(event);
                }
                maybe_input = input.next() => {
                    match maybe_input {
                        Some(Ok(Event::Key(key))) => self.app.handle_key(key),
                        Some(Ok(_)) => {}
                        Some(Err(err)) => return Err(err.into()),
                        None => break,
                    }
                }
            }
        }

        Ok(())
    }
}
