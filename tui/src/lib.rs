//! Terminal front-end for the slide workflow.

mod app;
mod form;
mod interactive;
mod view;

use anyhow::Result;
use slide_common::SlideConfig;
use slide_core::Session;

pub use app::App;
pub use form::{Field, FormState};
pub use interactive::InteractiveApp;

/// Runs the full-screen workflow until the user quits.
pub async fn run_interactive(config: &SlideConfig) -> Result<()> {
    let session = Session::from_config(config)?;
    tracing::info!(base_url = %config.base_url, "starting interactive session");
    InteractiveApp::new(session).run().await
}
