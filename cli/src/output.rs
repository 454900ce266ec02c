//! Plain-text rendering for the one-shot commands.

use slide_protocol::{Deck, HealthStatus, Outline};
use std::fmt::Write;

pub(crate) fn outline(outline: &Outline) -> String {
    let mut out = format!("# {}\n\n", outline.title);
    for (i, slide) in outline.slides.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", i + 1, slide.title);
        let _ = writeln!(out, "   {}", slide.summary);
        for citation in slide.citations() {
            let _ = writeln!(out, "   [{citation}]");
        }
    }
    out
}

pub(crate) fn deck(deck: &Deck) -> String {
    let mut out = format!("# {}\n", deck.outline.title);
    for (i, slide) in deck.slides.iter().enumerate() {
        let title = deck
            .outline
            .slides
            .get(i)
            .map_or("Untitled", |s| s.title.as_str());
        let _ = writeln!(out, "\n## {}. {title}", i + 1);
        for bullet in &slide.bullets {
            let _ = writeln!(out, "- {bullet}");
        }
        if !slide.notes.is_empty() {
            let _ = writeln!(out, "\nNotes: {}", slide.notes);
        }
    }
    out
}

pub(crate) fn health(status: &HealthStatus) -> String {
    let mut out = format!("status: {}\n", status.status);
    if let Some(dir) = &status.downloads_dir {
        let exists = match status.downloads_exists {
            Some(true) => "",
            Some(false) => " (missing)",
            None => "",
        };
        let _ = writeln!(out, "downloads: {dir}{exists}");
    }
    if let Some(count) = status.file_count {
        let _ = writeln!(out, "files: {count}");
    }
    out
}
