use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};
use slide_core::{PendingOperation, Stage, WorkflowState};
use slide_protocol::{Deck, Outline};

use crate::app::App;
use crate::form::{Field, FormState};

pub fn draw(f: &mut Frame, app: &App) {
    let state = app.session.state();
    let error_height = if state.last_error().is_some() { 3 } else { 0 };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(error_height),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(f.area());

    f.render_widget(header(state), chunks[0]);

    if let Some(message) = state.last_error() {
        let error = Paragraph::new(message)
            .style(Style::default().fg(Color::Red))
            .wrap(Wrap { trim: true })
            .block(Block::default().title("Error (Esc to dismiss)").borders(Borders::ALL));
        f.render_widget(error, chunks[1]);
    }

    match state.stage() {
        Stage::Form => draw_form(f, chunks[2], &app.form),
        Stage::Outline => {
            if let Some(outline) = state.outline() {
                draw_outline(f, chunks[2], outline, app.outline_scroll);
            }
        }
        Stage::Deck => {
            if let Some(deck) = state.deck() {
                draw_deck(f, chunks[2], deck, app.page);
            }
        }
    }

    f.render_widget(footer(app), chunks[3]);
}

fn header(state: &WorkflowState) -> Paragraph<'static> {
    let steps = [Stage::Form, Stage::Outline, Stage::Deck];
    let mut spans = vec![Span::styled("Slide Deck ", Style::default().bold())];
    for (i, stage) in steps.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw(" > "));
        }
        let style = if *stage == state.stage() {
            Style::default().fg(Color::Cyan).bold()
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(stage.to_string(), style));
    }
    Paragraph::new(Line::from(spans))
}

fn footer(app: &App) -> Paragraph<'_> {
    let state = app.session.state();
    let status = match state.pending() {
        PendingOperation::ProposingOutline => Some("Generating outline..."),
        PendingOperation::GeneratingDeck => Some("Generating slides..."),
        PendingOperation::None if state.is_exporting() => Some("Exporting PPTX..."),
        PendingOperation::None => None,
    };
    if let Some(status) = status {
        return Paragraph::new(status).style(Style::default().fg(Color::Yellow));
    }

    let keys = match state.stage() {
        Stage::Form if app.form.is_complete() => {
            "Tab: next field  ←/→: change  Enter: propose outline  Ctrl+Q: quit"
        }
        Stage::Form => "Tab: next field  ←/→: change  Ctrl+Q: quit",
        Stage::Outline => "g: generate slides  ↑/↓: scroll  r: start over  Ctrl+Q: quit",
        Stage::Deck => "←/→: page  e: export PPTX  r: start over  Ctrl+Q: quit",
    };
    let mut line = vec![Span::styled(keys, Style::default().fg(Color::DarkGray))];
    if let Some(link) = &app.download {
        line.push(Span::raw("  "));
        line.push(Span::styled(link.url.as_str(), Style::default().fg(Color::Green)));
    }
    Paragraph::new(Line::from(line))
}

fn draw_form(f: &mut Frame, area: Rect, form: &FormState) {
    let value = |field: Field| -> String {
        match field {
            Field::Topic => form.topic.clone(),
            Field::Audience => form.audience.clone(),
            Field::Tone => format!("< {} >", form.tone.label()),
            Field::Slides => format!("< {} >", form.slide_count),
        }
    };

    let items: Vec<ListItem> = [Field::Topic, Field::Audience, Field::Tone, Field::Slides]
        .into_iter()
        .map(|field| {
            let focused = field == form.focus;
            let marker = if focused { "> " } else { "  " };
            let label_style = if focused {
                Style::default().fg(Color::Cyan).bold()
            } else {
                Style::default()
            };
            ListItem::new(Line::from(vec![
                Span::raw(marker),
                Span::styled(format!("{:<9}", field.label()), label_style),
                Span::raw(value(field)),
            ]))
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .title("New presentation")
            .borders(Borders::ALL),
    );
    f.render_widget(list, area);
}

fn draw_outline(f: &mut Frame, area: Rect, outline: &Outline, scroll: u16) {
    let mut lines = Vec::new();
    for (i, slide) in outline.slides.iter().enumerate() {
        lines.push(Line::from(Span::styled(
            format!("{}. {}", i + 1, slide.title),
            Style::default().bold(),
        )));
        lines.push(Line::from(format!("   {}", slide.summary)));
        for citation in slide.citations() {
            lines.push(Line::from(Span::styled(
                format!("   [{citation}]"),
                Style::default().fg(Color::DarkGray),
            )));
        }
        lines.push(Line::default());
    }

    let body = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0))
        .block(
            Block::default()
                .title(format!("Outline: {}", outline.title))
                .borders(Borders::ALL),
        );
    f.render_widget(body, area);
}

fn draw_deck(f: &mut Frame, area: Rect, deck: &Deck, page: usize) {
    let total = deck.slides.len();
    let Some(slide) = deck.slides.get(page) else {
        let empty = Paragraph::new("The deck has no slides.")
            .block(Block::default().title(deck.outline.title.as_str()).borders(Borders::ALL));
        f.render_widget(empty, area);
        return;
    };
    let title = deck
        .outline
        .slides
        .get(page)
        .map_or("Untitled", |s| s.title.as_str());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(5)])
        .split(area);

    let bullets: Vec<Line> = slide
        .bullets
        .iter()
        .map(|b| Line::from(format!("• {b}")))
        .collect();
    let body = Paragraph::new(bullets).wrap(Wrap { trim: true }).block(
        Block::default()
            .title(format!("{title} ({}/{total})", page + 1))
            .borders(Borders::ALL),
    );
    f.render_widget(body, chunks[0]);

    let notes = Paragraph::new(vec![
        Line::from(slide.notes.as_str()),
        Line::from(Span::styled(
            format!("Image: {}", slide.image_prompt),
            Style::default().fg(Color::DarkGray),
        )),
    ])
    .wrap(Wrap { trim: true })
    .block(Block::default().title("Speaker notes").borders(Borders::ALL));
    f.render_widget(notes, chunks[1]);
}
