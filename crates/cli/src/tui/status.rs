//! Status bar widget: relay input, current selection with launch settings,
//! and process state.

use super::app::{Pane, Source, TuiApp};
use super::theme::THEME;
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};

/// Braille-pattern spinner frames for the status bar animation.
const SPINNER: &[char] = &['⣾', '⣽', '⣻', '⢿', '⡿', '⣟', '⣯', '⣷'];

/// Text of the left-hand status segment.
pub fn status_text(app: &TuiApp) -> String {
    let relay_active = app.relay_mode && app.process_running && app.focus == Pane::Output;
    if relay_active {
        return if app.relay_buffer.is_empty() {
            " > _ (CLI mode - type and press Enter, Esc to exit) ".to_string()
        } else {
            format!(" > {}_ ", app.relay_buffer)
        };
    }

    let ngl = app.overrides.ngl;
    let ctx = app.overrides.ctx_size;
    match app.source {
        Source::Local => match app.selected_local() {
            Some(model) => format!(" Selected: {} | NGL: {ngl} | CtxSize: {ctx} ", model.name),
            None => format!(" NGL: {ngl} | CtxSize: {ctx} | Press 1/2 for tabs "),
        },
        Source::Remote => match app.selected_remote() {
            Some(model) => format!(" HF: {} | NGL: {ngl} | CtxSize: {ctx} ", model.id),
            None => format!(" NGL: {ngl} | CtxSize: {ctx} | Press 1/2 for tabs "),
        },
    }
}

/// Renders the status bar.
pub fn render(app: &TuiApp, frame: &mut Frame<'_>, area: Rect) {
    let relay_active = app.relay_mode && app.process_running && app.focus == Pane::Output;
    let left_style = if relay_active {
        Style::default()
            .fg(THEME.status_relay)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(THEME.status_model)
    };
    let mut left = vec![Span::styled(status_text(app), left_style)];

    if app.is_loading() {
        let spinner = SPINNER[(app.spinner_tick as usize) % SPINNER.len()];
        left.push(Span::styled(
            format!(" {spinner} Loading... "),
            Style::default().fg(THEME.status_spinner),
        ));
    }

    let chunks = Layout::horizontal([Constraint::Min(0), Constraint::Length(22)]).split(area);
    frame.render_widget(Paragraph::new(Line::from(left)), chunks[0]);

    let (dot, state, color) = if app.process_running {
        ("●", "running", THEME.success)
    } else {
        ("○", "idle", THEME.fg_muted)
    };
    let right = Line::from(vec![
        Span::styled(format!("{dot} {state} "), Style::default().fg(color)),
        Span::styled(
            format!("v{}  ", env!("CARGO_PKG_VERSION")),
            Style::default().fg(THEME.status_hint),
        ),
    ]);
    frame.render_widget(Paragraph::new(right).right_aligned(), chunks[1]);
}
