//! Frame rendering: browse pane, output pane, status bar and the open modal.

use proto::ModelDetails;
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};
use unicode_width::UnicodeWidthChar;

use super::app::{Pane, Source, TuiApp};
use super::modal::{EditorField, Modal, OverrideEditor, QuantPicker};
use super::status;
use super::theme::THEME;

const STATUS_HEIGHT: u16 = 1;
const BORDER_ROWS: u16 = 2;
const QUANTS_PER_LINE: usize = 5;

/// Text rows inside the output pane for a terminal `height` rows tall.
pub fn output_viewport_height(height: u16) -> u16 {
    height.saturating_sub(STATUS_HEIGHT + BORDER_ROWS)
}

/// Draws the whole session.
pub fn render(app: &TuiApp, frame: &mut Frame<'_>) {
    let [main, status_area] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(STATUS_HEIGHT)])
            .areas(frame.area());
    let [browse, output] =
        Layout::horizontal([Constraint::Ratio(1, 3), Constraint::Ratio(2, 3)]).areas(main);

    render_browse(app, frame, browse);
    render_output(app, frame, output);
    status::render(app, frame, status_area);

    match &app.modal {
        Modal::None => {}
        Modal::ConfigEdit(editor) => render_editor(editor, frame),
        Modal::QuantPick(picker) => render_quant_picker(picker, frame),
        Modal::Details(details) => render_details(details, frame),
        Modal::NoQuantConfirm(model) => render_no_quant(&model.id, frame),
    }
}

fn pane_block(title: Line<'static>, focused: bool) -> Block<'static> {
    let border_style = if focused {
        Style::default().fg(THEME.border_active)
    } else {
        Style::default().fg(THEME.border)
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(title)
}

// ─── Browse pane ─────────────────────────────────────────────

fn tab(label: &'static str, active: bool) -> Span<'static> {
    if active {
        Span::styled(
            label,
            Style::default()
                .fg(THEME.tab_active)
                .add_modifier(Modifier::BOLD | Modifier::REVERSED),
        )
    } else {
        Span::styled(label, Style::default().fg(THEME.tab_inactive))
    }
}

fn render_browse(app: &TuiApp, frame: &mut Frame<'_>, area: Rect) {
    let title = Line::from(vec![
        tab(" 1:Local ", app.source == Source::Local),
        Span::raw(" "),
        tab(" 2:HuggingFace ", app.source == Source::Remote),
    ]);
    let block = pane_block(title, app.focus == Pane::Browse);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let width = inner.width as usize;
    let lines = match app.source {
        Source::Local => local_lines(app, width, inner.height as usize),
        Source::Remote => remote_lines(app, width, inner.height as usize),
    };
    frame.render_widget(Paragraph::new(lines), inner);
}

fn row(text: String, selected: bool, width: usize) -> Line<'static> {
    let marker = if selected { "> " } else { "  " };
    let text = truncate(&format!("{marker}{text}"), width);
    if selected {
        Line::from(Span::styled(
            text,
            Style::default()
                .fg(THEME.selection_fg)
                .bg(THEME.selection_bg)
                .add_modifier(Modifier::BOLD),
        ))
    } else {
        Line::from(Span::styled(text, Style::default().fg(THEME.fg)))
    }
}

/// First row to draw so `selected` stays inside `rows` visible rows.
fn list_start(selected: usize, rows: usize) -> usize {
    (selected + 1).saturating_sub(rows.max(1))
}

fn local_lines(app: &TuiApp, width: usize, rows: usize) -> Vec<Line<'static>> {
    if app.local_models.is_empty() {
        return vec![Line::from(Span::styled(
            " No models found. Check the models directory.",
            Style::default().fg(THEME.fg_muted),
        ))];
    }
    let start = list_start(app.local_selected, rows);
    app.local_models
        .iter()
        .enumerate()
        .skip(start)
        .take(rows)
        .map(|(idx, model)| {
            row(
                format!("{} ({:.2} MB)", model.name, model.size_mb()),
                idx == app.local_selected,
                width,
            )
        })
        .collect()
}

fn remote_lines(app: &TuiApp, width: usize, rows: usize) -> Vec<Line<'static>> {
    let cursor = if app.search_focused { "_" } else { "" };
    let prompt_style = if app.search_focused {
        Style::default().fg(THEME.accent_bright)
    } else {
        Style::default().fg(THEME.fg_dim)
    };
    let mut lines = vec![
        Line::from(vec![
            Span::styled("/ to search: ", prompt_style),
            Span::styled(
                truncate(&format!("{}{cursor}", app.search.value()), width.saturating_sub(13)),
                Style::default().fg(THEME.fg),
            ),
        ]),
        Line::default(),
    ];

    if app.searching.is_some() {
        lines.push(Line::from(Span::styled(
            "Searching...",
            Style::default().fg(THEME.warning),
        )));
        return lines;
    }
    if app.remote_models.is_empty() {
        lines.push(Line::from(Span::styled(
            "No results. Press / to search.",
            Style::default().fg(THEME.fg_muted),
        )));
        return lines;
    }

    let rows = rows.saturating_sub(lines.len());
    let start = list_start(app.remote_selected, rows);
    lines.extend(
        app.remote_models
            .iter()
            .enumerate()
            .skip(start)
            .take(rows)
            .map(|(idx, model)| {
                row(
                    format!("{} ({} dl)", model.id, model.downloads),
                    idx == app.remote_selected,
                    width,
                )
            }),
    );
    lines
}

// ─── Output pane ─────────────────────────────────────────────

fn render_output(app: &TuiApp, frame: &mut Frame<'_>, area: Rect) {
    let focused = app.focus == Pane::Output;
    let mut title = vec![Span::styled(
        " Output ",
        Style::default().fg(THEME.fg).add_modifier(Modifier::BOLD),
    )];
    if !app.output.is_following() {
        title.push(Span::styled(
            "[scrolled] ",
            Style::default().fg(THEME.warning),
        ));
    }
    let block = pane_block(Line::from(title), focused);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines: Vec<Line<'_>> = app
        .output
        .visible_lines(inner.height as usize)
        .map(|line| Line::from(sanitize_line(line)))
        .collect();
    frame.render_widget(
        Paragraph::new(lines).style(Style::default().fg(THEME.fg)),
        inner,
    );
}

/// Drops ANSI CSI sequences and control characters; tabs become spaces.
pub fn sanitize_line(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\x1b' => {
                if chars.peek() == Some(&'[') {
                    chars.next();
                    for c in chars.by_ref() {
                        if ('\x40'..='\x7e').contains(&c) {
                            break;
                        }
                    }
                }
            }
            '\t' => out.push_str("    "),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}

/// Cuts `text` to at most `width` terminal columns.
fn truncate(text: &str, width: usize) -> String {
    let mut used = 0;
    let mut out = String::new();
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > width {
            break;
        }
        used += w;
        out.push(ch);
    }
    out
}

// ─── Modals ──────────────────────────────────────────────────

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width,
        height,
    }
}

fn render_popup(frame: &mut Frame<'_>, title: String, lines: Vec<Line<'static>>, width: u16) {
    let height = lines.len() as u16 + BORDER_ROWS;
    let popup = centered(frame.area(), width, height);
    frame.render_widget(Clear, popup);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(THEME.modal_border))
        .title(Line::from(Span::styled(
            title,
            Style::default()
                .fg(THEME.modal_label)
                .add_modifier(Modifier::BOLD),
        )));
    frame.render_widget(Paragraph::new(lines).block(block), popup);
}

fn hint(text: &'static str) -> Line<'static> {
    Line::from(Span::styled(text, Style::default().fg(THEME.modal_hint)))
}

fn labelled(label: &'static str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(label, Style::default().fg(THEME.modal_label)),
        Span::styled(value, Style::default().fg(THEME.fg)),
    ])
}

fn render_editor(editor: &OverrideEditor, frame: &mut Frame<'_>) {
    let field = |label: &'static str, value: &str, focused: bool| {
        let style = if focused {
            Style::default()
                .fg(THEME.selection_fg)
                .bg(THEME.selection_bg)
        } else {
            Style::default().fg(THEME.fg)
        };
        let cursor = if focused { "_" } else { "" };
        Line::from(vec![
            Span::styled(label, Style::default().fg(THEME.modal_label)),
            Span::styled(format!("[{value}{cursor}]"), style),
        ])
    };
    let lines = vec![
        field(
            "NGL (GPU layers): ",
            editor.ngl.value(),
            editor.focus == EditorField::Ngl,
        ),
        field(
            "CtxSize:          ",
            editor.ctx_size.value(),
            editor.focus == EditorField::CtxSize,
        ),
        Line::default(),
        hint("Enter: Save | Esc: Cancel | Tab: Switch"),
    ];
    render_popup(frame, " Session Config ".to_string(), lines, 46);
}

fn render_quant_picker(picker: &QuantPicker, frame: &mut Frame<'_>) {
    let title = match picker.position_hint() {
        Some(pos) => format!(" Select Quantization {pos} "),
        None => " Select Quantization ".to_string(),
    };
    let mut lines = vec![
        labelled("Model: ", picker.model.id.clone()),
        Line::default(),
    ];
    for idx in picker.window() {
        lines.push(row(
            picker.quants[idx].clone(),
            idx == picker.selected,
            usize::MAX,
        ));
    }
    lines.push(Line::default());
    lines.push(hint("Enter: Server | c: CLI | Esc: Cancel"));
    render_popup(frame, title, lines, 56);
}

/// Human-readable size: gigabytes at or above one GiB, megabytes below.
pub fn format_size(bytes: u64) -> String {
    let gb = bytes as f64 / (1024.0 * 1024.0 * 1024.0);
    if gb >= 1.0 {
        format!("{gb:.2} GB")
    } else {
        format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

/// Detail rows for a remote model, wrapping long quantization lists.
pub fn details_lines(details: &ModelDetails, width: usize) -> Vec<Line<'static>> {
    let mut lines = vec![
        labelled("Model: ", details.id.clone()),
        Line::default(),
        labelled("Downloads: ", details.downloads.to_string()),
        labelled("Likes: ", details.likes.to_string()),
    ];
    if let Some(task) = &details.pipeline_tag {
        lines.push(labelled("Task: ", task.clone()));
    }
    if let Some(gguf) = &details.gguf {
        if let Some(arch) = &gguf.architecture {
            lines.push(labelled("Architecture: ", arch.clone()));
        }
        if let Some(ctx) = gguf.context_length {
            lines.push(labelled("Context Length: ", ctx.to_string()));
        }
        if let Some(total) = gguf.total {
            lines.push(labelled("Size: ", format_size(total)));
        }
    }
    if let Some(license) = &details.license {
        lines.push(labelled("License: ", license.clone()));
    }
    if let Some(modified) = details.last_modified {
        lines.push(labelled(
            "Last Modified: ",
            modified.format("%Y-%m-%d").to_string(),
        ));
    }

    if !details.quantizations.is_empty() {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            "Available Quantizations:",
            Style::default().fg(THEME.modal_label),
        )));
        let joined = details.quantizations.join(", ");
        if joined.chars().count() <= width {
            lines.push(Line::from(joined));
        } else {
            for chunk in details.quantizations.chunks(QUANTS_PER_LINE) {
                lines.push(Line::from(chunk.join(", ")));
            }
        }
    }
    lines.push(Line::default());
    lines.push(hint("Press Esc to close"));
    lines
}

fn render_details(details: &ModelDetails, frame: &mut Frame<'_>) {
    const WIDTH: u16 = 72;
    let lines = details_lines(details, (WIDTH - BORDER_ROWS) as usize);
    render_popup(frame, " Model Information ".to_string(), lines, WIDTH);
}

fn render_no_quant(model_id: &str, frame: &mut Frame<'_>) {
    let lines = vec![
        labelled("Model: ", model_id.to_string()),
        Line::default(),
        Line::from("Could not detect available quantizations."),
        Line::from("Try anyway without specifying a quant?"),
        Line::default(),
        hint("y/Enter: Server | c: CLI | n/Esc: Cancel"),
    ];
    render_popup(frame, " No Quantizations Found ".to_string(), lines, 56);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discover::LocalModel;
    use crate::tui::action::Action;
    use proto::{GgufInfo, LaunchOverrides, RemoteModel};
    use ratatui::{Terminal, backend::TestBackend};
    use std::path::PathBuf;

    fn make_app() -> TuiApp {
        TuiApp::new(
            vec![
                LocalModel {
                    name: "alpha.gguf".to_string(),
                    path: PathBuf::from("/m/alpha.gguf"),
                    size: 3 * 1024 * 1024,
                },
                LocalModel {
                    name: "beta.gguf".to_string(),
                    path: PathBuf::from("/m/beta.gguf"),
                    size: 1024,
                },
            ],
            LaunchOverrides { ngl: 99, ctx_size: 0 },
        )
    }

    fn draw(app: &TuiApp, width: u16, height: u16) -> String {
        let backend = TestBackend::new(width, height);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();
        let buf = terminal.backend().buffer().clone();
        buf.content()
            .iter()
            .map(|cell| cell.symbol().chars().next().unwrap_or(' '))
            .collect()
    }

    fn details() -> ModelDetails {
        ModelDetails {
            id: "foo/bar-GGUF".to_string(),
            downloads: 1234,
            likes: 56,
            pipeline_tag: Some("text-generation".to_string()),
            license: Some("apache-2.0".to_string()),
            gguf: Some(GgufInfo {
                architecture: Some("llama".to_string()),
                context_length: Some(4096),
                total: Some(500 * 1024 * 1024),
            }),
            last_modified: None,
            files: Vec::new(),
            quantizations: (0..12).map(|i| format!("Q{i}_K_M")).collect(),
        }
    }

    #[test]
    fn viewport_excludes_status_and_borders() {
        assert_eq!(output_viewport_height(40), 37);
        assert_eq!(output_viewport_height(2), 0);
    }

    #[test]
    fn draws_tabs_local_list_and_output() {
        let app = make_app();
        let screen = draw(&app, 120, 20);
        assert!(screen.contains("1:Local"));
        assert!(screen.contains("2:HuggingFace"));
        assert!(screen.contains("alpha.gguf (3.00 MB)"));
        assert!(screen.contains("Output"));
        assert!(screen.contains("Ready."));
    }

    #[test]
    fn remote_pane_shows_search_states() {
        let mut app = make_app();
        app.source = Source::Remote;
        assert!(draw(&app, 120, 20).contains("No results. Press / to search."));

        app.searching = Some("llama".to_string());
        assert!(draw(&app, 120, 20).contains("Searching..."));

        app.searching = None;
        app.remote_models = vec![RemoteModel::new("org/tiny-GGUF")];
        let screen = draw(&app, 120, 20);
        assert!(screen.contains("/ to search:"));
        assert!(screen.contains("org/tiny-GGUF"));
    }

    #[test]
    fn modals_render_their_titles() {
        let mut app = make_app();
        app.modal = Modal::ConfigEdit(OverrideEditor::new(app.overrides));
        assert!(draw(&app, 120, 30).contains("Session Config"));

        app.modal = Modal::QuantPick(QuantPicker::new(
            RemoteModel::new("foo/bar"),
            (0..20).map(|i| format!("Q{i}")).collect(),
        ));
        let screen = draw(&app, 120, 30);
        assert!(screen.contains("Select Quantization (1/20)"));

        app.modal = Modal::Details(Box::new(details()));
        let screen = draw(&app, 120, 30);
        assert!(screen.contains("Model Information"));
        assert!(screen.contains("500.00 MB"));

        app.modal = Modal::NoQuantConfirm(RemoteModel::new("foo/bar"));
        assert!(draw(&app, 120, 30).contains("Could not detect available quantizations."));
    }

    #[test]
    fn tiny_terminal_does_not_panic() {
        let mut app = make_app();
        app.update(Action::Resize {
            width: 12,
            height: 3,
        });
        draw(&app, 12, 3);
        app.modal = Modal::Details(Box::new(details()));
        draw(&app, 12, 3);
    }

    #[test]
    fn long_quant_list_wraps_five_per_line() {
        let lines = details_lines(&details(), 40);
        let rows: Vec<String> = lines.iter().map(|l| l.to_string()).collect();
        let first = rows
            .iter()
            .position(|r| r == "Available Quantizations:")
            .unwrap();
        assert_eq!(rows[first + 1], "Q0_K_M, Q1_K_M, Q2_K_M, Q3_K_M, Q4_K_M");
        assert_eq!(rows[first + 3], "Q10_K_M, Q11_K_M");
    }

    #[test]
    fn size_switches_units_at_one_gigabyte() {
        assert_eq!(format_size(1024 * 1024 * 1024), "1.00 GB");
        assert_eq!(format_size(512 * 1024 * 1024), "512.00 MB");
    }

    #[test]
    fn sanitize_strips_escape_sequences() {
        assert_eq!(sanitize_line("\x1b[32mok\x1b[0m\r"), "ok");
        assert_eq!(sanitize_line("a\tb"), "a    b");
    }

    #[test]
    fn truncate_counts_wide_characters() {
        assert_eq!(truncate("日本語", 4), "日本");
        assert_eq!(truncate("abc", 10), "abc");
    }
}
