use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap};

use crate::app::{App, InputMode, Screen};
use crate::model::ResourceKind;
use crate::store::LoadPhase;

const BG: Color = Color::Rgb(9, 15, 25);
const PANEL: Color = Color::Rgb(16, 27, 44);
const ACCENT: Color = Color::Rgb(52, 211, 153);
const MUTED: Color = Color::Rgb(140, 156, 178);
const WARN: Color = Color::Rgb(251, 191, 36);
const ERROR: Color = Color::Rgb(248, 113, 113);
const PL_A: Color = Color::Rgb(17, 94, 89);
const PL_B: Color = Color::Rgb(30, 64, 175);
const PL_C: Color = Color::Rgb(55, 48, 163);

pub fn render(frame: &mut Frame, app: &App) {
    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(6),
            Constraint::Length(1),
        ])
        .split(frame.area());

    render_header(frame, root[0], app);
    render_body(frame, root[1], app);
    render_footer(frame, root[2], app);

    match app.mode() {
        InputMode::Prompt => render_dialog(frame, app),
        InputMode::Confirm => render_confirmation(frame, app),
        InputMode::Normal | InputMode::Menu => {}
    }

    if app.show_help() {
        render_help_modal(frame, app);
    }
}

fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let mut spans = Vec::new();
    push_powerline_segment(&mut spans, " nsdeck ", Color::White, PL_A, PL_C);
    push_powerline_segment(
        &mut spans,
        format!(" {} ", app.screen().title()),
        Color::White,
        PL_C,
        BG,
    );

    let right = format!("backend: {} ", app.backend());
    let right_width = right.chars().count() as u16;
    if right_width >= area.width.saturating_sub(spans_width(&spans) as u16) {
        frame.render_widget(
            Paragraph::new(Line::from(spans)).style(Style::default().bg(BG)),
            area,
        );
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(right_width)])
        .split(area);
    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(BG)),
        chunks[0],
    );
    frame.render_widget(
        Paragraph::new(right)
            .style(Style::default().bg(BG).fg(MUTED))
            .alignment(Alignment::Right),
        chunks[1],
    );
}

fn render_body(frame: &mut Frame, area: Rect, app: &App) {
    let kinds = app.screen().kinds();
    let constraints = kinds
        .iter()
        .map(|_| Constraint::Ratio(1, kinds.len() as u32))
        .collect::<Vec<_>>();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    for (&kind, &chunk) in kinds.iter().zip(chunks.iter()) {
        let focused = kind == app.active_kind();
        render_collection(frame, chunk, app, kind, focused);
    }
}

fn render_collection(frame: &mut Frame, area: Rect, app: &App, kind: ResourceKind, focused: bool) {
    let store = app.store(kind);
    let Some(view) = app.view(kind) else {
        return;
    };

    let mut title = format!(
        "{} ({}) · page {}",
        kind.title(),
        store.len(),
        view.pagination.page()
    );
    match store.phase() {
        LoadPhase::Loading => title.push_str(" · loading…"),
        LoadPhase::Failed(_) => title.push_str(" · failed"),
        LoadPhase::Idle | LoadPhase::Loaded => {}
    }
    if let Some(loaded_at) = store.loaded_at() {
        title.push_str(&format!(" · updated {}", loaded_at.format("%H:%M:%S")));
    }

    let border = match (store.phase(), focused) {
        (LoadPhase::Failed(_), true) => ERROR,
        (_, true) => ACCENT,
        (_, false) => MUTED,
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .style(Style::default().bg(PANEL));

    if store.is_empty() {
        let (message, color) = match store.phase() {
            LoadPhase::Failed(error) => (format!("{error}\n\nPress r to retry."), ERROR),
            LoadPhase::Loading | LoadPhase::Idle => ("Loading…".to_string(), MUTED),
            LoadPhase::Loaded => (format!("No {} found.", kind.title().to_lowercase()), MUTED),
        };
        let placeholder = Paragraph::new(Text::from(message))
            .wrap(Wrap { trim: false })
            .block(block)
            .style(Style::default().fg(color));
        frame.render_widget(placeholder, area);
        return;
    }

    let columns = kind.columns();
    let header_row = Row::new(columns.iter().enumerate().map(|(index, column)| {
        let label = if column.sortable {
            let symbol = view.sort.direction_of(column.accessor).symbol();
            format!("{}:{} {symbol}", index + 1, column.header)
        } else {
            column.header.to_string()
        };
        Cell::from(label).style(Style::default().add_modifier(Modifier::BOLD))
    }))
    .height(1)
    .style(Style::default().fg(ACCENT));

    let rows = (0..store.len()).map(|index| {
        let open = store
            .row_key(index)
            .is_some_and(|key| view.menu.is_open(&key));
        let cells = store
            .row_cells(index, columns)
            .into_iter()
            .zip(columns)
            .map(|(value, column)| {
                if column.sortable {
                    Cell::from(value).style(Style::default().fg(Color::White))
                } else if open {
                    Cell::from("▾ actions").style(Style::default().fg(WARN))
                } else {
                    Cell::from("⋯").style(Style::default().fg(MUTED))
                }
            })
            .collect::<Vec<_>>();
        Row::new(cells)
    });

    let table = Table::new(rows, column_constraints(columns.len()))
        .header(header_row)
        .block(block)
        .column_spacing(1)
        .row_highlight_style(
            Style::default()
                .bg(Color::Rgb(24, 36, 58))
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("› ");

    let mut state = TableState::default();
    if focused {
        state.select(Some(view.selected.min(store.len().saturating_sub(1))));
    }
    frame.render_stateful_widget(table, area, &mut state);

    if focused && app.mode() == InputMode::Menu {
        render_action_menu(frame, area, app, view.selected);
    }
}

/// Drops the open menu just under the selected row, kept inside the table.
fn render_action_menu(frame: &mut Frame, area: Rect, app: &App, selected: usize) {
    let actions = app.menu_actions();
    if actions.is_empty() {
        return;
    }
    let highlighted = app
        .view(app.active_kind())
        .map(|view| view.menu.highlighted())
        .unwrap_or_default();

    let width = actions
        .iter()
        .map(|action| action.label().chars().count() as u16 + 6)
        .max()
        .unwrap_or(20)
        .min(area.width);
    let height = (actions.len() as u16 + 2).min(area.height);
    let row_y = area.y.saturating_add(3).saturating_add(selected as u16);
    let y = row_y.min(area.bottom().saturating_sub(height));
    let x = area.right().saturating_sub(width + 1).max(area.x);
    let popup = Rect::new(x, y, width, height);

    let lines = actions
        .iter()
        .enumerate()
        .map(|(index, action)| {
            if index == highlighted {
                Line::from(Span::styled(
                    format!("› {}", action.label()),
                    Style::default()
                        .fg(Color::Black)
                        .bg(ACCENT)
                        .add_modifier(Modifier::BOLD),
                ))
            } else {
                Line::from(Span::styled(
                    format!("  {}", action.label()),
                    Style::default().fg(Color::White),
                ))
            }
        })
        .collect::<Vec<_>>();

    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(WARN))
                .style(Style::default().bg(PANEL)),
        ),
        popup,
    );
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
    let (mode_label, mode_bg, mode_fg) = match app.mode() {
        InputMode::Normal => (" nrm ", PL_A, Color::White),
        InputMode::Menu => (" menu ", ACCENT, Color::Black),
        InputMode::Prompt => (" input ", ACCENT, Color::Black),
        InputMode::Confirm => (" confirm ", WARN, Color::Black),
    };
    let status_bg = if app.status().starts_with("Failed") || app.status().contains("failed") {
        ERROR
    } else {
        PL_B
    };

    let mut spans = Vec::new();
    push_powerline_segment(&mut spans, mode_label, mode_fg, mode_bg, status_bg);
    let status_width_hint = area.width.saturating_sub(40).max(24) as usize;
    push_powerline_segment(
        &mut spans,
        format!(" {} ", compact_text(app.status(), status_width_hint)),
        Color::White,
        status_bg,
        BG,
    );

    let right_spans = build_pagination_spans(app);
    let right_width = (spans_width(&right_spans) as u16).min(area.width.saturating_sub(28));
    if right_width == 0 {
        frame.render_widget(
            Paragraph::new(Line::from(spans)).style(Style::default().bg(BG)),
            area,
        );
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(right_width)])
        .split(area);
    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(BG)),
        chunks[0],
    );
    frame.render_widget(
        Paragraph::new(Line::from(right_spans))
            .style(Style::default().bg(BG))
            .alignment(Alignment::Right),
        chunks[1],
    );
}

fn build_pagination_spans(app: &App) -> Vec<Span<'static>> {
    let Some(view) = app.view(app.active_kind()) else {
        return Vec::new();
    };
    let enabled = |on: bool| {
        if on {
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(MUTED)
        }
    };

    vec![
        Span::styled("◀ p prev", enabled(view.pagination.can_previous())),
        Span::styled(
            format!("  page {}  ", view.pagination.page()),
            Style::default().fg(Color::White),
        ),
        Span::styled("next n ▶ ", enabled(view.pagination.can_next())),
    ]
}

fn render_dialog(frame: &mut Frame, app: &App) {
    let Some(dialog) = app.dialog() else {
        return;
    };
    let area = centered_rect(60, 30, frame.area());
    frame.render_widget(Clear, area);

    let input_style = if dialog.input.trim().is_empty() {
        Style::default().fg(MUTED)
    } else {
        Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
    };
    let lines = vec![
        Line::from(dialog.kind.prompt()),
        Line::from(""),
        Line::from(vec![
            Span::styled("> ", Style::default().fg(ACCENT)),
            Span::styled(format!("{}▏", dialog.input), input_style),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "Enter submit · Esc cancel",
            Style::default().fg(MUTED),
        )),
    ];

    let modal = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title(dialog.kind.title())
                .borders(Borders::ALL)
                .border_style(Style::default().fg(ACCENT))
                .style(Style::default().bg(PANEL)),
        )
        .style(Style::default().fg(Color::White));
    frame.render_widget(modal, area);
}

fn render_confirmation(frame: &mut Frame, app: &App) {
    let Some(prompt) = app.confirmation_prompt() else {
        return;
    };
    let area = centered_rect(50, 20, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(prompt.to_string()),
        Line::from(""),
        Line::from(Span::styled(
            "y confirm · n cancel",
            Style::default().fg(WARN),
        )),
    ];
    let modal = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title("Confirm")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(WARN))
                .style(Style::default().bg(PANEL)),
        )
        .style(Style::default().fg(Color::White));
    frame.render_widget(modal, area);
}

fn render_help_modal(frame: &mut Frame, app: &App) {
    let area = centered_rect(70, 60, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = vec![
        Line::from(format!(
            "nsdeck help  mode:{}  screen:{}",
            help_mode_label(app.mode()),
            app.screen().title()
        )),
        Line::from(""),
    ];
    for line in contextual_help_lines(app.screen()) {
        lines.push(Line::from(line));
    }

    let modal = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title("Help")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(ACCENT))
                .style(Style::default().bg(PANEL)),
        )
        .style(Style::default().fg(Color::White));

    frame.render_widget(modal, area);
}

fn contextual_help_lines(screen: &Screen) -> Vec<String> {
    let mut lines = vec![
        "Rows: j/k or arrows move  Enter/m open the row menu".to_string(),
        "Menu: j/k choose  Enter run  Esc close".to_string(),
        "Table: 1-9 sort by column  n/p next/previous page  r refresh".to_string(),
    ];
    match screen {
        Screen::Namespaces => lines.push(
            "Namespaces: clone any namespace; cloned ones open deployments or configs".to_string(),
        ),
        Screen::Deployments { .. } => lines.push(
            "Deployments: update the image; scaled-down deployments can be scaled up".to_string(),
        ),
        Screen::Configs { .. } => {
            lines.push("Configs: Tab switches between config maps and secrets".to_string())
        }
    }
    lines.push("Esc/Backspace back to namespaces  ? help  q quit".to_string());
    lines
}

fn help_mode_label(mode: InputMode) -> &'static str {
    match mode {
        InputMode::Normal => "normal",
        InputMode::Menu => "menu",
        InputMode::Prompt => "input",
        InputMode::Confirm => "confirm",
    }
}

fn push_powerline_segment(
    spans: &mut Vec<Span<'static>>,
    content: impl Into<String>,
    fg: Color,
    bg: Color,
    next_bg: Color,
) {
    spans.push(Span::styled(
        content.into(),
        Style::default().fg(fg).bg(bg).add_modifier(Modifier::BOLD),
    ));
    spans.push(Span::styled("", Style::default().fg(bg).bg(next_bg)));
}

fn spans_width(spans: &[Span<'_>]) -> usize {
    spans.iter().map(|span| span.content.chars().count()).sum()
}

fn compact_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }

    if max_chars <= 1 {
        return "…".to_string();
    }

    let mut out = value
        .chars()
        .take(max_chars.saturating_sub(1))
        .collect::<String>();
    out.push('…');
    out
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// Data columns share the width; the trailing action column stays narrow.
fn column_constraints(columns: usize) -> Vec<Constraint> {
    if columns <= 1 {
        return vec![Constraint::Percentage(100)];
    }

    let data_columns = columns as u16 - 1;
    let width = (88 / data_columns).max(1);
    (0..data_columns)
        .map(|_| Constraint::Percentage(width))
        .chain(std::iter::once(Constraint::Min(10)))
        .collect()
}
