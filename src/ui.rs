use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap};

use crate::app::{App, InputMode};
use crate::columns::CellValue;
use crate::list_view::HeaderCell;
use crate::model::{ConditionStatus, ResourceKind};
use crate::resource::ResourceModel;
use crate::status::{self, Classification};

const BG: Color = Color::Rgb(9, 15, 25);
const PANEL: Color = Color::Rgb(16, 27, 44);
const ACCENT: Color = Color::Rgb(52, 211, 153);
const MUTED: Color = Color::Rgb(140, 156, 178);
const WARN: Color = Color::Rgb(251, 191, 36);
const ERROR: Color = Color::Rgb(248, 113, 113);
const PL_A: Color = Color::Rgb(17, 94, 89);
const PL_B: Color = Color::Rgb(30, 64, 175);
const PL_C: Color = Color::Rgb(55, 48, 163);

pub fn render(frame: &mut Frame, app: &mut App) {
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

    if app.show_help() {
        render_help_modal(frame, app);
    }
}

fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let left_line = build_left_header_line(app);
    let right_line = Line::from(Span::styled(
        format!(" {} ", compact_text(app.location(), 64)),
        Style::default().fg(MUTED).bg(BG),
    ));
    let right_width = spans_width(&right_line.spans) as u16;
    if area.width < 60 || right_width >= area.width / 2 {
        frame.render_widget(
            Paragraph::new(left_line).style(Style::default().bg(BG).fg(Color::White)),
            area,
        );
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(right_width)])
        .split(area);
    frame.render_widget(
        Paragraph::new(left_line).style(Style::default().bg(BG).fg(Color::White)),
        chunks[0],
    );
    frame.render_widget(
        Paragraph::new(right_line)
            .style(Style::default().bg(BG))
            .alignment(Alignment::Right),
        chunks[1],
    );
}

fn build_left_header_line(app: &App) -> Line<'static> {
    let mut spans = Vec::new();
    push_powerline_segment(
        &mut spans,
        format!(" {} ", compact_text(app.context(), 24)),
        Color::White,
        PL_A,
        PL_B,
    );
    push_powerline_segment(
        &mut spans,
        format!(" ns:{} ", compact_text(&app.namespace_scope().to_string(), 20)),
        Color::White,
        PL_B,
        BG,
    );

    for kind in ResourceKind::ALL {
        let tab = if kind == app.active_kind() {
            Span::styled(
                format!(" {} ", kind.title()),
                Style::default()
                    .fg(Color::Black)
                    .bg(ACCENT)
                    .add_modifier(Modifier::BOLD),
            )
        } else {
            Span::styled(
                format!(" {} ", kind.short_token()),
                Style::default().fg(MUTED).bg(BG),
            )
        };
        spans.push(Span::raw(" "));
        spans.push(tab);
    }
    Line::from(spans)
}

fn render_body(frame: &mut Frame, area: Rect, app: &mut App) {
    app.set_table_page_size(table_rows_visible(area));

    if app.detail_open() {
        render_detail(frame, area, app);
        return;
    }

    if app.drawer_visible() {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(58), Constraint::Percentage(42)])
            .split(area);
        render_table(frame, chunks[0], app);
        render_drawer(frame, chunks[1], app);
        return;
    }

    render_table(frame, area, app);
}

fn render_table(frame: &mut Frame, area: Rect, app: &App) {
    let table_view = app.table();
    let kind = app.active_kind();

    if let Some(error) = table_view.error.as_deref() {
        let panel = Paragraph::new(Text::from(error.to_string()))
            .wrap(Wrap { trim: false })
            .block(
                Block::default()
                    .title(format!("{} Error", kind.title()))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(ERROR))
                    .style(Style::default().bg(PANEL)),
            )
            .style(Style::default().fg(ERROR));
        frame.render_widget(panel, area);
        return;
    }

    let sorted = app.sort_column();
    let header_row = Row::new(table_view.headers.iter().map(|header| {
        let mut style = Style::default().add_modifier(Modifier::BOLD);
        if sorted == Some(header.id) {
            style = style.fg(WARN);
        }
        Cell::from(header.label.clone()).style(style)
    }))
    .height(1)
    .style(Style::default().fg(ACCENT));

    let rows = table_view
        .rows
        .iter()
        .map(|row| Row::new(row.cells.iter().map(|cell| Cell::from(cell_line(cell)))));

    let title = if app.filter().is_empty() {
        format!("{} ({})", kind.title(), table_view.rows.len())
    } else {
        format!(
            "{} ({}) /{}",
            kind.title(),
            table_view.rows.len(),
            compact_text(app.filter(), 24)
        )
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ACCENT))
        .style(Style::default().bg(PANEL));

    let table = Table::new(rows, column_constraints(&table_view.headers))
        .header(header_row)
        .block(block)
        .column_spacing(1)
        .row_highlight_style(
            Style::default()
                .bg(Color::Rgb(24, 36, 58))
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▶ ");

    let mut state = TableState::default();
    if !table_view.rows.is_empty() {
        state.select(Some(app.selected_index()));
    }
    frame.render_stateful_widget(table, area, &mut state);
}

fn render_drawer(frame: &mut Frame, area: Rect, app: &App) {
    let (title, text) = match app.drawer_target() {
        Some(model) => (
            format!("{} {}", model.kind().title(), model.id()),
            resource_text(model),
        ),
        None => (
            "Details".to_string(),
            Text::from(Line::from(Span::styled(
                "No selection",
                Style::default().fg(MUTED),
            ))),
        ),
    };

    let paragraph = Paragraph::new(text)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(Style::default().fg(PL_C))
                .style(Style::default().bg(PANEL)),
        )
        .style(Style::default().fg(Color::White))
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn render_detail(frame: &mut Frame, area: Rect, app: &App) {
    let (title, text) = match app.detail_target() {
        Some(model) => (
            format!("{} {}  (esc: back)", model.kind().title(), model.id()),
            resource_text(model),
        ),
        None => (
            "Details".to_string(),
            Text::from("Resource is no longer listed"),
        ),
    };

    let paragraph = Paragraph::new(text)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(Style::default().fg(ACCENT))
                .style(Style::default().bg(PANEL)),
        )
        .style(Style::default().fg(Color::White))
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn resource_text(model: &ResourceModel) -> Text<'static> {
    let summary = status::derive(model);
    let mut lines = Vec::new();

    if !summary.reason.is_empty() {
        lines.push(Line::from(vec![
            Span::styled("status: ", Style::default().fg(MUTED)),
            Span::styled(
                summary.reason.clone(),
                Style::default()
                    .fg(classification_color(summary.classification))
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!(" ({})", summary.classification.label()),
                Style::default().fg(MUTED),
            ),
        ]));
    }
    if !summary.tooltip.is_empty() {
        lines.push(Line::from(Span::styled(
            summary.tooltip.clone(),
            Style::default().fg(MUTED),
        )));
    }
    if let Some(gates) = status::readiness_gates(model) {
        let mut spans = vec![Span::styled(
            format!("readiness gates {}: ", gates.label()),
            Style::default().fg(MUTED),
        )];
        for (gate, status) in &gates.entries {
            spans.push(Span::styled(
                format!("{gate} "),
                Style::default().fg(condition_color(*status)),
            ));
        }
        lines.push(Line::from(spans));
    }

    for condition in status::condition_badges(model) {
        let mut spans = vec![
            Span::styled("condition ", Style::default().fg(MUTED)),
            Span::styled(
                format!("{}={}", condition.type_, condition.status.as_str()),
                Style::default().fg(condition_color(condition.status)),
            ),
        ];
        if let Some(message) = condition.message.filter(|message| !message.is_empty()) {
            spans.push(Span::styled(format!("  {message}"), Style::default().fg(MUTED)));
        }
        lines.push(Line::from(spans));
    }

    for container in model.containers() {
        lines.push(Line::from(vec![
            Span::styled("container ", Style::default().fg(MUTED)),
            Span::raw(container.name),
            Span::styled(format!("  {}", container.image), Style::default().fg(MUTED)),
        ]));
    }

    if !lines.is_empty() {
        lines.push(Line::raw(""));
    }
    lines.extend(model.to_yaml().lines().map(highlight_yaml_line));
    Text::from(lines)
}

fn cell_line(value: &CellValue) -> Line<'static> {
    match value {
        CellValue::Status(summary) => Line::from(Span::styled(
            summary.reason.clone(),
            Style::default().fg(classification_color(summary.classification)),
        )),
        CellValue::Badges(conditions) => Line::from(condition_spans(conditions)),
        CellValue::Ratio { ready, total } => {
            let color = if ready < total { WARN } else { Color::White };
            Line::from(Span::styled(value.display(), Style::default().fg(color)))
        }
        CellValue::Link(link) => {
            let mut style = Style::default().fg(Color::Rgb(125, 211, 252));
            if link.opens_drawer {
                style = style.add_modifier(Modifier::UNDERLINED);
            }
            Line::from(Span::styled(link.id.name.clone(), style))
        }
        _ => Line::from(Span::styled(value.display(), Style::default().fg(Color::White))),
    }
}

fn condition_spans(conditions: &[crate::model::Condition]) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    for (index, condition) in conditions.iter().enumerate() {
        if index > 0 {
            spans.push(Span::raw(" "));
        }
        spans.push(Span::styled(
            condition.type_.clone(),
            Style::default().fg(condition_color(condition.status)),
        ));
    }
    spans
}

fn condition_color(status: ConditionStatus) -> Color {
    match status {
        ConditionStatus::True => ACCENT,
        ConditionStatus::False => ERROR,
        ConditionStatus::Unknown => MUTED,
    }
}

fn classification_color(classification: Classification) -> Color {
    match classification {
        Classification::Success => ACCENT,
        Classification::Warning => WARN,
        Classification::Error => ERROR,
        Classification::None => Color::White,
    }
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
    let mut spans = Vec::new();

    match app.mode() {
        InputMode::Normal => {
            let pending = app.pending_confirmation_prompt();
            let status_text = pending
                .map(|prompt| format!("{prompt}? (y/n)"))
                .unwrap_or_else(|| app.status().to_string());
            let (status_fg, status_bg) = if pending.is_some() {
                (Color::Black, WARN)
            } else {
                (Color::White, PL_B)
            };
            let drawer = app.drawer_state();
            let mode_label = if drawer.enabled_by_user {
                " nrm "
            } else {
                " nrm·nodrawer "
            };

            push_powerline_segment(&mut spans, mode_label, Color::White, PL_A, status_bg);
            push_powerline_segment(
                &mut spans,
                format!(
                    " {} {} ",
                    footer_status_icon(&status_text),
                    compact_text(&status_text, area.width.saturating_sub(28).max(24) as usize)
                ),
                status_fg,
                status_bg,
                BG,
            );
            if let Some(refreshed) = app.last_refreshed() {
                spans.push(Span::styled(
                    format!(" {refreshed}"),
                    Style::default().fg(MUTED).bg(BG),
                ));
            }
        }
        InputMode::Filter => {
            push_powerline_segment(&mut spans, " flt ", Color::Black, WARN, PL_B);
            push_powerline_segment(&mut spans, format!(" /{} ", app.input()), Color::White, PL_B, BG);
        }
        InputMode::Command => {
            push_powerline_segment(&mut spans, " cmd ", Color::Black, ACCENT, PL_B);
            push_powerline_segment(&mut spans, format!(" :{} ", app.input()), Color::White, PL_B, BG);
        }
    }

    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(BG)),
        area,
    );
}

fn footer_status_icon(status_text: &str) -> &'static str {
    let status = status_text.to_ascii_lowercase();
    let has_failure = ["failed", "error", "timed out", "forbidden", "unknown"]
        .iter()
        .any(|needle| status.contains(needle));
    if has_failure { "✗" } else { "✓" }
}

fn render_help_modal(frame: &mut Frame, app: &App) {
    let area = centered_rect(72, 70, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = vec![
        Line::from(Span::styled(
            format!(
                "kubeglance  mode:{}  list:{}  drawer:{}",
                help_mode_label(app.mode()),
                app.active_kind().title(),
                if app.drawer_state().enabled_by_user { "on" } else { "off" }
            ),
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        )),
        Line::raw(""),
    ];
    lines.extend(HELP_LINES.iter().map(|line| Line::raw(*line)));

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .title("Help (any key to close)")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(ACCENT))
                .style(Style::default().bg(PANEL)),
        )
        .style(Style::default().fg(Color::White))
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

const HELP_LINES: &[&str] = &[
    "j/k ↑/↓      move cursor        g/G  first/last row",
    "←/→          previous/next list  PgUp/PgDn  page",
    "enter        open drawer (or full detail when the drawer is off or narrow)",
    "esc          close drawer / detail, clear filter",
    "s / S        sort by next column / reverse direction",
    "/            filter rows         :  command   r  refresh   D  toggle drawer",
    "",
    ":po :deploy :rs :ns :pc          switch list",
    ":ns <name>|all                   namespace scope",
    ":sort <column> [asc|desc|off]    sort; without direction cycles asc, desc, none",
    ":cols [column]                   list or toggle columns",
    ":filter <text>   :drawer on|off  :create ns <name>",
    ":delete          :scale <n>      :q",
];

fn help_mode_label(mode: InputMode) -> &'static str {
    match mode {
        InputMode::Normal => "normal",
        InputMode::Filter => "filter",
        InputMode::Command => "command",
    }
}

fn highlight_yaml_line(line: &str) -> Line<'static> {
    let indent_len = line.len() - line.trim_start_matches([' ', '\t']).len();
    let (indent, trimmed) = line.split_at(indent_len);

    let mut spans = vec![Span::raw(indent.to_string())];
    let content = match trimmed.strip_prefix("- ") {
        Some(rest) => {
            spans.push(Span::styled("- ", Style::default().fg(ACCENT)));
            rest
        }
        None => trimmed,
    };

    match content.split_once(':') {
        Some((key, value)) if !key.is_empty() && !key.contains(' ') => {
            spans.push(Span::styled(
                key.to_string(),
                Style::default().fg(Color::Rgb(103, 232, 249)),
            ));
            spans.push(Span::styled(":", Style::default().fg(MUTED)));
            let value = value.trim();
            if !value.is_empty() {
                spans.push(Span::styled(
                    format!(" {value}"),
                    Style::default().fg(yaml_value_color(value)),
                ));
            }
        }
        _ => spans.push(Span::raw(content.to_string())),
    }
    Line::from(spans)
}

fn yaml_value_color(value: &str) -> Color {
    if value.starts_with('"') || value.starts_with('\'') {
        Color::Rgb(125, 211, 252)
    } else if matches!(value, "true" | "false" | "null" | "~") {
        WARN
    } else if value.parse::<f64>().is_ok() {
        Color::Rgb(251, 146, 60)
    } else {
        Color::Rgb(147, 197, 253)
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

fn table_rows_visible(area: Rect) -> usize {
    area.height.saturating_sub(3).max(1) as usize
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

fn column_constraints(headers: &[HeaderCell]) -> Vec<Constraint> {
    if headers.is_empty() {
        return vec![Constraint::Percentage(100)];
    }

    headers
        .iter()
        .map(|header| {
            let weight = header.relative_width.unwrap_or(1.0).max(0.1);
            Constraint::Fill((weight * 10.0).round() as u16)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{column_constraints, compact_text, render};
    use crate::app::App;
    use crate::config::{CliOverrides, RuntimeConfigSnapshot};
    use crate::input::Action;
    use crate::list_view::HeaderCell;
    use crate::model::{NamespaceScope, ResourceKind};
    use crate::resource::fixtures::pod;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use ratatui::layout::Constraint;
    use serde_json::json;

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn compact_text_truncates_with_ellipsis() {
        assert_eq!(compact_text("kubernetes", 5), "kube…");
        assert_eq!(compact_text("pods", 5), "pods");
    }

    #[test]
    fn constraints_follow_relative_widths() {
        let headers = vec![
            HeaderCell {
                id: "name",
                label: "Name".to_string(),
                relative_width: None,
            },
            HeaderCell {
                id: "pods",
                label: "Pods".to_string(),
                relative_width: Some(0.5),
            },
        ];
        assert_eq!(
            column_constraints(&headers),
            vec![Constraint::Fill(10), Constraint::Fill(5)]
        );
    }

    #[test]
    fn wide_terminal_renders_table_and_drawer() {
        let mut app = App::new(
            "prod".to_string(),
            "prod-admin".to_string(),
            NamespaceScope::Named("default".to_string()),
            ResourceKind::Pods,
            RuntimeConfigSnapshot::default(),
            CliOverrides::default(),
        );
        app.set_viewport_width(200);
        app.set_snapshot(
            ResourceKind::Pods,
            Ok(vec![pod("web", json!({ "phase": "Running" }))]),
        );
        app.apply_action(Action::SelectRow);

        let mut terminal = Terminal::new(TestBackend::new(200, 30)).unwrap();
        terminal.draw(|frame| render(frame, &mut app)).unwrap();
        let text = buffer_text(&terminal);

        assert!(text.contains("Pods (1)"));
        assert!(text.contains("Pods default/web"));
        assert!(text.contains("/c/prod/pods/default/web"));
    }
}
