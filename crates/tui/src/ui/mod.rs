use ratatui::{
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState},
    Frame,
};
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use crate::app::{App, Focus};
use crate::strings::{
    build_status_line, header_line, help_lines, INPUT_HINT, PREFIX_USER, TITLE_CHAT, TITLE_HELP,
    TITLE_INPUT,
};
use crate::theme::THEME;

const INPUT_MAX_LINES: u16 = 6;

pub fn draw(f: &mut Frame, app: &mut App) {
    let input_lines = (app.input.split('\n').count() as u16).clamp(1, INPUT_MAX_LINES);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(input_lines + 2),
            Constraint::Length(1),
        ])
        .split(f.area());

    draw_header(f, chunks[0], app);
    draw_chat(f, chunks[1], app);
    draw_input(f, chunks[2], app);
    draw_status(f, chunks[3], app);
    if app.show_help {
        draw_help(f, f.area());
    }
}

fn border_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(THEME.border_focus)
    } else {
        Style::default().fg(THEME.border_inactive)
    }
}

fn draw_header(f: &mut Frame, area: Rect, app: &App) {
    let text = header_line(app.session.model(), app.session.host());
    let p = Paragraph::new(Line::from(Span::styled(
        text,
        Style::default()
            .fg(THEME.header_fg)
            .add_modifier(Modifier::BOLD),
    )));
    f.render_widget(p, area);
}

fn styled_chat_line(line: &str) -> Line<'_> {
    if line.starts_with(PREFIX_USER) {
        Line::from(Span::styled(line, Style::default().add_modifier(Modifier::BOLD)))
    } else if line.starts_with("[error]") {
        Line::from(Span::styled(line, Style::default().fg(THEME.error_fg)))
    } else {
        Line::from(line)
    }
}

fn draw_chat(f: &mut Frame, area: Rect, app: &mut App) {
    app.chat_area = Some(area);
    let block = Block::default()
        .title(TITLE_CHAT)
        .borders(Borders::ALL)
        .border_style(border_style(app.focus == Focus::Chat));
    let inner_w = area.width.saturating_sub(2);
    let inner_h = area.height.saturating_sub(2);
    app.ensure_chat_wrapped(inner_w);
    let (start, viewport) = app.compute_chat_layout(inner_h);

    let lines: Vec<Line> = app.chat_lines[start..start + viewport]
        .iter()
        .map(|l| styled_chat_line(l))
        .collect();
    f.render_widget(Paragraph::new(lines).block(block), area);

    let total = app.chat_lines.len();
    if total > inner_h as usize {
        let mut state = ScrollbarState::new(total.saturating_sub(viewport)).position(start);
        let bar = Scrollbar::new(ScrollbarOrientation::VerticalRight);
        f.render_stateful_widget(bar, area, &mut state);
    }
}

fn draw_input(f: &mut Frame, area: Rect, app: &App) {
    let focused = app.focus == Focus::Input;
    let block = Block::default()
        .title(TITLE_INPUT)
        .borders(Borders::ALL)
        .border_style(border_style(focused));
    let inner_h = area.height.saturating_sub(2) as usize;
    let (line, col) = app.cursor_line_col();
    let skip = (line + 1).saturating_sub(inner_h);

    let p = if app.input.is_empty() {
        Paragraph::new(Span::styled(
            INPUT_HINT,
            Style::default().fg(THEME.border_inactive),
        ))
    } else {
        let lines: Vec<Line> = app
            .input
            .split('\n')
            .skip(skip)
            .map(|l| Line::from(l.to_string()))
            .collect();
        Paragraph::new(lines)
    };
    f.render_widget(p.block(block), area);

    if focused {
        let current = app.input.split('\n').nth(line).unwrap_or("");
        let before: String = current.graphemes(true).take(col).collect();
        f.set_cursor_position(input_cursor(area, &before, line.saturating_sub(skip)));
    }
}

/// Cursor cell for `before` (the text left of it) on visible row `row`,
/// clamped inside the input box.
fn input_cursor(area: Rect, before: &str, row: usize) -> Position {
    let width = u16::try_from(UnicodeWidthStr::width(before)).unwrap_or(u16::MAX);
    let row = u16::try_from(row).unwrap_or(u16::MAX);
    let x = area.x.saturating_add(1).saturating_add(width);
    let y = area.y.saturating_add(1).saturating_add(row);
    Position::new(x.min(area.x.saturating_add(area.width.saturating_sub(2))), y)
}

fn draw_status(f: &mut Frame, area: Rect, app: &App) {
    let (chats, pulls) = app.active_counts();
    let text = build_status_line(
        app.stick_to_bottom,
        app.chat_scroll,
        app.focus.label(),
        chats,
        pulls,
        area.width,
    );
    let style = if chats + pulls > 0 {
        Style::default().fg(THEME.busy_fg)
    } else {
        Style::default().fg(THEME.border_inactive)
    };
    f.render_widget(Paragraph::new(Span::styled(text, style)), area);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    Rect::new(
        area.x + (area.width - w) / 2,
        area.y + (area.height - h) / 2,
        w,
        h,
    )
}

fn draw_help(f: &mut Frame, area: Rect) {
    let lines = help_lines();
    let popup = centered(area, 48, lines.len() as u16 + 2);
    let block = Block::default()
        .title(TITLE_HELP)
        .borders(Borders::ALL)
        .border_style(border_style(true));
    let body: Vec<Line> = lines.into_iter().map(Line::from).collect();
    f.render_widget(Clear, popup);
    f.render_widget(Paragraph::new(body).block(block), popup);
}
