use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::app::{App, DisplayBlock};
use crate::markdown;
use crate::theme;

/// Rows of the `@` suggestion popup before it scrolls.
pub const MAX_SUGGESTION_ROWS: usize = 8;

fn input_height(app: &App, frame_width: u16) -> u16 {
    let inner_w = frame_width as usize;
    let visual_lines = input_visual_lines(&app.input, inner_w);
    (visual_lines as u16 + 2).min(8) // +2 for borders
}

/// Rows left for the history once the fixed bars are laid out.
pub fn history_viewport_height(app: &App, width: u16, height: u16) -> usize {
    let strike_h = if app.busy.is_some() { 1 } else { 0 };
    height
        .saturating_sub(2 + strike_h + input_height(app, width))
        .max(3) as usize
}

pub fn draw(frame: &mut Frame, app: &App) {
    // Paint entire frame with FORM bg so no terminal background bleeds through
    frame.render_widget(Block::default().style(theme::history_bg()), frame.area());

    let strike_h = if app.busy.is_some() { 1 } else { 0 };
    let input_h = input_height(app, frame.area().width);

    let chunks = Layout::vertical([
        Constraint::Length(1),        // status bar
        Constraint::Min(3),           // history
        Constraint::Length(strike_h), // strike zone (only while busy)
        Constraint::Length(input_h),  // input
        Constraint::Length(1),        // help bar
    ])
    .split(frame.area());

    draw_status_bar(frame, app, chunks[0]);
    draw_history(frame, app, chunks[1]);
    if let Some(label) = app.busy {
        draw_strike_zone(frame, app.tick, label, chunks[2]);
    }
    draw_input(frame, app, chunks[3]);
    draw_suggestions(frame, app, chunks[3]);
    draw_help_bar(frame, app, chunks[4]);
}

fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![
        Span::styled(" atchat", theme::app_title()),
        Span::styled(theme::STATUS_SEP, theme::status_separator()),
        Span::styled(app.root.as_str(), theme::status_detail()),
        Span::styled(theme::STATUS_SEP, theme::status_separator()),
        Span::styled(app.relay_url.as_str(), theme::status_detail()),
    ];

    let right = match app.file_count {
        Some(1) => "1 file".to_string(),
        Some(n) => format!("{n} files"),
        None => "listing…".to_string(),
    };
    let mut right_spans = vec![Span::styled(right, theme::file_count())];
    if !app.follow_output {
        right_spans.insert(0, Span::styled("SCROLL  ", theme::scroll_indicator()));
    }

    let left_width: usize = spans.iter().map(|s| s.content.width()).sum();
    let right_width: usize = right_spans.iter().map(|s| s.content.width()).sum::<usize>() + 1;
    let pad = (area.width as usize).saturating_sub(left_width + right_width);
    if pad > 0 {
        spans.push(Span::styled(" ".repeat(pad), theme::bar_bg()));
        spans.extend(right_spans);
    }

    let bar = Paragraph::new(Line::from(spans)).style(theme::bar_bg());
    frame.render_widget(bar, area);
}

fn draw_history(frame: &mut Frame, app: &App, area: Rect) {
    let viewport_height = area.height as usize;
    let viewport_width = area.width as usize;

    // scroll_offset is already clamped by the main loop before draw()
    let scroll = app.scroll_offset;
    let (first_idx, skip_lines) = find_visible_block(app, scroll);

    let mut lines: Vec<Line> = Vec::with_capacity(viewport_height + skip_lines + 20);
    for block in app.blocks[first_idx..].iter() {
        render_block(block, &mut lines);
        if lines.len() >= viewport_height + skip_lines {
            break;
        }
    }

    // Bottom-align content when it doesn't fill the viewport (chat-style).
    if scroll == 0 {
        let total_visual: usize = lines
            .iter()
            .map(|line| {
                let w = line.width();
                if w == 0 || viewport_width == 0 { 1 } else { w.div_ceil(viewport_width) }
            })
            .sum();
        let pad_count = viewport_height.saturating_sub(total_visual);
        if pad_count > 0 {
            let mut padded = vec![Line::from(""); pad_count];
            padded.extend(lines);
            lines = padded;
        }
    }

    // skip_lines is in visual-row space, so let Paragraph do the wrapping and scrolling
    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .style(theme::history_bg())
        .scroll((skip_lines as u16, 0));

    frame.render_widget(paragraph, area);
}

/// First visible block and the rows to skip inside it. Uses the height cache,
/// which the main loop pre-warms before draw().
fn find_visible_block(app: &App, scroll_offset: usize) -> (usize, usize) {
    let cache = app.height_cache_snapshot();
    if cache.is_empty() {
        return (0, 0);
    }
    let idx = cache.partition_point(|&cumulative| cumulative <= scroll_offset);
    if idx >= app.blocks.len() {
        return (app.blocks.len(), 0);
    }
    let block_start = if idx == 0 { 0 } else { cache[idx - 1] };
    (idx, scroll_offset - block_start)
}

/// Split a user message so `@name` tokens stand out.
fn user_line_spans(line: &str) -> Vec<Span<'_>> {
    let mut spans = Vec::new();
    let mut rest = line;
    while let Some(m) = atchat::find_mention(rest) {
        if m.start > 0 {
            spans.push(Span::styled(&rest[..m.start], theme::user_input()));
        }
        spans.push(Span::styled(&rest[m.start..m.end], theme::mention()));
        rest = &rest[m.end..];
    }
    if !rest.is_empty() {
        spans.push(Span::styled(rest, theme::user_input()));
    }
    spans
}

fn render_block<'a>(block: &'a DisplayBlock, lines: &mut Vec<Line<'a>>) {
    match block {
        DisplayBlock::UserInput(text) => {
            for line in text.lines() {
                let mut spans = vec![Span::styled(
                    format!("{} ", theme::PROMPT_CHAR),
                    theme::prompt(),
                )];
                spans.extend(user_line_spans(line));
                lines.push(Line::from(spans));
            }
            lines.push(Line::from(""));
        }
        DisplayBlock::AssistantText(text) => {
            lines.extend(markdown::render_markdown(text));
        }
        DisplayBlock::SystemMessage(text) => {
            for line in text.lines() {
                lines.push(Line::from(Span::styled(line, theme::system_message())));
            }
            lines.push(Line::from(""));
        }
        DisplayBlock::Error(msg) => {
            lines.push(Line::from(Span::styled(format!("Error: {msg}"), theme::error())));
            lines.push(Line::from(""));
        }
    }
}

// Rotating glyph with its fading trail, then the session state label.
fn draw_strike_zone(frame: &mut Frame, tick: usize, label: &str, area: Rect) {
    const ANGLES: &[char] = &['╲', '─', '╱', '│'];
    // 200ms per angle at a 100ms tick
    let idx = (tick / 2) % ANGLES.len();
    let trail_idx = (idx + ANGLES.len() - 1) % ANGLES.len();

    let spans = vec![
        Span::raw("  "),
        Span::styled(ANGLES[trail_idx].to_string(), Style::default().fg(theme::ASH_TEXT)),
        Span::styled(
            ANGLES[idx].to_string(),
            Style::default().fg(theme::SODIUM).add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!("  {label}"), Style::default().fg(theme::ASH_MID)),
    ];

    let paragraph = Paragraph::new(Line::from(spans)).style(theme::history_bg());
    frame.render_widget(paragraph, area);
}

fn draw_input(frame: &mut Frame, app: &App, area: Rect) {
    let line = Line::from(vec![
        Span::styled(format!("{} ", theme::PROMPT_CHAR), theme::prompt()),
        Span::styled(app.input.as_str(), theme::user_input()),
    ]);

    let input = Paragraph::new(line).wrap(Wrap { trim: false }).block(
        Block::default()
            .borders(Borders::TOP | Borders::BOTTOM)
            .border_style(theme::input_border()),
    );
    frame.render_widget(input, area);

    let (vis_row, vis_col) = input_cursor_position(&app.input, app.cursor_pos, area.width as usize);
    let content_h = area.height.saturating_sub(2) as usize;
    let row = vis_row.min(content_h.saturating_sub(1)) as u16;
    frame.set_cursor_position((area.x + vis_col as u16, area.y + 1 + row));
}

fn draw_help_bar(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = Vec::new();
    if app.has_suggestions() {
        spans.extend([
            Span::styled(" Tab/Enter", theme::help_key()),
            Span::styled(" accept  ", theme::help_desc()),
            Span::styled("↑/↓", theme::help_key()),
            Span::styled(" select  ", theme::help_desc()),
            Span::styled("Esc", theme::help_key()),
            Span::styled(" dismiss  ", theme::help_desc()),
        ]);
    } else {
        spans.extend([
            Span::styled(" @", theme::help_key()),
            Span::styled(" attach file  ", theme::help_desc()),
            Span::styled("^R", theme::help_key()),
            Span::styled(" refresh  ", theme::help_desc()),
            Span::styled("^U/^D", theme::help_key()),
            Span::styled(" scroll  ", theme::help_desc()),
            Span::styled("^Y", theme::help_key()),
            Span::styled(" copy  ", theme::help_desc()),
        ]);
    }
    spans.push(Span::styled("^C", theme::help_key()));
    spans.push(Span::styled(" quit", theme::help_desc()));

    let bar = Paragraph::new(Line::from(spans)).style(theme::bar_bg());
    frame.render_widget(bar, area);
}

/// First candidate row shown so that `selected` stays inside the window.
pub fn suggestion_window_start(selected: usize, total: usize, rows: usize) -> usize {
    if total <= rows {
        return 0;
    }
    selected.saturating_sub(rows - 1).min(total - rows)
}

/// Candidate rows that fit between the top of the frame and the input,
/// leaving room for the popup's two borders.
pub fn suggestion_rows(total: usize, input_top: u16) -> usize {
    let room = (input_top as usize).saturating_sub(2);
    total.min(MAX_SUGGESTION_ROWS).min(room)
}

/// Draw the `@` autocomplete popup above the input area.
fn draw_suggestions(frame: &mut Frame, app: &App, input_area: Rect) {
    let Some(state) = &app.suggestions else {
        return;
    };

    let total = state.candidates.len();
    let rows = suggestion_rows(total, input_area.y);
    if rows == 0 || input_area.width == 0 {
        return;
    }
    let start = suggestion_window_start(state.selected, total, rows);

    let height = rows as u16 + 2; // +2 for top/bottom border
    let widest = state.candidates[start..start + rows]
        .iter()
        .map(|c| c.width())
        .max()
        .unwrap_or(0);
    let width = ((widest + 4) as u16).clamp(24, 60).min(input_area.width);
    let y = input_area.y.saturating_sub(height);
    let popup_area = Rect::new(input_area.x, y, width, height);

    frame.render_widget(Clear, popup_area);

    let items: Vec<Line> = state.candidates[start..start + rows]
        .iter()
        .enumerate()
        .map(|(i, path)| {
            let style = if start + i == state.selected {
                Style::default()
                    .fg(theme::SODIUM)
                    .bg(theme::FORM_RAISED)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(theme::CHALK_DIM)
            };
            Line::from(Span::styled(format!(" {path}"), style))
        })
        .collect();

    let mut block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme::ASH));
    if total > rows {
        block = block.title(Span::styled(
            format!(" {}/{} ", state.selected + 1, total),
            Style::default().fg(theme::ASH_MID),
        ));
    }
    let paragraph = Paragraph::new(items)
        .block(block)
        .style(Style::default().bg(theme::FORM_DEEP));
    frame.render_widget(paragraph, popup_area);
}

/// Count total visual lines the input occupies after the 2-column prompt, accounting for wrapping.
fn input_visual_lines(input: &str, width: usize) -> usize {
    if width == 0 {
        return 1;
    }
    let total = UnicodeWidthStr::width(input) + 2;
    total.div_ceil(width).max(1)
}

/// Visual (row, col) of the caret, counting the 2-column prompt prefix.
fn input_cursor_position(input: &str, cursor_pos: usize, full_width: usize) -> (usize, usize) {
    let before = input.get(..cursor_pos).unwrap_or(input);
    let abs_pos = 2 + UnicodeWidthStr::width(before);
    if full_width > 0 {
        (abs_pos / full_width, abs_pos % full_width)
    } else {
        (0, abs_pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_keeps_selection_visible() {
        assert_eq!(suggestion_window_start(0, 5, 5), 0);
        assert_eq!(suggestion_window_start(3, 20, 8), 0);
        assert_eq!(suggestion_window_start(7, 20, 8), 0);
        assert_eq!(suggestion_window_start(8, 20, 8), 1);
        assert_eq!(suggestion_window_start(19, 20, 8), 12);
    }

    #[test]
    fn input_lines_wrap_after_prompt() {
        assert_eq!(input_visual_lines("", 10), 1);
        assert_eq!(input_visual_lines("12345678", 10), 1);
        assert_eq!(input_visual_lines("123456789", 10), 2);
    }

    #[test]
    fn cursor_position_counts_prefix_and_wraps() {
        assert_eq!(input_cursor_position("abc", 0, 80), (0, 2));
        assert_eq!(input_cursor_position("abc", 3, 80), (0, 5));
        assert_eq!(input_cursor_position("abcdefgh", 8, 10), (1, 0));
    }

    fn app_with_candidates(n: usize) -> App {
        let mut app = App::new(String::new(), None, None);
        let files = atchat::FileList::new((0..n).map(|i| format!("file{i}.txt")).collect());
        app.insert_char('@');
        app.update_suggestions(&files);
        app
    }

    fn render(app: &App, width: u16, height: u16) -> String {
        let mut terminal =
            ratatui::Terminal::new(ratatui::backend::TestBackend::new(width, height)).unwrap();
        terminal.draw(|frame| draw(frame, app)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn popup_fits_a_short_terminal() {
        let app = app_with_candidates(10);
        let screen = render(&app, 40, 8);
        assert!(screen.contains("file0.txt"));
        assert!(!screen.contains("file7.txt"));
    }

    #[test]
    fn popup_rows_are_limited_by_space_above_input() {
        assert_eq!(suggestion_rows(10, 30), MAX_SUGGESTION_ROWS);
        assert_eq!(suggestion_rows(3, 30), 3);
        assert_eq!(suggestion_rows(10, 4), 2);
        assert_eq!(suggestion_rows(10, 2), 0);
        assert_eq!(suggestion_rows(10, 0), 0);
    }

    #[test]
    fn popup_scrolls_past_max_rows() {
        let app = app_with_candidates(10);
        let screen = render(&app, 40, 30);
        assert!(screen.contains("file7.txt"));
        assert!(!screen.contains("file8.txt"));
        assert!(screen.contains("1/10"));
    }

    #[test]
    fn mention_tokens_are_split_out() {
        let spans = user_line_spans("read @a.txt now");
        let parts: Vec<&str> = spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(parts, vec!["read ", "@a.txt", " now"]);
    }
}
