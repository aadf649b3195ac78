use ratatui::style::{Color, Modifier, Style};

// ── Formwork: warm olive-tinted blacks ──────────────────────────────
pub const FORM: Color = Color::Rgb(14, 13, 11);
pub const FORM_DEEP: Color = Color::Rgb(8, 8, 7);
pub const FORM_RAISED: Color = Color::Rgb(20, 20, 18);

// ── Ash: structural greys ──────────────────────────────────────────
pub const ASH: Color = Color::Rgb(42, 42, 40);
pub const ASH_MID: Color = Color::Rgb(74, 74, 68);
pub const ASH_TEXT: Color = Color::Rgb(90, 90, 80);

// ── Chalk: text hierarchy ──────────────────────────────────────────
pub const CHALK_DIM: Color = Color::Rgb(122, 122, 112);
pub const CHALK_MID: Color = Color::Rgb(200, 196, 184);
pub const CHALK: Color = Color::Rgb(232, 228, 208);

// ── Accent colors ──────────────────────────────────────────────────
pub const SODIUM: Color = Color::Rgb(232, 163, 60);
pub const LICHEN: Color = Color::Rgb(138, 158, 108);
pub const ERROR: Color = Color::Rgb(204, 68, 68);

// ── Character constants ────────────────────────────────────────────
pub const PROMPT_CHAR: &str = "❯";
pub const STATUS_SEP: &str = " · ";

/// Sodium bold `❯` prompt character
pub fn prompt() -> Style {
    Style::default().fg(SODIUM).add_modifier(Modifier::BOLD)
}

pub fn user_input() -> Style {
    Style::default().fg(CHALK_MID)
}

pub fn assistant_text() -> Style {
    Style::default().fg(CHALK)
}

pub fn error() -> Style {
    Style::default().fg(ERROR)
}

pub fn code_content() -> Style {
    Style::default().fg(CHALK_DIM)
}

/// Code block border characters (│, ───)
pub fn code_chrome() -> Style {
    Style::default().fg(ASH)
}

pub fn help_key() -> Style {
    Style::default().fg(SODIUM).add_modifier(Modifier::BOLD)
}

pub fn help_desc() -> Style {
    Style::default().fg(ASH_MID)
}

pub fn input_border() -> Style {
    Style::default().fg(ASH)
}

pub fn app_title() -> Style {
    Style::default().fg(SODIUM).add_modifier(Modifier::BOLD)
}

/// Relay URL and workspace root in the status bar
pub fn status_detail() -> Style {
    Style::default().fg(CHALK_DIM)
}

pub fn status_separator() -> Style {
    Style::default().fg(ASH_MID)
}

/// File count once a listing has arrived
pub fn file_count() -> Style {
    Style::default().fg(LICHEN)
}

/// Status bar and help bar background
pub fn bar_bg() -> Style {
    Style::default().bg(FORM_RAISED)
}

pub fn history_bg() -> Style {
    Style::default().bg(FORM)
}

/// System message text (e.g. /help output)
pub fn system_message() -> Style {
    Style::default().fg(ASH_TEXT)
}

pub fn scroll_indicator() -> Style {
    Style::default().fg(SODIUM).add_modifier(Modifier::BOLD)
}

pub fn heading() -> Style {
    Style::default().fg(SODIUM).add_modifier(Modifier::BOLD)
}

pub fn inline_code() -> Style {
    Style::default().fg(SODIUM)
}

/// The `@name` token of a user message
pub fn mention() -> Style {
    Style::default().fg(SODIUM)
}
