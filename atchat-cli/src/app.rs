use std::path::{Path, PathBuf};

use atchat::{FileList, Message, Role, SuggestionState, Transcript};

use crate::markdown;

const HISTORY_LIMIT: usize = 500;

/// A renderable block in the scrollable history.
#[derive(Debug, PartialEq, Eq)]
pub enum DisplayBlock {
    UserInput(String),
    AssistantText(String),
    /// Informational message from the TUI itself (e.g. /help output).
    SystemMessage(String),
    Error(String),
}

/// How many visual rows a single line of text takes when wrapped to `width`.
fn wrapped_line_height(line: &str, width: usize) -> usize {
    if width == 0 {
        return 1;
    }
    let len = unicode_width::UnicodeWidthStr::width(line);
    if len == 0 { 1 } else { len.div_ceil(width) }
}

/// Sum of wrapped visual rows for a multi-line string, with an optional prefix width per line.
fn wrapped_text_height(text: &str, width: usize, prefix_chars: usize) -> usize {
    let effective = width.saturating_sub(prefix_chars);
    let h: usize = text
        .lines()
        .map(|line| wrapped_line_height(line, effective))
        .sum();
    h.max(1)
}

impl DisplayBlock {
    /// Number of visual lines this block takes when rendered at `width` columns.
    pub fn height(&self, width: usize) -> usize {
        match self {
            // "❯ " prefix, then a blank line
            DisplayBlock::UserInput(s) => wrapped_text_height(s, width, 2) + 1,
            DisplayBlock::AssistantText(s) => markdown::markdown_height(s, width),
            DisplayBlock::SystemMessage(s) => wrapped_text_height(s, width, 0) + 1,
            DisplayBlock::Error(msg) => wrapped_line_height(&format!("Error: {msg}"), width) + 1,
        }
    }
}

pub struct App {
    pub blocks: Vec<DisplayBlock>,
    pub input: String,
    pub cursor_pos: usize,
    pub scroll_offset: usize,
    pub input_history: Vec<String>,
    pub input_history_idx: Option<usize>,
    history_path: Option<PathBuf>,
    /// Spinner frame counter
    pub tick: usize,
    /// What the session is waiting on, shown next to the spinner.
    pub busy: Option<&'static str>,
    /// Live `@` completion for the token under the caret.
    pub suggestions: Option<SuggestionState>,
    /// Whether the UI needs a redraw.
    pub dirty: bool,
    /// Auto-scroll to bottom on new output. Disabled when the user scrolls up.
    pub follow_output: bool,
    pub relay_url: String,
    /// Workspace root with ~ substitution.
    pub root: String,
    /// Size of the latest listing; `None` until one arrives.
    pub file_count: Option<usize>,
    /// Transcript messages already turned into blocks.
    shown_messages: usize,
    /// Cumulative height prefix sums for each block.
    height_cache: Vec<usize>,
    height_cache_width: usize,
}

fn display_root(root: Option<&Path>) -> String {
    let Some(root) = root else {
        return "(no workspace)".to_string();
    };
    let home = std::env::var("HOME").unwrap_or_default();
    let dir = root.to_string_lossy().to_string();
    if !home.is_empty() && dir.starts_with(&home) {
        format!("~{}", &dir[home.len()..])
    } else {
        dir
    }
}

impl App {
    pub fn new(relay_url: String, root: Option<&Path>, history_path: Option<PathBuf>) -> Self {
        Self {
            blocks: Vec::new(),
            input: String::new(),
            cursor_pos: 0,
            scroll_offset: 0,
            input_history: Vec::new(),
            input_history_idx: None,
            history_path,
            tick: 0,
            busy: None,
            suggestions: None,
            dirty: true,
            follow_output: true,
            relay_url,
            root: display_root(root),
            file_count: None,
            shown_messages: 0,
            height_cache: Vec::new(),
            height_cache_width: 0,
        }
    }

    /// Get the current input text and reset input state.
    pub fn take_input(&mut self) -> String {
        let text = std::mem::take(&mut self.input);
        if !text.trim().is_empty() && self.input_history.last() != Some(&text) {
            self.input_history.push(text.clone());
        }
        self.cursor_pos = 0;
        self.input_history_idx = None;
        self.suggestions = None;
        self.follow_output = true;
        text
    }

    pub fn push_block(&mut self, block: DisplayBlock) {
        self.blocks.push(block);
        self.invalidate_height_cache();
        self.scroll_to_bottom();
    }

    pub fn push_system(&mut self, text: impl Into<String>) {
        self.push_block(DisplayBlock::SystemMessage(text.into()));
    }

    pub fn push_error(&mut self, text: impl Into<String>) {
        self.push_block(DisplayBlock::Error(text.into()));
    }

    /// Turn transcript messages appended since the last call into blocks.
    /// Returns the newly shown messages.
    pub fn sync_transcript<'t>(&mut self, transcript: &'t Transcript) -> &'t [Message] {
        let fresh = transcript.since(self.shown_messages);
        for message in fresh {
            let block = match message.role {
                Role::User => DisplayBlock::UserInput(message.content.clone()),
                Role::Assistant => DisplayBlock::AssistantText(message.content.clone()),
            };
            self.push_block(block);
        }
        self.shown_messages = transcript.len();
        fresh
    }

    /// Text of the most recent assistant block.
    pub fn last_reply(&self) -> Option<&str> {
        self.blocks.iter().rev().find_map(|b| match b {
            DisplayBlock::AssistantText(text) => Some(text.as_str()),
            _ => None,
        })
    }

    /// Mark the height cache as stale so it will be recomputed on next access.
    pub fn invalidate_height_cache(&mut self) {
        self.height_cache.clear();
    }

    pub fn scroll_up(&mut self, amount: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(amount);
        self.follow_output = false;
    }

    pub fn scroll_down(&mut self, amount: usize, viewport_height: usize, viewport_width: usize) {
        let total = self.total_content_height(viewport_width);
        let max_scroll = total.saturating_sub(viewport_height);
        self.scroll_offset = self.scroll_offset.saturating_add(amount).min(max_scroll);
        // Re-enable follow if we've reached the bottom
        if self.scroll_offset >= max_scroll {
            self.follow_output = true;
        }
    }

    pub fn scroll_to_bottom(&mut self) {
        if !self.follow_output {
            return;
        }
        // Clamped in the main loop once the viewport is known
        self.scroll_offset = usize::MAX;
    }

    /// Read-only view of the height cache (must be pre-warmed).
    pub fn height_cache_snapshot(&self) -> &[usize] {
        &self.height_cache
    }

    pub fn ensure_height_cache(&mut self, width: usize) {
        if !self.height_cache.is_empty() && self.height_cache_width == width {
            return;
        }
        self.height_cache_width = width;
        self.height_cache.clear();
        let mut cumulative: usize = 0;
        for block in &self.blocks {
            cumulative += block.height(width);
            self.height_cache.push(cumulative);
        }
    }

    pub fn total_content_height(&mut self, width: usize) -> usize {
        self.ensure_height_cache(width);
        self.height_cache.last().copied().unwrap_or(0)
    }

    // ── Input history ───────────────────────────────────────────────

    pub fn history_up(&mut self) {
        if self.input_history.is_empty() {
            return;
        }
        let idx = match self.input_history_idx {
            None => self.input_history.len() - 1,
            Some(i) => i.saturating_sub(1),
        };
        self.input_history_idx = Some(idx);
        self.input = self.input_history[idx].clone();
        self.cursor_pos = self.input.len();
    }

    pub fn history_down(&mut self) {
        match self.input_history_idx {
            None => {}
            Some(i) if i + 1 >= self.input_history.len() => {
                self.input_history_idx = None;
                self.input.clear();
                self.cursor_pos = 0;
            }
            Some(i) => {
                self.input_history_idx = Some(i + 1);
                self.input = self.input_history[i + 1].clone();
                self.cursor_pos = self.input.len();
            }
        }
    }

    /// Load input history from ~/.atchat/history.
    pub fn load_history(&mut self) {
        let Some(path) = &self.history_path else {
            return;
        };
        if let Ok(content) = std::fs::read_to_string(path) {
            self.input_history = content
                .lines()
                .filter(|l| !l.is_empty())
                .map(|l| l.to_string())
                .collect();
        }
    }

    /// Save input history (last 500 entries).
    pub fn save_history(&self) {
        let Some(path) = &self.history_path else {
            return;
        };
        if let Some(dir) = path.parent() {
            let _ = std::fs::create_dir_all(dir);
        }
        let start = self.input_history.len().saturating_sub(HISTORY_LIMIT);
        // One entry per line
        let lines: Vec<String> = self.input_history[start..]
            .iter()
            .map(|s| s.replace('\n', " "))
            .collect();
        if let Err(e) = std::fs::write(path, lines.join("\n")) {
            tracing::warn!(path = %path.display(), "failed to save history: {e}");
        }
    }

    // ── Editing ─────────────────────────────────────────────────────

    /// Insert a character at cursor position.
    pub fn insert_char(&mut self, c: char) {
        self.input.insert(self.cursor_pos, c);
        self.cursor_pos += c.len_utf8();
    }

    pub fn insert_str(&mut self, s: &str) {
        self.input.insert_str(self.cursor_pos, s);
        self.cursor_pos += s.len();
    }

    /// Delete character before cursor.
    pub fn backspace(&mut self) {
        if self.cursor_pos > 0 {
            let prev = self.input[..self.cursor_pos]
                .char_indices()
                .next_back()
                .map(|(i, _)| i)
                .unwrap_or(0);
            self.input.drain(prev..self.cursor_pos);
            self.cursor_pos = prev;
        }
    }

    /// Delete character at cursor.
    pub fn delete(&mut self) {
        if self.cursor_pos < self.input.len() {
            let next = self.input[self.cursor_pos..]
                .char_indices()
                .nth(1)
                .map(|(i, _)| self.cursor_pos + i)
                .unwrap_or(self.input.len());
            self.input.drain(self.cursor_pos..next);
        }
    }

    pub fn move_cursor_left(&mut self) {
        if self.cursor_pos > 0 {
            self.cursor_pos = self.input[..self.cursor_pos]
                .char_indices()
                .next_back()
                .map(|(i, _)| i)
                .unwrap_or(0);
        }
    }

    pub fn move_cursor_right(&mut self) {
        if self.cursor_pos < self.input.len() {
            self.cursor_pos = self.input[self.cursor_pos..]
                .char_indices()
                .nth(1)
                .map(|(i, _)| self.cursor_pos + i)
                .unwrap_or(self.input.len());
        }
    }

    pub fn move_cursor_home(&mut self) {
        self.cursor_pos = 0;
    }

    pub fn move_cursor_end(&mut self) {
        self.cursor_pos = self.input.len();
    }

    // ── Suggestions ─────────────────────────────────────────────────

    /// Recompute suggestions for the caret position. The highlighted row is
    /// kept while the caret stays inside the same `@` token.
    pub fn update_suggestions(&mut self, files: &FileList) {
        let previous = self.suggestions.take();
        self.suggestions =
            SuggestionState::compute(files, &self.input, self.cursor_pos).map(|next| {
                match previous {
                    Some(prev) if prev.at == next.at => next.with_selected(prev.selected),
                    _ => next,
                }
            });
    }

    pub fn has_suggestions(&self) -> bool {
        self.suggestions.is_some()
    }

    pub fn suggestion_up(&mut self) {
        if let Some(s) = self.suggestions.as_mut() {
            s.select_prev();
        }
    }

    pub fn suggestion_down(&mut self) {
        if let Some(s) = self.suggestions.as_mut() {
            s.select_next();
        }
    }

    pub fn dismiss_suggestions(&mut self) {
        self.suggestions = None;
    }

    /// Insert the highlighted candidate. Returns whether anything changed.
    pub fn complete_suggestion(&mut self) -> bool {
        let Some(state) = self.suggestions.take() else {
            return false;
        };
        match state.accept(&self.input) {
            Some((text, caret)) => {
                self.input = text;
                self.cursor_pos = caret;
                true
            }
            None => false,
        }
    }
}
