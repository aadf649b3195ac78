/// Workspace-relative paths offered for `@` completion, in listing order.
///
/// The list is only ever replaced wholesale by a fresh listing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileList {
    paths: Vec<String>,
}

impl FileList {
    pub fn new(paths: Vec<String>) -> Self {
        Self { paths }
    }

    pub fn replace(&mut self, paths: Vec<String>) {
        self.paths = paths;
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }

    /// Paths containing `partial` as a case-sensitive substring, in list order.
    pub fn matching(&self, partial: &str) -> Vec<String> {
        self.paths
            .iter()
            .filter(|p| p.contains(partial))
            .cloned()
            .collect()
    }
}

/// Locate the `@` token the caret is currently inside.
///
/// Returns the byte offset of the `@` and the text between it and the caret.
/// Any whitespace between the two means there is no live token.
pub fn token_at_cursor(input: &str, cursor: usize) -> Option<(usize, &str)> {
    let before = input.get(..cursor)?;
    let at = before.rfind('@')?;
    let partial = &before[at + 1..];
    if partial.chars().any(char::is_whitespace) {
        return None;
    }
    Some((at, partial))
}

/// Replace `input[at..cursor]` with `@<candidate> ` and return the new text
/// together with the caret position just past the inserted space.
pub fn insert_candidate(input: &str, at: usize, cursor: usize, candidate: &str) -> (String, usize) {
    let mut out = String::with_capacity(input.len() + candidate.len() + 2);
    out.push_str(&input[..at]);
    out.push('@');
    out.push_str(candidate);
    out.push(' ');
    let caret = out.len();
    out.push_str(&input[cursor..]);
    (out, caret)
}

/// Live autocomplete state for the token under the caret.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SuggestionState {
    /// Byte offset of the `@` that opened the token.
    pub at: usize,
    pub partial: String,
    pub candidates: Vec<String>,
    pub cursor: usize,
    pub selected: usize,
}

impl SuggestionState {
    /// Recompute suggestions for `input` with the caret at `cursor`.
    /// `None` when there is no live token or nothing matches.
    pub fn compute(files: &FileList, input: &str, cursor: usize) -> Option<Self> {
        let (at, partial) = token_at_cursor(input, cursor)?;
        let candidates = files.matching(partial);
        if candidates.is_empty() {
            return None;
        }
        Some(Self {
            at,
            partial: partial.to_string(),
            candidates,
            cursor,
            selected: 0,
        })
    }

    /// Carry a previous selection index over, clamped to the new candidates.
    pub fn with_selected(mut self, selected: usize) -> Self {
        self.selected = selected.min(self.candidates.len().saturating_sub(1));
        self
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn select_next(&mut self) {
        self.selected = (self.selected + 1).min(self.candidates.len().saturating_sub(1));
    }

    pub fn selected_candidate(&self) -> Option<&str> {
        self.candidates.get(self.selected).map(String::as_str)
    }

    /// Apply the selected candidate to `input`. `None` if `input` no longer
    /// has the token span this state was computed for.
    pub fn accept(&self, input: &str) -> Option<(String, usize)> {
        let candidate = self.selected_candidate()?;
        if self.at >= self.cursor || input.get(self.at..self.cursor).is_none() {
            return None;
        }
        Some(insert_candidate(input, self.at, self.cursor, candidate))
    }
}
