use std::sync::LazyLock;

use regex::Regex;

static MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@(\S+)").expect("mention pattern is valid"));

/// An `@filename` reference found in submitted text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Mention<'a> {
    /// The run of non-whitespace after the `@`.
    pub filename: &'a str,
    /// Byte offset of the `@`.
    pub start: usize,
    /// Byte offset just past the filename.
    pub end: usize,
}

/// Find the first `@` that is followed by at least one non-whitespace
/// character. A bare `@` is skipped, so `"a @ b @c"` yields `c`.
///
/// Only the first mention is reported; later ones stay in the text as-is.
pub fn find_mention(input: &str) -> Option<Mention<'_>> {
    let caps = MENTION.captures(input)?;
    let whole = caps.get(0)?;
    let name = caps.get(1)?;
    Some(Mention {
        filename: name.as_str(),
        start: whole.start(),
        end: whole.end(),
    })
}
