//! Prompt composition once a mentioned file has been resolved.

/// Substitute the first `@<filename>` in `original` with the file content,
/// framed by newlines so the model sees it as its own block.
pub fn compose_prompt(original: &str, filename: &str, content: &str) -> String {
    let token = format!("@{filename}");
    original.replacen(&token, &format!("\n{content}\n"), 1)
}

/// Transcript text for a mention whose file could not be read.
pub fn not_found_notice(filename: &str) -> String {
    format!("File \"{filename}\" not found in your workspace.")
}
