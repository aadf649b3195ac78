/// Commands recognized by the TUI (command, description).
pub const COMMANDS: &[(&str, &str)] = &[
    ("/refresh", "Reload the workspace file list"),
    ("/help", "Show commands and shortcuts"),
    ("/exit", "Quit"),
];

/// Slash commands recognized by the TUI.
#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    /// Ask the host for a fresh file listing
    Refresh,
    /// Show available commands and shortcuts
    Help,
    /// Quit the application
    Exit,
}

/// Try to parse a slash command from user input.
/// Returns `None` if the input is not a recognized command; such input is
/// sent as an ordinary prompt.
pub fn parse(input: &str) -> Option<Command> {
    let rest = input.trim().strip_prefix('/')?;
    let cmd = rest.split_whitespace().next().unwrap_or("");
    match cmd {
        "refresh" => Some(Command::Refresh),
        "help" | "?" => Some(Command::Help),
        "exit" | "quit" => Some(Command::Exit),
        _ => None,
    }
}

/// Build the text shown by /help.
pub fn help_text() -> String {
    let mut lines = vec!["Commands:".to_string()];
    for (cmd, desc) in COMMANDS {
        lines.push(format!("  {cmd:<18} {desc}"));
    }
    lines.extend(
        [
            "",
            "Shortcuts:",
            "  @name              Attach a workspace file to the message",
            "  Tab / Enter        Accept the highlighted file suggestion",
            "  Up / Down          Move through suggestions or input history",
            "  Esc                Dismiss suggestions",
            "  Ctrl+R             Refresh the file list",
            "  Ctrl+U / Ctrl+D    Scroll half-page up / down",
            "  PgUp / PgDn        Scroll page up / down",
            "  Ctrl+Y             Copy last reply to clipboard",
            "  Ctrl+C             Quit",
        ]
        .map(String::from),
    );
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_commands() {
        assert_eq!(parse("/refresh"), Some(Command::Refresh));
        assert_eq!(parse("  /help  "), Some(Command::Help));
        assert_eq!(parse("/?"), Some(Command::Help));
        assert_eq!(parse("/exit"), Some(Command::Exit));
        assert_eq!(parse("/quit now"), Some(Command::Exit));
    }

    #[test]
    fn unknown_or_plain_text_is_not_a_command() {
        assert_eq!(parse("/summarize @a.md"), None);
        assert_eq!(parse("refresh"), None);
        assert_eq!(parse("/"), None);
    }

    #[test]
    fn help_lists_every_command() {
        let help = help_text();
        for (cmd, _) in COMMANDS {
            assert!(help.contains(cmd));
        }
    }
}
