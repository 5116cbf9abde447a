//! A module implementing tokenization of a raw command line.
//!
//! Splitting is purely whitespace-based: there is no quoting, escaping or
//! substitution. Tokens borrow from the line, so the caller keeps the raw text
//! around for the history store while dispatching on the tokens.

/// Maximum accepted line length, terminator included.
pub const MAX_LINE: usize = 1024;

/// Upper bound on the number of tokens in one line.
///
/// The smallest token/delimiter pair is two bytes, so a line of `MAX_LINE`
/// bytes can never produce more than this.
pub const MAX_TOKENS: usize = MAX_LINE / 2 + 1;

/// Characters that separate tokens.
pub const DELIMITERS: [char; 3] = [' ', '\t', '\n'];

/// Literal that marks a command to be run in background when it is the last token.
pub const BACKGROUND_MARKER: &str = "&";

/// A tokenized command ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine<'a> {
    /// Argument vector; `argv[0]` is the command name.
    pub argv: Vec<&'a str>,
    /// Whether the line ended with [`BACKGROUND_MARKER`].
    pub background: bool,
}

/// Splits `line` into non-empty tokens on [`DELIMITERS`].
///
/// Blank input yields an empty vector, which callers must treat as a no-op.
pub fn split_into_tokens(line: &str) -> Vec<&str> {
    line.split(DELIMITERS)
        .filter(|token| !token.is_empty())
        .take(MAX_TOKENS)
        .collect()
}

/// Strips a trailing background marker off `tokens`.
///
/// Only the final token is inspected and at most one marker is removed.
pub fn split_background(mut tokens: Vec<&str>) -> CommandLine<'_> {
    let background = tokens.last() == Some(&BACKGROUND_MARKER);
    if background {
        tokens.pop();
    }
    CommandLine {
        argv: tokens,
        background,
    }
}

/// Tokenizes `line` and detects the background marker in one step.
pub fn parse_command_line(line: &str) -> CommandLine<'_> {
    split_background(split_into_tokens(line))
}

/// Cuts `line` down to at most `MAX_LINE - 1` bytes, respecting char boundaries.
pub fn clamp_line(line: &str) -> &str {
    let mut end = line.len().min(MAX_LINE - 1);
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    &line[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_ampersand_sets_background() {
        let cmd = parse_command_line("ls -la &");
        assert_eq!(cmd.argv, vec!["ls", "-la"]);
        assert!(cmd.background);
    }

    #[test]
    fn test_blank_line_has_no_tokens() {
        assert!(split_into_tokens("   ").is_empty());
        assert!(split_into_tokens("").is_empty());
        assert!(split_into_tokens("\t \n").is_empty());

        let cmd = parse_command_line("   ");
        assert!(cmd.argv.is_empty());
        assert!(!cmd.background);
    }

    #[test]
    fn test_mixed_delimiters() {
        assert_eq!(
            split_into_tokens("  echo\tone  two\n"),
            vec!["echo", "one", "two"]
        );
    }

    #[test]
    fn test_ampersand_not_last_is_a_plain_argument() {
        let cmd = parse_command_line("echo & done");
        assert_eq!(cmd.argv, vec!["echo", "&", "done"]);
        assert!(!cmd.background);
    }

    #[test]
    fn test_glued_ampersand_is_not_a_marker() {
        let cmd = parse_command_line("sleep 5&");
        assert_eq!(cmd.argv, vec!["sleep", "5&"]);
        assert!(!cmd.background);
    }

    #[test]
    fn test_only_one_marker_is_stripped() {
        let cmd = parse_command_line("true & &");
        assert_eq!(cmd.argv, vec!["true", "&"]);
        assert!(cmd.background);
    }

    #[test]
    fn test_lone_marker_leaves_empty_argv() {
        let cmd = parse_command_line("&");
        assert!(cmd.argv.is_empty());
        assert!(cmd.background);
    }

    #[test]
    fn test_no_quoting_support() {
        assert_eq!(
            split_into_tokens("echo \"a b\""),
            vec!["echo", "\"a", "b\""]
        );
    }

    #[test]
    fn test_token_bound_holds_for_densest_line() {
        let line = "a ".repeat(MAX_LINE / 2);
        let tokens = split_into_tokens(clamp_line(&line));
        assert!(tokens.len() <= MAX_TOKENS);
    }

    #[test]
    fn test_clamp_line_keeps_char_boundary() {
        let short = "pwd";
        assert_eq!(clamp_line(short), "pwd");

        let long = "é".repeat(MAX_LINE);
        let clamped = clamp_line(&long);
        assert!(clamped.len() <= MAX_LINE - 1);
        assert!(clamped.chars().all(|c| c == 'é'));
    }
}
