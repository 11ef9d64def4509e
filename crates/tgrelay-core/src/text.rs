//! Text helpers shared by the transcript and the pipeline.

/// Maximum characters of message text kept in a transcript row.
pub const MAX_TRANSCRIPT_CHARS: usize = 200;

/// Truncate `s` to at most `max_chars` Unicode scalar values.
///
/// Returns the input unchanged when it already fits. The remainder is
/// dropped without any ellipsis marker.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => s[..byte_idx].to_string(),
        None => s.to_string(),
    }
}

/// Extract the command token from a message text.
///
/// `/restart` and `/restart@my_bot extra words` both yield `restart`.
/// Returns `None` when the text is not a command.
pub fn parse_command(text: &str) -> Option<&str> {
    let first = text.split_whitespace().next()?;
    let name = first.strip_prefix('/')?;
    let name = name.split('@').next().unwrap_or("");
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_unchanged() {
        assert_eq!(truncate_chars("hello", 200), "hello");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn exactly_at_limit_is_unchanged() {
        let text = "a".repeat(MAX_TRANSCRIPT_CHARS);
        assert_eq!(truncate_chars(&text, MAX_TRANSCRIPT_CHARS), text);
    }

    #[test]
    fn long_text_is_cut_to_limit() {
        let text = "b".repeat(450);
        let cut = truncate_chars(&text, MAX_TRANSCRIPT_CHARS);
        assert_eq!(cut.chars().count(), MAX_TRANSCRIPT_CHARS);
    }

    #[test]
    fn counts_characters_not_bytes() {
        // Cyrillic letters are two bytes each in UTF-8.
        let text = "привет мир";
        let cut = truncate_chars(text, 6);
        assert_eq!(cut, "привет");
    }

    #[test]
    fn truncation_is_idempotent() {
        let text = "ёжик в тумане ".repeat(40);
        for limit in [0, 1, 7, 200, 1000] {
            let once = truncate_chars(&text, limit);
            let twice = truncate_chars(&once, limit);
            assert_eq!(once, twice);
            assert!(once.chars().count() <= limit);
        }
    }

    #[test]
    fn parses_plain_command() {
        assert_eq!(parse_command("/restart"), Some("restart"));
        assert_eq!(parse_command("/start now please"), Some("start"));
    }

    #[test]
    fn strips_bot_mention() {
        assert_eq!(parse_command("/help@relay_bot"), Some("help"));
    }

    #[test]
    fn free_text_is_not_a_command() {
        assert_eq!(parse_command("hello /restart"), None);
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("/"), None);
        assert_eq!(parse_command("/@bot"), None);
    }

    #[test]
    fn command_lookup_is_case_preserving() {
        assert_eq!(parse_command("/Restart"), Some("Restart"));
    }
}
