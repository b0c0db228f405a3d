use std::fmt::Display;

/// Default `max_length` for [`truncate`].
pub const DEFAULT_TRUNCATE_LENGTH: usize = 50;

const ELLIPSIS: &str = "...";

/// Quote a CSV field when it contains a comma, a double quote or a line feed.
///
/// Internal double quotes are doubled. Fields without those characters are
/// returned as-is, and `None` becomes the empty string. Escaping is not
/// idempotent: escaping an escaped field quotes it again.
pub fn escape_csv_field<T: Display>(value: Option<T>) -> String {
    let Some(value) = value else {
        return String::new();
    };
    let value = value.to_string();
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value
    }
}

/// Shorten `text` to at most `max_length` characters, ending in `...` when cut.
///
/// A cut result is exactly `max_length` characters long. When `max_length`
/// leaves no room for text the result is the ellipsis clipped to fit.
pub fn truncate(text: Option<&str>, max_length: usize) -> String {
    let text = match text {
        Some(t) if !t.is_empty() => t,
        _ => return String::new(),
    };

    if text.chars().count() <= max_length {
        return text.to_string();
    }

    if max_length <= ELLIPSIS.len() {
        return ELLIPSIS[..max_length].to_string();
    }

    let mut out: String = text.chars().take(max_length - ELLIPSIS.len()).collect();
    out.push_str(ELLIPSIS);
    out
}

/// Trim surrounding whitespace and turn every `\n` and `\r` into a space.
///
/// Runs of spaces are kept; `"a\r\nb"` becomes `"a  b"`.
pub fn normalize_whitespace(text: Option<&str>) -> String {
    match text {
        Some(t) => t.trim().replace(['\n', '\r'], " "),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_csv_cases() {
        let cases = [
            (Some("simple text"), "simple text"),
            (Some("text,with,commas"), "\"text,with,commas\""),
            (Some("text with \"quotes\""), "\"text with \"\"quotes\"\"\""),
            (Some("text\nwith\nnewlines"), "\"text\nwith\nnewlines\""),
            (None, ""),
            (Some(""), ""),
        ];
        for (input, expected) in cases {
            assert_eq!(escape_csv_field(input), expected, "input {input:?}");
        }
    }

    #[test]
    fn test_escape_csv_does_not_quote_carriage_return() {
        assert_eq!(escape_csv_field(Some("a\rb")), "a\rb");
    }

    #[test]
    fn test_escape_csv_stringifies_non_strings() {
        assert_eq!(escape_csv_field(Some(42)), "42");
        assert_eq!(escape_csv_field(Some(1.5)), "1.5");
    }

    #[test]
    fn test_escape_csv_is_not_idempotent() {
        let once = escape_csv_field(Some("a,b"));
        let twice = escape_csv_field(Some(&once));
        assert_ne!(once, twice);
        assert_eq!(twice, "\"\"\"a,b\"\"\"");
    }

    #[test]
    fn test_truncate() {
        let long_text = "Это очень длинная строка, которая должна быть обрезана";
        let truncated = truncate(Some(long_text), 20);
        assert_eq!(truncated.chars().count(), 20);
        assert!(truncated.ends_with("..."));
        assert!(long_text.starts_with(truncated.trim_end_matches("...")));

        assert_eq!(truncate(Some("short"), 20), "short");
        assert_eq!(truncate(Some("exactly5"), 8), "exactly5");
        assert_eq!(truncate(Some(""), 20), "");
        assert_eq!(truncate(None, 20), "");
    }

    #[test]
    fn test_truncate_default_length() {
        let text = "x".repeat(60);
        let out = truncate(Some(text.as_str()), DEFAULT_TRUNCATE_LENGTH);
        assert_eq!(out.len(), 50);
        assert_eq!(&out[47..], "...");
    }

    #[test]
    fn test_truncate_tiny_limits() {
        assert_eq!(truncate(Some("abcdef"), 3), "...");
        assert_eq!(truncate(Some("abcdef"), 2), "..");
        assert_eq!(truncate(Some("abcdef"), 0), "");
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace(Some("  a\nb  ")), "a b");
        assert_eq!(
            normalize_whitespace(Some("  Текст с пробелами\nи переносами  ")),
            "Текст с пробелами и переносами"
        );
        assert_eq!(normalize_whitespace(Some("a\r\nb")), "a  b");
        assert_eq!(normalize_whitespace(Some("a   b")), "a   b");
        assert_eq!(normalize_whitespace(Some("")), "");
        assert_eq!(normalize_whitespace(None), "");
    }
}
