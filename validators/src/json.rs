use serde::de::DeserializeOwned;

/// Decode `text` as JSON, falling back to `default`.
///
/// Empty or absent input returns `default` without touching the parser; any
/// decode failure (malformed JSON, or JSON that does not fit `T`) does too.
pub fn safe_json_parse<T: DeserializeOwned>(text: Option<&str>, default: T) -> T {
    match text {
        Some(t) if !t.is_empty() => serde_json::from_str(t).unwrap_or(default),
        _ => default,
    }
}
