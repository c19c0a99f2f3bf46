pub const MAX_NICKNAME_LENGTH: usize = 20;

/// Collapses runs of whitespace and caps the length. Returns `None` when
/// nothing printable is left, so callers can reject the request.
pub fn sanitize_nickname(name: &str) -> Option<String> {
    let cleaned = name.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        return None;
    }
    Some(cleaned.chars().take(MAX_NICKNAME_LENGTH).collect())
}
