/// Cuts `body` to at most `max_len` bytes on a char boundary, marking the cut.
pub(crate) fn truncate_snippet(body: &str, max_len: usize) -> String {
    if body.len() <= max_len {
        return body.to_string();
    }

    let mut cut = max_len;
    while !body.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &body[..cut])
}

/// Keeps the first and last four chars of a secret-ish value.
pub(crate) fn redact_value(value: &str) -> String {
    const REDACTED: &str = "<redacted>";

    let chars = value.trim().chars().collect::<Vec<_>>();
    if chars.len() <= 8 {
        return REDACTED.to_string();
    }

    let head = chars[..4].iter().collect::<String>();
    let tail = chars[chars.len() - 4..].iter().collect::<String>();
    format!("{head}...{tail}")
}
