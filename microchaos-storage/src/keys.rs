//! Storage key sanitization

/// Reduce a free-form key to the safe storage alphabet `[a-z0-9_-]`.
///
/// Lowercases and drops anything else, so keys double as file name
/// stems. Distinct raw keys can collide after sanitization; callers
/// treat the sanitized form as the identity.
pub fn sanitize_key(key: &str) -> String {
    key.chars()
        .flat_map(|c| c.to_lowercase())
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_' || *c == '-')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_lowercases_and_strips() {
        assert_eq!(sanitize_key("Black Friday 2026!"), "blackfriday2026");
        assert_eq!(sanitize_key("pre-release_v2"), "pre-release_v2");
        assert_eq!(sanitize_key("../etc/passwd"), "etcpasswd");
    }

    #[test]
    fn test_sanitize_idempotent() {
        let once = sanitize_key("Checkout Flow");
        assert_eq!(sanitize_key(&once), once);
    }
}
