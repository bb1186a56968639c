//! Request body sources

use crate::error::{ConfigError, ConfigResult};
use std::path::PathBuf;

/// Where the request body comes from.
///
/// The `file:<path>` CLI shorthand is parsed into an explicit variant
/// exactly once; downstream code never re-inspects the raw string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodySource {
    Inline(String),
    File(PathBuf),
}

impl BodySource {
    /// Parse a raw `--body` argument.
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix("file:") {
            Some(path) => BodySource::File(PathBuf::from(path)),
            None => BodySource::Inline(raw.to_string()),
        }
    }

    /// Resolve to the actual body string.
    ///
    /// File reads happen here, during config resolution; a missing file
    /// is a fatal configuration error, never a per-request error.
    pub fn resolve(&self) -> ConfigResult<String> {
        match self {
            BodySource::Inline(s) => Ok(s.clone()),
            BodySource::File(path) => {
                std::fs::read_to_string(path).map_err(|source| ConfigError::BodyFile {
                    path: path.display().to_string(),
                    source,
                })
            }
        }
    }

    /// Short preview for test-start logging. Truncation counts chars,
    /// not bytes, so multibyte bodies never split mid-character.
    pub fn preview(&self) -> String {
        match self {
            BodySource::Inline(s) if s.chars().count() > 50 => {
                let cut: String = s.chars().take(47).collect();
                format!("{cut}...")
            }
            BodySource::Inline(s) => s.clone(),
            BodySource::File(path) => format!("file:{}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_inline() {
        let body = BodySource::parse(r#"{"name":"Test"}"#);
        assert_eq!(body, BodySource::Inline(r#"{"name":"Test"}"#.to_string()));
        assert_eq!(body.resolve().unwrap(), r#"{"name":"Test"}"#);
    }

    #[test]
    fn test_parse_file_prefix() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        write!(tmp, "field=value").unwrap();
        let body = BodySource::parse(&format!("file:{}", tmp.path().display()));
        assert!(matches!(body, BodySource::File(_)));
        assert_eq!(body.resolve().unwrap(), "field=value");
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let body = BodySource::parse("file:/nonexistent/body.json");
        assert!(matches!(body.resolve(), Err(ConfigError::BodyFile { .. })));
    }

    #[test]
    fn test_preview_truncates() {
        let long = "x".repeat(80);
        let body = BodySource::Inline(long);
        let preview = body.preview();
        assert_eq!(preview.len(), 50);
        assert!(preview.ends_with("..."));
    }

    #[test]
    fn test_preview_multibyte_bodies() {
        // under the char limit even though the byte length exceeds it
        let short = BodySource::Inline("é".repeat(40));
        assert_eq!(short.preview(), "é".repeat(40));

        let long = BodySource::Inline("日".repeat(60));
        let preview = long.preview();
        assert_eq!(preview.chars().count(), 50);
        assert!(preview.ends_with("..."));
    }
}
