use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Characters that never make it into a canonical filename, and what to
/// put in their place. Control characters other than whitespace (NUL
/// included) are always replaced, whatever `illegal_chars` says.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SanitizePolicy {
    /// Characters replaced by `replacement`.
    pub illegal_chars: String,
    /// Stand-in for an illegal character. Dropped instead if it is itself illegal.
    pub replacement: char,
    /// Maximum title length in characters. 0 = unlimited.
    pub max_title_length: usize,
}

impl Default for SanitizePolicy {
    fn default() -> Self {
        Self {
            illegal_chars: r#"/\:*?"<>|"#.to_string(),
            replacement: '-',
            max_title_length: 90,
        }
    }
}

impl SanitizePolicy {
    fn is_illegal(&self, c: char) -> bool {
        (c.is_control() && !c.is_whitespace()) || self.illegal_chars.contains(c)
    }

    /// Make `text` safe to use as (part of) a filename.
    ///
    /// Illegal characters are replaced, whitespace runs collapse to one
    /// space, and leading/trailing whitespace plus trailing dots are
    /// trimmed. Never returns an empty string.
    pub fn sanitize(&self, text: &str) -> String {
        self.sanitize_truncated(text, 0)
    }

    fn sanitize_truncated(&self, text: &str, max_len: usize) -> String {
        let drop_illegal = self.is_illegal(self.replacement);
        let replaced: String = text
            .chars()
            .filter_map(|c| match (self.is_illegal(c), drop_illegal) {
                (false, _) => Some(c),
                (true, false) => Some(self.replacement),
                (true, true) => None,
            })
            .collect();

        let mut cleaned = WHITESPACE_RE.replace_all(&replaced, " ").trim().to_string();
        if max_len > 0 && cleaned.chars().count() > max_len {
            cleaned = cleaned.chars().take(max_len).collect();
        }
        let cleaned = cleaned.trim_end_matches(|c: char| c == '.' || c.is_whitespace());

        if cleaned.is_empty() {
            "0".to_string()
        } else {
            cleaned.to_string()
        }
    }

    /// `Title_ID`, the extension-less name shared by a record and its media.
    pub fn canonical_base(&self, title: &str, id: &str) -> String {
        format!(
            "{}_{}",
            self.sanitize_truncated(title, self.max_title_length),
            self.sanitize(id)
        )
    }
}
