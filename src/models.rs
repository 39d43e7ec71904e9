use serde::{Deserialize, Serialize};

use crate::dsl::extract::{ParsedEntry, HANZI_SENTINEL};

/// Column limits of the `entries` table / 字段长度限制
pub const HANZI_MAX_CHARS: usize = 64;
pub const PINYIN_MAX_CHARS: usize = 128;

/// Persisted dictionary entry / 词典条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Entry {
    pub id: i64,
    pub hanzi: String,
    pub pinyin: Option<String>,
    pub ru: String,
    pub pos: Option<String>,
    pub examples: Option<String>,
}

/// Entry ready for insertion, already truncated to column limits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    pub hanzi: String,
    pub pinyin: Option<String>,
    pub ru: String,
    pub pos: Option<String>,
    pub examples: Option<String>,
}

impl NewEntry {
    pub fn new(hanzi: &str, pinyin: Option<&str>, ru: &str) -> Self {
        let hanzi = truncate_chars(hanzi, HANZI_MAX_CHARS);
        Self {
            hanzi: if hanzi.is_empty() {
                HANZI_SENTINEL.to_string()
            } else {
                hanzi
            },
            pinyin: pinyin.map(|p| truncate_chars(p, PINYIN_MAX_CHARS)),
            ru: ru.to_string(),
            pos: None,
            examples: None,
        }
    }

    pub fn with_pos(mut self, pos: &str) -> Self {
        self.pos = Some(pos.to_string());
        self
    }

    pub fn with_examples(mut self, examples: &str) -> Self {
        self.examples = Some(examples.to_string());
        self
    }

    /// Short description used in import diagnostics
    pub fn diagnostic(&self) -> (String, Option<String>, String) {
        (
            self.hanzi.clone(),
            self.pinyin.clone(),
            truncate_chars(&self.ru, 80),
        )
    }
}

impl From<ParsedEntry> for NewEntry {
    fn from(parsed: ParsedEntry) -> Self {
        NewEntry::new(&parsed.hanzi, parsed.pinyin.as_deref(), &parsed.ru)
    }
}

/// Truncate to at most `max` characters (not bytes) / 按字符截断
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
