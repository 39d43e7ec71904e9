//! Multi-script search engine / 多文字搜索引擎
//!
//! Query routing (checked in this order):
//! 1. blank query → no results
//! 2. contains an ideograph → Hanzi mode
//! 3. looks romanized → Pinyin mode
//! 4. anything else → Russian mode
//!
//! Tiers per mode:
//! - Hanzi / Pinyin: exact, prefix, substring
//! - Russian: exact, prefix, whole word, substring

use std::sync::Arc;

use super::pattern::{MatchTier, PatternSet, SearchField};
use crate::dsl::script::{classify, ScriptClass};
use crate::models::Entry;
use crate::storage::{EntryStore, StorageError};

/// Search mode chosen from the query script / 搜索模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    Hanzi,
    Pinyin,
    Russian,
}

impl SearchMode {
    pub fn for_query(query: &str) -> Self {
        match classify(query) {
            ScriptClass::Ideograph => SearchMode::Hanzi,
            ScriptClass::Romanized => SearchMode::Pinyin,
            ScriptClass::Cyrillic | ScriptClass::Other => SearchMode::Russian,
        }
    }

    pub fn field(&self) -> SearchField {
        match self {
            SearchMode::Hanzi => SearchField::Hanzi,
            SearchMode::Pinyin => SearchField::Pinyin,
            SearchMode::Russian => SearchField::Ru,
        }
    }
}

/// Build the ranked pattern set for a query, `None` for a blank query
pub fn build_pattern(query: &str) -> Option<(SearchMode, PatternSet)> {
    let query = query.trim();
    if query.is_empty() {
        return None;
    }

    let mode = SearchMode::for_query(query);
    let needle = query.to_lowercase();
    let tiers = match mode {
        SearchMode::Hanzi | SearchMode::Pinyin => {
            vec![MatchTier::Exact, MatchTier::Prefix, MatchTier::Substring]
        }
        SearchMode::Russian => vec![
            MatchTier::Exact,
            MatchTier::Prefix,
            MatchTier::whole_word(&needle),
            MatchTier::Substring,
        ],
    };
    Some((mode, PatternSet::new(mode.field(), query, tiers)))
}

/// Read-only search over an [`EntryStore`] / 只读搜索
#[derive(Clone)]
pub struct SearchEngine {
    store: Arc<dyn EntryStore>,
}

impl SearchEngine {
    pub fn new(store: Arc<dyn EntryStore>) -> Self {
        Self { store }
    }

    /// Ranked entries for `query`, at most `limit` of them
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<Entry>, StorageError> {
        let Some((mode, pattern)) = build_pattern(query) else {
            return Ok(Vec::new());
        };
        if limit == 0 {
            return Ok(Vec::new());
        }

        tracing::debug!("Search {:?} in {:?} mode (limit {})", query.trim(), mode, limit);
        self.store.find_by_script_pattern(&pattern, limit).await
    }

    /// Single entry lookup, `None` when absent
    pub async fn get(&self, id: i64) -> Result<Option<Entry>, StorageError> {
        self.store.get_by_id(id).await
    }
}
