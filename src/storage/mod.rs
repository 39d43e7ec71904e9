//! Entry storage collaborator / 词条存储接口
//!
//! The import pipeline and the search engine only talk to [`EntryStore`];
//! the backend may be SQLite ([`sqlite::SqliteEntryStore`]) or in memory
//! ([`memory::MemoryEntryStore`]).

use async_trait::async_trait;

use crate::models::{Entry, NewEntry};
use crate::search::pattern::PatternSet;

pub mod memory;
pub mod sqlite;

pub use memory::MemoryEntryStore;
pub use sqlite::SqliteEntryStore;

/// Storage failure / 存储错误
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("constraint violated: {0}")]
    ConstraintViolation(String),
}

#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Insert all entries atomically: either every row becomes visible or none.
    /// Returns the number of rows inserted.
    async fn insert_batch(&self, entries: &[NewEntry]) -> Result<u64, StorageError>;

    /// Entries whose pattern field matches, ordered by
    /// `(rank, field length, id)` and truncated to `limit`
    async fn find_by_script_pattern(
        &self,
        pattern: &PatternSet,
        limit: usize,
    ) -> Result<Vec<Entry>, StorageError>;

    /// Single entry, `None` when the id is unknown
    async fn get_by_id(&self, id: i64) -> Result<Option<Entry>, StorageError>;

    /// Remove every entry and restart id assignment
    async fn clear_all(&self) -> Result<(), StorageError>;

    async fn count(&self) -> Result<u64, StorageError>;
}

/// Column constraints shared by all backends / 字段约束检查
pub(crate) fn check_constraints(entry: &NewEntry) -> Result<(), String> {
    use crate::models::{HANZI_MAX_CHARS, PINYIN_MAX_CHARS};

    let hanzi_len = entry.hanzi.chars().count();
    if hanzi_len == 0 || hanzi_len > HANZI_MAX_CHARS {
        return Err(format!("hanzi length {} out of range", hanzi_len));
    }
    if let Some(pinyin) = &entry.pinyin {
        if pinyin.chars().count() > PINYIN_MAX_CHARS {
            return Err("pinyin too long".to_string());
        }
    }
    if entry.ru.is_empty() {
        return Err("ru must not be empty".to_string());
    }
    Ok(())
}
