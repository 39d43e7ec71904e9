//! In-memory entry store / 内存词条存储

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{check_constraints, EntryStore, StorageError};
use crate::models::{Entry, NewEntry};
use crate::search::pattern::PatternSet;

struct Inner {
    rows: Vec<Entry>,
    next_id: i64,
}

/// Vector-backed store, ids assigned in insertion order
pub struct MemoryEntryStore {
    inner: RwLock<Inner>,
}

impl MemoryEntryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                rows: Vec::new(),
                next_id: 1,
            }),
        }
    }
}

impl Default for MemoryEntryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EntryStore for MemoryEntryStore {
    async fn insert_batch(&self, entries: &[NewEntry]) -> Result<u64, StorageError> {
        // Validate everything before touching the rows so a bad record
        // leaves the store untouched.
        for entry in entries {
            check_constraints(entry).map_err(StorageError::ConstraintViolation)?;
        }

        let mut inner = self.inner.write();
        for entry in entries {
            let id = inner.next_id;
            inner.next_id += 1;
            inner.rows.push(Entry {
                id,
                hanzi: entry.hanzi.clone(),
                pinyin: entry.pinyin.clone(),
                ru: entry.ru.clone(),
                pos: entry.pos.clone(),
                examples: entry.examples.clone(),
            });
        }
        Ok(entries.len() as u64)
    }

    async fn find_by_script_pattern(
        &self,
        pattern: &PatternSet,
        limit: usize,
    ) -> Result<Vec<Entry>, StorageError> {
        let candidates: Vec<Entry> = {
            let inner = self.inner.read();
            inner
                .rows
                .iter()
                .filter(|e| pattern.filter(e))
                .cloned()
                .collect()
        };
        Ok(pattern.order(candidates, limit))
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Entry>, StorageError> {
        Ok(self.inner.read().rows.iter().find(|e| e.id == id).cloned())
    }

    async fn clear_all(&self) -> Result<(), StorageError> {
        let mut inner = self.inner.write();
        inner.rows.clear();
        inner.next_id = 1;
        Ok(())
    }

    async fn count(&self) -> Result<u64, StorageError> {
        Ok(self.inner.read().rows.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ids_follow_insertion_order() {
        let store = MemoryEntryStore::new();
        store
            .insert_batch(&[NewEntry::new("一", None, "один"), NewEntry::new("二", None, "два")])
            .await
            .unwrap();
        store.insert_batch(&[NewEntry::new("三", None, "три")]).await.unwrap();

        assert_eq!(store.get_by_id(1).await.unwrap().unwrap().hanzi, "一");
        assert_eq!(store.get_by_id(3).await.unwrap().unwrap().ru, "три");
        assert_eq!(store.get_by_id(4).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_invalid_row_rejects_whole_batch() {
        let store = MemoryEntryStore::new();
        let mut batch: Vec<NewEntry> = (0..10)
            .map(|i| NewEntry::new("字", None, &format!("слово {}", i)))
            .collect();
        batch[9].ru = String::new();

        assert!(store.insert_batch(&batch).await.is_err());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_clear_all_restarts_ids() {
        let store = MemoryEntryStore::new();
        store.insert_batch(&[NewEntry::new("一", None, "один")]).await.unwrap();
        store.clear_all().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);

        store.insert_batch(&[NewEntry::new("二", None, "два")]).await.unwrap();
        assert_eq!(store.get_by_id(1).await.unwrap().unwrap().hanzi, "二");
    }
}
