//! SQLite entry store / SQLite 词条存储
//!
//! - one transaction per batch, dropped (rolled back) on the first failing row
//! - matching runs on lowercase shadow columns, SQLite `LIKE` only folds ASCII
//! - filter, rank and `LIMIT` run in SQL: each tier becomes a `CASE` arm,
//!   ties break on field length then id
//! - a whole-word tier has no `LIKE` form; rows past the SQL tiers are then
//!   scanned in pages ordered by (length, id) until that tier is filled

use async_trait::async_trait;
use sqlx::{Pool, Sqlite};

use super::{EntryStore, StorageError};
use crate::models::{Entry, NewEntry};
use crate::search::pattern::{escape_like, MatchTier, PatternSet, FALLBACK_RANK};

const ENTRY_COLUMNS: &str = "id, hanzi, pinyin, ru, pos, examples";

/// Rows fetched per page when classifying whole-word candidates
const SCAN_PAGE_SIZE: i64 = 512;

/// SQL condition and bind value of a tier, `None` for tiers SQL cannot express
fn tier_clause(tier: &MatchTier, column: &str, needle: &str) -> Option<(String, String)> {
    match tier {
        MatchTier::Exact => Some((format!("{} = ?", column), needle.to_string())),
        MatchTier::Prefix => Some((
            format!("{} LIKE ? ESCAPE '\\'", column),
            format!("{}%", escape_like(needle)),
        )),
        MatchTier::Substring => Some((
            format!("{} LIKE ? ESCAPE '\\'", column),
            format!("%{}%", escape_like(needle)),
        )),
        MatchTier::WholeWord(_) => None,
    }
}

pub struct SqliteEntryStore {
    db: Pool<Sqlite>,
}

impl SqliteEntryStore {
    pub fn new(db: Pool<Sqlite>) -> Self {
        Self { db }
    }

    /// Remaining rows ordered by (length, id), bucketed by their tier
    ///
    /// `skip` holds the conditions of the tiers already served by SQL. Scanning
    /// stops once the best remaining tier holds `need` rows, later pages can
    /// only rank below them.
    async fn scan_remaining_tiers(
        &self,
        pattern: &PatternSet,
        skip: &[(String, String)],
        need: usize,
    ) -> Result<Vec<Entry>, StorageError> {
        let column = pattern.field.lower_column();
        let length = format!("length({})", pattern.field.column());
        let mut sql = format!(
            "SELECT {} FROM entries WHERE {} LIKE ? ESCAPE '\\'",
            ENTRY_COLUMNS, column
        );
        if !skip.is_empty() {
            let conditions: Vec<&str> = skip.iter().map(|(cond, _)| cond.as_str()).collect();
            sql.push_str(&format!(" AND NOT ({})", conditions.join(" OR ")));
        }
        sql.push_str(&format!(
            " AND ({len} > ? OR ({len} = ? AND id > ?)) ORDER BY {len}, id LIMIT ?",
            len = length
        ));

        let first_tier = skip.len();
        // one bucket per remaining tier plus the fallback
        let bucket_count = pattern.tiers.len() - first_tier + 1;
        let mut buckets: Vec<Vec<Entry>> = vec![Vec::new(); bucket_count];
        let mut cursor: (i64, i64) = (-1, 0);

        loop {
            let mut query = sqlx::query_as::<_, Entry>(&sql).bind(pattern.like_pattern());
            for (_, value) in skip {
                query = query.bind(value);
            }
            let page = query
                .bind(cursor.0)
                .bind(cursor.0)
                .bind(cursor.1)
                .bind(SCAN_PAGE_SIZE)
                .fetch_all(&self.db)
                .await?;
            let exhausted = (page.len() as i64) < SCAN_PAGE_SIZE;

            for entry in page {
                let Some(value) = pattern.field.value(&entry) else {
                    continue;
                };
                cursor = (value.chars().count() as i64, entry.id);
                let rank = pattern.rank(value);
                let slot = if rank == FALLBACK_RANK {
                    buckets.len() - 1
                } else {
                    (rank as usize).saturating_sub(first_tier)
                };
                if buckets[slot].len() < need {
                    buckets[slot].push(entry);
                }
            }

            if exhausted || buckets[0].len() >= need {
                break;
            }
        }

        Ok(buckets.into_iter().flatten().take(need).collect())
    }
}

#[async_trait]
impl EntryStore for SqliteEntryStore {
    async fn insert_batch(&self, entries: &[NewEntry]) -> Result<u64, StorageError> {
        if entries.is_empty() {
            return Ok(0);
        }

        let mut tx = self.db.begin().await?;
        for entry in entries {
            sqlx::query(
                r#"
                INSERT INTO entries
                    (hanzi, pinyin, ru, pos, examples, hanzi_lower, pinyin_lower, ru_lower)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&entry.hanzi)
            .bind(&entry.pinyin)
            .bind(&entry.ru)
            .bind(&entry.pos)
            .bind(&entry.examples)
            .bind(entry.hanzi.to_lowercase())
            .bind(entry.pinyin.as_ref().map(|p| p.to_lowercase()))
            .bind(entry.ru.to_lowercase())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(entries.len() as u64)
    }

    async fn find_by_script_pattern(
        &self,
        pattern: &PatternSet,
        limit: usize,
    ) -> Result<Vec<Entry>, StorageError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let column = pattern.field.lower_column();
        let length = format!("length({})", pattern.field.column());
        // tiers up to the first one without a LIKE form are ranked in SQL
        let ranked: Vec<(String, String)> = pattern
            .tiers
            .iter()
            .map_while(|tier| tier_clause(tier, column, &pattern.needle))
            .collect();
        let fully_ranked = ranked.len() == pattern.tiers.len();

        let mut order_by: Vec<String> = Vec::new();
        if !ranked.is_empty() {
            let arms: Vec<String> = ranked
                .iter()
                .enumerate()
                .map(|(idx, (cond, _))| format!("WHEN {} THEN {}", cond, idx))
                .collect();
            let else_rank = if fully_ranked {
                FALLBACK_RANK
            } else {
                ranked.len() as u32
            };
            order_by.push(format!("CASE {} ELSE {} END", arms.join(" "), else_rank));
        }
        order_by.push(length);
        order_by.push("id".to_string());

        let mut results = if ranked.is_empty() && !fully_ranked {
            Vec::new()
        } else {
            let sql = format!(
                "SELECT {} FROM entries WHERE {} LIKE ? ESCAPE '\\' ORDER BY {} LIMIT ?",
                ENTRY_COLUMNS,
                column,
                order_by.join(", ")
            );
            let mut query = sqlx::query_as::<_, Entry>(&sql).bind(pattern.like_pattern());
            for (_, value) in &ranked {
                query = query.bind(value);
            }
            query.bind(limit as i64).fetch_all(&self.db).await?
        };

        if fully_ranked {
            return Ok(results);
        }

        // keep rows served by the SQL tiers, the rest needs the whole-word check
        results.retain(|entry| {
            pattern
                .field
                .value(entry)
                .map(|value| (pattern.rank(value) as usize) < ranked.len())
                .unwrap_or(false)
        });
        if results.len() < limit {
            let need = limit - results.len();
            let rest = self.scan_remaining_tiers(pattern, &ranked, need).await?;
            results.extend(rest);
        }

        Ok(results)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Entry>, StorageError> {
        let sql = format!("SELECT {} FROM entries WHERE id = ?", ENTRY_COLUMNS);
        let entry = sqlx::query_as::<_, Entry>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(entry)
    }

    async fn clear_all(&self) -> Result<(), StorageError> {
        let mut tx = self.db.begin().await?;
        sqlx::query("DELETE FROM entries").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM sqlite_sequence WHERE name = 'entries'")
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn count(&self) -> Result<u64, StorageError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM entries")
            .fetch_one(&self.db)
            .await?;
        Ok(count as u64)
    }
}
