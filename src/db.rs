use std::time::Duration;

use anyhow::Result;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

/// Open the dictionary database / 打开词典数据库
///
/// In-memory URLs get a single connection, every pooled connection would
/// otherwise see its own empty database.
pub async fn connect(database_url: &str) -> Result<SqlitePool> {
    let in_memory = database_url.contains(":memory:");
    let mut options = SqlitePoolOptions::new().max_connections(if in_memory { 1 } else { 4 });
    if in_memory {
        options = options
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>);
    }
    let pool = options.connect(database_url).await?;

    if !in_memory {
        // WAL: readers keep working during an import
        sqlx::query("PRAGMA journal_mode=WAL").execute(&pool).await?;
        sqlx::query("PRAGMA synchronous=NORMAL").execute(&pool).await?;
    }
    sqlx::query("PRAGMA busy_timeout=10000").execute(&pool).await?;

    Ok(pool)
}

/// Run database migrations / 运行数据库迁移
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS entries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            hanzi TEXT NOT NULL CHECK (length(hanzi) BETWEEN 1 AND 64),
            pinyin TEXT CHECK (pinyin IS NULL OR length(pinyin) <= 128),
            ru TEXT NOT NULL CHECK (ru <> ''),
            pos TEXT CHECK (pos IS NULL OR length(pos) <= 32),
            examples TEXT,
            hanzi_lower TEXT NOT NULL,
            pinyin_lower TEXT,
            ru_lower TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS ix_entries_hanzi ON entries(hanzi_lower)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS ix_entries_pinyin ON entries(pinyin_lower)")
        .execute(pool)
        .await?;

    tracing::debug!("Database migrations applied");
    Ok(())
}
