//! DSL import pipeline / DSL 导入流水线
//!
//! Files are read one after another in the given order. Each file is parsed
//! on a blocking thread that streams entries through a bounded channel; the
//! async side accumulates them in a [`BatchAccumulator`] and hands each full
//! batch to [`EntryStore::insert_batch`] as one atomic unit. The final partial
//! batch is flushed after the last file. The first failing batch aborts the run.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::ImportConfig;
use crate::dsl::{extract, DslReader, Policy};
use crate::models::NewEntry;
use crate::state::ImportState;
use crate::storage::{EntryStore, StorageError};

/// Parsed entries buffered between the parser thread and the committer
const ENTRY_CHANNEL_CAPACITY: usize = 1024;

/// Import failure / 导入错误
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The storage error is kept as the source only; the message carries
    /// the last record of the rejected batch.
    #[error(
        "batch insert failed in {file:?} after {committed} committed entries, \
         last record: hanzi={hanzi:?} pinyin={pinyin:?} ru={ru_prefix:?}"
    )]
    BatchFailed {
        file: PathBuf,
        committed: u64,
        hanzi: String,
        pinyin: Option<String>,
        ru_prefix: String,
        #[source]
        source: StorageError,
    },

    #[error("no DSL source files found in {0:?}")]
    NoSourceFiles(PathBuf),
}

/// Explicit batch buffer / 批量缓冲区
#[derive(Debug)]
pub struct BatchAccumulator {
    entries: Vec<NewEntry>,
    capacity: usize,
}

impl BatchAccumulator {
    /// A zero capacity is treated as one
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn add(&mut self, entry: NewEntry) {
        self.entries.push(entry);
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Take the buffered entries, leaving the accumulator empty
    pub fn drain(&mut self) -> Vec<NewEntry> {
        std::mem::replace(&mut self.entries, Vec::with_capacity(self.capacity))
    }
}

/// Per-run import settings / 导入参数
#[derive(Debug, Clone)]
pub struct ImportSettings {
    pub batch_size: usize,
    pub encoding: String,
    pub reverse_marker: String,
}

impl From<&ImportConfig> for ImportSettings {
    fn from(config: &ImportConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            encoding: config.encoding.clone(),
            reverse_marker: config.reverse_marker.clone(),
        }
    }
}

/// Outcome of an import run / 导入结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Entries committed across all batches
    pub inserted: u64,
    /// Files read to the end
    pub files: usize,
    /// Stopped at a batch boundary on request
    pub cancelled: bool,
}

/// Resolve the configured source files, failing when there are none
pub fn discover_sources(config: &ImportConfig) -> Result<Vec<PathBuf>, ImportError> {
    let dir = PathBuf::from(&config.source_dir);
    let files = config.source_files().map_err(|source| ImportError::Io {
        path: dir.clone(),
        source,
    })?;
    if files.is_empty() {
        return Err(ImportError::NoSourceFiles(dir));
    }
    Ok(files)
}

pub struct ImportPipeline {
    store: Arc<dyn EntryStore>,
    settings: ImportSettings,
    state: Arc<ImportState>,
}

impl ImportPipeline {
    pub fn new(store: Arc<dyn EntryStore>, settings: ImportSettings) -> Self {
        Self {
            store,
            settings,
            state: Arc::new(ImportState::new()),
        }
    }

    /// Share progress / cancellation with the caller
    pub fn with_state(mut self, state: Arc<ImportState>) -> Self {
        self.state = state;
        self
    }

    pub fn state(&self) -> &Arc<ImportState> {
        &self.state
    }

    /// Import `files` in order / 按顺序导入文件
    ///
    /// On failure everything committed before the failing batch stays
    /// persisted; the failing batch itself leaves no rows behind.
    pub async fn import_all(&self, files: &[PathBuf]) -> Result<ImportReport, ImportError> {
        self.state.start();
        let result = self.run(files).await;
        match &result {
            Ok(report) => {
                tracing::info!(
                    "Import finished: {} entries from {} files{}",
                    report.inserted,
                    report.files,
                    if report.cancelled { " (cancelled)" } else { "" }
                );
            }
            Err(e) => tracing::error!("Import failed: {}", e),
        }
        self.state.finish();
        result
    }

    /// Read and commit `files` in order / 按顺序读取并提交
    ///
    /// The batch is not flushed at file boundaries, so one batch may carry the
    /// tail of a file and the head of the next. A batch is attributed to the
    /// file being read when it fills (the last file for the final flush), and
    /// committed counts are only tracked for the whole run.
    async fn run(&self, files: &[PathBuf]) -> Result<ImportReport, ImportError> {
        let mut report = ImportReport::default();
        let mut batch = BatchAccumulator::new(self.settings.batch_size);
        let mut last_file: Option<&Path> = None;

        'files: for path in files {
            if self.state.is_cancelled() {
                report.cancelled = true;
                break;
            }

            let policy = Policy::for_path(path, &self.settings.reverse_marker);
            tracing::info!("Importing {:?} ({:?})", path, policy);

            let reader =
                DslReader::open(path, &self.settings.encoding).map_err(|source| ImportError::Io {
                    path: path.clone(),
                    source,
                })?;
            last_file = Some(path.as_path());

            // Decoding and extraction block, keep them off the runtime
            let (entry_tx, mut entry_rx) =
                tokio::sync::mpsc::channel::<NewEntry>(ENTRY_CHANNEL_CAPACITY);
            let parse_handle = tokio::task::spawn_blocking(move || {
                for article in reader {
                    let Some(parsed) = extract(policy, &article) else {
                        continue;
                    };
                    // receiver dropped: the run stopped early
                    if entry_tx.blocking_send(parsed.into()).is_err() {
                        break;
                    }
                }
            });

            while let Some(entry) = entry_rx.recv().await {
                batch.add(entry);

                if batch.is_full() {
                    self.commit(path, &mut batch, &mut report).await?;
                    if self.state.is_cancelled() {
                        report.cancelled = true;
                        break 'files;
                    }
                }
            }

            parse_handle.await.map_err(|e| ImportError::Io {
                path: path.clone(),
                source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
            })?;
            report.files += 1;
        }

        if report.cancelled {
            if !batch.is_empty() {
                tracing::warn!("Import cancelled, dropping {} uncommitted entries", batch.len());
            }
        } else if let Some(path) = last_file {
            if !batch.is_empty() {
                self.commit(path, &mut batch, &mut report).await?;
            }
        }

        Ok(report)
    }

    async fn commit(
        &self,
        file: &Path,
        batch: &mut BatchAccumulator,
        report: &mut ImportReport,
    ) -> Result<(), ImportError> {
        let entries = batch.drain();
        match self.store.insert_batch(&entries).await {
            Ok(n) => {
                report.inserted += n;
                self.state.add_committed(n);
                tracing::info!("Committed {} entries ({} total)", n, report.inserted);
                Ok(())
            }
            Err(source) => {
                let (hanzi, pinyin, ru_prefix) = entries
                    .last()
                    .map(NewEntry::diagnostic)
                    .unwrap_or_default();
                tracing::error!(
                    "Batch of {} entries from {:?} rolled back, last record: hanzi={:?} pinyin={:?} ru={:?}: {}",
                    entries.len(),
                    file,
                    hanzi,
                    pinyin,
                    ru_prefix,
                    source
                );
                Err(ImportError::BatchFailed {
                    file: file.to_path_buf(),
                    committed: report.inserted,
                    hanzi,
                    pinyin,
                    ru_prefix,
                    source,
                })
            }
        }
    }
}

/// Demo entries for an empty database / 演示数据
pub fn demo_entries() -> Vec<NewEntry> {
    vec![
        NewEntry::new("你好", Some("nǐ hǎo"), "привет")
            .with_pos("фраза")
            .with_examples("你好！你怎么样？"),
        NewEntry::new("谢谢", Some("xièxie"), "спасибо")
            .with_pos("фраза")
            .with_examples("谢谢你的帮助。"),
        NewEntry::new("学习", Some("xuéxí"), "учиться; изучать")
            .with_pos("глагол")
            .with_examples("我在学习中文。"),
    ]
}

/// Insert the demo entries unless the store already has data.
/// Returns the number of entries inserted.
pub async fn seed(store: &dyn EntryStore) -> Result<u64, StorageError> {
    if store.count().await? > 0 {
        tracing::info!("Entries already exist, skipping seed");
        return Ok(0);
    }
    let n = store.insert_batch(&demo_entries()).await?;
    tracing::info!("Seeded {} entries", n);
    Ok(n)
}
