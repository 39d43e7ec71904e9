use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::search::SearchEngine;

/// Import state management / 导入状态管理
///
/// Cancellation is only observed at batch boundaries.
pub struct ImportState {
    pub running: AtomicBool,
    /// Entries committed in the current run / 已提交条目数
    pub committed: AtomicU64,
    pub cancel_flag: AtomicBool,
}

impl ImportState {
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            committed: AtomicU64::new(0),
            cancel_flag: AtomicBool::new(false),
        }
    }

    pub fn start(&self) {
        self.running.store(true, Ordering::SeqCst);
        self.cancel_flag.store(false, Ordering::SeqCst);
        self.committed.store(0, Ordering::SeqCst);
    }

    /// Record a committed batch / 记录已提交批次
    pub fn add_committed(&self, n: u64) {
        self.committed.fetch_add(n, Ordering::SeqCst);
    }

    pub fn finish(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Request cancellation, honoured after the batch in flight / 请求取消
    pub fn cancel(&self) {
        self.cancel_flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_flag.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn committed(&self) -> u64 {
        self.committed.load(Ordering::SeqCst)
    }
}

impl Default for ImportState {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared state of the HTTP layer / HTTP 层共享状态
#[derive(Clone)]
pub struct AppState {
    pub engine: SearchEngine,
    pub default_limit: usize,
    pub max_limit: usize,
}

impl AppState {
    pub fn new(engine: SearchEngine, default_limit: usize, max_limit: usize) -> Arc<Self> {
        Arc::new(Self {
            engine,
            default_limit,
            max_limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_state_lifecycle() {
        let state = ImportState::new();
        assert!(!state.is_running());

        state.start();
        state.add_committed(5000);
        state.add_committed(12);
        assert!(state.is_running());
        assert_eq!(state.committed(), 5012);

        state.finish();
        assert!(!state.is_running());
        assert_eq!(state.committed(), 5012);
    }

    #[test]
    fn test_start_resets_cancel_and_count() {
        let state = ImportState::new();
        state.start();
        state.add_committed(3);
        state.cancel();
        assert!(state.is_cancelled());
        state.finish();

        state.start();
        assert!(!state.is_cancelled());
        assert_eq!(state.committed(), 0);
    }
}
