//! Search module - ranked lookup over stored entries / 搜索模块
//!
//! Architecture principles / 架构原则：
//! - The engine only classifies the query and builds a pattern set
//! - Storage filters and orders by the pattern set (see `pattern`)
//! - Call direction: Engine → Storage (unidirectional) / 调用方向
//!
//! Results are deterministic: `(rank, field length, id)`.

pub mod engine;
pub mod pattern;

pub use engine::{build_pattern, SearchEngine, SearchMode};
pub use pattern::{MatchTier, PatternSet, SearchField};
