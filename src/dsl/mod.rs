//! DSL dictionary source parsing / DSL 词典源文件解析
//!
//! - `script`: Hanzi / Pinyin / Cyrillic detection
//! - `markup`: tag and annotation stripping
//! - `reader`: article reconstruction with `#INCLUDE`
//! - `extract`: CN→RU / RU→CN field extraction

pub mod extract;
pub mod markup;
pub mod reader;
pub mod script;

pub use extract::{extract, ParsedEntry, Policy};
pub use reader::{Article, DslReader};
pub use script::{classify, ScriptClass};
