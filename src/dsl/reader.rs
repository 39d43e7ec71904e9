//! DSL article reader / DSL 词条读取器
//!
//! Reconstructs `(headword, body)` articles from a line-oriented DSL file:
//! - a line without leading space/tab starts a new article (headword)
//! - a line with leading space/tab continues the current article body
//! - `#`-prefixed lines are directives; `#INCLUDE "file"` inlines another file
//!
//! Reading is streaming: each source file is decoded chunk by chunk as its
//! lines are consumed, and articles are produced one at a time through
//! [`Iterator`]. The reader does blocking file I/O.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use encoding_rs::{Decoder, Encoding};
use once_cell::sync::Lazy;
use regex::Regex;

static INCLUDE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^#INCLUDE\s+"([^"]+)""#).expect("static include pattern"));

/// Bytes read from disk per decode step / 每次解码读取的字节数
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// One reconstructed dictionary article / 一篇词条
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub headword: String,
    pub body: String,
}

/// Classification of a physical input line
#[derive(Debug, PartialEq, Eq)]
enum RawLine<'a> {
    Blank,
    Include(&'a str),
    Directive,
    Headword(&'a str),
    Continuation(&'a str),
}

impl<'a> RawLine<'a> {
    fn classify(line: &'a str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return RawLine::Blank;
        }
        if trimmed.starts_with('#') {
            return match INCLUDE_RE.captures(trimmed).and_then(|c| c.get(1)) {
                Some(path) => RawLine::Include(path.as_str()),
                None => RawLine::Directive,
            };
        }
        if line.starts_with(|c: char| c == ' ' || c == '\t') {
            RawLine::Continuation(trimmed)
        } else {
            RawLine::Headword(trimmed)
        }
    }
}

/// An open source file on the include stack
struct Frame {
    /// Canonical path, used to refuse cyclic includes
    path: PathBuf,
    dir: PathBuf,
    lines: DecodedLines,
}

/// Incrementally decoded lines of one file / 逐块解码的文本行
///
/// Lines end at `\n`, a trailing `\r` is dropped. The decoder sniffs a BOM
/// and replaces malformed sequences with U+FFFD.
struct DecodedLines {
    source: BufReader<File>,
    decoder: Decoder,
    pending: String,
    /// Start of the not yet returned part of `pending`
    offset: usize,
    eof: bool,
}

impl DecodedLines {
    fn open(path: &Path, encoding: &'static Encoding) -> io::Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            source: BufReader::with_capacity(READ_BUFFER_SIZE, file),
            decoder: encoding.new_decoder(),
            pending: String::new(),
            offset: 0,
            eof: false,
        })
    }

    fn next_line(&mut self) -> io::Result<Option<String>> {
        loop {
            let rest = &self.pending[self.offset..];
            if let Some(pos) = rest.find('\n') {
                let line = strip_cr(&rest[..pos]).to_string();
                self.offset += pos + 1;
                return Ok(Some(line));
            }
            if self.eof {
                if rest.is_empty() {
                    return Ok(None);
                }
                let line = strip_cr(rest).to_string();
                self.offset = self.pending.len();
                return Ok(Some(line));
            }
            self.fill()?;
        }
    }

    /// Decode the next chunk of the file into `pending`
    fn fill(&mut self) -> io::Result<()> {
        self.pending.drain(..self.offset);
        self.offset = 0;

        let chunk = self.source.fill_buf()?;
        let last = chunk.is_empty();
        let room = self
            .decoder
            .max_utf8_buffer_length(chunk.len())
            .unwrap_or(chunk.len() * 3 + 16);
        self.pending.reserve(room);
        let (_, read, _) = self.decoder.decode_to_string(chunk, &mut self.pending, last);
        self.source.consume(read);
        self.eof = last;
        Ok(())
    }
}

fn strip_cr(line: &str) -> &str {
    line.strip_suffix('\r').unwrap_or(line)
}

/// Lazy, single-pass article reader with recursive `#INCLUDE` support
pub struct DslReader {
    encoding: &'static Encoding,
    stack: Vec<Frame>,
    head: Option<String>,
    body_lines: Vec<String>,
}

impl DslReader {
    /// Open the root file. A missing root is an error, missing includes are not.
    pub fn open(path: &Path, encoding_label: &str) -> io::Result<Self> {
        let encoding = resolve_encoding(encoding_label);
        let root = load_frame(path, encoding)?;
        Ok(Self {
            encoding,
            stack: vec![root],
            head: None,
            body_lines: Vec::new(),
        })
    }

    /// Next physical line across the include stack
    fn next_line(&mut self) -> Option<String> {
        loop {
            let frame = self.stack.last_mut()?;
            match frame.lines.next_line() {
                Ok(Some(line)) => return Some(line),
                Ok(None) => {
                    self.stack.pop();
                }
                Err(e) => {
                    tracing::warn!(
                        "Read error in {:?}, skipping rest of file: {}",
                        frame.path,
                        e
                    );
                    self.stack.pop();
                }
            }
        }
    }

    fn push_include(&mut self, relative: &str) {
        let Some(current) = self.stack.last() else {
            return;
        };
        let target = current.dir.join(relative);
        if !target.exists() {
            tracing::debug!("Include target not found, skipping: {:?}", target);
            return;
        }
        let canonical = std::fs::canonicalize(&target).unwrap_or_else(|_| target.clone());
        if self.stack.iter().any(|f| f.path == canonical) {
            tracing::warn!("Cyclic include skipped: {:?}", canonical);
            return;
        }
        match load_frame(&target, self.encoding) {
            Ok(frame) => self.stack.push(frame),
            Err(e) => tracing::warn!("Failed to read include {:?}: {}", target, e),
        }
    }

    /// Complete the pending article, if any
    fn flush(&mut self) -> Option<Article> {
        let head = self.head.take()?;
        let body = self.body_lines.join("\n").trim().to_string();
        self.body_lines.clear();
        Some(Article {
            headword: head.trim().to_string(),
            body,
        })
    }
}

impl Iterator for DslReader {
    type Item = Article;

    fn next(&mut self) -> Option<Article> {
        while let Some(line) = self.next_line() {
            match RawLine::classify(&line) {
                RawLine::Blank => {
                    if self.head.is_some() {
                        self.body_lines.push(String::new());
                    }
                }
                RawLine::Include(relative) => {
                    let relative = relative.to_string();
                    self.push_include(&relative);
                }
                RawLine::Directive => {}
                RawLine::Headword(text) => {
                    let text = text.to_string();
                    let done = self.flush();
                    self.head = Some(text);
                    if done.is_some() {
                        return done;
                    }
                }
                RawLine::Continuation(text) => {
                    if self.head.is_some() {
                        self.body_lines.push(text.to_string());
                    }
                }
            }
        }
        self.flush()
    }
}

/// Resolve an encoding by WHATWG label, falling back to UTF-8 / 按标签解析编码
pub fn resolve_encoding(label: &str) -> &'static Encoding {
    Encoding::for_label(label.trim().as_bytes()).unwrap_or(encoding_rs::UTF_8)
}

fn load_frame(path: &Path, encoding: &'static Encoding) -> io::Result<Frame> {
    let lines = DecodedLines::open(path, encoding)?;

    let canonical = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    Ok(Frame {
        path: canonical,
        dir,
        lines,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn article(headword: &str, body: &str) -> Article {
        Article {
            headword: headword.to_string(),
            body: body.to_string(),
        }
    }

    fn read_all(path: &Path) -> Vec<Article> {
        DslReader::open(path, "utf-8").unwrap().collect()
    }

    #[test]
    fn test_classify_lines() {
        assert_eq!(RawLine::classify(""), RawLine::Blank);
        assert_eq!(RawLine::classify("  \t"), RawLine::Blank);
        assert_eq!(RawLine::classify("#NAME \"x\""), RawLine::Directive);
        assert_eq!(RawLine::classify("#INCLUDE \"a.dsl\""), RawLine::Include("a.dsl"));
        assert_eq!(RawLine::classify("  #INCLUDE \"a.dsl\""), RawLine::Include("a.dsl"));
        assert_eq!(RawLine::classify("旅游"), RawLine::Headword("旅游"));
        assert_eq!(RawLine::classify("\tbody "), RawLine::Continuation("body"));
    }

    #[test]
    fn test_two_articles() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("main.dsl");
        fs::write(&path, "旅游\n  lǚyóu\n  travel; tourism\n另一个\n  second").unwrap();

        assert_eq!(
            read_all(&path),
            vec![
                article("旅游", "lǚyóu\ntravel; tourism"),
                article("另一个", "second"),
            ]
        );
    }

    #[test]
    fn test_directives_and_leading_noise() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("main.dsl");
        fs::write(
            &path,
            "#NAME \"Test\"\r\n#INDEX_LANGUAGE \"Chinese\"\r\n\r\n  orphan body\r\n你好\r\n\t[m1]привет[/m]\r\n",
        )
        .unwrap();

        assert_eq!(read_all(&path), vec![article("你好", "[m1]привет[/m]")]);
    }

    #[test]
    fn test_blank_lines_keep_paragraphs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("main.dsl");
        fs::write(&path, "词\n  one\n\n  two\n\n\n下一个\n").unwrap();

        assert_eq!(
            read_all(&path),
            vec![article("词", "one\n\ntwo"), article("下一个", "")]
        );
    }

    #[test]
    fn test_include_inlined_in_order() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("sub.dsl"), "中\n  middle\n").unwrap();
        let path = dir.path().join("main.dsl");
        fs::write(&path, "前\n  first\n#INCLUDE \"sub.dsl\"\n后\n  last\n").unwrap();

        assert_eq!(
            read_all(&path),
            vec![
                article("前", "first"),
                article("中", "middle"),
                article("后", "last"),
            ]
        );
    }

    #[test]
    fn test_include_relative_to_including_file() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("parts")).unwrap();
        fs::write(dir.path().join("parts/inner.dsl"), "内\n  inner\n").unwrap();
        fs::write(dir.path().join("parts/outer.dsl"), "#INCLUDE \"inner.dsl\"\n").unwrap();
        let path = dir.path().join("main.dsl");
        fs::write(&path, "#INCLUDE \"parts/outer.dsl\"\n").unwrap();

        assert_eq!(read_all(&path), vec![article("内", "inner")]);
    }

    #[test]
    fn test_missing_include_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("main.dsl");
        fs::write(&path, "一\n  one\n#INCLUDE \"nope.dsl\"\n  still one\n二\n  two\n").unwrap();

        assert_eq!(
            read_all(&path),
            vec![article("一", "one\nstill one"), article("二", "two")]
        );
    }

    #[test]
    fn test_cyclic_include_terminates() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.dsl"), "甲\n  a\n#INCLUDE \"b.dsl\"\n").unwrap();
        fs::write(dir.path().join("b.dsl"), "乙\n  b\n#INCLUDE \"a.dsl\"\n").unwrap();

        let articles = read_all(&dir.path().join("a.dsl"));
        assert_eq!(articles, vec![article("甲", "a"), article("乙", "b")]);
    }

    #[test]
    fn test_self_include_terminates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("self.dsl");
        fs::write(&path, "自\n  x\n#INCLUDE \"self.dsl\"\n").unwrap();

        assert_eq!(read_all(&path), vec![article("自", "x")]);
    }

    #[test]
    fn test_repeated_sibling_include_allowed() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("s.dsl"), "重\n  again\n").unwrap();
        let path = dir.path().join("main.dsl");
        fs::write(&path, "#INCLUDE \"s.dsl\"\n#INCLUDE \"s.dsl\"\n").unwrap();

        assert_eq!(
            read_all(&path),
            vec![article("重", "again"), article("重", "again")]
        );
    }

    #[test]
    fn test_utf16_with_bom() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("u16.dsl");
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "学习\n\txuéxí\n".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        fs::write(&path, bytes).unwrap();

        let articles: Vec<Article> = DslReader::open(&path, "utf-16").unwrap().collect();
        assert_eq!(articles, vec![article("学习", "xuéxí")]);
    }

    #[test]
    fn test_large_utf16_file_streams_across_chunks() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("big.dsl");
        let mut text = String::new();
        for i in 0..6000 {
            text.push_str(&format!("词{}\r\n\t𠮷 释义 {}\r\n", i, i));
        }
        let mut bytes = vec![0xFF, 0xFE];
        for unit in text.encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        assert!(bytes.len() > 2 * READ_BUFFER_SIZE);
        fs::write(&path, bytes).unwrap();

        let articles: Vec<Article> = DslReader::open(&path, "utf-16").unwrap().collect();
        assert_eq!(articles.len(), 6000);
        assert_eq!(articles[0], article("词0", "𠮷 释义 0"));
        assert_eq!(articles[5999], article("词5999", "𠮷 释义 5999"));
        assert!(articles.iter().all(|a| !a.body.contains('\u{FFFD}')));
    }

    #[test]
    fn test_missing_root_is_error() {
        let dir = TempDir::new().unwrap();
        assert!(DslReader::open(&dir.path().join("absent.dsl"), "utf-16").is_err());
    }

    #[test]
    fn test_resolve_encoding() {
        assert_eq!(resolve_encoding("utf-16"), encoding_rs::UTF_16LE);
        assert_eq!(resolve_encoding("UTF-8"), encoding_rs::UTF_8);
        assert_eq!(resolve_encoding("no-such-label"), encoding_rs::UTF_8);
    }
}
