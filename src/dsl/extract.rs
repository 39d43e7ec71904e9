//! Entry extraction policies / 词条字段提取
//!
//! Maps a raw `(headword, body)` article to Hanzi / Pinyin / Russian fields.
//! Which policy applies is decided by the caller from the source file name.

use std::path::Path;

use super::markup::normalize;
use super::reader::Article;
use super::script::{has_ideograph, is_ideograph, looks_like_romanized};

/// Hanzi placeholder when nothing ideographic could be extracted
pub const HANZI_SENTINEL: &str = "-";

/// Dictionary direction of a source corpus / 词典方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// CN→RU: headword is Hanzi, body is the Russian translation
    Forward,
    /// RU→CN: headword is Russian, Hanzi/Pinyin are mined from the body
    Reverse,
}

impl Policy {
    /// Pick the policy for a source file: names containing `reverse_marker`
    /// (case-insensitive) are RU→CN corpora.
    pub fn for_path(path: &Path, reverse_marker: &str) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let marker = reverse_marker.to_lowercase();
        if !marker.is_empty() && name.contains(&marker) {
            Policy::Reverse
        } else {
            Policy::Forward
        }
    }
}

/// Fields extracted from one article, before truncation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedEntry {
    pub hanzi: String,
    pub pinyin: Option<String>,
    pub ru: String,
}

/// Extract an entry from an article, `None` when a required field is empty
pub fn extract(policy: Policy, article: &Article) -> Option<ParsedEntry> {
    match policy {
        Policy::Forward => extract_forward(&article.headword, &article.body),
        Policy::Reverse => extract_reverse(&article.headword, &article.body),
    }
}

fn extract_forward(headword: &str, body: &str) -> Option<ParsedEntry> {
    let hanzi = headword.trim();
    if hanzi.is_empty() {
        return None;
    }
    let body = normalize(body);
    if body.is_empty() {
        return None;
    }
    Some(ParsedEntry {
        hanzi: hanzi.to_string(),
        pinyin: first_romanized(&body),
        ru: body,
    })
}

fn extract_reverse(headword: &str, body: &str) -> Option<ParsedEntry> {
    let ru = headword.trim();
    if ru.is_empty() {
        return None;
    }
    let body = normalize(body);
    Some(ParsedEntry {
        hanzi: first_ideograph_run(&body).unwrap_or_else(|| HANZI_SENTINEL.to_string()),
        pinyin: first_romanized(&body).or_else(|| first_romanized_run(&body)),
        ru: ru.to_string(),
    })
}

/// First maximal run of contiguous ideographs / 第一段连续汉字
///
/// Known limitation: with several unrelated Hanzi fragments in a body
/// (example sentences first, say) the first one wins even if irrelevant.
pub fn first_ideograph_run(text: &str) -> Option<String> {
    let run: String = text
        .chars()
        .skip_while(|c| !is_ideograph(*c))
        .take_while(|c| is_ideograph(*c))
        .collect();
    if run.is_empty() {
        None
    } else {
        Some(run)
    }
}

/// First romanized line of a body / 第一行拼音
///
/// Only whole lines qualify, tried top to bottom.
pub fn first_romanized(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find(|line| looks_like_romanized(line))
        .map(str::to_string)
}

/// Romanized tokens mined from mixed lines (`你好 nǐ hǎo — hello`)
///
/// Used for RU→CN bodies only, where the reading sits next to the Hanzi.
fn first_romanized_run(text: &str) -> Option<String> {
    text.lines()
        .filter(|line| has_ideograph(line))
        .find_map(romanized_token_run)
}

fn romanized_token_run(line: &str) -> Option<String> {
    let mut run: Vec<&str> = Vec::new();
    for token in line.split_whitespace() {
        if looks_like_romanized(token) {
            run.push(token);
        } else if !run.is_empty() {
            break;
        }
    }
    if run.is_empty() {
        None
    } else {
        Some(run.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn art(headword: &str, body: &str) -> Article {
        Article {
            headword: headword.to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_policy_for_path() {
        let policy = |path: &str, marker: &str| Policy::for_path(&PathBuf::from(path), marker);
        assert_eq!(policy("data/dabkrs_1.dsl", "bruks"), Policy::Forward);
        assert_eq!(policy("data/dabruks.dsl", "bruks"), Policy::Reverse);
        assert_eq!(policy("data/DaBRUKS.DSL", "bruks"), Policy::Reverse);
        assert_eq!(policy("bruks/other.dsl", "bruks"), Policy::Forward);
        assert_eq!(policy("dabruks.dsl", ""), Policy::Forward);
    }

    #[test]
    fn test_forward_keeps_pinyin_in_ru() {
        let parsed = extract(Policy::Forward, &art("学习", "xuéxí\nучиться; изучать")).unwrap();
        assert_eq!(
            parsed,
            ParsedEntry {
                hanzi: "学习".to_string(),
                pinyin: Some("xuéxí".to_string()),
                ru: "xuéxí\nучиться; изучать".to_string(),
            }
        );
    }

    #[test]
    fn test_forward_normalizes_body() {
        let parsed = extract(
            Policy::Forward,
            &art(" 旅游 ", "[m1]lǚyóu[/m]\n[m1]путешествие {разг.}[/m]"),
        )
        .unwrap();
        assert_eq!(parsed.hanzi, "旅游");
        assert_eq!(parsed.pinyin.as_deref(), Some("lǚyóu"));
        assert_eq!(parsed.ru, "lǚyóu\nпутешествие");
    }

    #[test]
    fn test_forward_without_pinyin() {
        let parsed = extract(Policy::Forward, &art("好", "хороший")).unwrap();
        assert_eq!(parsed.pinyin, None);
    }

    #[test]
    fn test_forward_ignores_latin_in_example_lines() {
        let body = "1) 好人 good man — хороший человек\n2) хороший";
        let parsed = extract(Policy::Forward, &art("好", body)).unwrap();
        assert_eq!(parsed.hanzi, "好");
        assert_eq!(parsed.pinyin, None);
    }

    #[test]
    fn test_forward_drops_empty_fields() {
        assert_eq!(extract(Policy::Forward, &art("  ", "тело")), None);
        assert_eq!(extract(Policy::Forward, &art("空", "")), None);
        assert_eq!(extract(Policy::Forward, &art("空", "[m1][/m] {note}")), None);
    }

    #[test]
    fn test_reverse_inline_hanzi_and_pinyin() {
        let parsed = extract(Policy::Reverse, &art("привет", "你好 nǐ hǎo — hello")).unwrap();
        assert_eq!(
            parsed,
            ParsedEntry {
                hanzi: "你好".to_string(),
                pinyin: Some("nǐ hǎo".to_string()),
                ru: "привет".to_string(),
            }
        );
    }

    #[test]
    fn test_reverse_pinyin_line_preferred() {
        let parsed = extract(Policy::Reverse, &art("учиться", "学习 (учёба)\nxuéxí")).unwrap();
        assert_eq!(parsed.hanzi, "学习");
        assert_eq!(parsed.pinyin.as_deref(), Some("xuéxí"));
    }

    #[test]
    fn test_reverse_sentinel_and_empty_body() {
        let parsed = extract(Policy::Reverse, &art("отлично", "")).unwrap();
        assert_eq!(parsed.hanzi, HANZI_SENTINEL);
        assert_eq!(parsed.pinyin, None);
        assert_eq!(parsed.ru, "отлично");

        assert_eq!(extract(Policy::Reverse, &art("", "你好")), None);
    }

    #[test]
    fn test_first_ideograph_run() {
        assert_eq!(first_ideograph_run("abc 你好吗? 再见"), Some("你好吗".to_string()));
        assert_eq!(first_ideograph_run("нет"), None);
    }

    #[test]
    fn test_first_romanized_order() {
        assert_eq!(first_romanized("привет\nnǐ hǎo\nzàijiàn"), Some("nǐ hǎo".to_string()));
        assert_eq!(first_romanized("привет\nпока"), None);
        // Latin text without ideographs on the line is not mined for tokens
        assert_eq!(first_romanized("1) hello, world"), None);
        assert_eq!(first_romanized("你好 nǐ hǎo — hello"), None);
        assert_eq!(first_romanized_run("你好 nǐ hǎo — hello"), Some("nǐ hǎo".to_string()));
    }
}
