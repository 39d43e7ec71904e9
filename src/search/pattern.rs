//! Ranked match patterns / 分级匹配模式
//!
//! A [`PatternSet`] names the target field, the lowercased needle and an
//! ordered list of match tiers. The tier index is the rank (lower is better),
//! rows matching no tier get [`FALLBACK_RANK`]. The in-memory backend sorts
//! with [`PatternSet::order`]; SQLite builds the same ordering in SQL.

use regex::Regex;

use crate::models::Entry;

/// Rank of a candidate that matches none of the tiers
pub const FALLBACK_RANK: u32 = 100;

/// Entry field a search targets / 搜索字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    Hanzi,
    Pinyin,
    Ru,
}

impl SearchField {
    /// Column holding the field as stored, its length breaks rank ties
    pub fn column(&self) -> &'static str {
        match self {
            SearchField::Hanzi => "hanzi",
            SearchField::Pinyin => "pinyin",
            SearchField::Ru => "ru",
        }
    }

    /// Lowercase shadow column used for matching in SQL
    pub fn lower_column(&self) -> &'static str {
        match self {
            SearchField::Hanzi => "hanzi_lower",
            SearchField::Pinyin => "pinyin_lower",
            SearchField::Ru => "ru_lower",
        }
    }

    pub fn value<'a>(&self, entry: &'a Entry) -> Option<&'a str> {
        match self {
            SearchField::Hanzi => Some(entry.hanzi.as_str()),
            SearchField::Pinyin => entry.pinyin.as_deref(),
            SearchField::Ru => Some(entry.ru.as_str()),
        }
    }
}

/// One rank tier / 匹配层级
#[derive(Debug, Clone)]
pub enum MatchTier {
    Exact,
    Prefix,
    /// Occurrence bounded by non-word characters or string edges
    WholeWord(Regex),
    Substring,
}

impl MatchTier {
    pub fn whole_word(needle: &str) -> Self {
        let pattern = format!(r"(?:^|\W){}(?:\W|$)", regex::escape(needle));
        // escaped input only fails on the compiled size limit
        match Regex::new(&pattern) {
            Ok(re) => MatchTier::WholeWord(re),
            Err(e) => {
                tracing::warn!("Whole-word pattern rejected, using substring tier: {}", e);
                MatchTier::Substring
            }
        }
    }

    fn matches(&self, haystack: &str, needle: &str) -> bool {
        match self {
            MatchTier::Exact => haystack == needle,
            MatchTier::Prefix => haystack.starts_with(needle),
            MatchTier::WholeWord(re) => re.is_match(haystack),
            MatchTier::Substring => haystack.contains(needle),
        }
    }
}

/// Field + needle + ordered tiers / 搜索模式集合
#[derive(Debug, Clone)]
pub struct PatternSet {
    pub field: SearchField,
    /// Lowercased query
    pub needle: String,
    pub tiers: Vec<MatchTier>,
}

impl PatternSet {
    pub fn new(field: SearchField, query: &str, tiers: Vec<MatchTier>) -> Self {
        Self {
            field,
            needle: query.to_lowercase(),
            tiers,
        }
    }

    /// Case-insensitive substring filter; rows with a null field never match
    pub fn filter(&self, entry: &Entry) -> bool {
        self.field
            .value(entry)
            .map(|v| v.to_lowercase().contains(&self.needle))
            .unwrap_or(false)
    }

    /// Rank of a field value, lower is better
    pub fn rank(&self, value: &str) -> u32 {
        let lower = value.to_lowercase();
        self.tiers
            .iter()
            .position(|tier| tier.matches(&lower, &self.needle))
            .map(|idx| idx as u32)
            .unwrap_or(FALLBACK_RANK)
    }

    /// `LIKE` pattern for the substring filter, `\` is the escape character
    pub fn like_pattern(&self) -> String {
        format!("%{}%", escape_like(&self.needle))
    }

    /// Order candidates by (rank, field length, id) and keep `limit` of them
    pub fn order(&self, candidates: Vec<Entry>, limit: usize) -> Vec<Entry> {
        let mut keyed: Vec<((u32, usize, i64), Entry)> = candidates
            .into_iter()
            .filter_map(|entry| {
                let value = self.field.value(&entry)?;
                let key = (self.rank(value), value.chars().count(), entry.id);
                Some((key, entry))
            })
            .collect();
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
        keyed.truncate(limit);
        keyed.into_iter().map(|(_, entry)| entry).collect()
    }
}

/// Escape `LIKE` wildcards so the query is matched literally / 转义 LIKE 通配符
pub fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: i64, hanzi: &str, pinyin: Option<&str>, ru: &str) -> Entry {
        Entry {
            id,
            hanzi: hanzi.to_string(),
            pinyin: pinyin.map(str::to_string),
            ru: ru.to_string(),
            pos: None,
            examples: None,
        }
    }

    fn russian(query: &str) -> PatternSet {
        PatternSet::new(
            SearchField::Ru,
            query,
            vec![
                MatchTier::Exact,
                MatchTier::Prefix,
                MatchTier::whole_word(&query.to_lowercase()),
                MatchTier::Substring,
            ],
        )
    }

    #[test]
    fn test_russian_tiers() {
        let p = russian("Привет");
        assert_eq!(p.rank("привет"), 0);
        assert_eq!(p.rank("Привет, как дела"), 1);
        assert_eq!(p.rank("ну привет"), 2);
        assert_eq!(p.rank("ну привет!"), 2);
        assert_eq!(p.rank("приветствие"), 3);
        assert_eq!(p.rank("пока"), FALLBACK_RANK);
    }

    #[test]
    fn test_whole_word_escapes_regex() {
        let tier = MatchTier::whole_word("a.b");
        assert!(tier.matches("x a.b y", "a.b"));
        assert!(!tier.matches("x axb y", "a.b"));
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a_b"), "a\\_b");
        assert_eq!(escape_like("c:\\"), "c:\\\\");
        assert_eq!(escape_like("你好"), "你好");
    }

    #[test]
    fn test_filter_skips_null_field() {
        let p = PatternSet::new(SearchField::Pinyin, "hao", vec![MatchTier::Substring]);
        assert!(p.filter(&entry(1, "好", Some("hǎo hao"), "хорошо")));
        assert!(!p.filter(&entry(2, "好", None, "hao")));
    }

    #[test]
    fn test_order_tie_breaks() {
        let p = PatternSet::new(
            SearchField::Hanzi,
            "你好",
            vec![MatchTier::Exact, MatchTier::Prefix, MatchTier::Substring],
        );
        let candidates = vec![
            entry(1, "说你好", None, "a"),
            entry(2, "你好吗", None, "b"),
            entry(3, "你好", None, "c"),
            entry(4, "你好啊", None, "d"),
            entry(5, "你好你好", None, "e"),
        ];
        let ids: Vec<i64> = p.order(candidates, 10).iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![3, 2, 4, 5, 1]);
    }

    #[test]
    fn test_order_limit() {
        let p = PatternSet::new(SearchField::Ru, "а", vec![MatchTier::Substring]);
        let candidates = (1..=5).map(|i| entry(i, "-", None, "а")).collect();
        assert_eq!(p.order(candidates, 2).len(), 2);
    }
}
