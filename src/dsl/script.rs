//! Script detection for Hanzi / Pinyin / Cyrillic text / 文字类型检测
//!
//! Pure predicates shared by the entry extractor and the search engine.
//! Classification happens in exactly one place ([`classify`]), callers
//! dispatch on the returned [`ScriptClass`].

use once_cell::sync::Lazy;
use regex::Regex;

/// Longest string still considered a romanization line / 拼音行最大长度
pub const MAX_ROMANIZED_CHARS: usize = 120;

/// Latin letters with the diacritics used by romanization systems,
/// plus whitespace, apostrophes, middle dots and hyphens.
static ROMANIZED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-zÀ-ÖØ-öø-ÿĀ-žǍ-ǐǑ-ǔǕ-ǜǞ-ǟǠ-ǡǢ-ǣǦ-ǧǨ-ǩǪ-ǫǬ-ǭǮ-ǯǰ-ǳǴ-ǵǸ-ǹǺ-ǻǼ-ǽǾ-ǿ\s'·-]+$",
    )
    .expect("static romanization pattern")
});

/// Tagged result of script classification / 文字分类结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptClass {
    /// Contains at least one CJK ideograph
    Ideograph,
    /// Pinyin-like Latin text
    Romanized,
    /// Contains Cyrillic letters
    Cyrillic,
    /// Anything else (digits, punctuation, mixed Latin junk)
    Other,
}

/// Check whether a character is a CJK ideograph / 检测是否为汉字
///
/// Covers CJK Unified Ideographs, Extension A and the Compatibility block.
pub fn is_ideograph(c: char) -> bool {
    matches!(c,
        '\u{3400}'..='\u{4dbf}' |  // CJK Extension A
        '\u{4e00}'..='\u{9fff}' |  // CJK Unified Ideographs
        '\u{f900}'..='\u{faff}'    // CJK Compatibility Ideographs
    )
}

/// Check whether a character is a Cyrillic letter / 检测是否为西里尔字母
pub fn is_cyrillic(c: char) -> bool {
    matches!(c, '\u{0400}'..='\u{04ff}') && c.is_alphabetic()
}

/// Text contains at least one ideograph / 文本是否包含汉字
pub fn has_ideograph(text: &str) -> bool {
    text.chars().any(is_ideograph)
}

/// Text contains at least one Cyrillic letter / 文本是否包含西里尔字母
pub fn has_cyrillic(text: &str) -> bool {
    text.chars().any(is_cyrillic)
}

/// Text looks like a romanized (Pinyin-like) token sequence / 文本是否像拼音
pub fn looks_like_romanized(text: &str) -> bool {
    let text = text.trim();
    if text.is_empty() {
        return false;
    }
    if text.chars().count() > MAX_ROMANIZED_CHARS {
        return false;
    }
    if has_cyrillic(text) || has_ideograph(text) {
        return false;
    }
    ROMANIZED_RE.is_match(text)
}

/// Classify text by script, checked in fixed priority order / 按优先级分类
///
/// Ideographs win over everything, then romanization, then Cyrillic.
pub fn classify(text: &str) -> ScriptClass {
    if has_ideograph(text) {
        ScriptClass::Ideograph
    } else if looks_like_romanized(text) {
        ScriptClass::Romanized
    } else if has_cyrillic(text) {
        ScriptClass::Cyrillic
    } else {
        ScriptClass::Other
    }
}
