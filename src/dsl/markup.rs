//! DSL markup cleanup / DSL 标记清理
//!
//! Turns article bodies into readable text: inline tags such as `[m1]`,
//! `[/m]`, `[ref]` and brace annotations `{...}` are dropped, whitespace is
//! collapsed. Malformed markup is never an error, unmatched brackets and
//! braces are simply left in place.

use once_cell::sync::Lazy;
use regex::Regex;

static TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[/?[A-Za-z0-9]+\]").expect("static tag pattern"));
static BRACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{[^}]*\}").expect("static brace pattern"));
static HSPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t]+").expect("static space pattern"));
static NEWLINES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("static newline pattern"));

/// Normalize a DSL article body into plain text / 标准化文章正文
pub fn normalize(text: &str) -> String {
    let mut out = text.replace('\u{00A0}', " ");

    // Removing one construct can expose another (`[[m]m]`, `[{x}i]`),
    // strip until nothing matches so the result is a fixed point.
    loop {
        let stripped = strip_markup(&out);
        if stripped == out {
            break;
        }
        out = stripped;
    }

    let out = HSPACE_RE.replace_all(&out, " ");
    let out = NEWLINES_RE.replace_all(&out, "\n\n");
    out.trim().to_string()
}

fn strip_markup(text: &str) -> String {
    let without_tags = TAG_RE.replace_all(text, "");
    BRACE_RE.replace_all(&without_tags, "").into_owned()
}
