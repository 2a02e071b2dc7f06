//! Built-in text normalization passes.
//!
//! Plain functions over `&str`; [`PassCatalog`](super::PassCatalog) adapts
//! them to the uniform pass signature.

use std::sync::LazyLock;

use regex::{NoExpand, Regex, RegexBuilder};
use whatlang::Lang;

use super::error::PassError;

// ============================================================================
// Patterns
// ============================================================================

// `A-z` also spans `[ \ ] ^ _ \``, so bracketed text survives for
// `remove_text_between_brackets`.
static NON_ALPHANUMERIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[^a-zA-z0-9 .,'"?!; \n]"#).expect("non-alphanumeric pattern should compile")
});

static PARENTHESISED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^()]*\)").expect("parenthesis pattern should compile"));

static SQUARE_BRACKETED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\[\]]*\]").expect("bracket pattern should compile"));

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{2,}").expect("whitespace run pattern should compile"));

static ANY_WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern should compile"));

static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([.!?])\s*").expect("sentence end pattern should compile"));

static EXCESS_NEWLINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("newline pattern should compile"));

static LEADING_BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\n").expect("leading blank pattern should compile"));

static FIRST_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.*?\n").expect("first line pattern should compile"));

static DOT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.+").expect("dot pattern should compile"));

/// Mojibake for a UTF-8 right single quote decoded as Windows-1252.
const MOJIBAKE_APOSTROPHE: &str = "\u{e2}\u{20ac}\u{2122}";

// ============================================================================
// Substitution
// ============================================================================

/// Compile `pattern` with a string of single-letter regex flags: `i`
/// (case-insensitive), `m` (multi-line), `s` (dot matches newline), `x`
/// (verbose).
pub fn compile_pattern(pattern: &str, flags: Option<&str>) -> Result<Regex, PassError> {
    let mut builder = RegexBuilder::new(pattern);
    for flag in flags.unwrap_or_default().chars() {
        match flag {
            'i' => builder.case_insensitive(true),
            'm' => builder.multi_line(true),
            's' => builder.dot_matches_new_line(true),
            'x' => builder.ignore_whitespace(true),
            other => return Err(PassError::UnknownFlag(other)),
        };
    }
    Ok(builder.build()?)
}

/// Replace every match of `pattern` with `replacement`.
///
/// The replacement may reference groups as `$1` or `${name}`. See
/// [`compile_pattern`] for `flags`.
pub fn replace_regex_pattern(
    text: &str,
    pattern: &str,
    replacement: &str,
    flags: Option<&str>,
) -> Result<String, PassError> {
    let regex = compile_pattern(pattern, flags)?;
    Ok(regex.replace_all(text, replacement).into_owned())
}

pub fn replace_string(text: &str, to_replace: &str, replace_with: &str) -> String {
    text.replace(to_replace, replace_with)
}

pub fn to_lowercase(text: &str) -> String {
    text.to_lowercase()
}

/// Drop every character outside letters, digits, common punctuation,
/// spaces and newlines.
pub fn remove_non_alphanumeric(text: &str) -> String {
    NON_ALPHANUMERIC.replace_all(text, "").into_owned()
}

/// Remove innermost `(...)` and `[...]` groups, then collapse the leftover
/// whitespace runs to `replacement` and trim.
pub fn remove_text_between_brackets(text: &str, replacement: &str) -> String {
    let text = PARENTHESISED.replace_all(text, "");
    let text = SQUARE_BRACKETED.replace_all(&text, "");
    let text = WHITESPACE_RUN.replace_all(&text, NoExpand(replacement));
    text.trim().to_string()
}

/// Break the text after every `.`, `!` or `?`, replacing any whitespace that
/// follows with a single newline.
pub fn each_sentence_on_new_line(text: &str) -> String {
    SENTENCE_END.replace_all(text, "${1}\n").into_owned()
}

/// Limit consecutive newlines to two.
pub fn remove_excessive_newlines(text: &str) -> String {
    EXCESS_NEWLINES.replace_all(text, "\n\n").into_owned()
}

pub fn remove_tab_characters(text: &str) -> String {
    text.replace('\t', "")
}

// ============================================================================
// Language
// ============================================================================

/// Resolve an ISO 639-3 code such as `nld`.
pub fn language(code: &str) -> Result<Lang, PassError> {
    Lang::from_code(code).ok_or_else(|| PassError::UnknownLanguage(code.to_string()))
}

/// Keep the text only if its detected language is `wanted`.
///
/// Text whose language cannot be detected is dropped.
pub fn keep_language(text: &str, wanted: Lang) -> String {
    let detected = whatlang::detect(text).map(|info| info.lang());
    if detected == Some(wanted) {
        text.to_string()
    } else {
        tracing::trace!("Dropping text detected as {:?}, wanted {:?}", detected, wanted);
        String::new()
    }
}

/// [`keep_language`] for a language given by its ISO 639-3 code.
pub fn filter_language(text: &str, code: &str) -> Result<String, PassError> {
    Ok(keep_language(text, language(code)?))
}

pub fn filter_out_non_dutch(text: &str) -> String {
    keep_language(text, Lang::Nld)
}

// ============================================================================
// Line structure
// ============================================================================

/// Remove the first line together with blank lines around it.
pub fn remove_first_sentence(text: &str) -> String {
    let text = LEADING_BLANK_LINES.replace(text, "");
    let text = FIRST_LINE.replace(&text, "");
    let text = LEADING_BLANK_LINES.replace(&text, "");
    text.into_owned()
}

/// Remove the last line, unless it is the only one.
pub fn remove_last_sentence(text: &str) -> String {
    let mut lines: Vec<&str> = text.trim_end().split('\n').collect();
    if lines.len() > 1 {
        lines.pop();
    }
    lines.join("\n").trim_end().to_string()
}

// ============================================================================
// Characters
// ============================================================================

/// Remove the stray U+009D control character left by some scrapes.
pub fn remove_special_unicode_character(text: &str) -> String {
    text.replace('\u{9d}', "")
}

pub fn remove_quotation_marks(text: &str) -> String {
    text.replace(['"', '\''], "").replace(MOJIBAKE_APOSTROPHE, "")
}

pub fn remove_multiple_dots(text: &str) -> String {
    DOT_RUN.replace_all(text, ".").into_owned()
}

/// Remove punctuation that does not directly follow an ASCII letter.
///
/// "Punctuation" is any character that is neither a word character nor
/// whitespace. The preceding character is judged on the input, so a run
/// like `...` is removed entirely.
pub fn remove_punctuation_if_not_preceded_by_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous: Option<char> = None;
    for c in text.chars() {
        let is_punctuation = !(c.is_alphanumeric() || c == '_' || c.is_whitespace());
        let after_letter = previous.is_some_and(|p| p.is_ascii_alphabetic());
        if !is_punctuation || after_letter {
            out.push(c);
        }
        previous = Some(c);
    }
    out
}

/// Collapse every whitespace run to one space and trim.
pub fn collapse_whitespace(text: &str) -> String {
    ANY_WHITESPACE.replace_all(text.trim(), " ").into_owned()
}
