//! TextPostProcessor (spec §4.9): the final normalization pass over the
//! emitted Markdown string, plus the CJK-aware text-joining helpers shared
//! by LineAnalyzer and MarkdownGenerator.
//!
//! Grounded on `pdf/markdown/lines.rs::{is_cjk_char, needs_space_between}`
//! and `pdf/markdown/bridge.rs::normalize_text_encoding` (soft-hyphen and
//! control-character cleanup, supplement C.3).

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::config::PipelineConfig;

static HTML_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"</?[a-zA-Z][a-zA-Z0-9]*(?:\s[^<>]*)?/?>").unwrap());
static PAGE_NUMBER_LINE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*\d{1,3}\s*$").unwrap());
static HASH_DIGITS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*#\s*\d+\s*$").unwrap());
static DUPLICATE_SEPARATOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\|(\s*---\s*\|)+\s*$").unwrap());
static BLANK_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// True when `c` falls in a CJK or CJK-adjacent Unicode block (teacher:
/// `pdf/markdown/lines.rs::is_cjk_char`).
pub fn is_cjk_char(c: char) -> bool {
    let cp = c as u32;
    matches!(cp,
        0x4E00..=0x9FFF    // CJK Unified Ideographs
        | 0x3400..=0x4DBF  // CJK Extension A
        | 0x20000..=0x2A6DF // CJK Extension B
        | 0x2A700..=0x2EBEF // CJK Extensions C-F
        | 0x3040..=0x309F  // Hiragana
        | 0x30A0..=0x30FF  // Katakana
        | 0xAC00..=0xD7A3  // Hangul syllables
        | 0x1100..=0x11FF  // Hangul Jamo
        | 0x3130..=0x318F  // Hangul Compat Jamo
        | 0xF900..=0xFAFF  // CJK Compatibility Ideographs
        | 0x3000..=0x303F  // CJK punctuation
        | 0xFF00..=0xFFEF  // Fullwidth forms
    )
}

const NO_SPACE_BEFORE: &[char] = &['。', '、', '，', '．', '）', '」', '』', '】', '〉', '》', '、', '！', '？', '：', '；'];
const NO_SPACE_AFTER: &[char] = &['（', '「', '『', '【', '〈', '《'];

/// Whether a space should be inserted between two adjacent runs of text
/// (teacher: `pdf/markdown/lines.rs::needs_space_between`). Distinct word
/// tokens get a space by default; the exception is CJK closing/opening
/// punctuation, which never takes a preceding/following space even when the
/// surrounding words would otherwise be joined with one.
pub fn needs_space_between(prev_last: char, next_first: char) -> bool {
    if NO_SPACE_BEFORE.contains(&next_first) || NO_SPACE_AFTER.contains(&prev_last) {
        return false;
    }
    true
}

/// Dehyphenates soft hyphens and strips control characters other than the
/// ones Markdown relies on (supplement C.3).
pub fn normalize_text_encoding(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '\u{00AD}' {
            let at_end_of_word = i + 1 >= chars.len() || !chars[i + 1].is_alphanumeric();
            if at_end_of_word {
                out.push('-');
            }
            // Mid-word soft hyphens are dropped silently.
            i += 1;
            continue;
        }
        if c == '\0' || c == '\u{FFFD}' {
            i += 1;
            continue;
        }
        if c.is_control() && c != '\n' && c != '\r' && c != '\t' {
            i += 1;
            continue;
        }
        out.push(c);
        i += 1;
    }
    out
}

/// Runs the final normalization pass over a fully-assembled Markdown
/// document string (spec §4.9). Idempotent: running this twice on its own
/// output yields the same string (spec §8, invariant 6).
pub fn post_process(text: &str, config: &PipelineConfig) -> String {
    let mut out = normalize_text_encoding(text);
    out = strip_html_preserving_br(&out);
    out = restore_escapes(&out);
    out = out.nfc().collect::<String>();
    out = canonicalize_punctuation(&out);
    out = remove_duplicate_separator_rows(&out);
    out = drop_page_number_lines(&out, config);
    out = collapse_blank_lines(&out);
    out.trim_end_matches('\n').to_string() + "\n"
}

fn strip_html_preserving_br(text: &str) -> String {
    HTML_TAG_RE
        .replace_all(text, |caps: &regex::Captures| {
            let whole = caps.get(0).unwrap().as_str();
            if whole.eq_ignore_ascii_case("<br>") || whole.eq_ignore_ascii_case("<br/>") || whole.eq_ignore_ascii_case("<br />") {
                "<br>".to_string()
            } else {
                String::new()
            }
        })
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
}

/// Protects existing `\\` sequences before HTML/entity stripping could
/// otherwise mangle them, then hands the text back untouched: structural
/// escapes (`\|` in table cells, etc.) are emitted correctly upstream by
/// TableProcessor/MarkdownGenerator, so this pass only needs to guarantee a
/// literal backslash never gets swallowed by the surrounding cleanup steps.
fn restore_escapes(text: &str) -> String {
    let protected = text.replace('\\', "\u{0}\u{0}BSLASH\u{0}\u{0}");
    protected.replace("\u{0}\u{0}BSLASH\u{0}\u{0}", "\\")
}

fn canonicalize_punctuation(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2013}' => '-',
            '\u{2014}' => '-',
            '\u{00A0}' => ' ',
            other => other,
        })
        .collect()
}

fn remove_duplicate_separator_rows(text: &str) -> String {
    let mut out_lines: Vec<&str> = Vec::new();
    for line in text.lines() {
        let is_separator = DUPLICATE_SEPARATOR_RE.is_match(line) || line.trim() == "| --- |";
        if is_separator && out_lines.last().map(|l: &&str| DUPLICATE_SEPARATOR_RE.is_match(l)).unwrap_or(false) {
            continue;
        }
        out_lines.push(line);
    }
    out_lines.join("\n")
}

fn drop_page_number_lines(text: &str, config: &PipelineConfig) -> String {
    text.lines()
        .filter(|line| {
            let trimmed = line.trim();
            let digit_count = trimmed.chars().filter(|c| c.is_ascii_digit()).count();
            let looks_like_page_number = PAGE_NUMBER_LINE_RE.is_match(line) && digit_count <= config.page_number_max_digits;
            let looks_like_hash_digits = HASH_DIGITS_RE.is_match(line);
            !(looks_like_page_number || looks_like_hash_digits)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn collapse_blank_lines(text: &str) -> String {
    BLANK_RUN_RE.replace_all(text, "\n\n").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_cjk_char() {
        assert!(is_cjk_char('本'));
        assert!(is_cjk_char('。'));
        assert!(!is_cjk_char('a'));
    }

    #[test]
    fn test_needs_space_between_cjk_words_default_to_spaced() {
        assert!(needs_space_between('本', '文'));
    }

    #[test]
    fn test_needs_space_between_cjk_punctuation() {
        assert!(!needs_space_between('す', '。'));
    }

    #[test]
    fn test_needs_space_between_latin_pair() {
        assert!(needs_space_between('a', 'b'));
    }

    #[test]
    fn test_normalize_text_encoding_drops_nul() {
        assert_eq!(normalize_text_encoding("a\0b"), "ab");
    }

    #[test]
    fn test_normalize_text_encoding_soft_hyphen_mid_word() {
        assert_eq!(normalize_text_encoding("un\u{00AD}happy"), "unhappy");
    }

    #[test]
    fn test_post_process_no_nul_or_replacement_char() {
        let config = PipelineConfig::default();
        let out = post_process("a\0b\u{FFFD}c", &config);
        assert!(!out.contains('\0'));
        assert!(!out.contains('\u{FFFD}'));
    }

    #[test]
    fn test_post_process_drops_page_number_line() {
        let config = PipelineConfig::default();
        let out = post_process("Body text\n\n12\n", &config);
        assert!(!out.lines().any(|l| l.trim() == "12"));
    }

    #[test]
    fn test_post_process_collapses_blank_lines() {
        let config = PipelineConfig::default();
        let out = post_process("a\n\n\n\n\nb\n", &config);
        assert!(!out.contains("\n\n\n"));
    }

    #[test]
    fn test_post_process_idempotent() {
        let config = PipelineConfig::default();
        let once = post_process("# Title\n\nBody text.\n\n\n\nMore.\n", &config);
        let twice = post_process(&once, &config);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_post_process_preserves_br() {
        let config = PipelineConfig::default();
        let out = post_process("| A<br>B | C |\n", &config);
        assert!(out.contains("<br>"));
    }
}
