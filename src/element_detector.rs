//! ElementDetector (spec §4.4): a stateless predicate library consumed by
//! LineAnalyzer and PostProcessor. Every predicate is total over
//! `(&str, &[Word])`; empty or degenerate inputs return `false`.
//!
//! Grounded on `pdf/markdown/paragraphs.rs::is_list_prefix` (generalized to
//! the richer prefix set spec.md names) and `pdf/markdown/bridge.rs`'s
//! ratio-and-gap heading validation (`MIN_HEADING_FONT_RATIO`,
//! `MIN_HEADING_FONT_GAP`).

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::PipelineConfig;
use crate::types::{FontAnalysis, Word};

static NUMBERED_ITEM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{1,3}[.)]\s+").unwrap());
static PAREN_NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\(\d{1,3}\)").unwrap());
static ALPHA_ITEM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z][.)]\s+").unwrap());
static BOLD_DASH_MARKER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\*\*[‒–—\-*+•・]\*\*").unwrap());
static MONO_FONT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)mono|courier|consolas").unwrap());
static SENTENCE_END_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?。]\s*$").unwrap());
static EMPHASIS_MARKER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*?\*?[^*]+\*\*?\*?").unwrap());

const LIST_BULLET_PREFIXES: &[&str] = &["- ", "* ", "+ ", "・", "•", "◦", "‒", "–", "—"];

/// `isListItemLike` (spec §4.4).
pub fn is_list_item_like(text: &str, _words: &[Word]) -> bool {
    if text.is_empty() {
        return false;
    }
    LIST_BULLET_PREFIXES.iter().any(|p| text.starts_with(p))
        || NUMBERED_ITEM_RE.is_match(text)
        || PAREN_NUMBER_RE.is_match(text)
        || ALPHA_ITEM_RE.is_match(text)
        || BOLD_DASH_MARKER_RE.is_match(text)
}

/// `isTableRowLike` (spec §4.4).
pub fn is_table_row_like(text: &str, words: &[Word], config: &PipelineConfig) -> bool {
    if text.is_empty() || words.is_empty() {
        return false;
    }
    if text.contains('|') || text.contains('\t') {
        return true;
    }

    let numeric_count = words.iter().filter(|w| w.text.chars().any(|c| c.is_ascii_digit())).count();
    let numeric_fraction = numeric_count as f32 / words.len() as f32;

    let mut sorted: Vec<&Word> = words.iter().collect();
    sorted.sort_by(|a, b| a.bbox.left.partial_cmp(&b.bbox.left).unwrap());
    let gaps: Vec<f32> = sorted.windows(2).map(|pair| pair[1].bbox.left - pair[0].bbox.right).collect();

    let has_large_gap = gaps.iter().any(|&g| g > config.table_row_large_gap);

    let regular_spacing = if gaps.len() >= 2 {
        let mean = gaps.iter().sum::<f32>() / gaps.len() as f32;
        if mean <= 0.0 {
            false
        } else {
            let variance = gaps.iter().map(|g| (g - mean).powi(2)).sum::<f32>() / gaps.len() as f32;
            let cv = variance.sqrt() / mean;
            cv < config.table_row_gap_cv_max && mean > config.table_row_mean_gap_min
        }
    } else {
        false
    };

    let short_words: Vec<&Word> = words.iter().filter(|w| w.text.chars().count() <= config.table_row_short_word_max_len).collect();
    let has_enough_short_words = short_words.len() >= config.table_row_min_short_words && {
        let mean_len = short_words.iter().map(|w| w.text.chars().count() as f32).sum::<f32>() / short_words.len() as f32;
        mean_len <= config.table_row_short_word_mean_max
    };

    (numeric_fraction >= config.table_row_numeric_fraction && (regular_spacing || has_large_gap))
        || regular_spacing
        || has_large_gap
        || has_enough_short_words
}

/// `isHeaderStructure` (spec §4.4), folding in the teacher's ratio-and-gap
/// validation (supplement C.4) as the concrete tier-of-thresholds test.
pub fn is_header_structure(text: &str, words: &[Word], font_analysis: &FontAnalysis, config: &PipelineConfig) -> bool {
    if text.is_empty() || words.is_empty() {
        return false;
    }
    if text.starts_with('#') {
        return true;
    }
    if SENTENCE_END_RE.is_match(text) {
        return false;
    }
    if text.contains(',') {
        return false;
    }
    if is_list_item_like(text, words) {
        return false;
    }
    if EMPHASIS_MARKER_RE.is_match(text) {
        return false;
    }

    let mean_size = words.iter().map(|w| w.height()).sum::<f32>() / words.len() as f32;
    if font_analysis.base_font_size <= 0.0 {
        return false;
    }

    let ratio = mean_size / font_analysis.base_font_size;
    let gap = mean_size - font_analysis.base_font_size;
    let word_count = text.split_whitespace().count();

    (ratio >= config.min_heading_font_ratio || gap >= config.min_heading_font_gap) && word_count <= config.max_heading_word_count
}

/// `isCodeBlockLike` (spec §4.4).
pub fn is_code_block_like(text: &str, words: &[Word], config: &PipelineConfig) -> bool {
    if text.is_empty() {
        return false;
    }
    if text.starts_with("```") || (text.starts_with('`') && text.ends_with('`') && text.len() > 1) {
        return true;
    }

    let left_margin = words.iter().map(|w| w.bbox.left).fold(f32::INFINITY, f32::min);
    let deep_indent = left_margin.is_finite() && left_margin > config.code_indent_threshold;
    let has_code_punctuation = text.contains('{') || text.contains('}') || text.contains(';') || text.contains("==") || text.contains("=>");
    if deep_indent && has_code_punctuation {
        return true;
    }

    let monospace_majority = !words.is_empty()
        && words.iter().filter(|w| MONO_FONT_RE.is_match(&w.font_name)).count() * 2 > words.len();
    monospace_majority
}

/// `isQuoteBlockLike` (spec §4.4).
pub fn is_quote_block_like(text: &str, _words: &[Word]) -> bool {
    if text.is_empty() {
        return false;
    }
    if text.starts_with("> ") {
        return true;
    }
    is_fully_quoted(text)
}

const QUOTE_PAIRS: &[(char, char)] = &[
    ('"', '"'),
    ('\'', '\''),
    ('\u{201C}', '\u{201D}'),
    ('\u{2018}', '\u{2019}'),
    ('\u{300C}', '\u{300D}'),
    ('\u{300E}', '\u{300F}'),
];

fn is_fully_quoted(text: &str) -> bool {
    let trimmed = text.trim();
    let Some(first) = trimmed.chars().next() else { return false };
    let Some(last) = trimmed.chars().last() else { return false };
    QUOTE_PAIRS.iter().any(|&(open, close)| first == open && last == close && trimmed.chars().count() > 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BoundingBox;

    fn word(text: &str, left: f32, right: f32, height: f32, font: &str) -> Word {
        Word {
            text: text.to_string(),
            bbox: BoundingBox { left, right, bottom: 0.0, top: height },
            font_name: font.to_string(),
        }
    }

    #[test]
    fn test_is_list_item_like_bullet() {
        assert!(is_list_item_like("- item", &[]));
        assert!(is_list_item_like("1. first", &[]));
        assert!(is_list_item_like("(1) note", &[]));
    }

    #[test]
    fn test_is_list_item_like_plain_text_false() {
        assert!(!is_list_item_like("Just a sentence.", &[]));
    }

    #[test]
    fn test_is_header_structure_large_font() {
        let config = PipelineConfig::default();
        let font_analysis = FontAnalysis { base_font_size: 11.0, large_font_threshold: 14.0, all_font_sizes_ascending: vec![11.0, 18.0] };
        let words = vec![word("Title", 0.0, 40.0, 18.0, "Arial-Bold")];
        assert!(is_header_structure("Title", &words, &font_analysis, &config));
    }

    #[test]
    fn test_is_header_structure_rejects_sentence_punctuation() {
        let config = PipelineConfig::default();
        let font_analysis = FontAnalysis { base_font_size: 11.0, large_font_threshold: 14.0, all_font_sizes_ascending: vec![11.0, 18.0] };
        let words = vec![word("Done.", 0.0, 40.0, 18.0, "Arial-Bold")];
        assert!(!is_header_structure("Done.", &words, &font_analysis, &config));
    }

    #[test]
    fn test_is_table_row_like_regular_spacing() {
        let config = PipelineConfig::default();
        let words = vec![
            word("A", 50.0, 60.0, 11.0, "Arial"),
            word("B", 150.0, 160.0, 11.0, "Arial"),
            word("C", 250.0, 260.0, 11.0, "Arial"),
        ];
        assert!(is_table_row_like("A B C", &words, &config));
    }

    #[test]
    fn test_is_code_block_like_monospace() {
        let config = PipelineConfig::default();
        let words = vec![word("fn", 0.0, 20.0, 11.0, "Courier-New"), word("main", 21.0, 50.0, 11.0, "Courier-New")];
        assert!(is_code_block_like("fn main", &words, &config));
    }

    #[test]
    fn test_is_quote_block_like_prefix() {
        assert!(is_quote_block_like("> quoted text", &[]));
    }

    #[test]
    fn test_is_quote_block_like_enclosed_quotes() {
        assert!(is_quote_block_like("\u{201C}a whole quote\u{201D}", &[]));
    }

    #[test]
    fn test_predicates_total_on_empty_input() {
        let config = PipelineConfig::default();
        let font_analysis = FontAnalysis { base_font_size: 11.0, large_font_threshold: 14.0, all_font_sizes_ascending: vec![] };
        assert!(!is_list_item_like("", &[]));
        assert!(!is_table_row_like("", &[], &config));
        assert!(!is_header_structure("", &[], &font_analysis, &config));
        assert!(!is_code_block_like("", &[], &config));
        assert!(!is_quote_block_like("", &[]));
    }
}
