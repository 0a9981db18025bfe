//! FontAnalyzer (spec §4.2, §3): per-document font-size distribution and
//! per-word bold/italic classification from font-name heuristics.
//!
//! Grounded on `pdf/hierarchy/clustering.rs::cluster_font_sizes` for the
//! distribution/mode mechanics (generalized here to the IQR-mode rule spec.md
//! names instead of k-means) and `pdf/markdown/lines.rs::most_frequent_font_size`
//! for tie-breaking-toward-smaller mode selection.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::PipelineConfig;
use crate::types::{FontAnalysis, FontFormatting, Word};
use crate::word_grouper::strip_subset_tag;

static BOLD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)bold|black|heavy|semibold|demibold|extrabold|ultrabold|medium|thick|w[5-9]").unwrap()
});
static ITALIC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)italic|oblique|slanted|cursive|kursiv|-italic|_italic|-oblique|italicmt").unwrap()
});
static NUMERIC_WEIGHT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(?:^|[^0-9])([1-9][0-9]{2})(?:$|[^0-9])").unwrap());

/// Computes the per-document font-size distribution (spec §3).
///
/// `baseFontSize` is the mode within the IQR of observed heights, ties
/// broken toward the smaller size. `largeFontThreshold` is the smallest
/// distinct size strictly greater than base, promoted to the next size up
/// if the ratio falls below `large_font_min_ratio`, else falling back to
/// `base * large_font_fallback_multiplier`.
pub fn analyze_distribution(words: &[Word], config: &PipelineConfig) -> FontAnalysis {
    let mut heights: Vec<f32> = words.iter().map(|w| w.height()).filter(|h| h.is_finite() && *h > 0.0).collect();

    if heights.is_empty() {
        return FontAnalysis {
            base_font_size: 0.0,
            large_font_threshold: 0.0,
            all_font_sizes_ascending: Vec::new(),
        };
    }

    heights.sort_by(|a, b| a.partial_cmp(b).unwrap());

    let mut distinct: Vec<f32> = Vec::new();
    for h in &heights {
        if distinct.last().map(|last: &f32| (last - h).abs() > 0.05).unwrap_or(true) {
            distinct.push(*h);
        }
    }

    let q1_idx = heights.len() / 4;
    let q3_idx = (heights.len() * 3) / 4;
    let q1 = heights[q1_idx];
    let q3 = heights[q3_idx.min(heights.len() - 1)];

    let in_iqr: Vec<f32> = heights.iter().copied().filter(|h| *h >= q1 && *h <= q3).collect();
    let pool = if in_iqr.is_empty() { &heights } else { &in_iqr };

    let base_font_size = mode_smallest_tiebreak(pool);

    let mut larger = distinct.iter().copied().filter(|&s| s > base_font_size);
    let smallest_larger = larger.next();

    let large_font_threshold = match smallest_larger {
        Some(candidate) if candidate / base_font_size >= config.large_font_min_ratio => candidate,
        Some(_) => distinct
            .iter()
            .copied()
            .filter(|&s| s > base_font_size)
            .nth(1)
            .unwrap_or(base_font_size * config.large_font_fallback_multiplier),
        None => base_font_size * config.large_font_fallback_multiplier,
    };

    tracing::debug!(base_font_size, large_font_threshold, distinct_sizes = distinct.len(), "font_analyzer: computed distribution");

    FontAnalysis {
        base_font_size,
        large_font_threshold,
        all_font_sizes_ascending: distinct,
    }
}

fn mode_smallest_tiebreak(values: &[f32]) -> f32 {
    // Quantize to 0.5pt buckets, matching the teacher's
    // `most_frequent_font_size` rounding convention.
    let mut buckets: Vec<(f32, usize)> = Vec::new();
    for &v in values {
        let key = (v * 2.0).round() / 2.0;
        if let Some(entry) = buckets.iter_mut().find(|(k, _)| (*k - key).abs() < f32::EPSILON) {
            entry.1 += 1;
        } else {
            buckets.push((key, 1));
        }
    }
    buckets.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.partial_cmp(&b.0).unwrap()));
    buckets.first().map(|(k, _)| *k).unwrap_or(0.0)
}

/// Derives `{bold, italic}` for a single word from its font name (spec §3, §4.2).
pub fn analyze_formatting(word: &Word, config: &PipelineConfig) -> FontFormatting {
    let cleaned = strip_subset_tag(&word.font_name);

    let bold = BOLD_RE.is_match(&word.font_name)
        || BOLD_RE.is_match(cleaned)
        || has_numeric_weight_at_least(&word.font_name, config.bold_weight_threshold);
    let italic = ITALIC_RE.is_match(&word.font_name) || ITALIC_RE.is_match(cleaned);

    FontFormatting { bold, italic }
}

fn has_numeric_weight_at_least(name: &str, threshold: u32) -> bool {
    NUMERIC_WEIGHT_RE
        .captures(name)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .map(|w| w >= threshold)
        .unwrap_or(false)
}

/// Wraps `text` in Markdown emphasis markers per `fmt` (spec §4.2), after
/// stripping NUL and replacement characters.
pub fn apply_formatting(text: &str, fmt: FontFormatting) -> String {
    let cleaned: String = text.chars().filter(|&c| c != '\0' && c != '\u{FFFD}').collect();
    match (fmt.bold, fmt.italic) {
        (true, true) => format!("***{cleaned}***"),
        (true, false) => format!("**{cleaned}**"),
        (false, true) => format!("*{cleaned}*"),
        (false, false) => cleaned,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BoundingBox;

    fn word(text: &str, height: f32, font: &str) -> Word {
        Word {
            text: text.to_string(),
            bbox: BoundingBox { left: 0.0, right: 10.0, bottom: 0.0, top: height },
            font_name: font.to_string(),
        }
    }

    #[test]
    fn test_analyze_distribution_mode_is_base() {
        let config = PipelineConfig::default();
        let words = vec![
            word("a", 11.0, "Arial"),
            word("b", 11.0, "Arial"),
            word("c", 11.0, "Arial"),
            word("d", 18.0, "Arial"),
        ];
        let analysis = analyze_distribution(&words, &config);
        assert_eq!(analysis.base_font_size, 11.0);
    }

    #[test]
    fn test_analyze_formatting_bold_from_name() {
        let config = PipelineConfig::default();
        let w = word("important", 11.0, "Arial-Bold");
        let fmt = analyze_formatting(&w, &config);
        assert!(fmt.bold);
        assert!(!fmt.italic);
    }

    #[test]
    fn test_analyze_formatting_strips_subset_tag() {
        let config = PipelineConfig::default();
        let w = word("text", 11.0, "ABCDEF+Arial-BoldItalic");
        let fmt = analyze_formatting(&w, &config);
        assert!(fmt.bold);
        assert!(fmt.italic);
    }

    #[test]
    fn test_analyze_formatting_numeric_weight() {
        let config = PipelineConfig::default();
        let w = word("text", 11.0, "CustomFont-700");
        let fmt = analyze_formatting(&w, &config);
        assert!(fmt.bold);
    }

    #[test]
    fn test_apply_formatting_both() {
        let fmt = FontFormatting { bold: true, italic: true };
        assert_eq!(apply_formatting("hi", fmt), "***hi***");
    }

    #[test]
    fn test_apply_formatting_strips_control_chars() {
        let fmt = FontFormatting::default();
        assert_eq!(apply_formatting("a\0b\u{FFFD}c", fmt), "abc");
    }
}
