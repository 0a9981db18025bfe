//! WordGrouper (spec §4.1): clusters positioned words into lines, then
//! merges adjacent words within a line into formatting-coherent runs.
//!
//! Grounded on `pdf/markdown/lines.rs::segments_to_lines` (baseline-overlap
//! grouping, sort-by-descending-y-then-ascending-x) and
//! `pdf/markdown/markdown.rs::chars_to_words`'s gap-based merge heuristic,
//! generalized to the richer mergeability test spec.md names.

use std::rc::Rc;

use crate::config::PipelineConfig;
use crate::types::{FontFormatting, Line, Word, WordGroup};

/// Groups words (already produced by the external PDF parser) into lines.
///
/// Input is assumed sorted by descending `bottom`, ascending `left`, per
/// spec §4.1; this function does not re-sort the input, only the output.
pub fn group_into_lines(words: &[Rc<Word>], config: &PipelineConfig) -> Vec<Line> {
    let mut lines: Vec<Line> = Vec::new();

    for word in words {
        let word_height = word.height().max(0.01);
        let mut best: Option<(usize, f32)> = None;

        for (idx, line) in lines.iter().enumerate() {
            let line_height = line.mean_height().max(0.01);
            let overlap = vertical_overlap(word, line.mean_bottom, line_height);
            let within_overlap = overlap > config.line_overlap_fraction * word_height;

            let dynamic_threshold =
                config.line_y_threshold.max(line_height.min(word_height) * config.line_dynamic_fraction);
            let distance = (word.bbox.bottom - line.mean_bottom).abs();
            let within_dynamic = distance <= dynamic_threshold;

            if within_overlap || within_dynamic {
                match best {
                    Some((_, best_distance)) if best_distance <= distance => {}
                    _ => best = Some((idx, distance)),
                }
            }
        }

        match best {
            Some((idx, _)) => {
                let line = &mut lines[idx];
                line.words.push(Rc::clone(word));
                let n = line.words.len() as f32;
                line.mean_bottom = ((line.mean_bottom * (n - 1.0)) + word.bbox.bottom) / n;
            }
            None => lines.push(Line {
                words: vec![Rc::clone(word)],
                mean_bottom: word.bbox.bottom,
            }),
        }
    }

    for line in &mut lines {
        line.words.sort_by(|a, b| a.bbox.left.partial_cmp(&b.bbox.left).unwrap());
    }
    lines.sort_by(|a, b| b.mean_bottom.partial_cmp(&a.mean_bottom).unwrap());

    tracing::debug!(word_count = words.len(), line_count = lines.len(), "word_grouper: grouped into lines");

    lines
}

fn vertical_overlap(word: &Word, line_bottom: f32, line_height: f32) -> f32 {
    let word_top = word.bbox.top;
    let word_bottom = word.bbox.bottom;
    let line_top = line_bottom + line_height;
    let overlap = word_top.min(line_top) - word_bottom.max(line_bottom);
    overlap.max(0.0)
}

/// Merges adjacent words within a single line into formatting-coherent runs
/// (spec §4.1). `x_threshold` is an additional caller-supplied absolute
/// floor on top of the height-relative gap test.
pub fn merge_words_in_line(line: &Line, x_threshold: f32, formatting_of: impl Fn(&Word) -> FontFormatting, config: &PipelineConfig) -> Vec<WordGroup> {
    let mut groups: Vec<WordGroup> = Vec::new();

    for word in &line.words {
        let fmt = formatting_of(word);
        if let Some(last) = groups.last_mut() {
            if is_mergeable(last, word, &fmt, x_threshold, config) {
                last.words.push(Rc::clone(word));
                continue;
            }
        }
        groups.push(WordGroup { words: vec![Rc::clone(word)], formatting: fmt });
    }

    groups
}

fn is_mergeable(group: &WordGroup, word: &Rc<Word>, fmt: &FontFormatting, x_threshold: f32, config: &PipelineConfig) -> bool {
    let Some(prev) = group.words.last() else { return false };
    if group.formatting != *fmt {
        return false;
    }

    let gap = word.bbox.left - prev.bbox.right;
    if gap < 0.0 {
        return true;
    }

    let min_height = prev.height().min(word.height()).max(0.01);
    let max_height = prev.height().max(word.height()).max(0.01);
    let height_ratio_diff = (prev.height() - word.height()).abs() / max_height;
    if height_ratio_diff > config.merge_height_tolerance {
        return false;
    }

    let same_family = font_family_prefix(&prev.font_name, config.merge_font_prefix_len)
        == font_family_prefix(&word.font_name, config.merge_font_prefix_len);
    if !same_family {
        return false;
    }

    let baseline_drift = (prev.bbox.bottom - word.bbox.bottom).abs() / max_height;
    if baseline_drift > config.merge_baseline_drift_fraction {
        return false;
    }

    let mean_width = (prev.bbox.width() + word.bbox.width()) / 2.0;
    if mean_width > 0.0 && gap > mean_width * config.merge_gap_width_fraction {
        return false;
    }

    let gap_limit = (min_height * config.merge_gap_height_fraction).max(x_threshold);
    gap <= gap_limit
}

fn font_family_prefix(name: &str, len: usize) -> String {
    let stripped = strip_subset_tag(name);
    stripped.chars().take(len).collect::<String>().to_ascii_lowercase()
}

/// Strips a leading PostScript subset tag of the form `ABCDEF+` (spec §3, §4.2).
pub fn strip_subset_tag(name: &str) -> &str {
    let bytes = name.as_bytes();
    if bytes.len() > 7
        && bytes[..6].iter().all(|b| b.is_ascii_uppercase())
        && bytes[6] == b'+'
    {
        &name[7..]
    } else {
        name
    }
}
