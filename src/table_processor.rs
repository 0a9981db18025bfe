//! TableProcessor (spec §4.7): converts a contiguous run of TableRow
//! elements into a Markdown pipe-table.
//!
//! No teacher file emits pipe tables directly (the teacher's OCR table path
//! defers rendering to an external `html_to_markdown_rs::hocr` helper not
//! available to this crate); the emission logic here is authored fresh,
//! grounded on the validation/cleanup heuristics in
//! `ocr/table/mod.rs::post_process_table` (header-row merging, column
//! pruning, density checks) and on `types/tables.rs::Table`'s
//! `"| A | B |\n|---|---|\n| C | D |"` emission convention.

use crate::config::PipelineConfig;
use crate::types::DocumentElement;

/// One reconstructed table cell.
#[derive(Debug, Clone, Default)]
pub struct Cell {
    pub text: String,
}

/// Splits a run of TableRow elements into cells, merges continuation rows,
/// normalizes column counts, and emits a Markdown pipe-table (spec §4.7).
pub fn process_table_run(elements: &[DocumentElement], config: &PipelineConfig) -> String {
    let boundaries = column_boundaries(elements, config);
    let mut rows: Vec<Vec<Cell>> = elements.iter().map(|e| split_cells(e, &boundaries, config)).collect();

    rows = merge_continuation_rows(rows, config);
    rows = normalize_columns(rows, config);

    if let Some(header_line) = extract_inline_header(&rows, config) {
        return header_line;
    }

    emit_markdown_table(&rows)
}

/// Derives table-wide column x-boundaries from the row with the most words
/// in the run (usually the header), so a sparse continuation row with a
/// single word still lands in the right column by absolute x-position
/// rather than by its own (uninformative) internal gaps (spec §8 "Multi-line
/// cell").
fn column_boundaries(elements: &[DocumentElement], config: &PipelineConfig) -> Vec<f32> {
    let Some(reference) = elements.iter().filter(|e| e.words.len() >= 2).max_by_key(|e| e.words.len()) else {
        return Vec::new();
    };

    let mut words: Vec<&std::rc::Rc<crate::types::Word>> = reference.words.iter().collect();
    words.sort_by(|a, b| a.bbox.left.partial_cmp(&b.bbox.left).unwrap());

    let font_height = reference.font_size.max(1.0);
    let gaps: Vec<f32> = words.windows(2).map(|p| p[1].bbox.left - p[0].bbox.right).collect();
    let threshold = select_split_threshold(&gaps, font_height, config);

    words
        .windows(2)
        .zip(gaps.iter())
        .filter(|(_, &gap)| gap > threshold)
        .map(|(pair, _)| (pair[0].bbox.right + pair[1].bbox.left) / 2.0)
        .collect()
}

/// Splits one row's words into cells. When table-wide `boundaries` are
/// available, words are bucketed by absolute x-position against them; this
/// is what lets a one-word continuation row land in its real column instead
/// of collapsing to a single cell. Falls back to local gap-based splitting
/// only when no boundaries could be derived for the run.
fn split_cells(element: &DocumentElement, boundaries: &[f32], config: &PipelineConfig) -> Vec<Cell> {
    if element.content.contains('|') {
        return element
            .content
            .trim_matches('|')
            .split('|')
            .map(|s| Cell { text: s.trim().to_string() })
            .collect();
    }

    let mut words: Vec<&std::rc::Rc<crate::types::Word>> = element.words.iter().collect();
    words.sort_by(|a, b| a.bbox.left.partial_cmp(&b.bbox.left).unwrap());
    if words.is_empty() {
        return vec![Cell::default()];
    }

    if !boundaries.is_empty() {
        let mut cells: Vec<Cell> = vec![Cell::default(); boundaries.len() + 1];
        for word in &words {
            let col = boundaries.iter().filter(|&&b| word.bbox.left >= b).count();
            let cell = &mut cells[col];
            if !cell.text.is_empty() {
                cell.text.push(' ');
            }
            cell.text.push_str(&word.text);
        }
        return cells;
    }

    let font_height = element.font_size.max(1.0);
    let gaps: Vec<f32> = words.windows(2).map(|p| p[1].bbox.left - p[0].bbox.right).collect();
    let threshold = select_split_threshold(&gaps, font_height, config);

    let mut cells: Vec<Cell> = Vec::new();
    let mut current = String::new();
    for (idx, word) in words.iter().enumerate() {
        if idx > 0 {
            let gap = gaps[idx - 1];
            if gap > threshold {
                cells.push(Cell { text: current.trim().to_string() });
                current = String::new();
            } else if gap > font_height * config.cell_word_space_fraction {
                current.push(' ');
            }
        }
        current.push_str(&word.text);
    }
    cells.push(Cell { text: current.trim().to_string() });
    cells
}

fn select_split_threshold(gaps: &[f32], font_height: f32, config: &PipelineConfig) -> f32 {
    let min_clamp = font_height * config.cell_split_min_multiplier;
    let max_clamp = font_height * config.cell_split_max_multiplier;

    if gaps.is_empty() {
        return min_clamp;
    }

    let mean = gaps.iter().sum::<f32>() / gaps.len() as f32;
    let large_gap_cutoff = mean * config.cell_split_large_gap_mean_multiplier;
    let smallest_large = gaps.iter().copied().filter(|&g| g > large_gap_cutoff).fold(f32::INFINITY, f32::min);

    let candidate = if smallest_large.is_finite() {
        smallest_large * config.cell_split_large_gap_scale
    } else {
        let mut sorted = gaps.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let q1 = sorted[sorted.len() / 4];
        let q3_idx = ((sorted.len() * 3) / 4).min(sorted.len() - 1);
        let q3 = sorted[q3_idx];
        let iqr = q3 - q1;
        if iqr > 0.1 {
            q1 + iqr * config.cell_split_iqr_multiplier
        } else {
            let median = sorted[sorted.len() / 2];
            median * config.cell_split_median_multiplier
        }
    };

    candidate.clamp(min_clamp, max_clamp)
}

fn merge_continuation_rows(rows: Vec<Vec<Cell>>, _config: &PipelineConfig) -> Vec<Vec<Cell>> {
    let mut merged: Vec<Vec<Cell>> = Vec::new();

    for row in rows {
        let should_merge = merged.last().is_some_and(|prev: &Vec<Cell>| {
            let col_diff = (prev.len() as i64 - row.len() as i64).abs();
            let col_counts_compatible = col_diff <= 1;

            let filled = row.iter().filter(|c| !c.text.is_empty()).count();
            let sparse = filled > 0 && filled < row.len();

            let avg_len = |r: &[Cell]| -> f32 {
                if r.is_empty() {
                    0.0
                } else {
                    r.iter().map(|c| c.text.chars().count() as f32).sum::<f32>() / r.len() as f32
                }
            };
            let shorter_than_half = avg_len(&row) < avg_len(prev) / 2.0;

            col_counts_compatible && (sparse || shorter_than_half)
        });

        if should_merge {
            let prev = merged.last_mut().unwrap();
            for (idx, cell) in row.into_iter().enumerate() {
                if cell.text.is_empty() {
                    continue;
                }
                if let Some(target) = prev.get_mut(idx) {
                    if target.text.is_empty() {
                        target.text = cell.text;
                    } else {
                        target.text.push_str("<br>");
                        target.text.push_str(&cell.text);
                    }
                } else {
                    prev.push(cell);
                }
            }
        } else {
            merged.push(row);
        }
    }

    merged
}

fn normalize_columns(rows: Vec<Vec<Cell>>, config: &PipelineConfig) -> Vec<Vec<Cell>> {
    if rows.is_empty() {
        return rows;
    }

    let target = target_column_count(&rows, config);

    rows.into_iter()
        .map(|mut row| {
            while row.len() < target {
                row.push(Cell::default());
            }
            row.truncate(target.max(1));
            row
        })
        .collect()
}

fn target_column_count(rows: &[Vec<Cell>], config: &PipelineConfig) -> usize {
    let mut counts: Vec<(usize, usize)> = Vec::new();
    for row in rows {
        let len = row.len();
        if let Some(entry) = counts.iter_mut().find(|(c, _)| *c == len) {
            entry.1 += 1;
        } else {
            counts.push((len, 1));
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1).then(b.0.cmp(&a.0)));

    // Ambiguous (top-two modes within the tie tolerance): take the larger
    // and apply the minimum-column-count floor. Unambiguous: trust the
    // observed mode as-is, so a genuine 2-column table stays 2 columns.
    if counts.len() >= 2 && counts[0].1.abs_diff(counts[1].1) <= config.column_mode_tie_tolerance {
        counts[0].0.max(counts[1].0).max(config.min_column_count)
    } else {
        counts.first().map(|(c, _)| *c).unwrap_or(config.min_column_count)
    }
}

/// Inline bold-row-as-header detection (spec §4.7): if every cell is
/// bold-wrapped, short, and the row looks like a standalone label, emit a
/// `## header` line instead of a table row.
fn extract_inline_header(rows: &[Vec<Cell>], config: &PipelineConfig) -> Option<String> {
    let row = rows.first()?;
    if rows.len() != 1 || row.is_empty() {
        return None;
    }

    let empty_count = row.iter().filter(|c| c.text.is_empty()).count();
    let empty_ratio = empty_count as f32 / row.len() as f32;

    let bold_count = row.iter().filter(|c| c.text.starts_with("**") && c.text.ends_with("**")).count();
    let non_empty = row.len() - empty_count;
    let bold_ratio = if non_empty == 0 { 0.0 } else { bold_count as f32 / non_empty as f32 };

    if empty_ratio >= config.inline_header_empty_ratio_min && bold_ratio >= config.inline_header_bold_ratio_min {
        let label = row
            .iter()
            .filter(|c| !c.text.is_empty())
            .map(|c| c.text.trim_matches('*').to_string())
            .collect::<Vec<_>>()
            .join(" ");
        return Some(format!("## {label}\n"));
    }
    None
}

fn emit_markdown_table(rows: &[Vec<Cell>]) -> String {
    if rows.is_empty() {
        return String::new();
    }

    let col_count = rows[0].len().max(1);
    let mut out = String::new();

    out.push_str(&emit_row(&rows[0]));
    out.push('\n');
    out.push('|');
    for _ in 0..col_count {
        out.push_str(" --- |");
    }
    out.push('\n');

    for row in rows.iter().skip(1) {
        out.push_str(&emit_row(row));
        out.push('\n');
    }

    out
}

fn emit_row(row: &[Cell]) -> String {
    let mut out = String::from("|");
    for cell in row {
        out.push(' ');
        out.push_str(&escape_cell(&cell.text));
        out.push_str(" |");
    }
    out
}

/// Escapes `|` as `\|` (spec §4.7, §8 pipe-escape law) and rewrites
/// internal newlines as `<br>`.
fn escape_cell(text: &str) -> String {
    text.replace('\\', "\\\\").replace('|', "\\|").replace('\n', "<br>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BoundingBox, ElementType, Word};
    use std::rc::Rc;

    fn table_row_element(words: Vec<(&str, f32, f32)>) -> DocumentElement {
        let words: Vec<Rc<Word>> = words
            .into_iter()
            .map(|(text, left, right)| {
                Rc::new(Word {
                    text: text.to_string(),
                    bbox: BoundingBox { left, right, bottom: 0.0, top: 11.0 },
                    font_name: "Arial".to_string(),
                })
            })
            .collect();
        DocumentElement {
            element_type: ElementType::TableRow,
            content: words.iter().map(|w| w.text.clone()).collect::<Vec<_>>().join(" "),
            font_size: 11.0,
            left_margin: 0.0,
            is_indented: false,
            words,
            heading_level: None,
        }
    }

    #[test]
    fn test_pipe_escape_law() {
        assert_eq!(escape_cell("a|b"), "a\\|b");
    }

    #[test]
    fn test_emit_markdown_table_plain_3x3() {
        let rows = vec![
            table_row_element(vec![("A", 50.0, 60.0), ("B", 150.0, 160.0), ("C", 250.0, 260.0)]),
            table_row_element(vec![("1", 50.0, 60.0), ("2", 150.0, 160.0), ("3", 250.0, 260.0)]),
            table_row_element(vec![("4", 50.0, 60.0), ("5", 150.0, 160.0), ("6", 250.0, 260.0)]),
        ];
        let config = PipelineConfig::default();
        let out = process_table_run(&rows, &config);
        assert!(out.starts_with("| A | B | C |\n"));
        assert!(out.contains("| --- | --- | --- |\n"));
        assert!(out.contains("| 1 | 2 | 3 |\n"));
        assert!(out.contains("| 4 | 5 | 6 |\n"));
    }

    #[test]
    fn test_multiline_cell_continuation_merge() {
        let rows = vec![
            table_row_element(vec![("Name", 50.0, 90.0), ("Note", 150.0, 190.0)]),
            table_row_element(vec![("Alice", 50.0, 90.0), ("first", 150.0, 190.0)]),
            table_row_element(vec![("line", 150.0, 190.0)]),
        ];
        let config = PipelineConfig::default();
        let out = process_table_run(&rows, &config);
        assert!(out.contains("| Alice | first<br>line |"), "got: {out}");
        assert!(!out.contains("| line |"), "continuation row must merge into Alice's row, got: {out}");
    }

    #[test]
    fn test_normalize_columns_pads_short_rows() {
        let config = PipelineConfig::default();
        let rows = vec![
            vec![Cell { text: "A".into() }, Cell { text: "B".into() }, Cell { text: "C".into() }],
            vec![Cell { text: "1".into() }],
        ];
        let normalized = normalize_columns(rows, &config);
        assert_eq!(normalized[1].len(), 3);
    }
}
