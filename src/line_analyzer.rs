//! LineAnalyzer (spec §4.3): produces one provisional `DocumentElement` per
//! line, including the classification precedence chain.
//!
//! Grounded on `pdf/markdown/classify.rs`'s pass ordering idea (try the
//! strongest signal first, fall through to weaker ones) and
//! `pdf/markdown/render.rs::render_segment_refs_with_markup`'s run-length
//! formatting-boundary assembly, generalized from inline-markup rendering to
//! classification-time content assembly.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::PipelineConfig;
use crate::element_detector;
use crate::font_analyzer::apply_formatting;
use crate::text_post_processor::needs_space_between;
use crate::types::{DocumentElement, ElementType, FontAnalysis, Line, Word, WordGroup};
use crate::word_grouper::merge_words_in_line;

static HORIZONTAL_LINE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(---+|\*\*\*+|___+|[-*_]{3,})$").unwrap());
static SHEBANG_OR_COMMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(#!|//|/\*|\*\s|--\s)").unwrap());

/// Produces one `DocumentElement` from a grouped line.
pub fn analyze(line: &Line, font_analysis: &FontAnalysis, x_tolerance: f32, config: &PipelineConfig) -> DocumentElement {
    if line.words.is_empty() {
        return DocumentElement::empty();
    }

    let formatting_of = |w: &Word| crate::font_analyzer::analyze_formatting(w, config);
    let groups = merge_words_in_line(line, x_tolerance, formatting_of, config);
    let content = assemble_content(&groups);

    let font_size = line.mean_height();
    let left_margin = line.left_margin();
    let is_indented = left_margin > config.indent_threshold;
    let words: Vec<_> = line.words.clone();

    let element_type = classify(&content, &line.words, font_analysis, config);

    let heading_level = if element_type == ElementType::Header {
        Some(heading_level_for_size(font_size, font_analysis))
    } else {
        None
    };

    tracing::trace!(content = %content, element_type = ?element_type, font_size, left_margin, "line_analyzer: classified line");

    DocumentElement {
        element_type,
        content,
        font_size,
        left_margin,
        is_indented,
        words,
        heading_level,
    }
}

fn assemble_content(groups: &[WordGroup]) -> String {
    let mut out = String::new();
    for (idx, group) in groups.iter().enumerate() {
        if idx > 0 {
            let prev_char = out.chars().last();
            let next_char = group.text().chars().next();
            if let (Some(p), Some(n)) = (prev_char, next_char) {
                if needs_space_between(p, n) {
                    out.push(' ');
                }
            }
        }
        out.push_str(&apply_formatting(&group.text(), group.formatting));
    }
    out
}

fn classify(content: &str, words: &[std::rc::Rc<Word>], font_analysis: &FontAnalysis, config: &PipelineConfig) -> ElementType {
    let owned_words: Vec<Word> = words.iter().map(|w| (**w).clone()).collect();
    let trimmed = content.trim();

    // 1. Already-Markdown prefixes.
    if trimmed.starts_with('#') {
        return ElementType::Header;
    }
    if trimmed.starts_with("> ") {
        return ElementType::QuoteBlock;
    }
    if trimmed.starts_with("```") {
        return ElementType::CodeBlock;
    }

    // 2. Comment / shebang-like lines.
    if SHEBANG_OR_COMMENT_RE.is_match(trimmed) {
        return ElementType::CodeBlock;
    }

    // 3. Whitespace-only / single printable character.
    if trimmed.is_empty() {
        return ElementType::Empty;
    }
    if trimmed.chars().count() == 1 {
        return ElementType::Paragraph;
    }

    // 4. Horizontal line pattern.
    if HORIZONTAL_LINE_RE.is_match(trimmed) {
        return ElementType::HorizontalLine;
    }

    // 5. Header structure.
    if element_detector::is_header_structure(trimmed, &owned_words, font_analysis, config) {
        return ElementType::Header;
    }

    // 6. CodeBlock, QuoteBlock, ListItem, TableRow, in that order.
    if element_detector::is_code_block_like(trimmed, &owned_words, config) {
        return ElementType::CodeBlock;
    }
    if element_detector::is_quote_block_like(trimmed, &owned_words) {
        return ElementType::QuoteBlock;
    }
    if element_detector::is_list_item_like(trimmed, &owned_words) {
        return ElementType::ListItem;
    }
    if element_detector::is_table_row_like(trimmed, &owned_words, config) {
        return ElementType::TableRow;
    }

    // 7. Table-content heuristic already folded into is_table_row_like above.

    // 8. Secondary font-size heuristic for Header.
    let mean_size = owned_words.iter().map(|w| w.height()).sum::<f32>() / owned_words.len().max(1) as f32;
    if font_analysis.base_font_size > 0.0
        && mean_size / font_analysis.base_font_size >= 1.5
        && !looks_like_plain_paragraph(trimmed)
    {
        return ElementType::Header;
    }

    // 9. Default.
    ElementType::Paragraph
}

fn looks_like_plain_paragraph(text: &str) -> bool {
    text.split_whitespace().count() > 12 || text.ends_with('.') || text.ends_with('。')
}

fn heading_level_for_size(size: f32, font_analysis: &FontAnalysis) -> u8 {
    let rank = font_analysis.size_rank(size);
    let total = font_analysis.all_font_sizes_ascending.len().max(1);
    // Larger rank (bigger font) => smaller (more important) heading number.
    let levels_above_base = total.saturating_sub(rank).min(6).max(1);
    levels_above_base as u8
}
