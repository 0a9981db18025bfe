//! MarkdownGenerator (spec §4.8): walks the refined element sequence,
//! dispatches per type, consolidates paragraphs, and inserts structural
//! whitespace via a small blank-line state machine.
//!
//! Grounded on `pdf/markdown/markdown.rs::assemble_markdown_with_tables`'s
//! `PageItem`-sorted interleaving idea (generalized here to a single
//! already-ordered element sequence) and
//! `pdf/markdown/render.rs::render_paragraph_to_output`'s per-type dispatch.

use crate::config::PipelineConfig;
use crate::table_processor;
use crate::text_post_processor::needs_space_between;
use crate::types::{DocumentElement, ElementType};

/// Emits the page's Markdown body (pre-TextPostProcessor) from a refined
/// element sequence.
pub fn generate(elements: &[DocumentElement], config: &PipelineConfig) -> String {
    let mut out = String::new();
    let mut idx = 0;
    let mut prev_type: Option<ElementType> = None;

    while idx < elements.len() {
        let element = &elements[idx];

        match element.element_type {
            ElementType::Empty => {
                idx += 1;
                continue;
            }
            ElementType::TableRow => {
                let run_end = table_run_end(elements, idx);
                insert_blank_line_before(&mut out, prev_type, ElementType::TableRow, idx == 0);
                let table_md = table_processor::process_table_run(&elements[idx..run_end], config);
                out.push_str(&table_md);
                idx = run_end;
                prev_type = Some(ElementType::TableRow);
                continue;
            }
            ElementType::Paragraph => {
                let run_end = paragraph_run_end(elements, idx, config);
                insert_blank_line_before(&mut out, prev_type, ElementType::Paragraph, idx == 0);
                let consolidated = consolidate_paragraphs(&elements[idx..run_end], config);
                out.push_str(&consolidated);
                out.push('\n');
                idx = run_end;
                prev_type = Some(ElementType::Paragraph);
                continue;
            }
            ElementType::Header => {
                insert_blank_line_before(&mut out, prev_type, ElementType::Header, idx == 0);
                out.push_str(&render_header(element));
                out.push('\n');
                idx += 1;
                prev_type = Some(ElementType::Header);
                continue;
            }
            ElementType::ListItem => {
                let run_end = list_run_end(elements, idx);
                insert_blank_line_before(&mut out, prev_type, ElementType::ListItem, idx == 0);
                let base_margin = elements[idx..run_end].iter().map(|e| e.left_margin).fold(f32::INFINITY, f32::min);
                for item in &elements[idx..run_end] {
                    out.push_str(&render_list_item(item, base_margin));
                    out.push('\n');
                }
                idx = run_end;
                prev_type = Some(ElementType::ListItem);
                continue;
            }
            ElementType::CodeBlock => {
                insert_blank_line_before(&mut out, prev_type, ElementType::CodeBlock, idx == 0);
                out.push_str(&render_code_block(element));
                idx += 1;
                prev_type = Some(ElementType::CodeBlock);
                continue;
            }
            ElementType::QuoteBlock => {
                insert_blank_line_before(&mut out, prev_type, ElementType::QuoteBlock, idx == 0);
                out.push_str(&render_quote_block(element));
                idx += 1;
                prev_type = Some(ElementType::QuoteBlock);
                continue;
            }
            ElementType::HorizontalLine => {
                insert_blank_line_before(&mut out, prev_type, ElementType::HorizontalLine, idx == 0);
                out.push_str("---\n");
                idx += 1;
                prev_type = Some(ElementType::HorizontalLine);
                continue;
            }
        }
    }

    tracing::debug!(element_count = elements.len(), output_len = out.len(), "markdown_generator: page rendered");

    out
}

fn insert_blank_line_before(out: &mut String, prev_type: Option<ElementType>, current: ElementType, is_first: bool) {
    if is_first || prev_type.is_none() {
        return;
    }
    let prev = prev_type.unwrap();

    let needs_blank = match current {
        ElementType::TableRow => prev != ElementType::TableRow,
        ElementType::Header => true,
        ElementType::Paragraph => matches!(prev, ElementType::Header | ElementType::Paragraph | ElementType::TableRow | ElementType::ListItem),
        _ => prev == ElementType::TableRow || prev == ElementType::Header,
    };

    if needs_blank && !out.ends_with("\n\n") && !out.is_empty() {
        if !out.ends_with('\n') {
            out.push('\n');
        }
        out.push('\n');
    }
}

fn table_run_end(elements: &[DocumentElement], start: usize) -> usize {
    let mut end = start;
    while end < elements.len() && elements[end].element_type == ElementType::TableRow {
        end += 1;
    }
    end
}

fn paragraph_run_end(elements: &[DocumentElement], start: usize, config: &PipelineConfig) -> usize {
    let mut end = start + 1;
    while end < elements.len() && elements[end].element_type == ElementType::Paragraph && can_consolidate(&elements[end - 1], &elements[end], config) {
        end += 1;
    }
    end
}

/// Whether two adjacent paragraphs fold into one (spec §4.8).
fn can_consolidate(a: &DocumentElement, b: &DocumentElement, config: &PipelineConfig) -> bool {
    if (a.font_size - b.font_size).abs() > config.paragraph_consolidation_font_delta_max {
        return false;
    }
    if a.is_indented != b.is_indented {
        return false;
    }
    if (a.left_margin - b.left_margin).abs() > config.paragraph_consolidation_margin_delta_max {
        return false;
    }
    if a.content.trim_end().ends_with('.') || a.content.trim_end().ends_with('。') {
        return false;
    }
    if b.content.contains('*') {
        return false;
    }
    if b.content.trim_start().chars().next().map(|c| c.is_uppercase()).unwrap_or(false) {
        return false;
    }
    true
}

fn consolidate_paragraphs(run: &[DocumentElement], _config: &PipelineConfig) -> String {
    let mut out = String::new();
    for (idx, element) in run.iter().enumerate() {
        if idx > 0 {
            let prev_last = out.chars().last();
            let next_first = element.content.chars().next();
            let separator = match (prev_last, next_first) {
                (Some(p), Some(n)) if !needs_space_between(p, n) => "",
                _ => " ",
            };
            out.push_str(separator);
        }
        out.push_str(&element.content);
    }
    out
}

fn render_header(element: &DocumentElement) -> String {
    let level = element.heading_level.unwrap_or(1).clamp(1, 6);
    let hashes = "#".repeat(level as usize);
    let content = element.content.trim_start_matches('#').trim();
    format!("{hashes} {content}")
}

fn render_list_item(element: &DocumentElement, base_margin: f32) -> String {
    let relative = (element.left_margin - base_margin).max(0.0);
    let indent_level = (relative / 20.0).round() as usize;
    let indent = "  ".repeat(indent_level);
    let content = normalize_list_prefix(&element.content);
    format!("{indent}{content}")
}

fn list_run_end(elements: &[DocumentElement], start: usize) -> usize {
    let mut end = start;
    while end < elements.len() && elements[end].element_type == ElementType::ListItem {
        end += 1;
    }
    end
}

fn normalize_list_prefix(text: &str) -> String {
    const BULLETS: &[&str] = &["- ", "* ", "+ ", "・", "•", "◦", "‒", "–", "—"];
    for bullet in BULLETS {
        if let Some(rest) = text.strip_prefix(bullet) {
            return format!("- {}", rest.trim_start());
        }
    }
    if text.chars().next().map(|c| c.is_ascii_digit()).unwrap_or(false) {
        return text.to_string();
    }
    format!("- {text}")
}

fn render_code_block(element: &DocumentElement) -> String {
    let lang = detect_code_language(&element.content);
    format!("```{lang}\n{}\n```\n", element.content)
}

/// Best-effort language tag for a fenced code block (spec §6): one of
/// `python|javascript|json|bash|csharp|html|css`, or empty when no signal
/// vocabulary matches.
fn detect_code_language(content: &str) -> &'static str {
    let trimmed = content.trim();
    if (trimmed.starts_with('{') && trimmed.ends_with('}')) || (trimmed.starts_with('[') && trimmed.ends_with(']')) {
        return "json";
    }
    if trimmed.starts_with("#!/bin/sh") || trimmed.starts_with("#!/bin/bash") || content.contains("$(") {
        return "bash";
    }
    if trimmed.starts_with('<') && (content.contains("</") || content.contains("/>")) {
        return "html";
    }
    if content.contains("using System") || content.contains("public class") || content.contains("namespace ") {
        return "csharp";
    }
    if content.contains("def ") || content.contains("elif ") || content.contains("import ") && content.contains(':') {
        return "python";
    }
    if content.contains("function ") || content.contains("const ") || content.contains("=>") || content.contains("console.log") {
        return "javascript";
    }
    if content.lines().any(|l| {
        let l = l.trim();
        l.ends_with('{') && l.contains(':') && !l.contains(';')
    }) {
        return "css";
    }
    ""
}

fn render_quote_block(element: &DocumentElement) -> String {
    element
        .content
        .lines()
        .map(|line| format!("> {}\n", line.trim_start_matches('>').trim_start()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BoundingBox, Word};
    use std::rc::Rc;

    fn element(element_type: ElementType, content: &str, font_size: f32, left_margin: f32) -> DocumentElement {
        let word = Rc::new(Word {
            text: content.to_string(),
            bbox: BoundingBox { left: left_margin, right: left_margin + 10.0, bottom: 0.0, top: font_size },
            font_name: "Arial".to_string(),
        });
        DocumentElement {
            element_type,
            content: content.to_string(),
            font_size,
            left_margin,
            is_indented: left_margin > 50.0,
            words: vec![word],
            heading_level: if element_type == ElementType::Header { Some(1) } else { None },
        }
    }

    #[test]
    fn test_generate_header_then_paragraph_has_blank_line() {
        let config = PipelineConfig::default();
        let elements = vec![element(ElementType::Header, "Title", 18.0, 0.0), element(ElementType::Paragraph, "Body.", 11.0, 0.0)];
        let out = generate(&elements, &config);
        assert!(out.contains("# Title\n\nBody."));
    }

    #[test]
    fn test_paragraph_consolidation_stops_at_sentence_end() {
        let config = PipelineConfig::default();
        let elements = vec![
            element(ElementType::Paragraph, "First sentence.", 11.0, 0.0),
            element(ElementType::Paragraph, "second fragment", 11.0, 0.0),
        ];
        let out = generate(&elements, &config);
        assert!(out.contains("First sentence.\n"));
    }

    #[test]
    fn test_nested_list_indentation() {
        let config = PipelineConfig::default();
        let elements = vec![element(ElementType::ListItem, "- item1", 11.0, 40.0), element(ElementType::ListItem, "- sub", 11.0, 60.0)];
        let out = generate(&elements, &config);
        assert!(out.contains("- item1"));
        assert!(out.contains("  - sub"));
    }

    #[test]
    fn test_horizontal_rule_emitted() {
        let config = PipelineConfig::default();
        let elements = vec![element(ElementType::HorizontalLine, "---", 11.0, 0.0)];
        let out = generate(&elements, &config);
        assert!(out.contains("---"));
    }

    #[test]
    fn test_detect_code_language_python() {
        assert_eq!(detect_code_language("def greet():\n    print(\"hi\")"), "python");
    }

    #[test]
    fn test_detect_code_language_json() {
        assert_eq!(detect_code_language("{\"a\": 1}"), "json");
    }

    #[test]
    fn test_detect_code_language_unknown_is_empty() {
        assert_eq!(detect_code_language("just some text"), "");
    }

    #[test]
    fn test_render_code_block_includes_language_tag() {
        let el = element(ElementType::CodeBlock, "def f():\n    pass", 11.0, 0.0);
        assert!(render_code_block(&el).starts_with("```python\n"));
    }
}
