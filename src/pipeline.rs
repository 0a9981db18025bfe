//! Pipeline orchestrator: wires the 9 components together per page, with
//! per-page failure isolation (spec §5, §7).
//!
//! Grounded on `pdf/markdown/pipeline.rs`'s orchestration shape (entry
//! logging, warning accumulation, catch-and-degrade around graphics
//! extraction) generalized from the structure-tree-first/heuristic-fallback
//! split to this crate's single heuristic pipeline.

use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use crate::config::PipelineConfig;
use crate::error::ConvertError;
use crate::types::{ConvertResult, DocumentStructure, PageInput, Word};
use crate::{font_analyzer, line_analyzer, markdown_generator, post_processor, text_post_processor, word_grouper};

/// Converts every page and concatenates the result with a blank-line
/// separator between pages (spec §5 ordering guarantee).
pub fn convert_document(pages: &[PageInput], config: &PipelineConfig) -> ConvertResult {
    tracing::debug!(page_count = pages.len(), "pipeline: starting document conversion");

    let mut text_parts: Vec<String> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();

    for (page_index, page) in pages.iter().enumerate() {
        match convert_page_body(page, config) {
            Ok((page_text, mut page_warnings)) => {
                if !page_text.trim().is_empty() {
                    text_parts.push(page_text);
                }
                warnings.append(&mut page_warnings);
            }
            Err(reason) => {
                tracing::debug!(page_index, reason = %reason, "pipeline: page failed catastrophically, continuing");
                let err = ConvertError::CatastrophicPageFailure { page_index, reason };
                warnings.push(err.to_string());
            }
        }
    }

    let joined = text_parts.join("\n\n");
    let text = text_post_processor::post_process(&joined, config);

    ConvertResult { text, warnings }
}

/// Converts a single page, returning its document structure (refined
/// elements plus the font analysis used to classify them) and any
/// warnings, without the final TextPostProcessor pass (callers assembling
/// a multi-page document normalize once at the end; single-page callers
/// should still run `text_post_processor::post_process` themselves).
pub fn convert_page(page: &PageInput, config: &PipelineConfig) -> (DocumentStructure, Vec<String>) {
    match convert_page_elements(page, config) {
        Ok(result) => result,
        Err(reason) => {
            let err = ConvertError::CatastrophicPageFailure { page_index: 0, reason };
            (DocumentStructure::default(), vec![err.to_string()])
        }
    }
}

fn convert_page_body(page: &PageInput, config: &PipelineConfig) -> Result<(String, Vec<String>), String> {
    let (structure, mut warnings) = convert_page_elements(page, config)?;
    let md = markdown_generator::generate(&structure.elements, config);
    warnings.retain(|w| !w.is_empty());
    Ok((md, warnings))
}

fn convert_page_elements(page: &PageInput, config: &PipelineConfig) -> Result<(DocumentStructure, Vec<String>), String> {
    let result = panic::catch_unwind(AssertUnwindSafe(|| convert_page_elements_inner(page, config)));
    match result {
        Ok(value) => Ok(value),
        Err(panic_payload) => {
            let reason = panic_message(panic_payload);
            Err(reason)
        }
    }
}

fn convert_page_elements_inner(page: &PageInput, config: &PipelineConfig) -> (DocumentStructure, Vec<String>) {
    let mut warnings = Vec::new();

    let words = sanitize_words(&page.words, &mut warnings);
    let word_refs: Vec<Rc<Word>> = words.iter().cloned().map(Rc::new).collect();

    let font_analysis = font_analyzer::analyze_distribution(&words, config);
    let lines = word_grouper::group_into_lines(&word_refs, config);

    let elements: Vec<crate::types::DocumentElement> = lines
        .iter()
        .map(|line| line_analyzer::analyze(line, &font_analysis, config.line_y_threshold, config))
        .collect();

    let refined = post_processor::run(elements, &font_analysis, &words, &page.paths, config);

    tracing::debug!(word_count = words.len(), element_count = refined.len(), "pipeline: page converted");

    (DocumentStructure { elements: refined, font_analysis }, warnings)
}

/// Drops malformed words (NaN/negative boxes, empty text with a non-empty
/// box) and records a warning (spec §7, `MalformedInput`).
fn sanitize_words(words: &[Word], warnings: &mut Vec<String>) -> Vec<Word> {
    let mut skipped = 0usize;
    let clean: Vec<Word> = words
        .iter()
        .filter(|w| {
            let bbox = &w.bbox;
            let finite = bbox.left.is_finite() && bbox.right.is_finite() && bbox.bottom.is_finite() && bbox.top.is_finite();
            let non_negative = bbox.left >= 0.0 && bbox.bottom >= 0.0 && bbox.right >= bbox.left && bbox.top >= bbox.bottom;
            let bad_bbox = !(finite && non_negative);
            let has_area = bbox.right > bbox.left && bbox.top > bbox.bottom;
            let empty_text_nonempty_box = w.text.is_empty() && has_area;
            let valid = !bad_bbox && !empty_text_nonempty_box;
            if !valid {
                skipped += 1;
            }
            valid
        })
        .cloned()
        .collect();

    if skipped > 0 {
        warnings.push(format!("dropped {skipped} malformed word(s) with invalid bounding boxes or empty text"));
    }

    clean
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
