//! Reconstructs structured Markdown (headings, lists, tables, code/quote
//! blocks) from a flat PDF word stream, using only 2-D glyph geometry and
//! font metadata — no semantic understanding, no OCR, no embedded document
//! structure required from the source.
//!
//! The crate owns exactly the document-structure inference pipeline: line
//! grouping, font-distribution statistics, per-line classification,
//! neighborhood-aware refinement, table reconstruction, and Markdown
//! emission with a final normalization pass. The PDF byte-level parser that
//! produces the word stream, OCR, image extraction, and file I/O are all
//! external collaborators and live outside this crate.
//!
//! ```
//! use pdf_structure::{convert_document, PageInput, PipelineConfig, Word, BoundingBox};
//!
//! let page = PageInput {
//!     words: vec![Word {
//!         text: "Hello".to_string(),
//!         bbox: BoundingBox { left: 0.0, right: 40.0, bottom: 700.0, top: 712.0 },
//!         font_name: "Arial".to_string(),
//!     }],
//!     paths: vec![],
//! };
//! let result = convert_document(&[page], &PipelineConfig::default());
//! assert!(result.text.contains("Hello"));
//! ```

pub mod config;
pub mod element_detector;
pub mod error;
pub mod font_analyzer;
pub mod graphics_processor;
pub mod line_analyzer;
pub mod markdown_generator;
pub mod pipeline;
pub mod post_processor;
pub mod table_processor;
pub mod text_post_processor;
pub mod types;
pub mod word_grouper;

pub use config::PipelineConfig;
pub use error::{ConvertError, Result};
pub use types::{
    BoundingBox, BorderType, ConvertResult, DocumentElement, DocumentStructure, ElementType, FontAnalysis, FontFormatting, GraphicsInfo, Line,
    LineSegment, PageInput, Path, PathCommand, Rectangle, TablePattern, Word, WordGroup,
};

/// Converts a full document (one or more pages) into a single Markdown
/// string, concatenating pages in order with a separating blank line (spec
/// §5, §6). Never panics across this boundary: a page whose conversion
/// fails catastrophically contributes no output and is recorded as a
/// warning; subsequent pages still run.
pub fn convert_document(pages: &[PageInput], config: &PipelineConfig) -> ConvertResult {
    pipeline::convert_document(pages, config)
}

/// Converts a single page into its `DocumentStructure` (refined elements
/// plus the font analysis used to classify them) plus any warnings
/// accumulated while doing so, without the final TextPostProcessor pass
/// (spec §3, §6). Most callers should prefer [`convert_document`]; this is
/// exposed for callers that want to inspect or further post-process the
/// structured element sequence themselves.
pub fn convert_page(page: &PageInput, config: &PipelineConfig) -> (DocumentStructure, Vec<String>) {
    pipeline::convert_page(page, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_api_round_trip() {
        let page = PageInput {
            words: vec![Word {
                text: "Hi".to_string(),
                bbox: BoundingBox { left: 0.0, right: 20.0, bottom: 700.0, top: 712.0 },
                font_name: "Arial".to_string(),
            }],
            paths: vec![],
        };
        let result = convert_document(&[page.clone()], &PipelineConfig::default());
        assert!(result.text.contains("Hi"));

        let (structure, _warnings) = convert_page(&page, &PipelineConfig::default());
        assert_eq!(structure.elements.len(), 1);
    }
}
