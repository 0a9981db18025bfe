//! Core data model for the document-structure inference pipeline.
//!
//! Mirrors the input/output shapes the PDF byte-level parser and the
//! Markdown emitter exchange with the core (spec §3, §6). Words are never
//! mutated after extraction; elements reference them by shared ownership
//! (`Rc`) so a single page's glyph run can be read from multiple
//! `DocumentElement`s without cloning text.

use std::rc::Rc;

/// An axis-aligned bounding rectangle in PDF points (y grows upward).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
    pub top: f32,
}

impl BoundingBox {
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.top - self.bottom
    }

    /// True if `other` lies entirely within `self`.
    pub fn contains(&self, other: &BoundingBox) -> bool {
        other.left >= self.left && other.right <= self.right && other.bottom >= self.bottom && other.top <= self.top
    }

    /// Fraction of `self`'s width spanned by the horizontal overlap with `other`.
    pub fn horizontal_overlap_fraction(&self, other: &BoundingBox) -> f32 {
        let overlap = self.right.min(other.right) - self.left.max(other.left);
        if overlap <= 0.0 {
            return 0.0;
        }
        let narrower = self.width().min(other.width());
        if narrower <= 0.0 {
            0.0
        } else {
            (overlap / narrower).clamp(0.0, 1.0)
        }
    }
}

/// A single positioned glyph run from the external PDF parser.
///
/// Read-only to the core: the pipeline never mutates `text`, `bbox`, or
/// `font_name` of an existing `Word`, only groups references to them.
#[derive(Debug, Clone)]
pub struct Word {
    pub text: String,
    pub bbox: BoundingBox,
    pub font_name: String,
}

impl Word {
    pub fn height(&self) -> f32 {
        self.bbox.height()
    }
}

/// Bold/italic derived from a word's font name (spec §3, §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FontFormatting {
    pub bold: bool,
    pub italic: bool,
}

/// Per-document font-size distribution used to classify headings (spec §3).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FontAnalysis {
    pub base_font_size: f32,
    pub large_font_threshold: f32,
    /// All distinct observed sizes, ascending.
    pub all_font_sizes_ascending: Vec<f32>,
}

impl FontAnalysis {
    /// Rank of `size` within the ascending distinct-size set (0 = smallest).
    /// Used to keep heading levels monotone in font-size rank (spec §8, invariant 2).
    pub fn size_rank(&self, size: f32) -> usize {
        self.all_font_sizes_ascending
            .iter()
            .position(|&s| (s - size).abs() < f32::EPSILON)
            .unwrap_or_else(|| {
                self.all_font_sizes_ascending
                    .iter()
                    .filter(|&&s| s < size)
                    .count()
            })
    }
}

/// The closed element-type set (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    Empty,
    Header,
    Paragraph,
    ListItem,
    TableRow,
    CodeBlock,
    QuoteBlock,
    HorizontalLine,
}

/// A classified line (or later, a run of lines): spec §3.
///
/// `words` is non-empty iff `element_type != Empty`. `content` is the
/// formatted text derived from `words` with bold/italic markup already
/// interleaved. `left_margin = min(word.left)`, `font_size = mean(word.height)`,
/// `is_indented <=> left_margin > indent_threshold`.
#[derive(Debug, Clone)]
pub struct DocumentElement {
    pub element_type: ElementType,
    pub content: String,
    pub font_size: f32,
    pub left_margin: f32,
    pub is_indented: bool,
    pub words: Vec<Rc<Word>>,
    /// Set only for `ElementType::Header`; 1..=6, monotone with font-size rank.
    pub heading_level: Option<u8>,
}

impl DocumentElement {
    pub fn empty() -> Self {
        DocumentElement {
            element_type: ElementType::Empty,
            content: String::new(),
            font_size: 0.0,
            left_margin: 0.0,
            is_indented: false,
            words: Vec::new(),
            heading_level: None,
        }
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        if self.words.is_empty() {
            return None;
        }
        let left = self.words.iter().map(|w| w.bbox.left).fold(f32::INFINITY, f32::min);
        let right = self
            .words
            .iter()
            .map(|w| w.bbox.right)
            .fold(f32::NEG_INFINITY, f32::max);
        let bottom = self
            .words
            .iter()
            .map(|w| w.bbox.bottom)
            .fold(f32::INFINITY, f32::min);
        let top = self.words.iter().map(|w| w.bbox.top).fold(f32::NEG_INFINITY, f32::max);
        Some(BoundingBox { left, right, bottom, top })
    }
}

/// A grouped, baseline-sharing run of words (WordGrouper output, before
/// classification into a `DocumentElement`).
#[derive(Debug, Clone)]
pub struct Line {
    pub words: Vec<Rc<Word>>,
    pub mean_bottom: f32,
}

impl Line {
    pub fn mean_height(&self) -> f32 {
        if self.words.is_empty() {
            return 0.0;
        }
        self.words.iter().map(|w| w.height()).sum::<f32>() / self.words.len() as f32
    }

    pub fn min_height(&self) -> f32 {
        self.words
            .iter()
            .map(|w| w.height())
            .fold(f32::INFINITY, f32::min)
    }

    pub fn left_margin(&self) -> f32 {
        self.words.iter().map(|w| w.bbox.left).fold(f32::INFINITY, f32::min)
    }
}

/// A word-merge group produced by `mergeWordsInLine` (spec §4.1): one or
/// more adjacent words treated as a single run for formatting/content assembly.
#[derive(Debug, Clone)]
pub struct WordGroup {
    pub words: Vec<Rc<Word>>,
    pub formatting: FontFormatting,
}

impl WordGroup {
    /// Joins this group's words CJK-aware (spec §4.1 content assembly, and
    /// the scenario-1 `本文 です。` no-space-before-punctuation rule).
    pub fn text(&self) -> String {
        let mut out = String::new();
        for word in &self.words {
            if let (Some(prev), Some(next)) = (out.chars().last(), word.text.chars().next()) {
                if crate::text_post_processor::needs_space_between(prev, next) {
                    out.push(' ');
                }
            }
            out.push_str(&word.text);
        }
        out
    }

    pub fn bbox(&self) -> Option<BoundingBox> {
        if self.words.is_empty() {
            return None;
        }
        let left = self.words.iter().map(|w| w.bbox.left).fold(f32::INFINITY, f32::min);
        let right = self
            .words
            .iter()
            .map(|w| w.bbox.right)
            .fold(f32::NEG_INFINITY, f32::max);
        let bottom = self
            .words
            .iter()
            .map(|w| w.bbox.bottom)
            .fold(f32::INFINITY, f32::min);
        let top = self.words.iter().map(|w| w.bbox.top).fold(f32::NEG_INFINITY, f32::max);
        Some(BoundingBox { left, right, bottom, top })
    }
}

/// A straight rule segment recovered from vector paths or inferred from word
/// positions (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineSegment {
    Horizontal { y: f32, x_start: f32, x_end: f32 },
    Vertical { x: f32, y_start: f32, y_end: f32 },
}

/// A closed four-sided path recovered from the vector-path stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rectangle {
    pub bbox: BoundingBox,
}

/// Evidence gathered from the page's vector-path stream plus, when absent,
/// the word-position fallback (spec §4.5).
#[derive(Debug, Clone, Default)]
pub struct GraphicsInfo {
    pub horizontal_segments: Vec<LineSegment>,
    pub vertical_segments: Vec<LineSegment>,
    pub rectangles: Vec<Rectangle>,
    /// True when graphics extraction failed and segments were inferred from
    /// word positions instead (spec §7, `GraphicsUnavailable`).
    pub is_inferred: bool,
}

/// Border topology classification for a detected table region (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderType {
    None,
    Partial,
    Full,
    Rectangle,
    TopBottomOnly,
    HeaderSeparator,
    GridLines,
}

/// A candidate table region with its supporting rule-line evidence (spec §3).
#[derive(Debug, Clone)]
pub struct TablePattern {
    pub bbox: BoundingBox,
    pub border_lines: Vec<LineSegment>,
    pub internal_lines: Vec<LineSegment>,
    pub estimated_rows: usize,
    pub estimated_columns: usize,
    pub border_type: BorderType,
    pub confidence: f32,
}

impl TablePattern {
    /// Per spec §9 Open Questions: promote enclosed elements only when
    /// confidence clears the bar, or when the caller's independent
    /// coordinate-only fallback agrees.
    pub fn is_actionable(&self, coordinate_fallback_agrees: bool) -> bool {
        self.confidence >= 0.5 || coordinate_fallback_agrees
    }
}

/// Ordered sequence of classified elements for one page, plus the font
/// analysis used to classify them (spec §3). Created per page, never
/// persisted.
#[derive(Debug, Clone, Default)]
pub struct DocumentStructure {
    pub elements: Vec<DocumentElement>,
    pub font_analysis: FontAnalysis,
}

/// Final pipeline output (spec §6).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConvertResult {
    pub text: String,
    pub warnings: Vec<String>,
}

/// A single vector-path drawing command from the external parser (spec §6).
/// Optional input: an empty path list degrades `GraphicsProcessor` to the
/// word-position fallback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCommand {
    MoveTo { x: f32, y: f32 },
    LineTo { x: f32, y: f32 },
    Close,
}

/// A single drawn path: a sequence of commands sharing one pen stroke.
pub type Path = Vec<PathCommand>;

/// Per-page input bundle (spec §6): the word stream plus the optional
/// vector-path stream `GraphicsProcessor` consumes.
#[derive(Debug, Clone, Default)]
pub struct PageInput {
    pub words: Vec<Word>,
    pub paths: Vec<Path>,
}
