//! Tunable thresholds (spec §9: "expose them as configuration but ship with
//! these defaults"). Every constant named in spec §4 lives here instead of
//! scattered module-private `const`s, generalizing the teacher's
//! `pdf/markdown/constants.rs` into an overridable struct, the same way
//! `core::config::ExtractionConfig` centralizes the teacher's extraction
//! knobs.

/// All thresholds the pipeline needs, grouped loosely by the component that
/// owns them. Defaults are the literal constants spec.md ships with, tuned
/// for A4/Letter pages at ~12pt base font.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    // --- WordGrouper (§4.1) ---
    /// Baseline-overlap fraction of word height required to join an existing line.
    pub line_overlap_fraction: f32,
    /// Static floor for the dynamic baseline-distance threshold.
    pub line_y_threshold: f32,
    /// Fraction of `min(line_height, word_height)` added to the dynamic line threshold.
    pub line_dynamic_fraction: f32,
    /// Max relative height difference for two words to be considered the same size.
    pub merge_height_tolerance: f32,
    /// Gap-to-height ratio below which adjacent words may merge into one group.
    pub merge_gap_height_fraction: f32,
    /// Max baseline drift, as a fraction of max height, for mergeable words.
    pub merge_baseline_drift_fraction: f32,
    /// Max gap, as a fraction of mean word width, for mergeable words.
    pub merge_gap_width_fraction: f32,
    /// Font-family-prefix length compared when deciding mergeability.
    pub merge_font_prefix_len: usize,

    // --- DocumentElement derivation (§3) ---
    /// `isIndented <=> leftMargin > indent_threshold`, in PDF points.
    pub indent_threshold: f32,

    // --- FontAnalyzer (§3, §4.2) ---
    /// Minimum base-to-large-font ratio; below this, promote to the next size up.
    pub large_font_min_ratio: f32,
    /// Fallback large-font threshold multiplier when no larger size clears the ratio.
    pub large_font_fallback_multiplier: f32,
    /// Numeric font weight at or above which a font is considered bold.
    pub bold_weight_threshold: u32,

    // --- ElementDetector (§4.4) ---
    /// Deep-indent threshold (pt) for code-block detection.
    pub code_indent_threshold: f32,
    /// Minimum fraction of numeric words for table-row detection.
    pub table_row_numeric_fraction: f32,
    /// Variation coefficient ceiling for "regular spacing" in table-row detection.
    pub table_row_gap_cv_max: f32,
    /// Mean gap (pt) floor for "regular spacing" in table-row detection.
    pub table_row_mean_gap_min: f32,
    /// Any single gap (pt) above this alone signals a table row.
    pub table_row_large_gap: f32,
    /// Minimum short-word count for table-row detection.
    pub table_row_min_short_words: usize,
    /// Max length (chars) for a "short" word in table-row detection.
    pub table_row_short_word_max_len: usize,
    /// Mean short-word length ceiling for table-row detection.
    pub table_row_short_word_mean_max: f32,

    // --- Header structure validation (§4.4, teacher-grounded supplement C.4) ---
    /// Minimum font-size ratio (vs. body) for a line to read as a heading.
    pub min_heading_font_ratio: f32,
    /// Minimum absolute font-size gap (pt) vs. body, alternative to the ratio test.
    pub min_heading_font_gap: f32,
    /// Max word count for a line to still qualify as a heading.
    pub max_heading_word_count: usize,

    // --- GraphicsProcessor (§4.5) ---
    /// Y-bucket tolerance (pt) when inferring rows from word positions.
    pub graphics_row_bucket_tolerance: f32,
    /// Inter-word gap (pt) considered "significant" for inferred vertical rules.
    pub graphics_significant_gap: f32,
    /// Minimum width (pt) of a candidate table-pattern rectangle.
    pub table_pattern_min_width: f32,
    /// Minimum height (pt) of a candidate table-pattern rectangle.
    pub table_pattern_min_height: f32,
    /// Gap-variance-to-mean ratio ceiling for "regular" spacing in confidence scoring.
    pub graphics_regular_variance_fraction: f32,

    // --- PostProcessor (§4.6) ---
    /// Font-size ratio at/above which a short paragraph is definitely a header.
    pub definite_header_ratio_short: f32,
    /// Max length (chars) eligible for the `definite_header_ratio_short` test.
    pub definite_header_len_short: usize,
    /// Font-size ratio at/above which a medium paragraph may be a header (with margin test).
    pub definite_header_ratio_medium: f32,
    /// Max length (chars) eligible for the `definite_header_ratio_medium` test.
    pub definite_header_len_medium: usize,
    /// Left-margin ceiling (pt) for the medium-length header test.
    pub definite_header_left_margin_max: f32,
    /// Max word count for a bold paragraph to be promoted to a header.
    pub max_bold_heading_word_count: usize,
    /// Element-index window (± elements) searched for a nearby TableRow.
    pub table_context_window: usize,
    /// Max vertical distance (pt) for table-row context reclassification.
    pub table_context_max_distance: f32,
    /// Max header length (chars) eligible to be absorbed as a table's first line.
    pub header_into_table_max_len: usize,
    /// Vertical gap (pt) ceiling for broken-cell consolidation.
    pub broken_cell_max_gap: f32,
    /// Horizontal-overlap fraction at/above which two rows are never merged.
    pub horizontal_overlap_guard: f32,

    // --- TableProcessor (§4.7) ---
    /// Multiplier applied to the mean gap to define a "large" gap candidate.
    pub cell_split_large_gap_mean_multiplier: f32,
    /// Scale applied to the selected large-gap candidate.
    pub cell_split_large_gap_scale: f32,
    /// IQR multiplier for the IQR-based split-threshold candidate.
    pub cell_split_iqr_multiplier: f32,
    /// Median multiplier for the median-based split-threshold candidate.
    pub cell_split_median_multiplier: f32,
    /// Lower clamp multiplier (of font height) on the cell-split threshold.
    pub cell_split_min_multiplier: f32,
    /// Upper clamp multiplier (of font height) on the cell-split threshold.
    pub cell_split_max_multiplier: f32,
    /// Gap-to-font-height fraction above which a space is inserted between words in a cell.
    pub cell_word_space_fraction: f32,
    /// Minimum column count when evidence is ambiguous.
    pub min_column_count: usize,
    /// Mode-difference tolerance when picking between the top two column-count modes.
    pub column_mode_tie_tolerance: usize,
    /// Empty-cell-ratio floor for inline bold-row header extraction.
    pub inline_header_empty_ratio_min: f32,
    /// Bold-content-ratio floor for inline bold-row header extraction.
    pub inline_header_bold_ratio_min: f32,

    // --- MarkdownGenerator (§4.8) ---
    /// Font-size delta (pt) above which two paragraphs never consolidate.
    pub paragraph_consolidation_font_delta_max: f32,
    /// Left-margin delta (pt) above which two paragraphs never consolidate.
    pub paragraph_consolidation_margin_delta_max: f32,

    // --- TextPostProcessor (§4.9) ---
    /// Max digit count for a standalone line to be pruned as a page number.
    pub page_number_max_digits: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            line_overlap_fraction: 0.4,
            line_y_threshold: 3.0,
            line_dynamic_fraction: 0.5,
            merge_height_tolerance: 0.05,
            merge_gap_height_fraction: 0.3,
            merge_baseline_drift_fraction: 0.15,
            merge_gap_width_fraction: 0.5,
            merge_font_prefix_len: 6,

            indent_threshold: 50.0,

            large_font_min_ratio: 1.05,
            large_font_fallback_multiplier: 1.15,
            bold_weight_threshold: 600,

            code_indent_threshold: 80.0,
            table_row_numeric_fraction: 0.4,
            table_row_gap_cv_max: 0.6,
            table_row_mean_gap_min: 8.0,
            table_row_large_gap: 15.0,
            table_row_min_short_words: 3,
            table_row_short_word_max_len: 20,
            table_row_short_word_mean_max: 10.0,

            min_heading_font_ratio: 1.25,
            min_heading_font_gap: 2.0,
            max_heading_word_count: 12,

            graphics_row_bucket_tolerance: 5.0,
            graphics_significant_gap: 20.0,
            table_pattern_min_width: 50.0,
            table_pattern_min_height: 20.0,
            graphics_regular_variance_fraction: 0.2,

            definite_header_ratio_short: 2.0,
            definite_header_len_short: 30,
            definite_header_ratio_medium: 1.2,
            definite_header_len_medium: 50,
            definite_header_left_margin_max: 120.0,
            max_bold_heading_word_count: 15,
            table_context_window: 3,
            table_context_max_distance: 200.0,
            header_into_table_max_len: 50,
            broken_cell_max_gap: 5.0,
            horizontal_overlap_guard: 0.5,

            cell_split_large_gap_mean_multiplier: 1.5,
            cell_split_large_gap_scale: 0.7,
            cell_split_iqr_multiplier: 0.3,
            cell_split_median_multiplier: 0.8,
            cell_split_min_multiplier: 0.3,
            cell_split_max_multiplier: 2.5,
            cell_word_space_fraction: 0.3,
            min_column_count: 3,
            column_mode_tie_tolerance: 1,
            inline_header_empty_ratio_min: 0.6,
            inline_header_bold_ratio_min: 0.5,

            paragraph_consolidation_font_delta_max: 1.0,
            paragraph_consolidation_margin_delta_max: 10.0,

            page_number_max_digits: 3,
        }
    }
}

impl PipelineConfig {
    /// Loads a config from a JSON document, defaulting any field it omits
    /// (mirrors the teacher's `ExtractionConfig`-from-file loading pattern).
    /// Rejects a config with a non-positive `indent_threshold`, since
    /// `DocumentElement::is_indented` would otherwise be trivially true or
    /// always false for every line on the page.
    pub fn from_json(text: &str) -> crate::error::Result<Self> {
        let config: PipelineConfig =
            serde_json::from_str(text).map_err(|e| crate::error::ConvertError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> crate::error::Result<()> {
        if self.indent_threshold <= 0.0 {
            return Err(crate::error::ConvertError::InvalidConfig(
                "indent_threshold must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
