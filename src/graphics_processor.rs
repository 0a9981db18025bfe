//! GraphicsProcessor (spec §4.5): recovers rule segments and rectangles
//! from the page's vector-path stream, falling back to word-position
//! inference when no paths are available, and synthesizes `TablePattern`
//! candidates from the intersection grid.
//!
//! Grounded on the teacher's "graphics extraction failure degrades to a
//! fallback rather than aborting" convention (`pdf/markdown/pipeline.rs`)
//! and `pdf/markdown/columns.rs`'s gap-based row/column inference idea,
//! generalized from column splitting to rule-line synthesis.

use crate::config::PipelineConfig;
use crate::types::{BorderType, GraphicsInfo, LineSegment, Path, PathCommand, Rectangle, TablePattern, Word};

const COLLINEAR_TOLERANCE: f32 = 0.5;

/// Extracts horizontal/vertical segments and rectangles from vector paths
/// (spec §4.5). Returns `is_inferred = false`; callers fall back to
/// [`infer_from_word_positions`] when `paths` is empty (spec §7,
/// `GraphicsUnavailable`).
pub fn extract_from_paths(paths: &[Path]) -> GraphicsInfo {
    let mut horizontal_segments = Vec::new();
    let mut vertical_segments = Vec::new();
    let mut rectangles = Vec::new();

    for path in paths {
        let points = path_points(path);
        if points.len() == 4 && is_closed_rectangle(&points) {
            let xs: Vec<f32> = points.iter().map(|p| p.0).collect();
            let ys: Vec<f32> = points.iter().map(|p| p.1).collect();
            let left = xs.iter().copied().fold(f32::INFINITY, f32::min);
            let right = xs.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            let bottom = ys.iter().copied().fold(f32::INFINITY, f32::min);
            let top = ys.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            rectangles.push(Rectangle {
                bbox: crate::types::BoundingBox { left, right, bottom, top },
            });
            continue;
        }

        for pair in points.windows(2) {
            let (x1, y1) = pair[0];
            let (x2, y2) = pair[1];
            if (y1 - y2).abs() < COLLINEAR_TOLERANCE && (x1 - x2).abs() > COLLINEAR_TOLERANCE {
                horizontal_segments.push(LineSegment::Horizontal { y: y1, x_start: x1.min(x2), x_end: x1.max(x2) });
            } else if (x1 - x2).abs() < COLLINEAR_TOLERANCE && (y1 - y2).abs() > COLLINEAR_TOLERANCE {
                vertical_segments.push(LineSegment::Vertical { x: x1, y_start: y1.min(y2), y_end: y1.max(y2) });
            }
        }
    }

    GraphicsInfo { horizontal_segments, vertical_segments, rectangles, is_inferred: false }
}

fn path_points(path: &Path) -> Vec<(f32, f32)> {
    let mut points = Vec::new();
    for cmd in path {
        match cmd {
            PathCommand::MoveTo { x, y } | PathCommand::LineTo { x, y } => points.push((*x, *y)),
            PathCommand::Close => {
                if let Some(&first) = points.first() {
                    points.push(first);
                }
            }
        }
    }
    points
}

fn is_closed_rectangle(points: &[(f32, f32)]) -> bool {
    if points.len() != 4 {
        return false;
    }
    let xs: Vec<f32> = points.iter().map(|p| p.0).collect();
    let ys: Vec<f32> = points.iter().map(|p| p.1).collect();
    let unique_x = distinct_count(&xs);
    let unique_y = distinct_count(&ys);
    unique_x == 2 && unique_y == 2
}

fn distinct_count(values: &[f32]) -> usize {
    let mut distinct: Vec<f32> = Vec::new();
    for &v in values {
        if !distinct.iter().any(|&d: &f32| (d - v).abs() < COLLINEAR_TOLERANCE) {
            distinct.push(v);
        }
    }
    distinct.len()
}

/// Word-position fallback used when `paths` is empty (spec §4.5, §7
/// `GraphicsUnavailable`): groups words into rows by a y-bucket tolerance,
/// then emits top/bottom horizontal segments per row and vertical segments
/// at significant inter-word gaps.
pub fn infer_from_word_positions(words: &[Word], config: &PipelineConfig) -> GraphicsInfo {
    let mut rows: Vec<Vec<&Word>> = Vec::new();
    for word in words {
        let bucket = rows.iter_mut().find(|row| {
            let row_y = row[0].bbox.bottom;
            (row_y - word.bbox.bottom).abs() <= config.graphics_row_bucket_tolerance
        });
        match bucket {
            Some(row) => row.push(word),
            None => rows.push(vec![word]),
        }
    }

    let mut horizontal_segments = Vec::new();
    let mut vertical_segments = Vec::new();

    for row in &rows {
        if row.is_empty() {
            continue;
        }
        let left = row.iter().map(|w| w.bbox.left).fold(f32::INFINITY, f32::min);
        let right = row.iter().map(|w| w.bbox.right).fold(f32::NEG_INFINITY, f32::max);
        let bottom = row.iter().map(|w| w.bbox.bottom).fold(f32::INFINITY, f32::min);
        let top = row.iter().map(|w| w.bbox.top).fold(f32::NEG_INFINITY, f32::max);
        horizontal_segments.push(LineSegment::Horizontal { y: bottom, x_start: left, x_end: right });
        horizontal_segments.push(LineSegment::Horizontal { y: top, x_start: left, x_end: right });

        let mut sorted_row = row.clone();
        sorted_row.sort_by(|a, b| a.bbox.left.partial_cmp(&b.bbox.left).unwrap());
        for pair in sorted_row.windows(2) {
            let gap = pair[1].bbox.left - pair[0].bbox.right;
            if gap > config.graphics_significant_gap {
                let x = (pair[0].bbox.right + pair[1].bbox.left) / 2.0;
                vertical_segments.push(LineSegment::Vertical { x, y_start: bottom, y_end: top });
            }
        }
    }

    tracing::debug!(row_count = rows.len(), "graphics_processor: inferred rule lines from word positions");

    GraphicsInfo { horizontal_segments, vertical_segments, rectangles: Vec::new(), is_inferred: true }
}

/// Synthesizes `TablePattern` candidates from the intersection of the
/// extracted/inferred horizontal and vertical segments (spec §4.5).
pub fn synthesize_table_patterns(graphics: &GraphicsInfo, config: &PipelineConfig) -> Vec<TablePattern> {
    let mut patterns = Vec::new();

    let mut h_ys: Vec<f32> = graphics.horizontal_segments.iter().map(|s| match s {
        LineSegment::Horizontal { y, .. } => *y,
        _ => unreachable!(),
    }).collect();
    h_ys.sort_by(|a, b| a.partial_cmp(b).unwrap());
    h_ys.dedup_by(|a, b| (*a - *b).abs() < COLLINEAR_TOLERANCE);

    let mut v_xs: Vec<f32> = graphics.vertical_segments.iter().map(|s| match s {
        LineSegment::Vertical { x, .. } => *x,
        _ => unreachable!(),
    }).collect();
    v_xs.sort_by(|a, b| a.partial_cmp(b).unwrap());
    v_xs.dedup_by(|a, b| (*a - *b).abs() < COLLINEAR_TOLERANCE);

    if h_ys.len() < 2 || v_xs.len() < 2 {
        return patterns;
    }

    for y_pair in h_ys.windows(2) {
        for x_pair in v_xs.windows(2) {
            let (y_bottom, y_top) = (y_pair[0], y_pair[1]);
            let (x_left, x_right) = (x_pair[0], x_pair[1]);
            let dx = x_right - x_left;
            let dy = y_top - y_bottom;
            if dx <= config.table_pattern_min_width || dy <= config.table_pattern_min_height {
                continue;
            }

            let bbox = crate::types::BoundingBox { left: x_left, right: x_right, bottom: y_bottom, top: y_top };

            let internal_h: Vec<_> = graphics
                .horizontal_segments
                .iter()
                .filter(|s| matches!(s, LineSegment::Horizontal { y, .. } if *y > y_bottom + COLLINEAR_TOLERANCE && *y < y_top - COLLINEAR_TOLERANCE))
                .copied()
                .collect();
            let internal_v: Vec<_> = graphics
                .vertical_segments
                .iter()
                .filter(|s| matches!(s, LineSegment::Vertical { x, .. } if *x > x_left + COLLINEAR_TOLERANCE && *x < x_right - COLLINEAR_TOLERANCE))
                .copied()
                .collect();
            let border_lines: Vec<_> = graphics
                .horizontal_segments
                .iter()
                .chain(graphics.vertical_segments.iter())
                .filter(|s| !internal_h.contains(s) && !internal_v.contains(s))
                .copied()
                .collect();

            let estimated_columns = internal_v.len() + 1;
            let estimated_rows = internal_h.len() + 1;

            let h_regular = is_regular_spacing(&internal_h, config);
            let v_regular = is_regular_spacing(&internal_v, config);

            let confidence = (internal_h.len() as f32 * 0.1
                + internal_v.len() as f32 * 0.1
                + if h_regular { 0.1 } else { 0.0 }
                + if v_regular { 0.1 } else { 0.0 })
            .clamp(0.0, 1.0);

            let border_type = classify_border_type(&graphics.rectangles, &bbox, &border_lines);

            patterns.push(TablePattern {
                bbox,
                border_lines,
                internal_lines: internal_h.into_iter().chain(internal_v).collect(),
                estimated_rows,
                estimated_columns,
                border_type,
                confidence,
            });
        }
    }

    tracing::debug!(pattern_count = patterns.len(), "graphics_processor: synthesized table patterns");

    patterns
}

fn is_regular_spacing(segments: &[LineSegment], config: &PipelineConfig) -> bool {
    let mut positions: Vec<f32> = segments
        .iter()
        .map(|s| match s {
            LineSegment::Horizontal { y, .. } => *y,
            LineSegment::Vertical { x, .. } => *x,
        })
        .collect();
    if positions.len() < 3 {
        return false;
    }
    positions.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let gaps: Vec<f32> = positions.windows(2).map(|p| p[1] - p[0]).collect();
    let mean = gaps.iter().sum::<f32>() / gaps.len() as f32;
    if mean <= 0.0 {
        return false;
    }
    let variance = gaps.iter().map(|g| (g - mean).powi(2)).sum::<f32>() / gaps.len() as f32;
    variance.sqrt() / mean < config.graphics_regular_variance_fraction
}

fn classify_border_type(rectangles: &[Rectangle], bbox: &crate::types::BoundingBox, border_lines: &[LineSegment]) -> BorderType {
    if rectangles.iter().any(|r| r.bbox.contains(bbox) || bbox.contains(&r.bbox)) {
        return BorderType::Rectangle;
    }
    let has_h = border_lines.iter().any(|s| matches!(s, LineSegment::Horizontal { .. }));
    let has_v = border_lines.iter().any(|s| matches!(s, LineSegment::Vertical { .. }));
    match (has_h, has_v) {
        (true, true) => BorderType::Full,
        (true, false) => BorderType::TopBottomOnly,
        (false, true) => BorderType::Partial,
        (false, false) => BorderType::None,
    }
}
