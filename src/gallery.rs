//! Justified gallery layout.
//!
//! Every row is scaled to exactly fill the container width while each image
//! keeps its aspect ratio. Rows are formed by a fixed per-row quota of
//! `ceil(count / target_rows)` images, not by width balancing, so the last
//! row may hold fewer images.
//!
//! For a row of `k` images with aspect ratios `a_i`, container width `W` and
//! gutter `g`, the uniform row height is:
//!
//! ```text
//! h = (W - g·(k-1)) / Σ a_i        width_i = a_i · h
//! ```
//!
//! All functions are pure.

/// Aspect ratio assumed for images without usable intrinsic dimensions.
pub const FALLBACK_ASPECT: f64 = 1.0;

/// One image's placement within a row.
#[derive(Debug, Clone, PartialEq)]
pub struct RowItem {
    /// Position of the image in the input sequence.
    pub index: usize,
    pub aspect_ratio: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JustifiedRow {
    pub items: Vec<RowItem>,
}

impl JustifiedRow {
    pub fn height(&self) -> f64 {
        self.items.first().map(|i| i.height).unwrap_or(0.0)
    }

    /// Sum of image widths plus inner gutters.
    pub fn total_width(&self, gutter: f64) -> f64 {
        let widths: f64 = self.items.iter().map(|i| i.width).sum();
        widths + gutter * self.items.len().saturating_sub(1) as f64
    }
}

/// Aspect ratio of a `(width, height)` pair, falling back for degenerate sizes.
pub fn aspect_ratio(dimensions: Option<(u32, u32)>) -> f64 {
    match dimensions {
        Some((w, h)) if w > 0 && h > 0 => w as f64 / h as f64,
        _ => FALLBACK_ASPECT,
    }
}

/// Number of images per row for a given count and target row count.
pub fn per_row_quota(count: usize, target_rows: usize) -> usize {
    count.div_ceil(target_rows.max(1))
}

/// Lay out images with the given aspect ratios into justified rows.
///
/// Zero images produce zero rows; callers render the empty state.
pub fn layout(
    aspects: &[f64],
    target_rows: usize,
    gutter: f64,
    container_width: f64,
) -> Vec<JustifiedRow> {
    if aspects.is_empty() {
        return Vec::new();
    }
    let quota = per_row_quota(aspects.len(), target_rows);
    let gutter = gutter.max(0.0);

    aspects
        .chunks(quota)
        .enumerate()
        .map(|(row_idx, row)| {
            let first = row_idx * quota;
            let ratio_sum: f64 = row.iter().sum();
            let available = container_width - gutter * (row.len() - 1) as f64;
            let height = available / ratio_sum;
            JustifiedRow {
                items: row
                    .iter()
                    .enumerate()
                    .map(|(i, &aspect_ratio)| RowItem {
                        index: first + i,
                        aspect_ratio,
                        width: aspect_ratio * height,
                        height,
                    })
                    .collect(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn six_squares_three_rows() {
        let rows = layout(&[1.0; 6], 3, 0.0, 900.0);
        assert_eq!(rows.len(), 3);
        for row in &rows {
            assert_eq!(row.items.len(), 2);
            for item in &row.items {
                assert!((item.width - 450.0).abs() < EPS);
                assert!((item.height - 450.0).abs() < EPS);
            }
        }
    }

    #[test]
    fn empty_input_gives_no_rows() {
        assert!(layout(&[], 3, 8.0, 1000.0).is_empty());
    }

    #[test]
    fn rows_fill_container_exactly() {
        let aspects = [1.5, 0.66, 1.0, 2.4, 0.8, 1.33, 0.5];
        for rows in 1..=10 {
            for gutter in [0.0, 8.0, 50.0] {
                for row in layout(&aspects, rows, gutter, 1000.0) {
                    assert!(
                        (row.total_width(gutter) - 1000.0).abs() < 1e-6,
                        "rows={rows} gutter={gutter}"
                    );
                }
            }
        }
    }

    #[test]
    fn uneven_count_leaves_short_last_row() {
        let rows = layout(&[1.0; 7], 3, 0.0, 900.0);
        let sizes: Vec<usize> = rows.iter().map(|r| r.items.len()).collect();
        assert_eq!(sizes, vec![3, 3, 1]);
    }

    #[test]
    fn quota_can_produce_fewer_rows_than_target() {
        // ceil(4/3) = 2 per row → only 2 rows
        let rows = layout(&[1.0; 4], 3, 0.0, 100.0);
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn indices_follow_input_order() {
        let rows = layout(&[1.0; 5], 2, 4.0, 500.0);
        let indices: Vec<usize> = rows
            .iter()
            .flat_map(|r| r.items.iter().map(|i| i.index))
            .collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn zero_target_rows_is_one_row() {
        let rows = layout(&[1.0, 2.0], 0, 0.0, 300.0);
        assert_eq!(rows.len(), 1);
        assert!((rows[0].height() - 100.0).abs() < EPS);
    }

    #[test]
    fn gutter_reduces_row_height() {
        let rows = layout(&[1.0, 1.0], 1, 10.0, 210.0);
        assert!((rows[0].height() - 100.0).abs() < EPS);
    }

    #[test]
    fn aspect_ratio_falls_back_for_missing_or_zero() {
        assert_eq!(aspect_ratio(None), FALLBACK_ASPECT);
        assert_eq!(aspect_ratio(Some((0, 100))), FALLBACK_ASPECT);
        assert!((aspect_ratio(Some((1600, 1200))) - 4.0 / 3.0).abs() < EPS);
    }
}
