//! The two viewport mapping algorithms.
//!
//! Both directions work over the same picture: a vertical stack of
//! rendered blocks, each tagged with the `[start, end)` source span it
//! was rendered from and measured in content-space pixels (y grows
//! downward from the top of the rendered document, independent of the
//! current scroll position).
//!
//! [`scroll_top_for_offset`] maps a source offset to the scroll position
//! that centers it; [`offset_at_center`] maps the current viewport
//! center back to a source offset. Each scans for two anchors - the
//! nearest block edge at-or-before the target and the nearest at-or-
//! after - and interpolates linearly between them. Anchor selection
//! uses `Option` sentinels with strict comparisons, so the first block
//! reaching a given distance in document order wins ties.
//!
//! Degenerate inputs (no spanned blocks, target outside every rendered
//! span) yield `None`, never a non-finite command.

use lawmark_common::SourceSpan;

/// One rendered block's layout: its source span (None for structural
/// wrappers, which both algorithms skip) and its vertical extent in
/// content-space pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlockBox {
    /// Source provenance of the block.
    pub span: Option<SourceSpan>,
    /// Top edge, content-space.
    pub top: f64,
    /// Bottom edge, content-space.
    pub bottom: f64,
}

impl BlockBox {
    /// A spanned block covering `top..bottom`.
    pub fn new(span: SourceSpan, top: f64, bottom: f64) -> Self {
        Self {
            span: Some(span),
            top,
            bottom,
        }
    }

    /// Check whether the block's extent intersects the given scroll
    /// window `[scroll_top, scroll_top + height)`.
    pub fn intersects(&self, scroll_top: f64, height: f64) -> bool {
        self.bottom > scroll_top && self.top < scroll_top + height
    }
}

/// Scroll geometry of the preview viewport.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportMetrics {
    /// Visible height in pixels.
    pub height: f64,
    /// Current scroll position (content-space y of the viewport top).
    pub scroll_top: f64,
    /// Total rendered content height.
    pub content_height: f64,
}

impl ViewportMetrics {
    /// Content-space y of the viewport's vertical center.
    pub fn center(&self) -> f64 {
        self.scroll_top + self.height / 2.0
    }
}

/// An interpolation anchor: a block edge at signed distance `d` from the
/// target, carrying the value `v` to interpolate (a pixel y or a source
/// offset, depending on direction).
#[derive(Clone, Copy)]
struct Anchor {
    d: f64,
    v: f64,
}

/// Linear interpolation between the at-or-before anchor (`d <= 0`) and
/// the at-or-after anchor (`d >= 0`). When both anchors sit exactly on
/// the target (a shared block edge) the anchor value itself is the
/// result rather than a degenerate 0/0 ratio.
fn interpolate(before: Anchor, after: Anchor) -> Option<f64> {
    let denom = after.d - before.d;
    if denom == 0.0 {
        // before.d <= 0 <= after.d, so equal distances are both zero.
        return Some(before.v);
    }
    let r = -before.d / denom;
    let v = before.v + r * (after.v - before.v);
    v.is_finite().then_some(v)
}

/// Compute the scroll position that puts source offset `offset` at the
/// vertical center of the viewport.
///
/// Scans every spanned block: the block edge closest to the target from
/// at-or-before and the edge closest from at-or-after become the
/// interpolation anchors, and the target's content-space y is
/// interpolated between their pixel positions by its position between
/// their offsets. Returns `None` when no valid anchor pair exists; the
/// caller must treat that as "do not move".
pub fn scroll_top_for_offset(
    offset: usize,
    blocks: &[BlockBox],
    metrics: &ViewportMetrics,
) -> Option<f64> {
    let mut before: Option<Anchor> = None;
    let mut after: Option<Anchor> = None;

    for block in blocks {
        let Some(span) = block.span else { continue };
        let rel_start = span.start as f64 - offset as f64;
        let rel_end = span.end as f64 - offset as f64;

        // A block entirely at-or-before the target contributes its
        // bottom edge; one overlapping or after contributes its top.
        let (before_v, before_d) = if rel_end <= 0.0 {
            (block.bottom, rel_end)
        } else {
            (block.top, rel_start)
        };
        let (after_v, after_d) = if rel_start >= 0.0 {
            (block.top, rel_start)
        } else {
            (block.bottom, rel_end)
        };

        if before_d <= 0.0 && before.is_none_or(|a| a.d < before_d) {
            before = Some(Anchor {
                d: before_d,
                v: before_v,
            });
        }
        if after_d >= 0.0 && after.is_none_or(|a| after_d < a.d) {
            after = Some(Anchor {
                d: after_d,
                v: after_v,
            });
        }
    }

    let target_y = interpolate(before?, after?)?;
    let scroll_top = target_y - metrics.height / 2.0;
    if !scroll_top.is_finite() {
        tracing::trace!(
            target: "lawmark::geometry",
            offset,
            "degenerate scroll target, ignoring"
        );
        return None;
    }
    Some(scroll_top)
}

/// Compute the source offset the viewport is currently centered on.
///
/// `visible` must contain only the blocks intersecting the viewport
/// (the surface's visibility observation maintains that set). The same
/// anchor rule as [`scroll_top_for_offset`] runs in the opposite
/// direction: block edges are measured by pixel distance from the
/// viewport center, and the anchors' *source offsets* are interpolated.
/// Returns `None` when nothing spanned is visible.
pub fn offset_at_center(visible: &[BlockBox], metrics: &ViewportMetrics) -> Option<usize> {
    let center = metrics.center();
    let mut above: Option<Anchor> = None;
    let mut below: Option<Anchor> = None;

    for block in visible {
        let Some(span) = block.span else { continue };
        let rel_top = block.top - center;
        let rel_bottom = block.bottom - center;

        let (above_v, above_d) = if rel_bottom <= 0.0 {
            (span.end as f64, rel_bottom)
        } else {
            (span.start as f64, rel_top)
        };
        let (below_v, below_d) = if rel_top >= 0.0 {
            (span.start as f64, rel_top)
        } else {
            (span.end as f64, rel_bottom)
        };

        if above_d <= 0.0 && above.is_none_or(|a| a.d < above_d) {
            above = Some(Anchor {
                d: above_d,
                v: above_v,
            });
        }
        if below_d >= 0.0 && below.is_none_or(|a| below_d < a.d) {
            below = Some(Anchor {
                d: below_d,
                v: below_v,
            });
        }
    }

    let offset = interpolate(above?, below?)?;
    if !offset.is_finite() {
        return None;
    }
    Some(offset.round().max(0.0) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Three adjacent blocks [0,10) [10,25) [25,40), 60/80/60 px tall.
    fn three_blocks() -> Vec<BlockBox> {
        vec![
            BlockBox::new(SourceSpan::new(0, 10), 0.0, 60.0),
            BlockBox::new(SourceSpan::new(10, 25), 60.0, 140.0),
            BlockBox::new(SourceSpan::new(25, 40), 140.0, 200.0),
        ]
    }

    fn metrics(scroll_top: f64) -> ViewportMetrics {
        ViewportMetrics {
            height: 100.0,
            scroll_top,
            content_height: 200.0,
        }
    }

    #[test]
    fn test_center_on_shared_edge_returns_boundary_offset() {
        // Viewport center exactly on the 60px edge shared by [0,10) and
        // [10,25): the boundary offset, not a degenerate ratio.
        let blocks = three_blocks();
        let offset = offset_at_center(&blocks, &metrics(10.0));
        assert_eq!(offset, Some(10));
    }

    #[test]
    fn test_center_inside_block_returns_interior_offset() {
        // Center at 100px, inside [10,25)'s 60..140 box.
        let blocks = three_blocks();
        let offset = offset_at_center(&blocks, &metrics(50.0)).unwrap();
        assert!(offset > 10 && offset < 25, "got {offset}");
    }

    #[test]
    fn test_center_offset_interpolates_linearly() {
        // Center at 80px = a quarter into [10,25)'s box.
        let blocks = three_blocks();
        let offset = offset_at_center(&blocks, &metrics(30.0));
        // 10 + 0.25 * 15 = 13.75, rounds to 14.
        assert_eq!(offset, Some(14));
    }

    #[test]
    fn test_scroll_target_centers_offset() {
        let blocks = three_blocks();
        // Offset 10 sits exactly on the 60px edge.
        let scroll_top = scroll_top_for_offset(10, &blocks, &metrics(0.0));
        assert_eq!(scroll_top, Some(10.0));

        // Offset strictly inside [10,25) interpolates within its box.
        let scroll_top = scroll_top_for_offset(13, &blocks, &metrics(0.0)).unwrap();
        let expected = 60.0 + (3.0 / 15.0) * 80.0 - 50.0;
        assert!((scroll_top - expected).abs() < 1e-9, "got {scroll_top}");
    }

    #[test]
    fn test_round_trip_within_block_granularity() {
        let blocks = three_blocks();
        for offset in [0, 5, 10, 17, 25, 33] {
            let scroll_top = scroll_top_for_offset(offset, &blocks, &metrics(0.0)).unwrap();
            let moved = metrics(scroll_top);
            let visible: Vec<BlockBox> = blocks
                .iter()
                .copied()
                .filter(|b| b.intersects(moved.scroll_top, moved.height))
                .collect();
            let back = offset_at_center(&visible, &moved).unwrap();

            // Identify the block span containing (or starting at) the
            // original offset; the round trip must land within it.
            let span = blocks
                .iter()
                .filter_map(|b| b.span)
                .find(|s| s.contains(offset) || s.start == offset)
                .unwrap();
            assert!(
                back >= span.start.saturating_sub(1) && back <= span.end,
                "offset {offset} round-tripped to {back}, outside {span:?}"
            );
        }
    }

    #[test]
    fn test_empty_blocks_yield_none() {
        assert_eq!(scroll_top_for_offset(5, &[], &metrics(0.0)), None);
        assert_eq!(offset_at_center(&[], &metrics(0.0)), None);
    }

    #[test]
    fn test_structural_blocks_only_yield_none() {
        let blocks = vec![BlockBox {
            span: None,
            top: 0.0,
            bottom: 100.0,
        }];
        assert_eq!(scroll_top_for_offset(5, &blocks, &metrics(0.0)), None);
        assert_eq!(offset_at_center(&blocks, &metrics(0.0)), None);
    }

    #[test]
    fn test_offset_beyond_rendered_range_yields_none() {
        // No block edge lies at-or-after offset 100, so no anchor pair.
        let blocks = three_blocks();
        assert_eq!(scroll_top_for_offset(100, &blocks, &metrics(0.0)), None);
    }

    #[test]
    fn test_viewport_over_gap_yields_none() {
        // Visible set filtered to a scroll window past every block.
        let blocks = three_blocks();
        let moved = metrics(500.0);
        let visible: Vec<BlockBox> = blocks
            .iter()
            .copied()
            .filter(|b| b.intersects(moved.scroll_top, moved.height))
            .collect();
        assert_eq!(offset_at_center(&visible, &moved), None);
    }

    #[test]
    fn test_first_block_wins_distance_ties() {
        // Two blocks sharing the edge at 60px and the offset 10; the
        // earlier block's edge is kept under strict comparison.
        let blocks = three_blocks();
        // Both directions stay finite and pinned to the shared edge.
        assert_eq!(scroll_top_for_offset(10, &blocks, &metrics(0.0)), Some(10.0));
        assert_eq!(offset_at_center(&blocks, &metrics(10.0)), Some(10));
    }
}
