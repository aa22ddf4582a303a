//! Geometric helpers for collision detection and grid scanning.

use crate::model::Pallet;
use crate::types::{BoundingBox, EPSILON_GENERAL};

/// Checks whether two placed pallets overlap in space.
///
/// Unplaced pallets never intersect anything.
pub fn intersects(a: &Pallet, b: &Pallet) -> bool {
    match (a.bounding_box(), b.bounding_box()) {
        (Some(a), Some(b)) => a.intersects(&b),
        _ => false,
    }
}

/// Returns the first placed pallet whose bounding box intersects `candidate`.
pub fn first_collision<'a>(candidate: &BoundingBox, placed: &'a [Pallet]) -> Option<&'a Pallet> {
    placed.iter().find(|p| {
        p.bounding_box()
            .is_some_and(|existing| existing.intersects(candidate))
    })
}

/// Generates grid positions `start, start + step, ...` up to and including `max`.
///
/// Positions are computed from their index so that long scans do not
/// accumulate rounding drift. The sequence is produced lazily. It is empty
/// when `max < start`, when `step` is not a positive finite number, or when
/// the number of cells does not fit into `usize`.
///
/// # Parameters
/// * `start` - First position
/// * `max` - Largest admissible position
/// * `step` - Grid granularity, must be positive
pub fn grid_positions(start: f64, max: f64, step: f64) -> impl Iterator<Item = f64> + Clone {
    let (first, last) = match cell_count(start, max, step) {
        Some(steps) => (0, steps),
        None => (1, 0),
    };
    (first..=last).map(move |i| start + i as f64 * step)
}

/// Index of the last grid cell in `[start, max]`, `None` if there is none.
fn cell_count(start: f64, max: f64, step: f64) -> Option<usize> {
    if step <= 0.0 || !step.is_finite() || !start.is_finite() || max + EPSILON_GENERAL < start {
        return None;
    }
    let steps = ((max - start) / step + EPSILON_GENERAL).floor();
    if !steps.is_finite() || steps >= usize::MAX as f64 {
        return None;
    }
    Some(steps as usize)
}
