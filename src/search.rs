//! First-fit footprint search inside a zone.

use crate::geometry::{first_collision, grid_positions};
use crate::model::{Pallet, Trailer};
use crate::types::{Dimensional, Vec3};
use crate::zones::Zone;

/// Finds the first collision-free floor position for `pallet` inside `zone`.
///
/// Scans `x` from the zone start to `zone.end - length` (outer loop) and `y`
/// from 0 to `trailer.width - width` (inner loop) in steps of `step`, always
/// at `z = 0`. The pallet's current orientation is used as is.
///
/// # Parameters
/// * `pallet` - The pallet to place
/// * `zone` - Zone whose X range bounds the scan
/// * `trailer` - Trailer providing the width and the loaded pallets
/// * `step` - Grid granularity
///
/// # Returns
/// `Some(position)` of the first free cell, `None` if the grid is exhausted
pub fn find_position_in_zone(
    pallet: &Pallet,
    zone: &Zone,
    trailer: &Trailer,
    step: f64,
) -> Option<Vec3> {
    let dims = pallet.dimensions();
    let xs = grid_positions(zone.start, zone.end - dims.x, step);
    let ys = grid_positions(0.0, trailer.width() - dims.y, step);

    for x in xs {
        for y in ys.clone() {
            let position = Vec3::new(x, y, 0.0);
            let candidate = pallet.bounding_box_at(position);
            if first_collision(&candidate, trailer.loaded()).is_none() {
                return Some(position);
            }
        }
    }
    None
}
