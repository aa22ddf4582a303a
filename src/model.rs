//! Data models for trailer loading.
//!
//! This module defines the entities the loading strategies operate on:
//! - `Pallet`: a transport pallet with dimensions, weights and placement state
//! - `Trailer`: the loading space with its authoritative validator
//! - `PalletQueue`: the owned queue of pallets still waiting for a placement

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::geometry::first_collision;
use crate::types::{BoundingBox, Dimensional, EPSILON_GENERAL, Vec3, Weighted};

/// Validation error for pallet and trailer data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Invalid dimension: {0}")]
    InvalidDimension(String),
    #[error("Invalid weight: {0}")]
    InvalidWeight(String),
    #[error("Invalid pallet type: {0}")]
    InvalidPalletType(String),
}

fn validate_dimension(value: f64, name: &str) -> Result<(), ValidationError> {
    if value <= 0.0 || value.is_nan() || value.is_infinite() {
        return Err(ValidationError::InvalidDimension(format!(
            "{} must be positive, got: {}",
            name, value
        )));
    }
    Ok(())
}

fn validate_dimensions(dims: (f64, f64, f64), owner: &str) -> Result<(), ValidationError> {
    if Vec3::from_tuple(dims).is_valid_dimension() {
        return Ok(());
    }
    // Report the first offending axis.
    validate_dimension(dims.0, &format!("{owner} length"))?;
    validate_dimension(dims.1, &format!("{owner} width"))?;
    validate_dimension(dims.2, &format!("{owner} height"))?;
    Ok(())
}

fn validate_positive_weight(value: f64, name: &str) -> Result<(), ValidationError> {
    if value <= 0.0 || value.is_nan() || value.is_infinite() {
        return Err(ValidationError::InvalidWeight(format!(
            "{} must be positive, got: {}",
            name, value
        )));
    }
    Ok(())
}

fn validate_cargo_weight(value: f64) -> Result<(), ValidationError> {
    if value < 0.0 || value.is_nan() || value.is_infinite() {
        return Err(ValidationError::InvalidWeight(format!(
            "Cargo weight must not be negative, got: {}",
            value
        )));
    }
    Ok(())
}

/// Pallet type tag.
///
/// Every type except `Custom` has a catalog entry with standard dimensions and
/// tare weight.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PalletType {
    #[default]
    Eur,
    Eur2,
    Industrial,
    HalfEur,
    Custom,
}

/// Catalog entry of a standard pallet type (mm, kg).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PalletSpec {
    pub length: f64,
    pub width: f64,
    pub height: f64,
    pub tare_weight: f64,
}

impl PalletType {
    /// Returns the catalog entry, `None` for `Custom`.
    pub fn spec(self) -> Option<PalletSpec> {
        let (length, width, height, tare_weight) = match self {
            PalletType::Eur => (1200.0, 800.0, 144.0, 25.0),
            PalletType::Eur2 => (1200.0, 1000.0, 144.0, 30.0),
            PalletType::Industrial => (1200.0, 1200.0, 150.0, 35.0),
            PalletType::HalfEur => (800.0, 600.0, 144.0, 15.0),
            PalletType::Custom => return None,
        };
        Some(PalletSpec {
            length,
            width,
            height,
            tare_weight,
        })
    }

    pub fn code(self) -> &'static str {
        match self {
            PalletType::Eur => "EUR",
            PalletType::Eur2 => "EUR2",
            PalletType::Industrial => "INDUSTRIAL",
            PalletType::HalfEur => "HALF_EUR",
            PalletType::Custom => "CUSTOM",
        }
    }
}

/// A transport pallet.
///
/// Dimensions are stored in the unrotated orientation; `dimensions()` swaps
/// length and width while the pallet is rotated. Placement state is only
/// changed through `place`, `rotate` and `clear_placement`.
#[derive(Clone, Debug, PartialEq)]
pub struct Pallet {
    id: String,
    kind: PalletType,
    length: f64,
    width: f64,
    height: f64,
    tare_weight: f64,
    cargo_weight: f64,
    position: Option<Vec3>,
    rotated: bool,
}

impl Pallet {
    /// Creates a new pallet with validation.
    ///
    /// # Parameters
    /// * `id` - Unique identifier
    /// * `kind` - Type tag
    /// * `dims` - Dimensions (length, width, height) in mm
    /// * `tare_weight` - Weight of the empty pallet in kg
    /// * `cargo_weight` - Weight of the cargo on the pallet in kg
    ///
    /// # Examples
    /// ```
    /// use trailer_loader::model::{Pallet, PalletType};
    ///
    /// let ok = Pallet::new("P1", PalletType::Custom, (1000.0, 500.0, 200.0), 20.0, 300.0);
    /// assert!(ok.is_ok());
    ///
    /// let invalid = Pallet::new("P2", PalletType::Custom, (-1.0, 500.0, 200.0), 20.0, 0.0);
    /// assert!(invalid.is_err());
    /// ```
    pub fn new(
        id: impl Into<String>,
        kind: PalletType,
        dims: (f64, f64, f64),
        tare_weight: f64,
        cargo_weight: f64,
    ) -> Result<Self, ValidationError> {
        validate_dimensions(dims, "Pallet")?;
        validate_positive_weight(tare_weight, "Tare weight")?;
        validate_cargo_weight(cargo_weight)?;

        Ok(Self {
            id: id.into(),
            kind,
            length: dims.0,
            width: dims.1,
            height: dims.2,
            tare_weight,
            cargo_weight,
            position: None,
            rotated: false,
        })
    }

    /// Creates a pallet of a catalog type carrying `cargo_weight`.
    pub fn standard(
        id: impl Into<String>,
        kind: PalletType,
        cargo_weight: f64,
    ) -> Result<Self, ValidationError> {
        let spec = kind.spec().ok_or_else(|| {
            ValidationError::InvalidPalletType(format!(
                "{} has no standard dimensions",
                kind.code()
            ))
        })?;
        Self::new(
            id,
            kind,
            (spec.length, spec.width, spec.height),
            spec.tare_weight,
            cargo_weight,
        )
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> PalletType {
        self.kind
    }

    /// Unrotated length in mm.
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Unrotated width in mm.
    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn tare_weight(&self) -> f64 {
        self.tare_weight
    }

    pub fn cargo_weight(&self) -> f64 {
        self.cargo_weight
    }

    /// Tare plus cargo weight in kg.
    pub fn total_weight(&self) -> f64 {
        self.tare_weight + self.cargo_weight
    }

    pub fn position(&self) -> Option<Vec3> {
        self.position
    }

    pub fn is_placed(&self) -> bool {
        self.position.is_some()
    }

    pub fn is_rotated(&self) -> bool {
        self.rotated
    }

    /// Turns the pallet by 90 degrees in the floor plane.
    pub fn rotate(&mut self) {
        self.rotated = !self.rotated;
    }

    /// Sets the position of the lower-left-front corner.
    pub fn place(&mut self, position: Vec3) {
        self.position = Some(position);
    }

    /// Removes position and rotation.
    pub fn clear_placement(&mut self) {
        self.position = None;
        self.rotated = false;
    }

    /// Returns a copy of this pallet without placement state.
    pub fn unplaced_copy(&self) -> Self {
        let mut copy = self.clone();
        copy.clear_placement();
        copy
    }

    /// Bounding box the pallet would occupy at `position` in its current orientation.
    #[inline]
    pub fn bounding_box_at(&self, position: Vec3) -> BoundingBox {
        BoundingBox::from_position_and_dims(position, self.dimensions())
    }

    /// Bounding box of the placed pallet, `None` while unplaced.
    #[inline]
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.position.map(|position| self.bounding_box_at(position))
    }
}

impl Dimensional for Pallet {
    fn dimensions(&self) -> Vec3 {
        if self.rotated {
            Vec3::new(self.width, self.length, self.height)
        } else {
            Vec3::new(self.length, self.width, self.height)
        }
    }
}

impl Weighted for Pallet {
    fn weight(&self) -> f64 {
        self.total_weight()
    }
}

/// Why the trailer refused a pallet.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RejectionReason {
    #[error("pallet has no position")]
    Unpositioned,
    #[error("pallet exceeds the trailer bounds")]
    OutOfBounds,
    #[error("pallet collides with pallet {with}")]
    Collision { with: String },
    #[error("load of {attempted} kg would exceed the maximum of {max} kg")]
    Overweight { attempted: f64, max: f64 },
}

impl RejectionReason {
    pub fn code(&self) -> &'static str {
        match self {
            RejectionReason::Unpositioned => "unpositioned",
            RejectionReason::OutOfBounds => "out_of_bounds",
            RejectionReason::Collision { .. } => "collision",
            RejectionReason::Overweight { .. } => "overweight",
        }
    }
}

/// A pallet refused by `Trailer::add`, handed back to the caller.
#[derive(Debug)]
pub struct Rejection {
    pub pallet: Pallet,
    pub reason: RejectionReason,
}

impl Rejection {
    pub fn into_pallet(self) -> Pallet {
        self.pallet
    }
}

/// The trailer being loaded.
///
/// Loaded pallets are only reachable through `add`, which re-validates every
/// pallet against bounds, collisions and the weight limit.
#[derive(Clone, Debug)]
pub struct Trailer {
    length: f64,
    width: f64,
    height: f64,
    max_weight: f64,
    loaded: Vec<Pallet>,
}

impl Trailer {
    pub const STANDARD_LENGTH: f64 = 13_600.0;
    pub const STANDARD_WIDTH: f64 = 2_450.0;
    pub const STANDARD_HEIGHT: f64 = 2_700.0;
    pub const STANDARD_MAX_WEIGHT: f64 = 24_000.0;

    /// Creates a new empty trailer with validation.
    ///
    /// # Parameters
    /// * `dims` - Dimensions (length, width, height) in mm
    /// * `max_weight` - Maximum total load in kg
    pub fn new(dims: (f64, f64, f64), max_weight: f64) -> Result<Self, ValidationError> {
        validate_dimensions(dims, "Trailer")?;
        validate_positive_weight(max_weight, "Maximum load")?;

        Ok(Self {
            length: dims.0,
            width: dims.1,
            height: dims.2,
            max_weight,
            loaded: Vec::new(),
        })
    }

    /// An empty standard semi-trailer (13.6 m, 24 t).
    pub fn standard() -> Self {
        Self {
            length: Self::STANDARD_LENGTH,
            width: Self::STANDARD_WIDTH,
            height: Self::STANDARD_HEIGHT,
            max_weight: Self::STANDARD_MAX_WEIGHT,
            loaded: Vec::new(),
        }
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn max_weight(&self) -> f64 {
        self.max_weight
    }

    /// Pallets accepted so far, in acceptance order.
    pub fn loaded(&self) -> &[Pallet] {
        &self.loaded
    }

    /// Sum of the total weights of all loaded pallets.
    pub fn total_weight(&self) -> f64 {
        self.loaded.iter().map(Weighted::weight).sum()
    }

    pub fn remaining_weight(&self) -> f64 {
        self.max_weight - self.total_weight()
    }

    pub fn used_volume(&self) -> f64 {
        self.loaded.iter().map(Dimensional::volume).sum()
    }

    /// Percentage of the cargo space occupied by loaded pallets.
    pub fn utilization_percent(&self) -> f64 {
        let total = self.volume();
        if total <= 0.0 {
            return 0.0;
        }
        (self.used_volume() / total) * 100.0
    }

    fn bounds(&self) -> BoundingBox {
        BoundingBox::from_position_and_dims(Vec3::zero(), self.dimensions())
    }

    /// Adds a pallet after validating position, bounds, collisions and weight.
    ///
    /// The trailer is left unchanged on rejection and the pallet is returned
    /// inside the `Rejection`.
    pub fn add(&mut self, pallet: Pallet) -> Result<(), Rejection> {
        let Some(candidate) = pallet.bounding_box() else {
            return Err(Rejection {
                pallet,
                reason: RejectionReason::Unpositioned,
            });
        };

        if !candidate.is_within(&self.bounds(), EPSILON_GENERAL) {
            return Err(Rejection {
                pallet,
                reason: RejectionReason::OutOfBounds,
            });
        }

        if let Some(other) = first_collision(&candidate, &self.loaded) {
            let with = other.id().to_string();
            return Err(Rejection {
                pallet,
                reason: RejectionReason::Collision { with },
            });
        }

        let attempted = self.total_weight() + pallet.total_weight();
        if attempted > self.max_weight + EPSILON_GENERAL {
            return Err(Rejection {
                pallet,
                reason: RejectionReason::Overweight {
                    attempted,
                    max: self.max_weight,
                },
            });
        }

        self.loaded.push(pallet);
        Ok(())
    }

    /// Removes a loaded pallet by id.
    pub fn remove(&mut self, id: &str) -> Option<Pallet> {
        let index = self.loaded.iter().position(|p| p.id() == id)?;
        Some(self.loaded.remove(index))
    }

    /// Empties the trailer and returns everything that was loaded.
    pub fn reset(&mut self) -> Vec<Pallet> {
        std::mem::take(&mut self.loaded)
    }
}

impl Dimensional for Trailer {
    fn dimensions(&self) -> Vec3 {
        Vec3::new(self.length, self.width, self.height)
    }
}

/// Owned queue of pallets waiting for a placement decision.
///
/// Removing an element hands its ownership to the caller.
#[derive(Clone, Debug, Default)]
pub struct PalletQueue {
    pending: VecDeque<Pallet>,
}

impl PalletQueue {
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Removes the pallet at `index`, `None` if out of range.
    pub fn take(&mut self, index: usize) -> Option<Pallet> {
        self.pending.remove(index)
    }

    pub fn pop_front(&mut self) -> Option<Pallet> {
        self.take(0)
    }

}

impl FromIterator<Pallet> for PalletQueue {
    fn from_iter<I: IntoIterator<Item = Pallet>>(iter: I) -> Self {
        Self {
            pending: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn custom(id: &str, dims: (f64, f64, f64), weight: f64) -> Pallet {
        Pallet::new(id, PalletType::Custom, dims, weight, 0.0).unwrap()
    }

    fn placed(id: &str, dims: (f64, f64, f64), weight: f64, pos: (f64, f64, f64)) -> Pallet {
        let mut pallet = custom(id, dims, weight);
        pallet.place(Vec3::from_tuple(pos));
        pallet
    }

    #[test]
    fn standard_pallet_uses_catalog() {
        let pallet = Pallet::standard("EUR_1", PalletType::Eur, 475.0).unwrap();
        assert_eq!(pallet.length(), 1200.0);
        assert_eq!(pallet.width(), 800.0);
        assert_eq!(pallet.total_weight(), 500.0);
        assert!(!pallet.is_placed());
    }

    #[test]
    fn custom_type_has_no_standard() {
        let result = Pallet::standard("X", PalletType::Custom, 10.0);
        assert!(matches!(result, Err(ValidationError::InvalidPalletType(_))));
    }

    #[test]
    fn rejects_malformed_pallets() {
        assert!(Pallet::new("A", PalletType::Custom, (0.0, 1.0, 1.0), 1.0, 0.0).is_err());
        assert!(Pallet::new("A", PalletType::Custom, (1.0, f64::NAN, 1.0), 1.0, 0.0).is_err());
        assert!(Pallet::new("A", PalletType::Custom, (1.0, 1.0, 1.0), 0.0, 0.0).is_err());
        assert!(Pallet::new("A", PalletType::Custom, (1.0, 1.0, 1.0), 1.0, -5.0).is_err());
    }

    #[test]
    fn rotation_swaps_length_and_width() {
        let mut pallet = custom("A", (1200.0, 800.0, 144.0), 25.0);
        assert_eq!(pallet.dimensions(), Vec3::new(1200.0, 800.0, 144.0));
        pallet.rotate();
        assert!(pallet.is_rotated());
        assert_eq!(pallet.dimensions(), Vec3::new(800.0, 1200.0, 144.0));
        pallet.rotate();
        assert!(!pallet.is_rotated());
    }

    #[test]
    fn unplaced_copy_drops_placement() {
        let mut pallet = placed("A", (100.0, 50.0, 10.0), 5.0, (10.0, 0.0, 0.0));
        pallet.rotate();
        let copy = pallet.unplaced_copy();
        assert!(copy.position().is_none());
        assert!(!copy.is_rotated());
        assert_eq!(copy.id(), "A");
    }

    #[test]
    fn trailer_accepts_valid_pallet() {
        let mut trailer = Trailer::new((1000.0, 500.0, 300.0), 100.0).unwrap();
        let pallet = placed("A", (100.0, 100.0, 100.0), 40.0, (0.0, 0.0, 0.0));
        assert!(trailer.add(pallet).is_ok());
        assert_eq!(trailer.loaded().len(), 1);
        assert_eq!(trailer.total_weight(), 40.0);
        assert_eq!(trailer.remaining_weight(), 60.0);
    }

    #[test]
    fn trailer_rejects_unpositioned_pallet() {
        let mut trailer = Trailer::new((1000.0, 500.0, 300.0), 100.0).unwrap();
        let rejection = trailer.add(custom("A", (100.0, 100.0, 100.0), 40.0)).unwrap_err();
        assert_eq!(rejection.reason, RejectionReason::Unpositioned);
        assert!(trailer.loaded().is_empty());
    }

    #[test]
    fn trailer_rejects_out_of_bounds() {
        let mut trailer = Trailer::new((1000.0, 500.0, 300.0), 100.0).unwrap();
        let too_tall = placed("A", (100.0, 100.0, 400.0), 10.0, (0.0, 0.0, 0.0));
        let sticking_out = placed("B", (100.0, 100.0, 100.0), 10.0, (950.0, 0.0, 0.0));

        assert_eq!(
            trailer.add(too_tall).unwrap_err().reason,
            RejectionReason::OutOfBounds
        );
        assert_eq!(
            trailer.add(sticking_out).unwrap_err().reason,
            RejectionReason::OutOfBounds
        );
        assert!(trailer.loaded().is_empty());
    }

    #[test]
    fn trailer_rejects_collision_and_returns_pallet() {
        let mut trailer = Trailer::new((1000.0, 500.0, 300.0), 100.0).unwrap();
        trailer
            .add(placed("A", (100.0, 100.0, 100.0), 10.0, (0.0, 0.0, 0.0)))
            .unwrap();

        let rejection = trailer
            .add(placed("B", (100.0, 100.0, 100.0), 10.0, (50.0, 50.0, 0.0)))
            .unwrap_err();
        assert_eq!(
            rejection.reason,
            RejectionReason::Collision {
                with: "A".to_string()
            }
        );
        assert_eq!(rejection.into_pallet().id(), "B");
        assert_eq!(trailer.loaded().len(), 1);
    }

    #[test]
    fn trailer_rejects_overweight() {
        let mut trailer = Trailer::new((1000.0, 500.0, 300.0), 100.0).unwrap();
        trailer
            .add(placed("A", (100.0, 100.0, 100.0), 80.0, (0.0, 0.0, 0.0)))
            .unwrap();

        let rejection = trailer
            .add(placed("B", (100.0, 100.0, 100.0), 30.0, (200.0, 0.0, 0.0)))
            .unwrap_err();
        assert_eq!(rejection.reason.code(), "overweight");
        assert_eq!(trailer.total_weight(), 80.0);
    }

    #[test]
    fn trailer_remove_and_reset() {
        let mut trailer = Trailer::new((1000.0, 500.0, 300.0), 100.0).unwrap();
        trailer
            .add(placed("A", (100.0, 100.0, 100.0), 10.0, (0.0, 0.0, 0.0)))
            .unwrap();
        trailer
            .add(placed("B", (100.0, 100.0, 100.0), 10.0, (100.0, 0.0, 0.0)))
            .unwrap();

        assert_eq!(trailer.remove("A").map(|p| p.id().to_string()), Some("A".into()));
        assert!(trailer.remove("A").is_none());
        assert_eq!(trailer.reset().len(), 1);
        assert!(trailer.loaded().is_empty());
    }

    #[test]
    fn utilization_reflects_loaded_volume() {
        let mut trailer = Trailer::new((100.0, 100.0, 100.0), 100.0).unwrap();
        trailer
            .add(placed("A", (50.0, 100.0, 100.0), 10.0, (0.0, 0.0, 0.0)))
            .unwrap();
        assert!((trailer.utilization_percent() - 50.0).abs() < EPSILON_GENERAL);
    }

    #[test]
    fn invalid_trailer_is_rejected() {
        assert!(Trailer::new((0.0, 100.0, 100.0), 100.0).is_err());
        assert!(Trailer::new((100.0, 100.0, 100.0), 0.0).is_err());
    }

    #[test]
    fn dimension_error_names_the_axis() {
        let err = Pallet::new("P", PalletType::Custom, (100.0, f64::NAN, 100.0), 1.0, 0.0)
            .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidDimension(ref msg) if msg.contains("Pallet width")));

        let err = Trailer::new((100.0, 100.0, -1.0), 100.0).unwrap_err();
        assert!(err.to_string().contains("Trailer height"));
    }

    #[test]
    fn queue_take_returns_ownership() {
        let mut queue: PalletQueue = ["A", "B", "C"]
            .into_iter()
            .map(|id| custom(id, (10.0, 10.0, 10.0), 1.0))
            .collect();

        let taken = queue.take(1).unwrap();
        assert_eq!(taken.id(), "B");
        assert_eq!(queue.len(), 2);
        assert!(queue.take(5).is_none());
        assert_eq!(queue.pop_front().unwrap().id(), "A");
        assert_eq!(queue.pop_front().unwrap().id(), "C");
        assert_eq!(queue.len(), 0);
    }
}
