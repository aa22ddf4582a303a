//! Zone-balanced loading along the trailer length ("X distribution").
//!
//! The trailer is split into equally long zones. Pallets are processed from
//! heaviest to lightest; each one is sent to the zone whose load is closest to
//! the ideal share, placed on the first free grid cell of that zone (turned by
//! 90 degrees if the first orientation does not fit), and committed through the
//! trailer's own validator.

use std::cmp::Ordering;
use std::num::NonZeroUsize;

use serde::Deserialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::model::{Pallet, PalletQueue, RejectionReason, Trailer};
use crate::search::find_position_in_zone;
use crate::strategy::{LoadEvent, LoadObserver, LoadingStrategy, NoopObserver};
use crate::types::Vec3;
use crate::zones::{ZoneBalancer, ZoneChoice, ZoneLayout};

/// Invalid strategy configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("zones must be at least 1, got: {0}")]
    InvalidZones(usize),
    #[error("balancing factor must be a finite value >= 0, got: {0}")]
    InvalidBalancingFactor(f64),
    #[error("grid granularity must be a finite value > 0, got: {0}")]
    InvalidGridGranularity(f64),
    #[error("at most {max} zones are supported, got: {zones}")]
    TooManyZones { zones: usize, max: usize },
    #[error("grid granularity {granularity} yields {cells} cells per axis, at most {max} are supported")]
    GridTooFine {
        granularity: f64,
        cells: f64,
        max: f64,
    },
}

/// Configuration of the X distribution strategy.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct XDistributionConfig {
    /// Number of zones along the trailer length
    pub zones: usize,
    /// Allowed excess of a zone's weight over its fair share (0.1 = 10 %)
    pub balancing_factor: f64,
    /// Step of the position grid in mm
    pub grid_granularity: f64,
}

impl XDistributionConfig {
    pub const DEFAULT_ZONES: usize = 4;
    pub const DEFAULT_BALANCING_FACTOR: f64 = 0.1;
    pub const DEFAULT_GRID_GRANULARITY: f64 = 100.0;
    pub const MAX_ZONES: usize = 1_000;
    /// Upper bound for grid cells along the longest trailer axis.
    pub const MAX_GRID_CELLS_PER_AXIS: f64 = 100_000.0;

    /// Creates a builder for custom configuration.
    pub fn builder() -> XDistributionConfigBuilder {
        XDistributionConfigBuilder::default()
    }

    /// Checks every value against its admissible range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.zones == 0 {
            return Err(ConfigError::InvalidZones(self.zones));
        }
        if self.zones > Self::MAX_ZONES {
            return Err(ConfigError::TooManyZones {
                zones: self.zones,
                max: Self::MAX_ZONES,
            });
        }
        if !self.balancing_factor.is_finite() || self.balancing_factor < 0.0 {
            return Err(ConfigError::InvalidBalancingFactor(self.balancing_factor));
        }
        if !self.grid_granularity.is_finite() || self.grid_granularity <= 0.0 {
            return Err(ConfigError::InvalidGridGranularity(self.grid_granularity));
        }
        Ok(())
    }

    /// Validates the configuration and bounds the position grid on `trailer`.
    pub fn validate_for(&self, trailer: &Trailer) -> Result<(), ConfigError> {
        self.validate()?;
        let cells = trailer.length().max(trailer.width()) / self.grid_granularity;
        if !cells.is_finite() || cells > Self::MAX_GRID_CELLS_PER_AXIS {
            return Err(ConfigError::GridTooFine {
                granularity: self.grid_granularity,
                cells,
                max: Self::MAX_GRID_CELLS_PER_AXIS,
            });
        }
        Ok(())
    }
}

impl Default for XDistributionConfig {
    fn default() -> Self {
        Self {
            zones: Self::DEFAULT_ZONES,
            balancing_factor: Self::DEFAULT_BALANCING_FACTOR,
            grid_granularity: Self::DEFAULT_GRID_GRANULARITY,
        }
    }
}

/// Builder for `XDistributionConfig`.
#[derive(Clone, Debug, Default)]
pub struct XDistributionConfigBuilder {
    config: XDistributionConfig,
}

impl XDistributionConfigBuilder {
    pub fn zones(mut self, zones: usize) -> Self {
        self.config.zones = zones;
        self
    }

    pub fn balancing_factor(mut self, factor: f64) -> Self {
        self.config.balancing_factor = factor;
        self
    }

    pub fn grid_granularity(mut self, step: f64) -> Self {
        self.config.grid_granularity = step;
        self
    }

    pub fn build(self) -> XDistributionConfig {
        self.config
    }
}

/// Partial configuration; unset fields keep the defaults they are merged over.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize, ToSchema)]
pub struct ConfigOverrides {
    #[serde(default)]
    pub zones: Option<usize>,
    #[serde(default)]
    pub balancing_factor: Option<f64>,
    #[serde(default)]
    pub grid_granularity: Option<f64>,
}

/// Applies `overrides` on top of `defaults`.
///
/// # Examples
/// ```
/// use trailer_loader::loader::{ConfigOverrides, XDistributionConfig, merge};
///
/// let overrides = ConfigOverrides { zones: Some(2), ..Default::default() };
/// let config = merge(&XDistributionConfig::default(), &overrides);
/// assert_eq!(config.zones, 2);
/// assert_eq!(config.balancing_factor, XDistributionConfig::DEFAULT_BALANCING_FACTOR);
/// ```
pub fn merge(defaults: &XDistributionConfig, overrides: &ConfigOverrides) -> XDistributionConfig {
    XDistributionConfig {
        zones: overrides.zones.unwrap_or(defaults.zones),
        balancing_factor: overrides.balancing_factor.unwrap_or(defaults.balancing_factor),
        grid_granularity: overrides.grid_granularity.unwrap_or(defaults.grid_granularity),
    }
}

/// Why a pallet was left out of a loading pass.
#[derive(Clone, Debug, PartialEq)]
pub enum UnplacedReason {
    /// Every zone would exceed its balancing tolerance.
    NoBalancedZone,
    /// The selected zone has no free grid cell in either orientation.
    NoFreePosition { zone: usize },
    /// The trailer's validator refused the position found in the zone.
    ValidatorRejected {
        zone: usize,
        reason: RejectionReason,
    },
}

impl UnplacedReason {
    pub fn code(&self) -> &'static str {
        match self {
            UnplacedReason::NoBalancedZone => "no_balanced_zone",
            UnplacedReason::NoFreePosition { .. } => "no_free_position",
            UnplacedReason::ValidatorRejected { .. } => "validator_rejected",
        }
    }

    pub fn zone(&self) -> Option<usize> {
        match self {
            UnplacedReason::NoBalancedZone => None,
            UnplacedReason::NoFreePosition { zone }
            | UnplacedReason::ValidatorRejected { zone, .. } => Some(*zone),
        }
    }
}

impl std::fmt::Display for UnplacedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnplacedReason::NoBalancedZone => {
                write!(f, "No zone can take the pallet within the balancing tolerance")
            }
            UnplacedReason::NoFreePosition { zone } => {
                write!(f, "No free floor position in zone {} in either orientation", zone)
            }
            UnplacedReason::ValidatorRejected { zone, reason } => {
                write!(f, "Trailer rejected the position found in zone {}: {}", zone, reason)
            }
        }
    }
}

/// Pallet that could not be placed, with placement state cleared.
#[derive(Clone, Debug)]
pub struct UnplacedPallet {
    pub pallet: Pallet,
    pub reason: UnplacedReason,
}

/// Result of one loading pass.
#[derive(Clone, Debug)]
pub struct LoadOutcome {
    /// Placed pallets in commit order.
    pub placed: Vec<Pallet>,
    /// Pallets left out, in processing order.
    pub unplaced: Vec<UnplacedPallet>,
    /// Weight committed to each zone during this pass.
    pub zone_weights: Vec<f64>,
}

impl LoadOutcome {
    /// Indicates whether all pallets were placed.
    pub fn is_complete(&self) -> bool {
        self.unplaced.is_empty()
    }

    pub fn placed_count(&self) -> usize {
        self.placed.len()
    }

    pub fn unplaced_count(&self) -> usize {
        self.unplaced.len()
    }

    /// Total weight of all pallets placed in this pass.
    pub fn total_placed_weight(&self) -> f64 {
        self.placed.iter().map(Pallet::total_weight).sum()
    }
}

/// The X distribution loading strategy.
#[derive(Clone, Debug)]
pub struct XDistributionLoading {
    config: XDistributionConfig,
    zones: NonZeroUsize,
    trailer: Trailer,
}

impl XDistributionLoading {
    pub const NAME: &'static str = "X Distribution Loading";

    /// Creates the strategy for `trailer`, failing on an invalid configuration.
    pub fn new(trailer: Trailer, config: XDistributionConfig) -> Result<Self, ConfigError> {
        config.validate_for(&trailer)?;
        let zones =
            NonZeroUsize::new(config.zones).ok_or(ConfigError::InvalidZones(config.zones))?;
        Ok(Self {
            config,
            zones,
            trailer,
        })
    }

    /// Creates the strategy with `overrides` merged over the default configuration.
    pub fn with_overrides(trailer: Trailer, overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        Self::new(trailer, merge(&XDistributionConfig::default(), overrides))
    }

    pub fn config(&self) -> &XDistributionConfig {
        &self.config
    }

    /// Releases the loaded trailer.
    pub fn into_trailer(self) -> Trailer {
        self.trailer
    }

    /// Loads `pallets` into the trailer and reports the full outcome.
    ///
    /// # Parameters
    /// * `pallets` - Pallets to load; stale placement state is discarded
    /// * `observer` - Receives one event per pallet plus start and finish events
    pub fn load(&mut self, pallets: Vec<Pallet>, observer: &mut dyn LoadObserver) -> LoadOutcome {
        let layout = ZoneLayout::new(self.trailer.length(), self.zones);
        let mut balancer = ZoneBalancer::new(self.zones, self.config.balancing_factor);

        tracing::info!(
            pallets = pallets.len(),
            zones = layout.count(),
            "starting X distribution loading"
        );
        observer.on_event(&LoadEvent::RunStarted {
            strategy: Self::NAME.to_string(),
            pallets: pallets.len(),
            zones: layout.count(),
            zone_length: layout.zone_length(),
        });

        // Heaviest first; the sort is stable so equal weights keep input order.
        let mut sorted = pallets;
        sorted.sort_by(|a, b| {
            b.total_weight()
                .partial_cmp(&a.total_weight())
                .unwrap_or(Ordering::Equal)
        });
        let mut queue: PalletQueue = sorted
            .into_iter()
            .map(|mut pallet| {
                pallet.clear_placement();
                pallet
            })
            .collect();
        tracing::debug!(queued = queue.len(), "pallets ordered by weight");

        let mut placed = Vec::new();
        let mut unplaced = Vec::new();

        while let Some(pallet) = queue.pop_front() {
            match self.place_one(pallet, &layout, &mut balancer) {
                Ok((pallet, choice)) => {
                    let position = pallet.position().unwrap_or(Vec3::zero());
                    tracing::debug!(
                        id = pallet.id(),
                        zone = choice.zone,
                        rotated = pallet.is_rotated(),
                        "pallet loaded"
                    );
                    observer.on_event(&LoadEvent::PalletPlaced {
                        id: pallet.id().to_string(),
                        zone: choice.zone,
                        pos: position.as_tuple(),
                        rotated: pallet.is_rotated(),
                        weight: pallet.total_weight(),
                        zone_weight: balancer.weights()[choice.zone],
                        fair_share: choice.fair_share,
                        total_weight: self.trailer.total_weight(),
                    });
                    placed.push(pallet);
                }
                Err(entry) => {
                    tracing::debug!(
                        id = entry.pallet.id(),
                        reason = entry.reason.code(),
                        "pallet not loaded"
                    );
                    observer.on_event(&LoadEvent::PalletRejected {
                        id: entry.pallet.id().to_string(),
                        weight: entry.pallet.total_weight(),
                        zone: entry.reason.zone(),
                        reason_code: entry.reason.code().to_string(),
                        reason_text: entry.reason.to_string(),
                    });
                    unplaced.push(entry);
                }
            }
        }

        tracing::info!(
            placed = placed.len(),
            unplaced = unplaced.len(),
            "finished X distribution loading"
        );
        observer.on_event(&LoadEvent::Finished {
            placed: placed.len(),
            unplaced: unplaced.len(),
        });

        LoadOutcome {
            placed,
            unplaced,
            zone_weights: balancer.weights().to_vec(),
        }
    }

    /// Zone selection, position search with one rotation retry, and commit.
    ///
    /// On success returns a copy of the committed pallet; the original now
    /// lives in the trailer.
    fn place_one(
        &mut self,
        mut pallet: Pallet,
        layout: &ZoneLayout,
        balancer: &mut ZoneBalancer,
    ) -> Result<(Pallet, ZoneChoice), UnplacedPallet> {
        let weight = pallet.total_weight();
        let Some(choice) = balancer.select(weight) else {
            return Err(UnplacedPallet {
                pallet,
                reason: UnplacedReason::NoBalancedZone,
            });
        };
        let Some(zone) = layout.zone(choice.zone) else {
            return Err(UnplacedPallet {
                pallet,
                reason: UnplacedReason::NoBalancedZone,
            });
        };
        let step = self.config.grid_granularity;

        let position = match find_position_in_zone(&pallet, &zone, &self.trailer, step) {
            Some(position) => position,
            None => {
                pallet.rotate();
                match find_position_in_zone(&pallet, &zone, &self.trailer, step) {
                    Some(position) => position,
                    None => {
                        pallet.clear_placement();
                        return Err(UnplacedPallet {
                            pallet,
                            reason: UnplacedReason::NoFreePosition { zone: zone.index },
                        });
                    }
                }
            }
        };

        pallet.place(position);
        let committed = pallet.clone();
        match self.trailer.add(pallet) {
            Ok(()) => {
                balancer.commit(zone.index, committed.id(), weight);
                Ok((committed, choice))
            }
            Err(rejection) => {
                let mut pallet = rejection.pallet;
                pallet.clear_placement();
                Err(UnplacedPallet {
                    pallet,
                    reason: UnplacedReason::ValidatorRejected {
                        zone: zone.index,
                        reason: rejection.reason,
                    },
                })
            }
        }
    }
}

impl LoadingStrategy for XDistributionLoading {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn load_pallets_observed(
        &mut self,
        pallets: Vec<Pallet>,
        observer: &mut dyn LoadObserver,
    ) -> Vec<Pallet> {
        self.load(pallets, observer).placed
    }

    fn trailer(&self) -> &Trailer {
        &self.trailer
    }

    fn trailer_mut(&mut self) -> &mut Trailer {
        &mut self.trailer
    }
}

/// Loads `pallets` into `trailer` with the default configuration.
///
/// Returns the outcome together with the loaded trailer. Fails when the
/// default grid is too fine for the trailer.
pub fn load_with_defaults(
    trailer: Trailer,
    pallets: Vec<Pallet>,
) -> Result<(LoadOutcome, Trailer), ConfigError> {
    let mut strategy = XDistributionLoading::new(trailer, XDistributionConfig::default())?;
    let outcome = strategy.load(pallets, &mut NoopObserver);
    Ok((outcome, strategy.into_trailer()))
}
