//! Contract shared by all pallet placement strategies.
//!
//! A strategy owns the trailer it loads, so a loading pass always has
//! exclusive access to it. Progress is reported through a `LoadObserver`
//! instead of a fixed output stream.

use serde::Serialize;

use crate::model::{Pallet, Trailer};

/// Events emitted while a strategy loads pallets, e.g. for live visualization.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum LoadEvent {
    /// A loading pass begins.
    RunStarted {
        strategy: String,
        pallets: usize,
        zones: usize,
        zone_length: f64,
    },
    /// A pallet was accepted by the trailer.
    PalletPlaced {
        id: String,
        zone: usize,
        pos: (f64, f64, f64),
        rotated: bool,
        weight: f64,
        zone_weight: f64,
        fair_share: f64,
        total_weight: f64,
    },
    /// A pallet could not be placed in this pass.
    PalletRejected {
        id: String,
        weight: f64,
        zone: Option<usize>,
        reason_code: String,
        reason_text: String,
    },
    /// Loading pass finished.
    Finished { placed: usize, unplaced: usize },
}

/// Receives `LoadEvent`s during a loading pass.
pub trait LoadObserver {
    fn on_event(&mut self, event: &LoadEvent);
}

impl<F> LoadObserver for F
where
    F: FnMut(&LoadEvent),
{
    fn on_event(&mut self, event: &LoadEvent) {
        self(event)
    }
}

/// Observer that ignores every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl LoadObserver for NoopObserver {
    fn on_event(&mut self, _event: &LoadEvent) {}
}

/// Observer that forwards events to `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl LoadObserver for TracingObserver {
    fn on_event(&mut self, event: &LoadEvent) {
        match event {
            LoadEvent::RunStarted {
                strategy,
                pallets,
                zones,
                zone_length,
            } => tracing::info!(%strategy, pallets, zones, zone_length, "loading started"),
            LoadEvent::PalletPlaced {
                id, zone, pos, rotated, ..
            } => tracing::debug!(%id, zone, ?pos, rotated, "pallet placed"),
            LoadEvent::PalletRejected {
                id,
                zone,
                reason_code,
                ..
            } => tracing::debug!(%id, ?zone, %reason_code, "pallet not placed"),
            LoadEvent::Finished { placed, unplaced } => {
                tracing::info!(placed, unplaced, "loading finished")
            }
        }
    }
}

/// A pallet placement strategy.
///
/// Implementations place pallets into the trailer they own and return the
/// placed subset, each pallet carrying its final position and rotation.
pub trait LoadingStrategy {
    /// Human-readable strategy name.
    fn name(&self) -> &str;

    /// Loads `pallets`, reporting progress to `observer`.
    fn load_pallets_observed(
        &mut self,
        pallets: Vec<Pallet>,
        observer: &mut dyn LoadObserver,
    ) -> Vec<Pallet>;

    fn trailer(&self) -> &Trailer;

    fn trailer_mut(&mut self) -> &mut Trailer;

    /// Loads `pallets` without observing progress.
    fn load_pallets(&mut self, pallets: Vec<Pallet>) -> Vec<Pallet> {
        self.load_pallets_observed(pallets, &mut NoopObserver)
    }

    /// Loads fresh, unplaced copies of `pallets`, optionally emptying the
    /// trailer first. The caller's pallets are left untouched.
    fn run(&mut self, pallets: &[Pallet], reset: bool) -> Vec<Pallet> {
        if reset {
            self.trailer_mut().reset();
        }
        let copies = pallets.iter().map(Pallet::unplaced_copy).collect();
        self.load_pallets(copies)
    }
}
