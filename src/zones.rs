//! Weight-balancing zones along the trailer length.
//!
//! The trailer floor is split into `count` equally long slices. A
//! `ZoneBalancer` tracks how much weight each slice has received during one
//! loading run and decides which slice the next pallet should go to.

use std::cmp::Ordering;
use std::num::NonZeroUsize;

use crate::types::EPSILON_GENERAL;

/// One length-wise slice of the trailer floor, `[start, end)` along X.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Zone {
    pub index: usize,
    pub start: f64,
    pub end: f64,
}

impl Zone {
    pub fn length(&self) -> f64 {
        self.end - self.start
    }
}

/// Partition of a trailer length into equally long zones.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoneLayout {
    count: usize,
    zone_length: f64,
}

impl ZoneLayout {
    /// Splits `trailer_length` into `count` zones.
    pub fn new(trailer_length: f64, count: NonZeroUsize) -> Self {
        Self {
            count: count.get(),
            zone_length: trailer_length / count.get() as f64,
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn zone_length(&self) -> f64 {
        self.zone_length
    }

    /// Returns the zone at `index`, `None` if out of range.
    pub fn zone(&self, index: usize) -> Option<Zone> {
        (index < self.count).then(|| Zone {
            index,
            start: index as f64 * self.zone_length,
            end: (index + 1) as f64 * self.zone_length,
        })
    }

    pub fn zones(&self) -> impl Iterator<Item = Zone> + '_ {
        (0..self.count).filter_map(|index| self.zone(index))
    }
}

/// Result of a zone selection: the chosen zone and the targets it was judged by.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoneChoice {
    pub zone: usize,
    /// `(committed + candidate) / zones`, the target used for ranking.
    pub ideal: f64,
    /// `max(ideal, candidate)`, the share the zone's new weight is measured against.
    pub fair_share: f64,
}

/// Per-run zone weight ledger and best-zone selection.
#[derive(Clone, Debug)]
pub struct ZoneBalancer {
    balancing_factor: f64,
    weights: Vec<f64>,
    members: Vec<Vec<String>>,
}

impl ZoneBalancer {
    /// Creates a ledger with `count` empty zones.
    ///
    /// Allocates per zone; callers bound `count` through the validated
    /// strategy configuration.
    pub fn new(count: NonZeroUsize, balancing_factor: f64) -> Self {
        Self {
            balancing_factor,
            weights: vec![0.0; count.get()],
            members: vec![Vec::new(); count.get()],
        }
    }

    pub fn count(&self) -> usize {
        self.weights.len()
    }

    pub fn balancing_factor(&self) -> f64 {
        self.balancing_factor
    }

    /// Accumulated weight per zone.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn total_weight(&self) -> f64 {
        self.weights.iter().sum()
    }

    /// Ids of the pallets committed to `zone`, in commit order.
    pub fn members(&self, zone: usize) -> &[String] {
        self.members.get(zone).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Ideal weight per zone if `candidate_weight` were added to the load.
    pub fn ideal_weight(&self, candidate_weight: f64) -> f64 {
        (self.total_weight() + candidate_weight) / self.count() as f64
    }

    /// Zone indices ordered by distance of their weight to the ideal, ties by index.
    pub fn ranked_zones(&self, candidate_weight: f64) -> Vec<usize> {
        let ideal = self.ideal_weight(candidate_weight);
        let mut order: Vec<usize> = (0..self.count()).collect();
        order.sort_by(|&a, &b| {
            let da = (self.weights[a] - ideal).abs();
            let db = (self.weights[b] - ideal).abs();
            da.partial_cmp(&db)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.cmp(&b))
        });
        order
    }

    /// Checks whether `zone` may take `candidate_weight` without exceeding
    /// `(1 + balancing_factor)` times its fair share.
    pub fn qualifies(&self, zone: usize, candidate_weight: f64) -> bool {
        let Some(&current) = self.weights.get(zone) else {
            return false;
        };
        let fair_share = self.fair_share(candidate_weight);
        if fair_share <= 0.0 {
            return false;
        }
        (current + candidate_weight) / fair_share <= 1.0 + self.balancing_factor + EPSILON_GENERAL
    }

    /// Picks the best-ranked qualifying zone, `None` if no zone qualifies.
    ///
    /// Only weights are considered; whether the pallet physically fits is up to
    /// the caller.
    pub fn select(&self, candidate_weight: f64) -> Option<ZoneChoice> {
        let ideal = self.ideal_weight(candidate_weight);
        let fair_share = self.fair_share(candidate_weight);
        self.ranked_zones(candidate_weight)
            .into_iter()
            .find(|&zone| self.qualifies(zone, candidate_weight))
            .map(|zone| ZoneChoice {
                zone,
                ideal,
                fair_share,
            })
    }

    /// Records a pallet accepted into `zone`.
    pub fn commit(&mut self, zone: usize, pallet_id: &str, weight: f64) {
        if let (Some(total), Some(ids)) = (self.weights.get_mut(zone), self.members.get_mut(zone)) {
            *total += weight;
            ids.push(pallet_id.to_string());
        }
    }

    // A pallet cannot be split, so no zone's share is smaller than the pallet itself.
    fn fair_share(&self, candidate_weight: f64) -> f64 {
        self.ideal_weight(candidate_weight).max(candidate_weight)
    }
}
