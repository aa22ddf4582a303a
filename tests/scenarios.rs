//! Integration tests for the X distribution loading strategy.

use trailer_loader::geometry::intersects;
use trailer_loader::loader::{
    ConfigError, ConfigOverrides, UnplacedReason, XDistributionConfig, XDistributionLoading, merge,
};
use trailer_loader::model::{Pallet, PalletType, Trailer};
use trailer_loader::strategy::{LoadEvent, LoadingStrategy};
use trailer_loader::types::{Dimensional, Vec3};

fn custom(id: &str, length: f64, width: f64, weight: f64) -> Pallet {
    Pallet::new(id, PalletType::Custom, (length, width, 144.0), weight, 0.0).unwrap()
}

fn loader(
    dims: (f64, f64, f64),
    max_weight: f64,
    zones: usize,
    balancing_factor: f64,
) -> XDistributionLoading {
    let config = XDistributionConfig::builder()
        .zones(zones)
        .balancing_factor(balancing_factor)
        .grid_granularity(100.0)
        .build();
    XDistributionLoading::new(Trailer::new(dims, max_weight).unwrap(), config).unwrap()
}

/// Mixed catalog pallets with varying cargo.
fn mixed_shipment(count: usize) -> Vec<Pallet> {
    let kinds = [
        PalletType::Eur,
        PalletType::Eur2,
        PalletType::Industrial,
        PalletType::HalfEur,
    ];
    (0..count)
        .map(|i| {
            let kind = kinds[(i * 7) % kinds.len()];
            let cargo = 150.0 + ((i * 211) % 900) as f64;
            Pallet::standard(format!("{}_{}", kind.code(), i), kind, cargo).unwrap()
        })
        .collect()
}

mod scenario_tests {
    use super::*;

    #[test]
    fn single_pallet_goes_to_front_zone_origin() {
        let mut strategy = loader((1200.0, 200.0, 300.0), 1000.0, 4, 0.1);
        let placed = strategy.load_pallets(vec![custom("A", 100.0, 100.0, 50.0)]);

        assert_eq!(placed.len(), 1);
        assert_eq!(placed[0].position(), Some(Vec3::zero()));
        assert_eq!(strategy.trailer().total_weight(), 50.0);
    }

    #[test]
    fn pallet_without_free_cell_is_skipped_and_loading_continues() {
        let mut strategy = loader((300.0, 100.0, 300.0), 1000.0, 1, 0.5);
        let outcome = strategy.load(
            vec![
                custom("A", 200.0, 100.0, 60.0),
                custom("B", 200.0, 100.0, 50.0),
                custom("C", 100.0, 100.0, 10.0),
            ],
            &mut |_: &LoadEvent| {},
        );

        let ids: Vec<&str> = outcome.placed.iter().map(Pallet::id).collect();
        assert_eq!(ids, vec!["A", "C"]);
        assert_eq!(outcome.placed[1].position(), Some(Vec3::new(200.0, 0.0, 0.0)));
        assert_eq!(outcome.unplaced.len(), 1);
        assert_eq!(outcome.unplaced[0].pallet.id(), "B");
        assert_eq!(
            outcome.unplaced[0].reason,
            UnplacedReason::NoFreePosition { zone: 0 }
        );
        assert!(!outcome.unplaced[0].pallet.is_rotated());
    }

    #[test]
    fn blocked_pallet_stays_out_of_the_empty_zone() {
        let mut strategy = loader((400.0, 100.0, 300.0), 1000.0, 2, 1.0);
        let outcome = strategy.load(
            vec![
                custom("A", 200.0, 100.0, 100.0),
                custom("B", 150.0, 100.0, 90.0),
            ],
            &mut |_: &LoadEvent| {},
        );

        let ids: Vec<&str> = outcome.placed.iter().map(Pallet::id).collect();
        assert_eq!(ids, vec!["A"]);
        assert_eq!(outcome.unplaced[0].pallet.id(), "B");
        assert_eq!(
            outcome.unplaced[0].reason,
            UnplacedReason::NoFreePosition { zone: 0 }
        );
        assert_eq!(outcome.zone_weights[1], 0.0);
        assert!(
            strategy
                .trailer()
                .loaded()
                .iter()
                .all(|p| p.position().is_some_and(|pos| pos.x < 200.0))
        );
    }

    #[test]
    fn oversized_configuration_is_rejected_up_front() {
        let fine = XDistributionConfig::builder().grid_granularity(1e-300).build();
        assert!(matches!(
            XDistributionLoading::new(Trailer::standard(), fine),
            Err(ConfigError::GridTooFine { .. })
        ));

        let many = XDistributionConfig::builder().zones(usize::MAX).build();
        assert!(matches!(
            XDistributionLoading::new(Trailer::standard(), many),
            Err(ConfigError::TooManyZones { .. })
        ));
    }

    #[test]
    fn zero_tolerance_routes_equal_pallet_to_next_zone() {
        let mut strategy = loader((1000.0, 200.0, 300.0), 1000.0, 2, 0.0);
        let outcome = strategy.load(
            vec![
                custom("P1", 100.0, 100.0, 100.0),
                custom("P2", 100.0, 100.0, 100.0),
                custom("P3", 100.0, 100.0, 50.0),
            ],
            &mut |_: &LoadEvent| {},
        );

        assert_eq!(outcome.placed.len(), 2);
        let second = outcome.placed[1].position().unwrap();
        assert!(second.x >= 500.0, "P2 stayed in zone 0 at {:?}", second);
        assert_eq!(outcome.unplaced[0].pallet.id(), "P3");
        assert_eq!(outcome.unplaced[0].reason.code(), "no_balanced_zone");
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let mut strategy = loader((1200.0, 200.0, 300.0), 1000.0, 4, 0.1);
        let outcome = strategy.load(Vec::new(), &mut |_: &LoadEvent| {});
        assert!(outcome.placed.is_empty());
        assert!(outcome.is_complete());
        assert_eq!(outcome.zone_weights, vec![0.0; 4]);
    }

    #[test]
    fn defaults_merge_with_request_overrides() {
        let overrides = ConfigOverrides {
            zones: Some(3),
            grid_granularity: Some(50.0),
            ..Default::default()
        };
        let strategy =
            XDistributionLoading::with_overrides(Trailer::standard(), &overrides).unwrap();
        assert_eq!(
            *strategy.config(),
            merge(&XDistributionConfig::default(), &overrides)
        );
        assert_eq!(strategy.config().balancing_factor, 0.1);
        assert_eq!(strategy.name(), "X Distribution Loading");
    }
}

mod property_tests {
    use super::*;

    fn standard_loader(balancing_factor: f64) -> XDistributionLoading {
        let config = XDistributionConfig::builder()
            .balancing_factor(balancing_factor)
            .build();
        XDistributionLoading::new(Trailer::standard(), config).unwrap()
    }

    #[test]
    fn placed_pallets_are_pairwise_disjoint() {
        let mut strategy = standard_loader(0.5);
        let placed = strategy.load_pallets(mixed_shipment(40));

        assert!(placed.len() > 1);
        for (i, a) in placed.iter().enumerate() {
            for b in &placed[i + 1..] {
                assert!(!intersects(a, b), "{} overlaps {}", a.id(), b.id());
            }
        }
    }

    #[test]
    fn accepted_pallets_respect_zone_tolerance() {
        let balancing_factor = 0.3;
        let mut strategy = standard_loader(balancing_factor);
        let mut events = Vec::new();
        strategy.load(mixed_shipment(30), &mut |event: &LoadEvent| {
            events.push(event.clone())
        });

        let mut checked = 0;
        for event in &events {
            if let LoadEvent::PalletPlaced {
                zone_weight,
                fair_share,
                ..
            } = event
            {
                assert!(
                    zone_weight / fair_share <= 1.0 + balancing_factor + 1e-6,
                    "zone weight {} exceeds fair share {}",
                    zone_weight,
                    fair_share
                );
                checked += 1;
            }
        }
        assert!(checked > 0);
    }

    #[test]
    fn total_weight_stays_within_trailer_limit() {
        let config = XDistributionConfig::builder().balancing_factor(1.0).build();
        let trailer = Trailer::new((13_600.0, 2_450.0, 2_700.0), 5_000.0).unwrap();
        let mut strategy = XDistributionLoading::new(trailer, config).unwrap();

        let outcome = strategy.load(mixed_shipment(30), &mut |_: &LoadEvent| {});

        assert!(outcome.total_placed_weight() <= 5_000.0 + 1e-6);
        assert_eq!(strategy.trailer().total_weight(), outcome.total_placed_weight());
        assert!(
            outcome
                .unplaced
                .iter()
                .any(|entry| entry.reason.code() == "validator_rejected")
        );
    }

    #[test]
    fn independent_runs_are_identical() {
        let first = standard_loader(0.2).load_pallets(mixed_shipment(25));
        let second = standard_loader(0.2).load_pallets(mixed_shipment(25));
        assert_eq!(first, second);
    }

    #[test]
    fn rotated_pallets_report_swapped_dimensions() {
        let mut strategy = loader((1200.0, 100.0, 300.0), 1000.0, 2, 1.0);
        let placed = strategy.load_pallets(vec![
            custom("A", 80.0, 120.0, 20.0),
            custom("B", 90.0, 110.0, 10.0),
        ]);

        assert_eq!(placed.len(), 2);
        for pallet in &placed {
            assert!(pallet.is_rotated());
            let dims = pallet.dimensions();
            assert_eq!((dims.x, dims.y), (pallet.width(), pallet.length()));
        }
    }

    #[test]
    fn run_with_reset_reloads_from_scratch() {
        let mut strategy = standard_loader(0.5);
        let shipment = mixed_shipment(10);

        let first = strategy.run(&shipment, true);
        let second = strategy.run(&shipment, true);

        assert_eq!(first, second);
        assert_eq!(strategy.trailer().loaded().len(), first.len());
        assert!(shipment.iter().all(|p| !p.is_placed()));
    }
}
