//! Property tests for disciplinary bookkeeping

use chrono::NaiveDate;
use proptest::prelude::*;

use paddock::core::config::EngineConfig;
use paddock::core::types::{CarClassId, CategoryId, DriverId, PointSystemId};
use paddock::points::{PointSystem, PointsCatalog};
use paddock::roster::RosterLedger;

fn enrolled_roster(config: &EngineConfig) -> RosterLedger {
    let mut roster = RosterLedger::new();
    roster
        .enroll(
            DriverId(1),
            CategoryId(1),
            CarClassId(1),
            7,
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            config,
        )
        .unwrap();
    roster
}

proptest! {
    #[test]
    fn licence_balance_never_leaves_domain(
        deltas in prop::collection::vec(-15i16..=15, 0..50)
    ) {
        let config = EngineConfig::default();
        let mut roster = enrolled_roster(&config);

        for delta in deltas {
            let adjustment = roster
                .adjust_licence_points(DriverId(1), CategoryId(1), delta, None, &config)
                .unwrap();
            prop_assert!(adjustment.balance <= config.licence_points_ceiling);

            let stored = roster
                .enrollment(DriverId(1), CategoryId(1))
                .unwrap()
                .licence_points;
            prop_assert_eq!(stored, adjustment.balance);
            prop_assert_eq!(adjustment.suspended, stored == 0);
        }
    }

    #[test]
    fn point_resolution_is_total_and_non_negative(
        values in prop::collection::vec(0.0f64..100.0, 1..20),
        position in 0u16..40
    ) {
        let mut catalog = PointsCatalog::new();
        catalog
            .insert(PointSystem::new(PointSystemId(1), values.clone()).unwrap())
            .unwrap();

        let points = catalog
            .points(PointSystemId(1), Some(position))
            .unwrap();
        prop_assert!(points >= 0.0);
        if position == 0 || position as usize > values.len() {
            prop_assert_eq!(points, 0.0);
        } else {
            prop_assert_eq!(points, values[position as usize - 1]);
        }
    }

    #[test]
    fn warnings_never_decrease(
        counts in prop::collection::vec(0u8..5, 0..30)
    ) {
        let config = EngineConfig::default();
        let mut roster = enrolled_roster(&config);

        let mut previous = 0u8;
        for count in counts {
            let total = roster
                .add_warnings(DriverId(1), CategoryId(1), count)
                .unwrap();
            prop_assert!(total >= previous);
            previous = total;
        }
    }
}
