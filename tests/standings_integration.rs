//! Integration tests for standings aggregation

use chrono::NaiveDate;
use paddock::core::config::EngineConfig;
use paddock::core::types::{
    CategoryId, ChampionshipId, DriverId, PointSystemId, RoundId, SessionId, SessionKind, TeamId,
};
use paddock::engine::{Engine, ResultSubmission};
use paddock::points::{FastestLapRule, PointsCatalog};

const POINT_SYSTEMS: &str = r#"
[[point_system]]
id = 1
points = [12.5, 10.0, 8.0, 6.5, 5.5, 5.0, 4.5, 4.0, 3.5, 3.0, 2.5, 2.0, 1.5, 1.0]

[[point_system]]
id = 2
points = [1.0]
"#;

struct League {
    engine: Engine,
    championship: ChampionshipId,
    category: CategoryId,
    quali: SessionId,
    race: SessionId,
    rounds: Vec<RoundId>,
    drivers: Vec<DriverId>,
    teams: Vec<TeamId>,
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
}

/// A one-category league with `round_count` rounds and `driver_count`
/// drivers split over two teams
fn league(round_count: u16, driver_count: u32) -> League {
    let points = PointsCatalog::from_toml_str(POINT_SYSTEMS).unwrap();
    let mut engine = Engine::new(EngineConfig::default(), points).unwrap();

    let championship = engine
        .add_championship("eSports Championship 1", date(1), None)
        .unwrap();
    let game = engine.add_game("Gran Turismo 7").unwrap();
    let gt3 = engine.add_car_class("GT3", game).unwrap();
    let quali = engine
        .add_session("Qualifica", SessionKind::Qualifying, PointSystemId(2))
        .unwrap();
    let race = engine
        .add_session("Gara", SessionKind::Race, PointSystemId(1))
        .unwrap();
    let category = engine
        .add_category(
            "Pro",
            game,
            championship,
            None,
            vec![gt3],
            vec![quali, race],
            Some(FastestLapRule::flat(1.0)),
        )
        .unwrap();

    let mut rounds = Vec::new();
    let circuits = ["Monza", "Spa", "Suzuka", "Interlagos", "Bathurst"];
    for number in 1..=round_count {
        let circuit = circuits[(number as usize - 1) % circuits.len()];
        rounds.push(
            engine
                .add_round(category, number, date(number as u32 + 1), circuit)
                .unwrap(),
        );
    }

    let team_a = engine.add_team("Red Hawks", 1000).unwrap();
    let team_b = engine.add_team("Blue Comets", 1000).unwrap();
    engine.enter_team(team_a, championship, date(1)).unwrap();
    engine.enter_team(team_b, championship, date(1)).unwrap();

    let mut drivers = Vec::new();
    for index in 0..driver_count {
        let driver = engine
            .add_driver(&format!("psn-driver-{}", index + 1), None)
            .unwrap();
        let team = if index % 2 == 0 { team_a } else { team_b };
        engine
            .assign_driver(driver, team, date(1), None, index < 2)
            .unwrap();
        engine
            .enroll_driver(driver, category, gt3, 10 + index as u16, date(1))
            .unwrap();
        drivers.push(driver);
    }

    League {
        engine,
        championship,
        category,
        quali,
        race,
        rounds,
        drivers,
        teams: vec![team_a, team_b],
    }
}

fn classified(
    driver: DriverId,
    round: RoundId,
    session: SessionId,
    position: u16,
    time: u32,
) -> ResultSubmission {
    ResultSubmission {
        driver_id: driver,
        round_id: round,
        session_id: session,
        position: Some(position),
        time: Some(time),
        fastest_lap: false,
        supersede: false,
    }
}

fn dnf(driver: DriverId, round: RoundId, session: SessionId) -> ResultSubmission {
    ResultSubmission {
        driver_id: driver,
        round_id: round,
        session_id: session,
        position: None,
        time: None,
        fastest_lap: false,
        supersede: false,
    }
}

impl League {
    /// Record a full race finishing order for one round
    fn run_race(&mut self, round_index: usize, order: &[DriverId]) {
        let round = self.rounds[round_index];
        for (index, driver) in order.iter().enumerate() {
            self.engine
                .record_result(classified(
                    *driver,
                    round,
                    self.race,
                    index as u16 + 1,
                    3_600_000 + index as u32 * 2_000,
                ))
                .unwrap();
        }
    }
}

#[test]
fn single_round_totals_combine_quali_and_race() {
    let mut league = league(1, 3);
    let [d1, d2, d3] = [league.drivers[0], league.drivers[1], league.drivers[2]];
    let round = league.rounds[0];

    league
        .engine
        .record_result(classified(d1, round, league.quali, 1, 92_000))
        .unwrap();
    league
        .engine
        .record_result(classified(d2, round, league.quali, 2, 92_400))
        .unwrap();
    league.run_race(0, &[d1, d2, d3]);

    let standings = league.engine.standings(league.category, None);
    assert_eq!(standings.len(), 3);
    assert_eq!(standings[0].driver_id, d1);
    assert_eq!(standings[0].points, 13.5); // pole point + P1
    assert_eq!(standings[1].points, 10.0);
    assert_eq!(standings[2].points, 8.0);
    assert_eq!(standings[0].wins, 1);
}

#[test]
fn fastest_lap_bonus_is_additive() {
    let mut league = league(1, 2);
    let [d1, d2] = [league.drivers[0], league.drivers[1]];
    let round = league.rounds[0];

    league
        .engine
        .record_result(classified(d1, round, league.race, 1, 3_600_000))
        .unwrap();
    league
        .engine
        .record_result(ResultSubmission {
            fastest_lap: true,
            ..classified(d2, round, league.race, 2, 3_602_000)
        })
        .unwrap();

    let standings = league.engine.standings(league.category, None);
    assert_eq!(standings[1].driver_id, d2);
    assert_eq!(standings[1].points, 11.0); // P2 + fastest lap
}

#[test]
fn standings_are_idempotent() {
    let mut league = league(2, 4);
    let order: Vec<DriverId> = league.drivers.clone();
    league.run_race(0, &order);

    let first = league.engine.standings(league.category, None);
    let second = league.engine.standings(league.category, None);
    let computed = league.engine.compute_standings(league.category, None);
    assert_eq!(first, second);
    assert_eq!(first, computed);
}

#[test]
fn empty_category_yields_empty_table() {
    let mut league = league(1, 2);
    assert!(league.engine.standings(league.category, None).is_empty());
    assert!(league
        .engine
        .standings(CategoryId(99), None)
        .is_empty());
}

#[test]
fn cutoff_limits_scored_rounds() {
    let mut league = league(2, 2);
    let [d1, d2] = [league.drivers[0], league.drivers[1]];
    league.run_race(0, &[d1, d2]);
    league.run_race(1, &[d2, d1]);

    let through_first = league.engine.standings(league.category, Some(1));
    assert_eq!(through_first[0].driver_id, d1);
    assert_eq!(through_first[0].points, 12.5);

    let full = league.engine.standings(league.category, None);
    assert_eq!(full[0].points, 22.5);
    assert_eq!(full[1].points, 22.5);
}

#[test]
fn countback_ranks_the_win_over_consistency() {
    let mut league = league(3, 5);
    let d = league.drivers.clone();

    // d0 takes one win and two fourths, d1 two seconds and a fifth: both
    // on 25.5 points, the win decides.
    league.run_race(0, &[d[0], d[1], d[2], d[3], d[4]]);
    league.run_race(1, &[d[2], d[1], d[3], d[0], d[4]]);
    league.run_race(2, &[d[3], d[2], d[4], d[0], d[1]]);

    let standings = league.engine.standings(league.category, None);
    let points_of = |driver: DriverId| {
        standings
            .iter()
            .find(|row| row.driver_id == driver)
            .unwrap()
            .points
    };
    assert_eq!(points_of(d[0]), 25.5);
    assert_eq!(points_of(d[1]), 25.5);

    let rank_of = |driver: DriverId| {
        standings
            .iter()
            .find(|row| row.driver_id == driver)
            .unwrap()
            .position
    };
    assert!(rank_of(d[0]) < rank_of(d[1]));
}

#[test]
fn equal_countback_breaks_by_earlier_total() {
    let mut league = league(2, 2);
    let [d1, d2] = [league.drivers[0], league.drivers[1]];

    // One solo win each; d1 reached the total a round earlier
    league.run_race(0, &[d1]);
    league.run_race(1, &[d2]);

    let standings = league.engine.standings(league.category, None);
    assert_eq!(standings[0].points, standings[1].points);
    assert_eq!(standings[0].wins, standings[1].wins);
    assert_eq!(standings[0].driver_id, d1);
}

#[test]
fn superseded_result_is_the_only_one_scored() {
    let mut league = league(1, 2);
    let [d1, d2] = [league.drivers[0], league.drivers[1]];
    let round = league.rounds[0];

    league.run_race(0, &[d1, d2]);

    // Correction: d1 actually finished behind d2
    league
        .engine
        .record_result(ResultSubmission {
            supersede: true,
            ..classified(d1, round, league.race, 2, 3_610_000)
        })
        .unwrap();

    let standings = league.engine.standings(league.category, None);
    assert_eq!(standings[0].driver_id, d2);
    assert_eq!(standings[0].points, 12.5);
    assert_eq!(standings[1].points, 10.0);
}

#[test]
fn dnf_scores_nothing() {
    let mut league = league(1, 3);
    let [d1, d2, d3] = [league.drivers[0], league.drivers[1], league.drivers[2]];
    let round = league.rounds[0];

    league
        .engine
        .record_result(classified(d1, round, league.race, 1, 3_600_000))
        .unwrap();
    league
        .engine
        .record_result(classified(d2, round, league.race, 2, 3_602_000))
        .unwrap();
    league
        .engine
        .record_result(dnf(d3, round, league.race))
        .unwrap();

    let standings = league.engine.standings(league.category, None);
    let d3_row = standings.iter().find(|row| row.driver_id == d3).unwrap();
    assert_eq!(d3_row.points, 0.0);
    assert_eq!(d3_row.position, 3);
}

#[test]
fn team_standings_follow_current_teams() {
    let mut league = league(1, 4);
    let d = league.drivers.clone();

    // Teams alternate: d0, d2 -> Red Hawks; d1, d3 -> Blue Comets
    league.run_race(0, &[d[0], d[1], d[2], d[3]]);

    let teams = league.engine.team_standings(league.championship);
    assert_eq!(teams.len(), 2);
    assert_eq!(teams[0].team_id, league.teams[0]);
    assert_eq!(teams[0].points, 20.5); // 12.5 + 8.0
    assert_eq!(teams[1].points, 16.5); // 10.0 + 6.5

    // A team-level penalty shifts the lead
    league
        .engine
        .add_team_penalty_points(league.teams[0], league.championship, 5.0)
        .unwrap();
    let teams = league.engine.team_standings(league.championship);
    assert_eq!(teams[0].team_id, league.teams[1]);
    assert_eq!(teams[1].points, 15.5);
}

#[test]
fn points_per_round_accumulates() {
    let mut league = league(2, 2);
    let [d1, d2] = [league.drivers[0], league.drivers[1]];
    league.run_race(0, &[d1, d2]);
    league.run_race(1, &[d1, d2]);

    let tallies = league.engine.points_per_round(league.category);
    assert_eq!(tallies.len(), 2);
    assert_eq!(tallies[0].round_number, 1);
    assert_eq!(tallies[0].totals, vec![(d1, 12.5), (d2, 10.0)]);
    assert_eq!(tallies[1].totals, vec![(d1, 25.0), (d2, 20.0)]);
}

#[test]
fn championship_standings_cover_every_category() {
    let mut league = league(1, 2);
    let [d1, d2] = [league.drivers[0], league.drivers[1]];
    league.run_race(0, &[d1, d2]);

    let per_category = league.engine.championship_standings(league.championship);
    assert_eq!(per_category.len(), 1);
    let (category, standings) = &per_category[0];
    assert_eq!(*category, league.category);
    assert_eq!(standings[0].driver_id, d1);
}
