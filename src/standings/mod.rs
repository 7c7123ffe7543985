//! Standings aggregation
//!
//! A pure read-side projection over the result ledger, the point catalog
//! and the roster. Nothing here mutates state; every function can be
//! re-run at any time and two runs without an intervening mutation yield
//! identical output. A category with no results yields an empty table
//! rather than an error.

use ahash::AHashMap;
use ordered_float::OrderedFloat;
use rayon::prelude::*;

use serde::{Deserialize, Serialize};

use crate::core::config::EngineConfig;
use crate::core::types::{CategoryId, ChampionshipId, DriverId, Position, RoundId, SessionKind, TeamId};
use crate::league::LeagueRegistry;
use crate::points::PointsCatalog;
use crate::results::{ResultLedger, ResultRow};
use crate::roster::RosterLedger;

/// One line of a category's standings table
///
/// Ordering rule: total points descending, then position countback (more
/// wins, then more second places, and so on, over penalty-adjusted race
/// finishes), then the earlier round in which the driver last added to
/// their total (whoever reached the tied total first ranks ahead), then
/// driver id as the final deterministic anchor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandingsRow {
    /// 1-based rank in the table
    pub position: Position,
    pub driver_id: DriverId,
    pub points: f64,
    /// Penalty-adjusted race wins, the first countback column
    pub wins: u16,
}

/// One line of a championship's team standings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamStandingsRow {
    pub position: Position,
    pub team_id: TeamId,
    pub points: f64,
}

/// Cumulative driver totals after one round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundTally {
    pub round_number: u16,
    /// (driver, cumulative points), ordered by driver id
    pub totals: Vec<(DriverId, f64)>,
}

#[derive(Debug, Default)]
struct Tally {
    total: f64,
    /// counts[p - 1] = penalty-adjusted race finishes at position p
    position_counts: Vec<u16>,
    /// Round number of the last change to the total; 0 if never scored
    last_gain_round: u16,
}

impl Tally {
    fn count_position(&mut self, position: Position) {
        let index = position as usize - 1;
        if self.position_counts.len() <= index {
            self.position_counts.resize(index + 1, 0);
        }
        self.position_counts[index] += 1;
    }

    fn count_at(&self, index: usize) -> u16 {
        self.position_counts.get(index).copied().unwrap_or(0)
    }
}

/// Points one result row is worth, before suspension is considered
fn row_points(
    registry: &LeagueRegistry,
    points: &PointsCatalog,
    category_fastest_lap: Option<&crate::points::FastestLapRule>,
    row: &ResultRow,
) -> f64 {
    let Ok(session) = registry.session(row.session_id) else {
        return 0.0;
    };
    let base = points
        .points(session.point_system_id, row.position)
        .unwrap_or(0.0);
    let bonus = if row.fastest_lap {
        category_fastest_lap.map_or(0.0, |rule| rule.bonus(row.position))
    } else {
        0.0
    };
    base + bonus - row.penalty_points
}

/// Compute the standings of one category up to an optional round cutoff
///
/// Suspension handling: the aggregator replays each driver's licence
/// balance round by round, from the per-result deltas left by the
/// stewarding workflow and the round-anchored administrative adjustments
/// in the roster's licence log. A round entered with an empty licence
/// scores nothing for that driver; rounds already scored stay scored.
pub fn category_standings(
    registry: &LeagueRegistry,
    results: &ResultLedger,
    roster: &RosterLedger,
    points: &PointsCatalog,
    config: &EngineConfig,
    category_id: CategoryId,
    through_round: Option<u16>,
) -> Vec<StandingsRow> {
    let Ok(category) = registry.category(category_id) else {
        return Vec::new();
    };

    let rounds = registry.rounds_of_category(category_id);
    let cutoff = through_round.unwrap_or(u16::MAX);
    let ceiling = config.licence_points_ceiling;

    let mut rows_by_round: AHashMap<RoundId, Vec<&ResultRow>> = AHashMap::new();
    for row in results.rows() {
        if row.category_id == category_id {
            rows_by_round.entry(row.round_id).or_default().push(row);
        }
    }

    let mut admin_by_round: AHashMap<u16, Vec<(DriverId, i16)>> = AHashMap::new();
    for entry in roster.licence_adjustments(category_id) {
        admin_by_round
            .entry(entry.after_round)
            .or_default()
            .push((entry.driver_id, entry.delta));
    }

    let mut tallies: AHashMap<DriverId, Tally> = AHashMap::new();
    let mut balances: AHashMap<DriverId, u8> = AHashMap::new();

    let apply_delta = |balances: &mut AHashMap<DriverId, u8>, driver: DriverId, delta: i16| {
        let balance = balances.entry(driver).or_insert(ceiling);
        *balance = (*balance as i16 + delta).clamp(0, ceiling as i16) as u8;
    };

    // Adjustments anchored before the first round
    if let Some(entries) = admin_by_round.get(&0) {
        for (driver, delta) in entries {
            apply_delta(&mut balances, *driver, *delta);
        }
    }

    for round in rounds.iter().filter(|r| r.number <= cutoff) {
        if let Some(round_rows) = rows_by_round.get(&round.id) {
            for row in round_rows {
                let balance = *balances
                    .entry(row.driver_id)
                    .or_insert(config.licence_points_ceiling);
                let tally = tallies.entry(row.driver_id).or_default();

                if balance > 0 {
                    let earned = row_points(registry, points, category.fastest_lap.as_ref(), row);
                    if earned != 0.0 {
                        tally.total += earned;
                        tally.last_gain_round = round.number;
                    }
                }
                if row.kind == SessionKind::Race {
                    if let Some(position) = row.position {
                        tally.count_position(position);
                    }
                }
            }

            // Stewarding deductions take effect from the next round onwards
            for row in round_rows {
                if row.licence_points_removed > 0 {
                    apply_delta(
                        &mut balances,
                        row.driver_id,
                        -(row.licence_points_removed as i16),
                    );
                }
            }
        }

        if let Some(entries) = admin_by_round.get(&round.number) {
            for (driver, delta) in entries {
                apply_delta(&mut balances, *driver, *delta);
            }
        }
    }

    let max_counted = tallies
        .values()
        .map(|t| t.position_counts.len())
        .max()
        .unwrap_or(0);

    let mut entries: Vec<(DriverId, Tally)> = tallies.into_iter().collect();
    entries.sort_by(|(a_id, a), (b_id, b)| {
        OrderedFloat(b.total)
            .cmp(&OrderedFloat(a.total))
            .then_with(|| {
                for index in 0..max_counted {
                    let ordering = b.count_at(index).cmp(&a.count_at(index));
                    if ordering != std::cmp::Ordering::Equal {
                        return ordering;
                    }
                }
                std::cmp::Ordering::Equal
            })
            .then_with(|| a.last_gain_round.cmp(&b.last_gain_round))
            .then_with(|| a_id.0.cmp(&b_id.0))
    });

    entries
        .into_iter()
        .enumerate()
        .map(|(index, (driver_id, tally))| StandingsRow {
            position: index as Position + 1,
            driver_id,
            points: tally.total,
            wins: tally.count_at(0),
        })
        .collect()
}

/// Team standings of a championship
///
/// Drivers' category totals are summed onto their current team, then each
/// entered team's penalty points are subtracted. Teams entered in the
/// championship appear even when scoreless.
pub fn team_standings(
    registry: &LeagueRegistry,
    results: &ResultLedger,
    roster: &RosterLedger,
    points: &PointsCatalog,
    config: &EngineConfig,
    championship_id: ChampionshipId,
) -> Vec<TeamStandingsRow> {
    let mut totals: AHashMap<TeamId, f64> = AHashMap::new();

    for team in registry.teams() {
        if registry.team_entry(team.id, championship_id).is_some() {
            totals.insert(team.id, 0.0);
        }
    }

    for category in registry.categories_of_championship(championship_id) {
        for row in category_standings(registry, results, roster, points, config, category.id, None) {
            if let Some(team_id) = roster.current_team(row.driver_id) {
                *totals.entry(team_id).or_insert(0.0) += row.points;
            }
        }
    }

    for (team_id, total) in totals.iter_mut() {
        if let Some(entry) = registry.team_entry(*team_id, championship_id) {
            *total -= entry.penalty_points;
        }
    }

    let mut entries: Vec<(TeamId, f64)> = totals.into_iter().collect();
    entries.sort_by(|(a_id, a), (b_id, b)| {
        OrderedFloat(*b)
            .cmp(&OrderedFloat(*a))
            .then_with(|| a_id.0.cmp(&b_id.0))
    });

    entries
        .into_iter()
        .enumerate()
        .map(|(index, (team_id, points))| TeamStandingsRow {
            position: index as Position + 1,
            team_id,
            points,
        })
        .collect()
}

/// Cumulative totals after each round of a category, in calendar order
pub fn points_per_round(
    registry: &LeagueRegistry,
    results: &ResultLedger,
    roster: &RosterLedger,
    points: &PointsCatalog,
    config: &EngineConfig,
    category_id: CategoryId,
) -> Vec<RoundTally> {
    let mut tallies = Vec::new();
    for round in registry.rounds_of_category(category_id) {
        if !results.round_has_results(round.id) {
            continue;
        }
        let standings = category_standings(
            registry,
            results,
            roster,
            points,
            config,
            category_id,
            Some(round.number),
        );
        if standings.is_empty() {
            continue;
        }
        let mut totals: Vec<(DriverId, f64)> = standings
            .into_iter()
            .map(|row| (row.driver_id, row.points))
            .collect();
        totals.sort_by_key(|(driver_id, _)| driver_id.0);
        tallies.push(RoundTally {
            round_number: round.number,
            totals,
        });
    }
    tallies
}

/// Standings of every category in a championship, computed in parallel
///
/// Pure fan-out over an immutable snapshot; safe to call concurrently
/// with other reads.
pub fn championship_standings(
    registry: &LeagueRegistry,
    results: &ResultLedger,
    roster: &RosterLedger,
    points: &PointsCatalog,
    config: &EngineConfig,
    championship_id: ChampionshipId,
) -> Vec<(CategoryId, Vec<StandingsRow>)> {
    let categories: Vec<CategoryId> = registry
        .categories_of_championship(championship_id)
        .iter()
        .map(|c| c.id)
        .collect();

    categories
        .into_par_iter()
        .map(|category_id| {
            (
                category_id,
                category_standings(registry, results, roster, points, config, category_id, None),
            )
        })
        .collect()
}
