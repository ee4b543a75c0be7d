#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Single-shot offensive commitment for a turn.
//!
//! The planner prefers demolishers on a route that takes no damage at all.
//! Otherwise it sends scouts down the route with the best exposure to attack
//! trade-off. Ties always resolve to the candidate listed first, so identical
//! boards produce identical commitments.

use frontline_core::{spend_while_affordable, Location, TurnActions, UnitKind};
use frontline_system_threat::{
    rank, unblocked_launch_edges, viable_launch_edges, Candidate, ThreatEstimator,
};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Tuning for the offense planner.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OffenseConfig {
    /// Fraction of attack potential subtracted from incoming damage when valuing scout routes.
    pub attack_discount: f64,
    /// Scout routes must traverse strictly more cells than this.
    pub min_path_len: usize,
}

impl Default for OffenseConfig {
    fn default() -> Self {
        Self {
            attack_discount: 0.25,
            min_path_len: 4,
        }
    }
}

/// Deterministic launch decision derived from the current board.
#[derive(Clone, Debug, PartialEq)]
pub struct LaunchChoice {
    /// Mobile kind to commit.
    pub kind: UnitKind,
    /// Launch cell.
    pub location: Location,
    /// Route the units are expected to take.
    pub route: Vec<Location>,
}

/// Units committed by an offense pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Commitment {
    /// Mobile kind committed.
    pub kind: UnitKind,
    /// Launch cell.
    pub location: Location,
    /// Number of units deployed.
    pub committed: u32,
}

/// Picks a launch cell and unit kind, then spends the movement budget on it.
#[derive(Clone, Debug, Default)]
pub struct OffensePlanner {
    config: OffenseConfig,
    estimator: ThreatEstimator,
}

impl OffensePlanner {
    /// Creates a planner with the provided tuning.
    #[must_use]
    pub fn new(config: OffenseConfig) -> Self {
        Self {
            config,
            estimator: ThreatEstimator::default(),
        }
    }

    /// Tuning in effect.
    #[must_use]
    pub fn config(&self) -> &OffenseConfig {
        &self.config
    }

    /// Worst-class net value of a scout route; lower is better.
    #[must_use]
    pub fn net_value(&self, candidate: &Candidate) -> f64 {
        let discount = self.config.attack_discount;
        let against_walls = candidate.incoming - discount * candidate.attack.low_value;
        let against_towers = candidate.incoming - discount * candidate.attack.high_value;
        against_walls.min(against_towers)
    }

    /// Deterministic launch decision, or `None` when only the random fallback remains.
    ///
    /// A fully safe demolisher route is chosen even when the movement budget
    /// cannot pay for one demolisher; [`OffensePlanner::plan`] then commits
    /// nothing rather than falling back to scouts.
    #[must_use]
    pub fn choose<S>(&self, state: &S) -> Option<LaunchChoice>
    where
        S: TurnActions + ?Sized,
    {
        let candidates = viable_launch_edges(state);
        if candidates.is_empty() {
            return None;
        }

        let demolishers = self
            .estimator
            .score(state, &candidates, UnitKind::Demolisher);
        let safest = rank(demolishers, |_, _| std::cmp::Ordering::Equal)
            .into_iter()
            .next();
        if let Some(safe) = safest.filter(Candidate::is_fully_safe) {
            return Some(LaunchChoice {
                kind: UnitKind::Demolisher,
                location: safe.location,
                route: safe.path.unwrap_or_default(),
            });
        }

        let mut scouts: Vec<(f64, Candidate)> = self
            .estimator
            .score(state, &candidates, UnitKind::Scout)
            .into_iter()
            .map(|candidate| (self.net_value(&candidate), candidate))
            .collect();
        scouts.sort_by(|a, b| a.0.total_cmp(&b.0));

        scouts
            .into_iter()
            .map(|(_, candidate)| candidate)
            .find(|candidate| {
                candidate.path_len() > self.config.min_path_len
                    && state.can_place(UnitKind::Scout, candidate.location).is_ok()
            })
            .map(|candidate| LaunchChoice {
                kind: UnitKind::Scout,
                location: candidate.location,
                route: candidate.path.unwrap_or_default(),
            })
    }

    /// Cells the offense would traverse if it launched on the current board.
    #[must_use]
    pub fn project_route<S>(&self, state: &S) -> Vec<Location>
    where
        S: TurnActions + ?Sized,
    {
        self.choose(state)
            .map(|choice| choice.route)
            .unwrap_or_default()
    }

    /// Commits mobile units for the turn.
    ///
    /// Falls back to scouts at a random unblocked launch cell when no
    /// deterministic choice exists.
    pub fn plan<S, R>(&self, state: &mut S, rng: &mut R) -> Option<Commitment>
    where
        S: TurnActions + ?Sized,
        R: Rng + ?Sized,
    {
        let (kind, location) = match self.choose(&*state) {
            Some(choice) => (choice.kind, choice.location),
            None => {
                let options = unblocked_launch_edges(&*state);
                let Some(location) = options.choose(rng).copied() else {
                    debug!("no unblocked launch cell");
                    return None;
                };
                if let Err(reason) = state.can_place(UnitKind::Scout, location) {
                    debug!(%location, %reason, "fallback launch rejected");
                    return None;
                }
                (UnitKind::Scout, location)
            }
        };

        match spend_while_affordable(state, kind, location, None) {
            Ok(committed) => {
                info!(?kind, %location, committed, "offense committed");
                Some(Commitment {
                    kind,
                    location,
                    committed,
                })
            }
            Err(error) => {
                warn!(?kind, %error, "offense skipped");
                None
            }
        }
    }
}
