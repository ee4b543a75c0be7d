#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure scoring of launch candidates by projected exposure and attack potential.
//!
//! Both scores walk the route the path oracle predicts for a candidate. A
//! candidate without a route scores zero on both axes and reports
//! `has_path() == false`, so callers can tell "unreachable" apart from "safe".

use std::cmp::Ordering;

use frontline_core::{Board, EdgeSide, Location, Owner, UnitKind};

/// Expected structural damage split by target value.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AttackScore {
    /// Damage weighted by cost against walls.
    pub low_value: f64,
    /// Damage weighted by cost against supports and turrets.
    pub high_value: f64,
}

impl AttackScore {
    /// Sum over both target classes.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.low_value + self.high_value
    }
}

/// Scored launch candidate. Recomputed every planning pass.
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
    /// Launch cell.
    pub location: Location,
    /// Predicted route, including the launch cell.
    pub path: Option<Vec<Location>>,
    /// Projected damage taken along the route.
    pub incoming: f64,
    /// Projected damage dealt along the route.
    pub attack: AttackScore,
}

impl Candidate {
    /// Reports whether the oracle produced a route.
    #[must_use]
    pub fn has_path(&self) -> bool {
        self.path.is_some()
    }

    /// Number of cells on the route, zero when unreachable.
    #[must_use]
    pub fn path_len(&self) -> usize {
        self.path.as_ref().map_or(0, Vec::len)
    }

    /// Reports whether the candidate has a route that takes no damage at all.
    #[must_use]
    pub fn is_fully_safe(&self) -> bool {
        self.has_path() && self.incoming == 0.0
    }
}

/// Scores candidates from the perspective of one player's mobile units.
#[derive(Clone, Copy, Debug)]
pub struct ThreatEstimator {
    perspective: Owner,
}

impl Default for ThreatEstimator {
    fn default() -> Self {
        Self::new(Owner::Me)
    }
}

impl ThreatEstimator {
    /// Creates an estimator for units launched by `perspective`.
    #[must_use]
    pub fn new(perspective: Owner) -> Self {
        Self { perspective }
    }

    /// Player whose units are being scored.
    #[must_use]
    pub fn perspective(&self) -> Owner {
        self.perspective
    }

    /// Projected incoming damage for each candidate, in input order.
    #[must_use]
    pub fn estimate_damage<B>(&self, board: &B, candidates: &[Location], attacker: UnitKind) -> Vec<f64>
    where
        B: Board + ?Sized,
    {
        candidates
            .iter()
            .map(|&start| {
                board
                    .path_to_edge(start, None)
                    .map_or(0.0, |path| self.path_damage(board, &path, attacker))
            })
            .collect()
    }

    /// Projected structural damage dealt for each candidate, in input order.
    #[must_use]
    pub fn estimate_attack_potential<B>(
        &self,
        board: &B,
        candidates: &[Location],
        attacker: UnitKind,
    ) -> Vec<AttackScore>
    where
        B: Board + ?Sized,
    {
        candidates
            .iter()
            .map(|&start| {
                board
                    .path_to_edge(start, None)
                    .map_or_else(AttackScore::default, |path| {
                        self.path_attack(board, &path, attacker)
                    })
            })
            .collect()
    }

    /// Scores every candidate on both axes, querying each route once.
    #[must_use]
    pub fn score<B>(&self, board: &B, candidates: &[Location], attacker: UnitKind) -> Vec<Candidate>
    where
        B: Board + ?Sized,
    {
        candidates
            .iter()
            .map(|&location| {
                let path = board.path_to_edge(location, None);
                let (incoming, attack) = path.as_deref().map_or_else(
                    || (0.0, AttackScore::default()),
                    |path| {
                        (
                            self.path_damage(board, path, attacker),
                            self.path_attack(board, path, attacker),
                        )
                    },
                );
                Candidate {
                    location,
                    path,
                    incoming,
                    attack,
                }
            })
            .collect()
    }

    fn path_damage<B>(&self, board: &B, path: &[Location], attacker: UnitKind) -> f64
    where
        B: Board + ?Sized,
    {
        let catalog = board.catalog();
        let speed = catalog.profile(attacker, false).speed;
        let exposure = if speed > 0.0 { 1.0 / speed } else { 1.0 };

        path.iter()
            .map(|&cell| {
                board
                    .attackers(cell, self.perspective)
                    .into_iter()
                    .map(|unit| catalog.profile(unit.kind, unit.upgraded).damage_to_mobile)
                    .sum::<f64>()
            })
            .sum::<f64>()
            * exposure
    }

    fn path_attack<B>(&self, board: &B, path: &[Location], attacker: UnitKind) -> AttackScore
    where
        B: Board + ?Sized,
    {
        let catalog = board.catalog();
        let profile = catalog.profile(attacker, false);
        let mut score = AttackScore::default();
        if profile.damage_to_structure <= 0.0 {
            return score;
        }

        for &cell in path {
            for target in board.locations_in_range(cell, profile.range) {
                let Some(unit) = board.occupant(target) else {
                    continue;
                };
                if unit.owner == self.perspective {
                    continue;
                }
                let Some(class) = unit.kind.structure_class() else {
                    continue;
                };

                let value = profile.damage_to_structure * catalog.cost(unit.kind).structure;
                if class.is_high_value() {
                    score.high_value += value;
                } else {
                    score.low_value += value;
                }
            }
        }

        score
    }
}

/// Orders candidates by ascending incoming damage, then by `tie_break`.
///
/// The sort is stable, so candidates the tie-break deems equal keep their
/// input order.
#[must_use]
pub fn rank<F>(mut candidates: Vec<Candidate>, mut tie_break: F) -> Vec<Candidate>
where
    F: FnMut(&Candidate, &Candidate) -> Ordering,
{
    candidates.sort_by(|a, b| {
        a.incoming
            .total_cmp(&b.incoming)
            .then_with(|| tie_break(a, b))
    });
    candidates
}

/// Launch-edge cells free of structures, ordered edge by edge from the tip.
#[must_use]
pub fn unblocked_launch_edges<B>(board: &B) -> Vec<Location>
where
    B: Board + ?Sized,
{
    EdgeSide::LAUNCH
        .iter()
        .flat_map(|side| board.edge_locations(*side))
        .filter(|cell| !board.is_occupied(*cell))
        .collect()
}

/// Unblocked launch-edge cells whose route ends on an enemy edge.
#[must_use]
pub fn viable_launch_edges<B>(board: &B) -> Vec<Location>
where
    B: Board + ?Sized,
{
    let enemy: Vec<Location> = EdgeSide::ENEMY
        .iter()
        .flat_map(|side| board.edge_locations(*side))
        .collect();

    unblocked_launch_edges(board)
        .into_iter()
        .filter(|start| {
            board
                .path_to_edge(*start, None)
                .and_then(|path| path.last().copied())
                .is_some_and(|end| enemy.contains(&end))
        })
        .collect()
}
