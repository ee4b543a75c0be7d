#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Reactive defense planning for a single turn.
//!
//! The planner runs one terminal pass per turn: repair damaged structures,
//! answer breaches, complete the reinforcement layout and finally deploy
//! interceptors where the turn's threats concentrated. Every rejected request
//! is logged and skipped; the pass never aborts.

use std::collections::BTreeMap;
use std::ops::AddAssign;

use frontline_core::{
    spend_while_affordable, Board, CrossingEvent, EdgeSide, Location, Owner, ResourcePool,
    TurnActions, UnitKind, FRONT_ROW, HALF_ARENA,
};
use frontline_system_events::TurnSummary;
use frontline_system_threat::unblocked_launch_edges;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Number of edge cells tried, nearest first, when an interceptor site is blocked.
const INTERCEPTOR_SITES: usize = 3;

/// Fixed placement pattern expressed as `[x, y]` pairs.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Layout {
    /// Turret cells, placed first.
    pub turrets: Vec<[i32; 2]>,
    /// Wall cells, placed after the turrets.
    pub walls: Vec<[i32; 2]>,
}

impl Layout {
    /// Turrets and front-row walls built on the first turn.
    #[must_use]
    pub fn opening() -> Self {
        Self {
            turrets: vec![[3, 12], [10, 12], [12, 12], [15, 12], [17, 12], [24, 12]],
            walls: vec![
                [2, 13],
                [3, 13],
                [4, 13],
                [5, 13],
                [9, 13],
                [10, 13],
                [11, 13],
                [12, 13],
                [13, 13],
                [14, 13],
                [15, 13],
                [16, 13],
                [17, 13],
                [18, 13],
                [22, 13],
                [23, 13],
                [24, 13],
                [25, 13],
            ],
        }
    }

    /// Corner turrets and a second wall behind the front-row gaps.
    #[must_use]
    pub fn reinforcement() -> Self {
        Self {
            turrets: vec![[1, 12], [26, 12], [7, 11], [20, 11]],
            walls: vec![
                [0, 13],
                [1, 13],
                [26, 13],
                [27, 13],
                [6, 12],
                [7, 12],
                [8, 12],
                [19, 12],
                [20, 12],
                [21, 12],
            ],
        }
    }

    /// Every site paired with the kind built there, turrets first.
    pub fn sites(&self) -> impl Iterator<Item = (UnitKind, Location)> + '_ {
        let turrets = self
            .turrets
            .iter()
            .map(|site| (UnitKind::Turret, location(*site)));
        let walls = self
            .walls
            .iter()
            .map(|site| (UnitKind::Wall, location(*site)));
        turrets.chain(walls)
    }
}

/// Weights applied to each threat source when voting for interceptor sites.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct VoteWeights {
    /// Weight of each opponent breach.
    pub breach: u32,
    /// Weight of each deduced break-through point.
    pub break_through: u32,
    /// Weight of each opponent spawn origin, mirrored onto the defender's edge.
    pub spawn_origin: u32,
}

impl Default for VoteWeights {
    fn default() -> Self {
        Self {
            breach: 3,
            break_through: 2,
            spawn_origin: 1,
        }
    }
}

/// Tuning for the defense planner.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DefenseConfig {
    /// Structures below this health ratio are removed and rebuilt.
    pub health_threshold: f64,
    /// Fraction of the movement budget interceptors may consume.
    pub interceptor_share: f64,
    /// Interceptor vote weights.
    pub vote_weights: VoteWeights,
    /// Layout built on the opening turn.
    pub opening: Layout,
    /// Layout completed every turn where cells are free.
    pub reinforcement: Layout,
    /// Turret offsets tried around each breach, written for the left half.
    pub flank_offsets: Vec<[i32; 2]>,
    /// Cells that absorb surplus structure budget with supports.
    pub support_locations: Vec<[i32; 2]>,
}

impl Default for DefenseConfig {
    fn default() -> Self {
        Self {
            health_threshold: 0.5,
            interceptor_share: 0.5,
            vote_weights: VoteWeights::default(),
            opening: Layout::opening(),
            reinforcement: Layout::reinforcement(),
            flank_offsets: vec![
                [-2, 2],
                [-3, 2],
                [-1, 2],
                [-2, 1],
                [-3, 1],
                [-3, 3],
                [-2, 3],
                [-1, 3],
            ],
            support_locations: vec![[14, 9], [4, 11], [13, 3], [23, 11]],
        }
    }
}

/// Tally of accepted requests issued by a defense pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DefenseReport {
    /// Structures placed.
    pub placed: u32,
    /// Structures upgraded.
    pub upgraded: u32,
    /// Structures removed.
    pub removed: u32,
    /// Interceptors deployed.
    pub interceptors: u32,
}

impl DefenseReport {
    /// Reports whether no request was accepted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn place<S>(&mut self, state: &mut S, kind: UnitKind, location: Location) -> bool
    where
        S: TurnActions + ?Sized,
    {
        match state.request_place(kind, location) {
            Ok(()) => {
                if kind.is_structure() {
                    self.placed += 1;
                } else {
                    self.interceptors += 1;
                }
                true
            }
            Err(reason) => {
                debug!(?kind, %location, %reason, "placement skipped");
                false
            }
        }
    }

    fn upgrade<S>(&mut self, state: &mut S, location: Location) -> bool
    where
        S: TurnActions + ?Sized,
    {
        match state.request_upgrade(location) {
            Ok(()) => {
                self.upgraded += 1;
                true
            }
            Err(reason) => {
                debug!(%location, %reason, "upgrade skipped");
                false
            }
        }
    }

    fn remove<S>(&mut self, state: &mut S, location: Location) -> bool
    where
        S: TurnActions + ?Sized,
    {
        match state.request_remove(location) {
            Ok(()) => {
                self.removed += 1;
                true
            }
            Err(reason) => {
                debug!(%location, %reason, "removal skipped");
                false
            }
        }
    }
}

impl AddAssign for DefenseReport {
    fn add_assign(&mut self, other: Self) {
        self.placed += other.placed;
        self.upgraded += other.upgraded;
        self.removed += other.removed;
        self.interceptors += other.interceptors;
    }
}

/// Plans repairs, breach responses, reinforcement and interceptor deployment.
#[derive(Clone, Debug, Default)]
pub struct DefensePlanner {
    config: DefenseConfig,
}

impl DefensePlanner {
    /// Creates a planner with the provided tuning.
    #[must_use]
    pub fn new(config: DefenseConfig) -> Self {
        Self { config }
    }

    /// Tuning in effect.
    #[must_use]
    pub fn config(&self) -> &DefenseConfig {
        &self.config
    }

    /// Builds the opening layout and spends the movement budget on interceptors
    /// at random unblocked launch cells.
    pub fn opening<S, R>(&self, state: &mut S, rng: &mut R) -> DefenseReport
    where
        S: TurnActions + ?Sized,
        R: Rng + ?Sized,
    {
        let mut report = DefenseReport::default();
        for (kind, location) in self.config.opening.sites() {
            let _ = report.place(state, kind, location);
        }

        let launch = unblocked_launch_edges(&*state);
        let cost = state.catalog().cost(UnitKind::Interceptor);
        let cap = match state.resources().affordable_count(&cost) {
            Ok(cap) => cap,
            Err(error) => {
                warn!(%error, "interceptor cost is misconfigured");
                return report;
            }
        };

        for _ in 0..cap {
            let Some(site) = launch.choose(rng).copied() else {
                break;
            };
            if !report.place(state, UnitKind::Interceptor, site) {
                break;
            }
        }

        report
    }

    /// Runs the full defensive pass in priority order.
    ///
    /// Cells listed in `reserved` are left free by the reinforcement step.
    pub fn plan<S>(&self, state: &mut S, summary: &TurnSummary, reserved: &[Location]) -> DefenseReport
    where
        S: TurnActions + ?Sized,
    {
        let mut report = self.repair(state, summary);
        report += self.respond_to_breaches(state, summary);
        report += self.reinforce(state, reserved);
        report += self.deploy_interceptors(state, summary);
        report
    }

    /// Rebuilds badly damaged, vanished and destroyed structures.
    ///
    /// A structure below the health threshold is removed and rebuilt only when
    /// the rebuild is affordable. Every rebuild is followed by an upgrade attempt.
    pub fn repair<S>(&self, state: &mut S, summary: &TurnSummary) -> DefenseReport
    where
        S: TurnActions + ?Sized,
    {
        let mut report = DefenseReport::default();

        for damage in summary.damaged() {
            let location = damage.location;
            match state.occupant(location).copied() {
                Some(unit) if unit.owner != Owner::Me => {}
                Some(unit) => {
                    if unit.health_ratio() >= self.config.health_threshold {
                        continue;
                    }
                    let cost = state.catalog().cost(unit.kind);
                    if !state.resources().can_afford(&cost) {
                        debug!(%location, kind = ?unit.kind, "rebuild unaffordable, keeping damaged structure");
                        continue;
                    }
                    if report.remove(state, location) {
                        rebuild(state, unit.kind, location, &mut report);
                    }
                }
                None => rebuild(state, damage.class.kind(), location, &mut report),
            }
        }

        for (location, kind) in summary.destroyed() {
            if !state.is_occupied(location) {
                rebuild(state, kind, location, &mut report);
            }
        }

        report
    }

    /// Plugs each breached lane at the front line and flanks it with a turret.
    ///
    /// A wall goes on the first front-row cell of the lane and a turret one row
    /// behind it. Cells already holding the defender's structures are upgraded
    /// instead.
    pub fn respond_to_breaches<S>(&self, state: &mut S, summary: &TurnSummary) -> DefenseReport
    where
        S: TurnActions + ?Sized,
    {
        let mut report = DefenseReport::default();

        for breach in summary.breach_locations() {
            let Some(crossing) = front_line_crossing(&*state, breach) else {
                debug!(%breach, "breach has no front-line crossing");
                continue;
            };

            let behind = crossing.offset(0, -1);
            fortify(state, UnitKind::Wall, crossing, &mut report);
            if let Some(behind) = behind {
                fortify(state, UnitKind::Turret, behind, &mut report);
            }

            let plug: Vec<Location> = std::iter::once(crossing).chain(behind).collect();
            self.flank(state, breach, &plug, &mut report);
        }

        report
    }

    fn flank<S>(&self, state: &mut S, breach: Location, plug: &[Location], report: &mut DefenseReport)
    where
        S: TurnActions + ?Sized,
    {
        let mirror = breach.x() > HALF_ARENA;
        let sites: Vec<Location> = self
            .config
            .flank_offsets
            .iter()
            .filter_map(|[dx, dy]| breach.offset(if mirror { *dx } else { -*dx }, *dy))
            .filter(|site| !plug.contains(site))
            .collect();

        let flanked = sites.iter().any(|site| {
            state
                .occupant(*site)
                .is_some_and(|unit| unit.owner == Owner::Me && unit.kind == UnitKind::Turret)
        });
        if flanked {
            return;
        }

        for site in sites {
            if report.place(state, UnitKind::Turret, site) {
                if let Some(cover) = site.offset(0, 1) {
                    let _ = report.place(state, UnitKind::Wall, cover);
                }
                break;
            }
        }
    }

    /// Completes the reinforcement layout on free cells outside `reserved`.
    pub fn reinforce<S>(&self, state: &mut S, reserved: &[Location]) -> DefenseReport
    where
        S: TurnActions + ?Sized,
    {
        let mut report = DefenseReport::default();
        for (kind, location) in self.config.reinforcement.sites() {
            if reserved.contains(&location) || state.is_occupied(location) {
                continue;
            }
            let _ = report.place(state, kind, location);
        }
        report
    }

    /// Weighted votes per friendly edge cell gathered from the turn's threats.
    ///
    /// Breaches, mirrored spawn origins and break-through points extrapolated
    /// from observed midline crossings are snapped to the nearest launch-edge
    /// cell before being counted.
    #[must_use]
    pub fn interceptor_votes<B>(&self, board: &B, summary: &TurnSummary) -> BTreeMap<Location, u32>
    where
        B: Board + ?Sized,
    {
        let edges = friendly_edges(board);
        let weights = self.config.vote_weights;
        let mut votes: BTreeMap<Location, u32> = BTreeMap::new();
        let mut cast = |location: Location, weight: u32| {
            if weight == 0 {
                return;
            }
            if let Some(cell) = nearest(&edges, location) {
                let tally = votes.entry(cell).or_insert(0);
                *tally = tally.saturating_add(weight);
            }
        };

        for breach in &summary.breaches {
            cast(breach.location, weights.breach);
        }

        for spawn in &summary.spawns {
            cast(spawn.location.mirrored(), weights.spawn_origin);
        }

        for crossing in &summary.crossings {
            cast(break_through(board, crossing), weights.break_through);
        }

        votes
    }

    /// Deploys interceptors in proportion to each site's vote share.
    ///
    /// The total is bounded by the configured share of the movement budget.
    /// A turn without any vote deploys nothing.
    pub fn deploy_interceptors<S>(&self, state: &mut S, summary: &TurnSummary) -> DefenseReport
    where
        S: TurnActions + ?Sized,
    {
        let mut report = DefenseReport::default();
        let votes = self.interceptor_votes(&*state, summary);
        if votes.values().all(|vote| *vote == 0) {
            debug!("no interceptor votes this turn");
            return report;
        }

        let cost = state.catalog().cost(UnitKind::Interceptor);
        let balance = state.resources();
        let share = self.config.interceptor_share.clamp(0.0, 1.0);
        let allowance = ResourcePool::new(balance.structure(), balance.movement() * share);
        let cap = match allowance.affordable_count(&cost) {
            Ok(cap) => cap,
            Err(error) => {
                warn!(%error, "interceptor cost is misconfigured");
                return report;
            }
        };

        let edges = friendly_edges(&*state);
        for (location, mut remaining) in apportion(cap, &votes) {
            for site in nearby(&edges, location) {
                if remaining == 0 {
                    break;
                }
                match spend_while_affordable(state, UnitKind::Interceptor, site, Some(remaining)) {
                    Ok(placed) => {
                        remaining -= placed;
                        report.interceptors += placed;
                    }
                    Err(error) => {
                        warn!(%error, "interceptor cost is misconfigured");
                        return report;
                    }
                }
            }
        }

        report
    }

    /// Spends leftover structure budget on supports at the configured cells.
    pub fn invest_surplus<S>(&self, state: &mut S) -> DefenseReport
    where
        S: TurnActions + ?Sized,
    {
        let mut report = DefenseReport::default();
        let cost = state.catalog().cost(UnitKind::Support);
        let cap = match state.resources().affordable_count(&cost) {
            Ok(cap) => cap,
            Err(error) => {
                warn!(%error, "support cost is misconfigured");
                return report;
            }
        };

        for site in &self.config.support_locations {
            if report.placed >= cap {
                break;
            }
            let _ = report.place(state, UnitKind::Support, location(*site));
        }
        report
    }
}

/// Splits `seats` across the voted sites by largest remainder.
///
/// The quotas sum to `seats` whenever any vote was cast. Equal remainders
/// favour sites in location order.
fn apportion(seats: u32, votes: &BTreeMap<Location, u32>) -> Vec<(Location, u32)> {
    let total: u64 = votes.values().map(|vote| u64::from(*vote)).sum();
    if total == 0 {
        return Vec::new();
    }

    let mut quotas: Vec<(Location, u32, u64)> = votes
        .iter()
        .map(|(location, vote)| {
            let share = u64::from(seats) * u64::from(*vote);
            let whole = u32::try_from(share / total).unwrap_or(seats);
            (*location, whole, share % total)
        })
        .collect();

    let assigned: u32 = quotas.iter().map(|(_, whole, _)| *whole).sum();
    let mut order: Vec<usize> = (0..quotas.len()).collect();
    order.sort_by(|a, b| quotas[*b].2.cmp(&quotas[*a].2));
    for index in order.into_iter().take(seats.saturating_sub(assigned) as usize) {
        quotas[index].1 += 1;
    }

    quotas
        .into_iter()
        .map(|(location, quota, _)| (location, quota))
        .collect()
}

fn location([x, y]: [i32; 2]) -> Location {
    Location::new(x, y)
}

fn rebuild<S>(state: &mut S, kind: UnitKind, location: Location, report: &mut DefenseReport)
where
    S: TurnActions + ?Sized,
{
    if report.place(state, kind, location) {
        let _ = report.upgrade(state, location);
    }
}

fn fortify<S>(state: &mut S, kind: UnitKind, location: Location, report: &mut DefenseReport)
where
    S: TurnActions + ?Sized,
{
    match state.occupant(location).map(|unit| unit.owner) {
        Some(Owner::Me) => {
            let _ = report.upgrade(state, location);
        }
        Some(Owner::Opponent) => {}
        None => {
            let _ = report.place(state, kind, location);
        }
    }
}

/// First front-row cell on the lane through `breach`, or the front-row cell straight ahead.
fn front_line_crossing<B>(board: &B, breach: Location) -> Option<Location>
where
    B: Board + ?Sized,
{
    let crossing = board
        .path_to_edge(breach, None)
        .and_then(|path| path.into_iter().find(|cell| cell.y() == FRONT_ROW));
    crossing.or_else(|| {
        let projected = Location::new(breach.x(), FRONT_ROW);
        projected.in_arena().then_some(projected)
    })
}

/// Edge cell an opponent unit reaches when it continues from its midline crossing.
///
/// The heading is the edge opposite the unit's launch cell. Without a path the
/// crossing itself is used.
fn break_through<B>(board: &B, crossing: &CrossingEvent) -> Location
where
    B: Board + ?Sized,
{
    let heading = EdgeSide::containing(crossing.origin).map(EdgeSide::opposite);
    board
        .path_to_edge(crossing.location, heading)
        .and_then(|path| path.last().copied())
        .unwrap_or(crossing.location)
}

fn friendly_edges<B>(board: &B) -> Vec<Location>
where
    B: Board + ?Sized,
{
    EdgeSide::LAUNCH
        .iter()
        .flat_map(|side| board.edge_locations(*side))
        .collect()
}

fn nearest(edges: &[Location], target: Location) -> Option<Location> {
    edges
        .iter()
        .copied()
        .min_by_key(|cell| cell.distance_sq(target))
}

fn nearby(edges: &[Location], target: Location) -> Vec<Location> {
    let mut sites = edges.to_vec();
    sites.sort_by_key(|cell| cell.distance_sq(target));
    sites.truncate(INTERCEPTOR_SITES);
    sites
}
