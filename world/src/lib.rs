#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative per-turn board state for the Frontline engine.
//!
//! [`TurnState`] reconstructs the arena from the engine's turn snapshot,
//! answers [`Board`] queries (occupancy, ranges, edges, paths) and executes
//! budget-checked [`TurnActions`] requests against a local copy of the board
//! so later planning steps observe earlier ones. The pending [`ActionBatch`]
//! is released exactly once through [`TurnState::submit_turn`].

use std::collections::BTreeMap;

use frontline_core::{
    Action, ActionRejected, Board, EdgeSide, Location, Owner, ResourcePool, StationaryUnit,
    TurnActions, UnitCatalog, UnitKind,
};

mod navigation;
pub mod protocol;

/// Stationary units keyed by the cell they occupy.
#[derive(Clone, Debug, Default)]
pub struct GameMap {
    units: BTreeMap<Location, StationaryUnit>,
}

impl GameMap {
    /// Creates an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Structure occupying the location, if any.
    #[must_use]
    pub fn get(&self, location: Location) -> Option<&StationaryUnit> {
        self.units.get(&location)
    }

    /// Places a structure, returning the one it displaced.
    pub fn insert(&mut self, unit: StationaryUnit) -> Option<StationaryUnit> {
        self.units.insert(unit.location, unit)
    }

    /// Clears the location, returning the structure that stood there.
    pub fn remove(&mut self, location: Location) -> Option<StationaryUnit> {
        self.units.remove(&location)
    }

    /// Reports whether a mobile unit cannot stand on the location.
    #[must_use]
    pub fn is_blocked(&self, location: Location) -> bool {
        !location.in_arena() || self.units.contains_key(&location)
    }
}

/// Actions accumulated during a turn, split the way the engine expects them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ActionBatch {
    /// Structure placements, upgrades and removals in request order.
    pub build: Vec<Action>,
    /// Mobile unit deployments in request order.
    pub deploy: Vec<Action>,
}

impl ActionBatch {
    /// Reports whether no action has been queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.build.is_empty() && self.deploy.is_empty()
    }

    /// Number of units of the kind deployed at the location.
    #[must_use]
    pub fn deployed(&self, kind: UnitKind, location: Location) -> usize {
        let wanted = Action::Place { kind, location };
        self.deploy.iter().filter(|action| **action == wanted).count()
    }
}

/// Board and budget view for the turn being planned.
#[derive(Clone, Debug)]
pub struct TurnState {
    catalog: UnitCatalog,
    turn: u32,
    map: GameMap,
    resources: ResourcePool,
    opponent_resources: ResourcePool,
    batch: ActionBatch,
}

impl TurnState {
    /// Creates an empty board with the provided budgets.
    #[must_use]
    pub fn new(catalog: UnitCatalog, turn: u32, resources: ResourcePool) -> Self {
        Self {
            catalog,
            turn,
            map: GameMap::new(),
            resources,
            opponent_resources: ResourcePool::default(),
            batch: ActionBatch::default(),
        }
    }

    /// Records the opponent's balances reported by the snapshot.
    #[must_use]
    pub fn with_opponent_resources(mut self, resources: ResourcePool) -> Self {
        self.opponent_resources = resources;
        self
    }

    /// Seeds the board with an existing structure at full health.
    ///
    /// Returns the structure that previously occupied the cell, if any.
    pub fn seed_structure(
        &mut self,
        kind: UnitKind,
        owner: Owner,
        location: Location,
    ) -> Option<StationaryUnit> {
        let max_health = self.catalog.profile(kind, false).health;
        self.insert_unit(StationaryUnit {
            kind,
            owner,
            health: max_health,
            max_health,
            location,
            upgraded: false,
        })
    }

    /// Seeds the board with an existing structure as reported by the engine.
    pub fn insert_unit(&mut self, unit: StationaryUnit) -> Option<StationaryUnit> {
        self.map.insert(unit)
    }

    /// Read-only access to the arena.
    #[must_use]
    pub fn map(&self) -> &GameMap {
        &self.map
    }

    /// Opponent balances reported by the snapshot.
    #[must_use]
    pub fn opponent_resources(&self) -> ResourcePool {
        self.opponent_resources
    }

    /// Actions queued so far this turn.
    #[must_use]
    pub fn pending(&self) -> &ActionBatch {
        &self.batch
    }

    /// Finalises the turn, yielding the queued batch.
    ///
    /// Consuming the state guarantees the batch is flushed once.
    #[must_use]
    pub fn submit_turn(self) -> ActionBatch {
        self.batch
    }

    fn owned_structure(&self, location: Location) -> Result<&StationaryUnit, ActionRejected> {
        let unit = self
            .map
            .get(location)
            .ok_or(ActionRejected::Vacant(location))?;
        if unit.owner != Owner::Me {
            return Err(ActionRejected::NotOwned(location));
        }
        Ok(unit)
    }
}

impl Board for TurnState {
    fn catalog(&self) -> &UnitCatalog {
        &self.catalog
    }

    fn occupant(&self, location: Location) -> Option<&StationaryUnit> {
        self.map.get(location)
    }

    fn path_to_edge(&self, start: Location, target: Option<EdgeSide>) -> Option<Vec<Location>> {
        let target = target.unwrap_or_else(|| EdgeSide::target_for(start));
        navigation::find_path(start, target, |cell| self.map.is_blocked(cell))
    }
}

impl TurnActions for TurnState {
    fn turn_number(&self) -> u32 {
        self.turn
    }

    fn resources(&self) -> ResourcePool {
        self.resources
    }

    fn can_place(&self, kind: UnitKind, location: Location) -> Result<(), ActionRejected> {
        if !location.in_arena() {
            return Err(ActionRejected::OutOfBounds(location));
        }

        if kind.is_structure() {
            if !location.on_own_half() {
                return Err(ActionRejected::WrongTerritory(location));
            }
        } else if !EdgeSide::LAUNCH
            .iter()
            .any(|side| side.locations().contains(&location))
        {
            return Err(ActionRejected::NotLaunchEdge(location));
        }

        if self.map.get(location).is_some() {
            return Err(ActionRejected::Occupied(location));
        }

        let cost = self.catalog.cost(kind);
        let mut budget = self.resources;
        budget.spend(&cost)
    }

    fn request_place(&mut self, kind: UnitKind, location: Location) -> Result<(), ActionRejected> {
        self.can_place(kind, location)?;
        self.resources.spend(&self.catalog.cost(kind))?;

        let action = Action::Place { kind, location };
        if kind.is_structure() {
            let _ = self.seed_structure(kind, Owner::Me, location);
            self.batch.build.push(action);
        } else {
            self.batch.deploy.push(action);
        }
        Ok(())
    }

    fn request_upgrade(&mut self, location: Location) -> Result<(), ActionRejected> {
        let unit = *self.owned_structure(location)?;
        if unit.upgraded {
            return Err(ActionRejected::NotUpgradable(location));
        }
        let cost = self
            .catalog
            .upgrade_cost(unit.kind)
            .ok_or(ActionRejected::NotUpgradable(location))?;
        self.resources.spend(&cost)?;

        let upgraded_health = self.catalog.profile(unit.kind, true).health;
        let bonus = (upgraded_health - unit.max_health).max(0.0);
        let _ = self.map.insert(StationaryUnit {
            health: unit.health + bonus,
            max_health: upgraded_health,
            upgraded: true,
            ..unit
        });
        self.batch.build.push(Action::Upgrade { location });
        Ok(())
    }

    fn request_remove(&mut self, location: Location) -> Result<(), ActionRejected> {
        let _ = self.owned_structure(location)?;
        let _ = self.map.remove(location);
        self.batch.build.push(Action::Remove { location });
        Ok(())
    }
}
