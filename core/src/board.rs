//! Query and action surfaces the turn engine consumes from the board.

use crate::{
    ActionRejected, EdgeSide, Location, Owner, ResourcePool, StationaryUnit, UnitCatalog,
    UnitKind, ARENA_SIZE,
};

/// Extra reach added to every radius so cells touching the circle's rim count as inside.
pub const RANGE_SLACK: f64 = 0.51;

/// Reports whether `target` lies within `range` cells of `origin`.
#[must_use]
pub fn within_range(origin: Location, target: Location, range: f64) -> bool {
    let reach = range + RANGE_SLACK;
    (origin.distance_sq(target) as f64) <= reach * reach
}

/// Read-only board queries used by the estimator and the planners.
pub trait Board {
    /// Unit catalog the board resolves stats from.
    fn catalog(&self) -> &UnitCatalog;

    /// Structure occupying the location, if any.
    fn occupant(&self, location: Location) -> Option<&StationaryUnit>;

    /// Ordered cells a mobile unit starting at `start` traverses, including the start.
    ///
    /// The target edge defaults to the one diagonally opposite the start.
    /// Returns `None` when the start is outside the arena or blocked.
    fn path_to_edge(&self, start: Location, target: Option<EdgeSide>) -> Option<Vec<Location>>;

    /// Reports whether a structure occupies the location.
    fn is_occupied(&self, location: Location) -> bool {
        self.occupant(location).is_some()
    }

    /// In-arena cells within `radius` of `center`.
    fn locations_in_range(&self, center: Location, radius: f64) -> Vec<Location> {
        if radius.is_nan() || radius < 0.0 {
            return Vec::new();
        }

        // Radii beyond the arena cover all of it.
        let reach = (radius + RANGE_SLACK).ceil().min(f64::from(ARENA_SIZE)) as i32;
        let mut cells = Vec::new();
        let rows = center.y().saturating_sub(reach).max(0)
            ..=center.y().saturating_add(reach).min(ARENA_SIZE - 1);
        for y in rows {
            let columns = center.x().saturating_sub(reach).max(0)
                ..=center.x().saturating_add(reach).min(ARENA_SIZE - 1);
            for x in columns {
                let cell = Location::new(x, y);
                if cell.in_arena() && within_range(center, cell, radius) {
                    cells.push(cell);
                }
            }
        }
        cells
    }

    /// Cells composing the provided edge.
    fn edge_locations(&self, side: EdgeSide) -> Vec<Location> {
        side.locations()
    }

    /// Structures hostile to `victim` able to hit a mobile unit standing at `location`.
    fn attackers(&self, location: Location, victim: Owner) -> Vec<&StationaryUnit> {
        let catalog = self.catalog();
        self.locations_in_range(location, catalog.max_structure_range())
            .into_iter()
            .filter_map(|cell| self.occupant(cell))
            .filter(|unit| unit.owner != victim)
            .filter(|unit| {
                let profile = catalog.profile(unit.kind, unit.upgraded);
                profile.damage_to_mobile > 0.0
                    && within_range(unit.location, location, profile.range)
            })
            .collect()
    }
}

/// Budget-checked mutation requests issued by the defender during a turn.
///
/// Every request either succeeds, updating the live budget and the local
/// board view, or is rejected without side effects.
pub trait TurnActions: Board {
    /// Index of the turn being planned.
    fn turn_number(&self) -> u32;

    /// Live balances of both budgets.
    fn resources(&self) -> ResourcePool;

    /// Checks whether a placement would be accepted without performing it.
    ///
    /// # Errors
    ///
    /// Returns the reason the placement would be rejected.
    fn can_place(&self, kind: UnitKind, location: Location) -> Result<(), ActionRejected>;

    /// Places a single unit of the provided kind.
    ///
    /// # Errors
    ///
    /// Returns the reason the placement was rejected.
    fn request_place(&mut self, kind: UnitKind, location: Location) -> Result<(), ActionRejected>;

    /// Upgrades the defender's structure at the location.
    ///
    /// # Errors
    ///
    /// Returns the reason the upgrade was rejected.
    fn request_upgrade(&mut self, location: Location) -> Result<(), ActionRejected>;

    /// Removes the defender's structure at the location.
    ///
    /// # Errors
    ///
    /// Returns the reason the removal was rejected.
    fn request_remove(&mut self, location: Location) -> Result<(), ActionRejected>;

    /// Places up to `count` units, stopping at the first rejection.
    ///
    /// Returns the number of units placed.
    fn request_place_many(&mut self, kind: UnitKind, location: Location, count: u32) -> u32 {
        let mut placed = 0;
        for _ in 0..count {
            if self.request_place(kind, location).is_err() {
                break;
            }
            placed += 1;
        }
        placed
    }
}
