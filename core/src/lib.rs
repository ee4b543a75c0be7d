#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Frontline turn engine.
//!
//! This crate defines the vocabulary that connects the board, the event
//! aggregator, the threat estimator and the planners. The board answers
//! queries through the [`Board`] trait and accepts budget-checked mutation
//! requests through [`TurnActions`]. Systems read per-turn event summaries,
//! score candidate locations, and respond exclusively with action requests.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod allocator;
mod board;
mod catalog;
mod resources;

pub use allocator::spend_while_affordable;
pub use board::{within_range, Board, TurnActions, RANGE_SLACK};
pub use catalog::{CatalogError, UnitCatalog, UnitProfile, UnitStats};
pub use resources::{BudgetError, Cost, ResourceKind, ResourcePool};

/// Number of cells along each side of the square bounding the arena.
pub const ARENA_SIZE: i32 = 28;

/// Number of rows owned by each player.
pub const HALF_ARENA: i32 = ARENA_SIZE / 2;

/// Row holding the defender's forward-most cells.
pub const FRONT_ROW: i32 = HALF_ARENA - 1;

/// Location of a single arena cell expressed as column and row coordinates.
///
/// Row zero is the defender's rear tip; rows increase toward the opponent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    x: i32,
    y: i32,
}

impl Location {
    /// Creates a new location. The value is not required to lie inside the arena.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Reports whether the location lies within the diamond-shaped arena.
    #[must_use]
    pub const fn in_arena(&self) -> bool {
        if self.y < 0 || self.y >= ARENA_SIZE {
            return false;
        }

        if self.y < HALF_ARENA {
            self.x >= HALF_ARENA - 1 - self.y && self.x <= HALF_ARENA + self.y
        } else {
            self.x >= self.y - HALF_ARENA && self.x <= ARENA_SIZE + HALF_ARENA - 1 - self.y
        }
    }

    /// Reports whether the location lies on the defender's half of the arena.
    #[must_use]
    pub const fn on_own_half(&self) -> bool {
        self.y < HALF_ARENA
    }

    /// Returns the location shifted by the provided deltas if it stays inside the arena.
    #[must_use]
    pub fn offset(self, dx: i32, dy: i32) -> Option<Location> {
        let x = self.x.checked_add(dx)?;
        let y = self.y.checked_add(dy)?;
        let shifted = Location::new(x, y);
        shifted.in_arena().then_some(shifted)
    }

    /// Reflects the location across the midline onto the other player's half.
    #[must_use]
    pub const fn mirrored(self) -> Location {
        Location::new(self.x, ARENA_SIZE - 1 - self.y)
    }

    /// Squared euclidean distance between two locations.
    #[must_use]
    pub fn distance_sq(self, other: Location) -> i64 {
        let dx = i64::from(self.x) - i64::from(other.x);
        let dy = i64::from(self.y) - i64::from(other.y);
        dx * dx + dy * dy
    }

    /// Computes the Manhattan distance between two locations.
    #[must_use]
    pub fn manhattan_distance(self, other: Location) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.x, self.y)
    }
}

/// Identifies which player owns a unit or caused an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Owner {
    /// The player this engine plays for.
    Me,
    /// The opposing player.
    Opponent,
}

impl Owner {
    /// Decodes the owner flag used in engine frames, where 1 is self and 2 the opponent.
    #[must_use]
    pub const fn from_frame_flag(flag: u64) -> Option<Owner> {
        match flag {
            1 => Some(Self::Me),
            2 => Some(Self::Opponent),
            _ => None,
        }
    }
}

/// Closed set of unit kinds available in the game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UnitKind {
    /// Cheap blocking structure.
    Wall,
    /// Structure that shields friendly mobile units.
    Support,
    /// Attacking structure that fires at mobile units in range.
    Turret,
    /// Cheap fast mobile unit.
    Scout,
    /// Tanky long-range mobile unit that targets structures.
    Demolisher,
    /// Mobile unit that hunts enemy mobile units.
    Interceptor,
}

impl UnitKind {
    /// Every unit kind ordered by its engine type index.
    pub const ALL: [UnitKind; 6] = [
        Self::Wall,
        Self::Support,
        Self::Turret,
        Self::Scout,
        Self::Demolisher,
        Self::Interceptor,
    ];

    /// Engine type index used in configuration and frame payloads.
    #[must_use]
    pub const fn type_index(self) -> usize {
        match self {
            Self::Wall => 0,
            Self::Support => 1,
            Self::Turret => 2,
            Self::Scout => 3,
            Self::Demolisher => 4,
            Self::Interceptor => 5,
        }
    }

    /// Resolves an engine type index into a unit kind.
    #[must_use]
    pub fn from_type_index(index: u64) -> Option<UnitKind> {
        usize::try_from(index)
            .ok()
            .and_then(|index| Self::ALL.get(index).copied())
    }

    /// Reports whether the kind is a stationary structure.
    #[must_use]
    pub const fn is_structure(self) -> bool {
        matches!(self, Self::Wall | Self::Support | Self::Turret)
    }

    /// Reports whether the kind is a mobile unit.
    #[must_use]
    pub const fn is_mobile(self) -> bool {
        !self.is_structure()
    }

    /// Budget the kind is paid from.
    #[must_use]
    pub const fn resource(self) -> ResourceKind {
        if self.is_structure() {
            ResourceKind::Structure
        } else {
            ResourceKind::Movement
        }
    }

    /// Structural class of the kind, if it is a structure.
    #[must_use]
    pub const fn structure_class(self) -> Option<StructureClass> {
        match self {
            Self::Wall => Some(StructureClass::Wall),
            Self::Support => Some(StructureClass::Support),
            Self::Turret => Some(StructureClass::Turret),
            Self::Scout | Self::Demolisher | Self::Interceptor => None,
        }
    }
}

/// Structural target classes reported by damage and death events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StructureClass {
    /// Blocking structure.
    Wall,
    /// Shielding structure.
    Support,
    /// Attacking structure.
    Turret,
}

impl StructureClass {
    /// Resolves an engine type index into a structural class.
    #[must_use]
    pub fn from_type_index(index: u64) -> Option<StructureClass> {
        UnitKind::from_type_index(index).and_then(UnitKind::structure_class)
    }

    /// Unit kind that rebuilds a structure of this class.
    #[must_use]
    pub const fn kind(self) -> UnitKind {
        match self {
            Self::Wall => UnitKind::Wall,
            Self::Support => UnitKind::Support,
            Self::Turret => UnitKind::Turret,
        }
    }

    /// Walls are low-value targets; supports and turrets are high-value targets.
    #[must_use]
    pub const fn is_high_value(self) -> bool {
        !matches!(self, Self::Wall)
    }
}

/// The four diagonal edges of the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeSide {
    /// Upper-left edge owned by the opponent.
    TopLeft,
    /// Upper-right edge owned by the opponent.
    TopRight,
    /// Lower-left edge owned by the defender.
    BottomLeft,
    /// Lower-right edge owned by the defender.
    BottomRight,
}

impl EdgeSide {
    /// Edges from which the defender launches mobile units.
    pub const LAUNCH: [EdgeSide; 2] = [Self::BottomLeft, Self::BottomRight];

    /// Edges the defender's mobile units try to reach.
    pub const ENEMY: [EdgeSide; 2] = [Self::TopLeft, Self::TopRight];

    /// Edge diagonally across the arena.
    #[must_use]
    pub const fn opposite(self) -> EdgeSide {
        match self {
            Self::TopLeft => Self::BottomRight,
            Self::TopRight => Self::BottomLeft,
            Self::BottomLeft => Self::TopRight,
            Self::BottomRight => Self::TopLeft,
        }
    }

    /// Reports whether the edge lies on the opponent's half.
    #[must_use]
    pub const fn is_top(self) -> bool {
        matches!(self, Self::TopLeft | Self::TopRight)
    }

    /// Reports whether the edge lies on the right-hand side.
    #[must_use]
    pub const fn is_right(self) -> bool {
        matches!(self, Self::TopRight | Self::BottomRight)
    }

    /// Cells composing the edge, ordered from the arena tip toward the midline.
    #[must_use]
    pub fn locations(self) -> Vec<Location> {
        (0..HALF_ARENA)
            .map(|i| match self {
                Self::BottomLeft => Location::new(FRONT_ROW - i, i),
                Self::BottomRight => Location::new(HALF_ARENA + i, i),
                Self::TopLeft => Location::new(FRONT_ROW - i, ARENA_SIZE - 1 - i),
                Self::TopRight => Location::new(HALF_ARENA + i, ARENA_SIZE - 1 - i),
            })
            .collect()
    }

    /// Edge the location lies on, if any.
    #[must_use]
    pub fn containing(location: Location) -> Option<EdgeSide> {
        [Self::BottomLeft, Self::BottomRight, Self::TopLeft, Self::TopRight]
            .into_iter()
            .find(|side| side.locations().contains(&location))
    }

    /// Edge a mobile unit starting at the location heads toward by default.
    #[must_use]
    pub const fn target_for(start: Location) -> EdgeSide {
        match (start.y() < HALF_ARENA, start.x() < HALF_ARENA) {
            (true, true) => Self::TopRight,
            (true, false) => Self::TopLeft,
            (false, true) => Self::BottomRight,
            (false, false) => Self::BottomLeft,
        }
    }
}

/// Stationary unit occupying a single arena cell.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StationaryUnit {
    /// Kind of structure.
    pub kind: UnitKind,
    /// Player that owns the structure.
    pub owner: Owner,
    /// Remaining health.
    pub health: f64,
    /// Health of a freshly built structure of this kind and upgrade level.
    pub max_health: f64,
    /// Cell occupied by the structure.
    pub location: Location,
    /// Indicates whether the structure has been upgraded.
    pub upgraded: bool,
}

impl StationaryUnit {
    /// Remaining health as a fraction of maximum health.
    #[must_use]
    pub fn health_ratio(&self) -> f64 {
        if self.max_health <= 0.0 {
            return 0.0;
        }
        self.health / self.max_health
    }
}

/// Opponent mobile unit reaching the defender's edge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BreachEvent {
    /// Edge cell where the unit scored.
    pub location: Location,
    /// Sub-frame index within the turn at which the breach was reported.
    pub frame: u32,
}

/// Damage dealt to a defender structure.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DamageEvent {
    /// Cell of the damaged structure.
    pub location: Location,
    /// Damage inflicted.
    pub amount: f64,
    /// Structural class of the damaged target.
    pub class: StructureClass,
}

/// Mobile unit spawned by the opponent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpawnEvent {
    /// Launch cell of the unit.
    pub location: Location,
    /// Kind of mobile unit.
    pub kind: UnitKind,
    /// Engine identifier of the spawned unit.
    pub spawn_id: String,
    /// Player that spawned the unit.
    pub owner: Owner,
}

/// First sighting of an opponent mobile unit on the defender's half.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CrossingEvent {
    /// Engine identifier shared with the unit's spawn report.
    pub spawn_id: String,
    /// Kind of mobile unit.
    pub kind: UnitKind,
    /// Launch cell recorded when the unit spawned.
    pub origin: Location,
    /// First cell the unit was seen on past the midline.
    pub location: Location,
}

/// Destruction of a defender structure.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeathEvent {
    /// Cell the structure occupied.
    pub location: Location,
    /// Kind of structure destroyed.
    pub kind: UnitKind,
    /// Player that owned the structure.
    pub owner: Owner,
    /// Indicates whether the owner removed the structure itself.
    pub self_destruct: bool,
}

/// Action requests queued for submission at the end of a turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Places a unit of the provided kind.
    Place {
        /// Kind of unit to place.
        kind: UnitKind,
        /// Target cell.
        location: Location,
    },
    /// Upgrades the structure at the provided cell.
    Upgrade {
        /// Cell holding the structure.
        location: Location,
    },
    /// Removes the structure at the provided cell.
    Remove {
        /// Cell holding the structure.
        location: Location,
    },
}

/// Reasons an action request may be rejected by the board.
#[derive(Clone, Copy, Debug, PartialEq, Error)]
pub enum ActionRejected {
    /// The target lies outside the arena.
    #[error("location {0} lies outside the arena")]
    OutOfBounds(Location),
    /// Structures may only be placed on the owner's half.
    #[error("location {0} is outside the defender's half")]
    WrongTerritory(Location),
    /// Mobile units may only be launched from the defender's edges.
    #[error("location {0} is not a launch edge")]
    NotLaunchEdge(Location),
    /// The target cell already holds a structure.
    #[error("location {0} is occupied")]
    Occupied(Location),
    /// The target cell holds no structure.
    #[error("location {0} holds no structure")]
    Vacant(Location),
    /// The structure at the target cell belongs to the opponent.
    #[error("structure at {0} is not owned by the defender")]
    NotOwned(Location),
    /// The structure cannot be upgraded further.
    #[error("structure at {0} cannot be upgraded")]
    NotUpgradable(Location),
    /// The live budget cannot cover the request.
    #[error("insufficient {resource:?} budget: needed {needed}, available {available}")]
    InsufficientResources {
        /// Budget that fell short.
        resource: ResourceKind,
        /// Amount the request required.
        needed: f64,
        /// Amount remaining.
        available: f64,
    },
}
