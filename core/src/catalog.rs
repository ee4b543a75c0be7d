//! Read-only unit catalog resolved once from the engine configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Cost, UnitKind};

/// Combat and economic attributes of a unit at a single upgrade level.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnitProfile {
    /// Price paid to build the unit, or to upgrade it for upgraded profiles.
    pub cost: Cost,
    /// Health of a freshly built unit.
    pub health: f64,
    /// Damage dealt per hit to mobile units.
    pub damage_to_mobile: f64,
    /// Damage dealt per hit to structures.
    pub damage_to_structure: f64,
    /// Targeting radius measured in cells.
    pub range: f64,
    /// Cells travelled per frame; zero for structures.
    pub speed: f64,
}

/// Catalog entry describing a unit kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnitStats {
    /// Engine shorthand used in outbound action lines.
    pub shorthand: String,
    /// Attributes of a freshly built unit.
    pub base: UnitProfile,
    /// Attributes after an upgrade, if the kind can be upgraded.
    pub upgraded: Option<UnitProfile>,
}

/// Errors raised while assembling a unit catalog.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum CatalogError {
    /// A unit kind costs nothing from its own budget, which would make spend loops unbounded.
    #[error("unit kind {0:?} has zero cost in its own budget")]
    ZeroCost(UnitKind),
    /// Two unit kinds share the same shorthand.
    #[error("shorthand {0:?} is used by more than one unit kind")]
    DuplicateShorthand(String),
    /// A range or speed is negative or not finite, or a mobile kind cannot move.
    #[error("unit kind {kind:?} has unusable {attribute} {value}")]
    InvalidAttribute {
        /// Offending unit kind.
        kind: UnitKind,
        /// Name of the attribute.
        attribute: &'static str,
        /// Value that was supplied.
        value: f64,
    },
}

/// Pure lookup table of unit attributes keyed by [`UnitKind`].
#[derive(Clone, Debug, PartialEq)]
pub struct UnitCatalog {
    entries: [UnitStats; 6],
}

impl UnitCatalog {
    /// Builds a catalog from entries ordered by engine type index.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::ZeroCost`] when a kind is free in the budget it
    /// is paid from, [`CatalogError::DuplicateShorthand`] when shorthands
    /// collide, and [`CatalogError::InvalidAttribute`] for unusable ranges or
    /// speeds.
    pub fn new(entries: [UnitStats; 6]) -> Result<Self, CatalogError> {
        for kind in UnitKind::ALL {
            let stats = &entries[kind.type_index()];
            if stats.base.cost.of(kind.resource()) <= 0.0 {
                return Err(CatalogError::ZeroCost(kind));
            }
            for profile in std::iter::once(&stats.base).chain(stats.upgraded.as_ref()) {
                check_motion(kind, profile)?;
            }

            let duplicate = entries
                .iter()
                .skip(kind.type_index() + 1)
                .any(|other| other.shorthand == stats.shorthand);
            if duplicate {
                return Err(CatalogError::DuplicateShorthand(stats.shorthand.clone()));
            }
        }

        Ok(Self { entries })
    }

    /// Catalog mirroring the engine's standard unit table.
    #[must_use]
    pub fn standard() -> Self {
        let structure = |cost: f64, health: f64, damage: f64, range: f64| UnitProfile {
            cost: Cost::new(cost, 0.0),
            health,
            damage_to_mobile: damage,
            damage_to_structure: 0.0,
            range,
            speed: 0.0,
        };
        let mobile = |cost: f64,
                      health: f64,
                      to_mobile: f64,
                      to_structure: f64,
                      range: f64,
                      speed: f64| {
            UnitProfile {
                cost: Cost::new(0.0, cost),
                health,
                damage_to_mobile: to_mobile,
                damage_to_structure: to_structure,
                range,
                speed,
            }
        };

        Self {
            entries: [
                UnitStats {
                    shorthand: "FF".to_owned(),
                    base: structure(1.0, 60.0, 0.0, 0.0),
                    upgraded: Some(structure(1.0, 120.0, 0.0, 0.0)),
                },
                UnitStats {
                    shorthand: "EF".to_owned(),
                    base: structure(4.0, 30.0, 0.0, 3.5),
                    upgraded: Some(structure(4.0, 30.0, 0.0, 7.0)),
                },
                UnitStats {
                    shorthand: "DF".to_owned(),
                    base: structure(2.0, 75.0, 5.0, 2.5),
                    upgraded: Some(structure(4.0, 75.0, 15.0, 3.5)),
                },
                UnitStats {
                    shorthand: "PI".to_owned(),
                    base: mobile(1.0, 15.0, 2.0, 2.0, 3.5, 1.0),
                    upgraded: None,
                },
                UnitStats {
                    shorthand: "EI".to_owned(),
                    base: mobile(3.0, 5.0, 8.0, 8.0, 4.5, 0.5),
                    upgraded: None,
                },
                UnitStats {
                    shorthand: "SI".to_owned(),
                    base: mobile(1.0, 40.0, 20.0, 0.0, 4.5, 0.25),
                    upgraded: None,
                },
            ],
        }
    }

    /// Catalog entry for the provided kind.
    #[must_use]
    pub fn stats(&self, kind: UnitKind) -> &UnitStats {
        &self.entries[kind.type_index()]
    }

    /// Attributes of the kind at the requested upgrade level.
    ///
    /// Kinds without an upgrade fall back to their base attributes.
    #[must_use]
    pub fn profile(&self, kind: UnitKind, upgraded: bool) -> UnitProfile {
        let stats = self.stats(kind);
        if upgraded {
            stats.upgraded.unwrap_or(stats.base)
        } else {
            stats.base
        }
    }

    /// Price of building a fresh unit of the kind.
    #[must_use]
    pub fn cost(&self, kind: UnitKind) -> Cost {
        self.stats(kind).base.cost
    }

    /// Price of upgrading a structure of the kind, if it can be upgraded.
    #[must_use]
    pub fn upgrade_cost(&self, kind: UnitKind) -> Option<Cost> {
        self.stats(kind).upgraded.map(|profile| profile.cost)
    }

    /// Engine shorthand for the kind.
    #[must_use]
    pub fn shorthand(&self, kind: UnitKind) -> &str {
        &self.stats(kind).shorthand
    }

    /// Resolves an engine shorthand into a unit kind.
    #[must_use]
    pub fn kind_for_shorthand(&self, shorthand: &str) -> Option<UnitKind> {
        UnitKind::ALL
            .into_iter()
            .find(|kind| self.shorthand(*kind) == shorthand)
    }

    /// Largest targeting radius of any structure at any upgrade level.
    #[must_use]
    pub fn max_structure_range(&self) -> f64 {
        UnitKind::ALL
            .into_iter()
            .filter(|kind| kind.is_structure())
            .flat_map(|kind| [self.profile(kind, false), self.profile(kind, true)])
            .map(|profile| profile.range)
            .fold(0.0, f64::max)
    }
}

fn check_motion(kind: UnitKind, profile: &UnitProfile) -> Result<(), CatalogError> {
    let invalid = |attribute, value| CatalogError::InvalidAttribute {
        kind,
        attribute,
        value,
    };
    if !profile.range.is_finite() || profile.range < 0.0 {
        return Err(invalid("range", profile.range));
    }
    let moves = if kind.is_mobile() {
        profile.speed > 0.0
    } else {
        profile.speed >= 0.0
    };
    if !profile.speed.is_finite() || !moves {
        return Err(invalid("speed", profile.speed));
    }
    Ok(())
}

impl Default for UnitCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
