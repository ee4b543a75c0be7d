//! Engine wire protocol: configuration, turn snapshots, sub-frames and action lines.
//!
//! Every inbound message is a single JSON line. The first line carries the
//! game configuration; every later line is a frame whose `turnInfo[0]` phase
//! discriminates turn snapshots, action sub-frames and the end of the game.

use frontline_core::{
    Action, CatalogError, Cost, Location, Owner, ResourcePool, StationaryUnit, UnitCatalog,
    UnitKind, UnitProfile, UnitStats,
};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::{ActionBatch, TurnState};

/// Shorthand the engine expects for removal requests.
pub const REMOVE_SHORTHAND: &str = "RM";
/// Shorthand the engine expects for upgrade requests.
pub const UPGRADE_SHORTHAND: &str = "UP";

const PHASE_TURN: i64 = 0;
const PHASE_ACTION: i64 = 1;
const PHASE_END: i64 = 2;

const REMOVAL_LIST: usize = 6;
const UPGRADE_LIST: usize = 7;

/// Undecodable inbound messages. Every variant is fatal for the process.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The line is not valid JSON or does not match the expected shape.
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),
    /// The configuration lists fewer unit kinds than the game defines.
    #[error("unit information lists {0} entries, expected at least 6")]
    MissingUnits(usize),
    /// The configuration describes an unusable unit table.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    /// The frame lacks a usable `turnInfo` header.
    #[error("turnInfo header is missing or malformed")]
    MissingTurnInfo,
    /// The frame phase is not one the engine defines.
    #[error("unknown frame phase {0}")]
    UnknownPhase(i64),
    /// A player stats array is too short.
    #[error("player stats are malformed")]
    MalformedStats,
    /// A unit entry of a turn snapshot could not be decoded.
    #[error("unit entry {0} is malformed")]
    MalformedUnit(String),
}

#[derive(Deserialize)]
struct RawConfig {
    #[serde(rename = "unitInformation")]
    unit_information: Vec<RawUnitInformation>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawUnitInformation {
    #[serde(default)]
    shorthand: Option<String>,
    #[serde(default)]
    cost1: f64,
    #[serde(default)]
    cost2: f64,
    #[serde(default)]
    start_health: f64,
    #[serde(default)]
    attack_damage_walker: f64,
    #[serde(default)]
    attack_damage_tower: f64,
    #[serde(default)]
    attack_range: f64,
    #[serde(default)]
    speed: f64,
    #[serde(default)]
    upgrade: Option<RawUpgrade>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawUpgrade {
    cost1: Option<f64>,
    cost2: Option<f64>,
    start_health: Option<f64>,
    attack_damage_walker: Option<f64>,
    attack_damage_tower: Option<f64>,
    attack_range: Option<f64>,
}

impl RawUnitInformation {
    fn into_stats(self, kind: UnitKind, fallback: &UnitCatalog) -> UnitStats {
        let base = UnitProfile {
            cost: Cost::new(self.cost1, self.cost2),
            health: self.start_health,
            damage_to_mobile: self.attack_damage_walker,
            damage_to_structure: self.attack_damage_tower,
            range: self.attack_range,
            speed: self.speed,
        };
        let upgraded = self.upgrade.map(|upgrade| UnitProfile {
            cost: Cost::new(
                upgrade.cost1.unwrap_or(base.cost.structure),
                upgrade.cost2.unwrap_or(base.cost.movement),
            ),
            health: upgrade.start_health.unwrap_or(base.health),
            damage_to_mobile: upgrade.attack_damage_walker.unwrap_or(base.damage_to_mobile),
            damage_to_structure: upgrade
                .attack_damage_tower
                .unwrap_or(base.damage_to_structure),
            range: upgrade.attack_range.unwrap_or(base.range),
            speed: base.speed,
        });

        UnitStats {
            shorthand: self
                .shorthand
                .unwrap_or_else(|| fallback.shorthand(kind).to_owned()),
            base,
            upgraded,
        }
    }
}

/// Decodes the configuration line into a validated unit catalog.
///
/// # Errors
///
/// Returns [`ProtocolError`] when the JSON is undecodable, lists fewer than
/// six unit kinds, or describes a free unit kind.
pub fn parse_catalog(line: &str) -> Result<UnitCatalog, ProtocolError> {
    let config: RawConfig = serde_json::from_str(line)?;
    let count = config.unit_information.len();
    if count < UnitKind::ALL.len() {
        return Err(ProtocolError::MissingUnits(count));
    }

    let fallback = UnitCatalog::standard();
    let entries = UnitKind::ALL.map(|kind| {
        config.unit_information[kind.type_index()]
            .clone()
            .into_stats(kind, &fallback)
    });
    Ok(UnitCatalog::new(entries)?)
}

/// Balances and health reported for one player.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayerStats {
    /// Remaining life points.
    pub health: f64,
    /// Structure budget balance.
    pub structure: f64,
    /// Movement budget balance.
    pub movement: f64,
}

impl PlayerStats {
    fn decode(values: &[f64]) -> Result<Self, ProtocolError> {
        match values {
            [health, structure, movement, ..] => Ok(Self {
                health: *health,
                structure: *structure,
                movement: *movement,
            }),
            _ => Err(ProtocolError::MalformedStats),
        }
    }

    /// Budgets as a resource pool.
    #[must_use]
    pub fn pool(&self) -> ResourcePool {
        ResourcePool::new(self.structure, self.movement)
    }
}

/// Board state delivered at the start of a turn.
#[derive(Clone, Debug, PartialEq)]
pub struct TurnSnapshot {
    /// Index of the turn about to be planned.
    pub turn: u32,
    /// Stats of the defender.
    pub me: PlayerStats,
    /// Stats of the opponent.
    pub opponent: PlayerStats,
    /// Every structure on the board.
    pub units: Vec<StationaryUnit>,
}

impl TurnSnapshot {
    /// Rebuilds the planning view for the turn.
    #[must_use]
    pub fn into_state(self, catalog: &UnitCatalog) -> TurnState {
        let mut state = TurnState::new(catalog.clone(), self.turn, self.me.pool())
            .with_opponent_resources(self.opponent.pool());
        for unit in self.units {
            let _ = state.insert_unit(unit);
        }
        state
    }
}

/// Raw event lists of one sub-frame, kept undecoded so malformed entries can be dropped one by one.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct RawEventBatch {
    /// Breach entries `[loc, damage, unitType, id, owner]`.
    #[serde(default)]
    pub breach: Vec<Value>,
    /// Damage entries `[loc, damage, unitType, id, owner]`.
    #[serde(default)]
    pub damage: Vec<Value>,
    /// Spawn entries `[loc, unitType, id, owner]`.
    #[serde(default)]
    pub spawn: Vec<Value>,
    /// Death entries `[loc, unitType, id, owner, removedByOwner]`.
    #[serde(default)]
    pub death: Vec<Value>,
}

/// Opponent mobile unit present on the board during a sub-frame.
#[derive(Clone, Debug, PartialEq)]
pub struct MobileSighting {
    /// Kind of mobile unit.
    pub kind: UnitKind,
    /// Cell the unit stands on.
    pub location: Location,
    /// Engine identifier, matching the unit's spawn report.
    pub unit_id: String,
}

/// Intra-turn notification batch describing simulated combat.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SubFrame {
    /// Turn the sub-frame belongs to.
    pub turn: u32,
    /// Frame index within the turn's action phase.
    pub frame: u32,
    /// Events reported since the previous sub-frame.
    pub events: RawEventBatch,
    /// Opponent mobile units on the board. Malformed entries are skipped.
    pub opponent_units: Vec<MobileSighting>,
}

/// Decoded inbound frame.
#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    /// Start of a turn; planning must run and a batch must be submitted.
    Turn(TurnSnapshot),
    /// Action phase notification.
    Action(SubFrame),
    /// The match is over.
    EndGame,
}

#[derive(Deserialize)]
struct RawFrame {
    #[serde(rename = "turnInfo", default)]
    turn_info: Vec<f64>,
    #[serde(rename = "p1Stats", default)]
    p1_stats: Vec<f64>,
    #[serde(rename = "p2Stats", default)]
    p2_stats: Vec<f64>,
    #[serde(rename = "p1Units", default)]
    p1_units: Vec<Vec<Vec<Value>>>,
    #[serde(rename = "p2Units", default)]
    p2_units: Vec<Vec<Vec<Value>>>,
    #[serde(default)]
    events: RawEventBatch,
}

/// Decodes a frame line.
///
/// # Errors
///
/// Returns [`ProtocolError`] when the line is undecodable, the header is
/// missing, or a turn snapshot carries malformed stats or units.
pub fn parse_frame(line: &str, catalog: &UnitCatalog) -> Result<Frame, ProtocolError> {
    let raw: RawFrame = serde_json::from_str(line)?;
    let (phase, turn, frame) = match raw.turn_info.as_slice() {
        [phase, turn, rest @ ..] => (*phase as i64, *turn, rest.first().copied().unwrap_or(0.0)),
        _ => return Err(ProtocolError::MissingTurnInfo),
    };
    let turn = counter(turn).ok_or(ProtocolError::MissingTurnInfo)?;

    match phase {
        PHASE_TURN => {
            let me = PlayerStats::decode(&raw.p1_stats)?;
            let opponent = PlayerStats::decode(&raw.p2_stats)?;
            let mut units = decode_units(&raw.p1_units, Owner::Me, catalog)?;
            units.extend(decode_units(&raw.p2_units, Owner::Opponent, catalog)?);
            Ok(Frame::Turn(TurnSnapshot {
                turn,
                me,
                opponent,
                units,
            }))
        }
        PHASE_ACTION => Ok(Frame::Action(SubFrame {
            turn,
            frame: counter(frame).unwrap_or(0),
            events: raw.events,
            opponent_units: decode_sightings(&raw.p2_units),
        })),
        PHASE_END => Ok(Frame::EndGame),
        other => Err(ProtocolError::UnknownPhase(other)),
    }
}

fn decode_units(
    lists: &[Vec<Vec<Value>>],
    owner: Owner,
    catalog: &UnitCatalog,
) -> Result<Vec<StationaryUnit>, ProtocolError> {
    let upgraded: Vec<Location> = lists
        .get(UPGRADE_LIST)
        .map(|entries| entries.iter().filter_map(|entry| entry_location(entry)).collect())
        .unwrap_or_default();

    let mut units = Vec::new();
    for kind in UnitKind::ALL.into_iter().filter(|kind| kind.is_structure()) {
        let Some(entries) = lists.get(kind.type_index()) else {
            continue;
        };
        for entry in entries {
            let location = entry_location(entry)
                .ok_or_else(|| ProtocolError::MalformedUnit(format!("{entry:?}")))?;
            let health = entry
                .get(2)
                .and_then(Value::as_f64)
                .ok_or_else(|| ProtocolError::MalformedUnit(format!("{entry:?}")))?;
            let is_upgraded = upgraded.contains(&location);
            units.push(StationaryUnit {
                kind,
                owner,
                health,
                max_health: catalog.profile(kind, is_upgraded).health,
                location,
                upgraded: is_upgraded,
            });
        }
    }

    if lists.len() > REMOVAL_LIST && !lists[REMOVAL_LIST].is_empty() {
        tracing::debug!(?owner, pending = lists[REMOVAL_LIST].len(), "structures pending removal");
    }

    Ok(units)
}

fn decode_sightings(lists: &[Vec<Vec<Value>>]) -> Vec<MobileSighting> {
    let mut sightings = Vec::new();
    for kind in UnitKind::ALL.into_iter().filter(|kind| kind.is_mobile()) {
        let Some(entries) = lists.get(kind.type_index()) else {
            continue;
        };
        for entry in entries {
            let decoded = entry_location(entry)
                .zip(entry.get(3).and_then(unit_id))
                .map(|(location, unit_id)| MobileSighting {
                    kind,
                    location,
                    unit_id,
                });
            match decoded {
                Some(sighting) => sightings.push(sighting),
                None => tracing::debug!(?entry, "skipped malformed mobile unit entry"),
            }
        }
    }
    sightings
}

fn unit_id(value: &Value) -> Option<String> {
    match value {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

fn entry_location(entry: &[Value]) -> Option<Location> {
    let x = coordinate(entry.first()?)?;
    let y = coordinate(entry.get(1)?)?;
    Some(Location::new(x, y))
}

fn coordinate(value: &Value) -> Option<i32> {
    let number = value.as_f64()?;
    if !number.is_finite() || number.fract() != 0.0 {
        return None;
    }
    i32::try_from(number as i64).ok()
}

fn counter(value: f64) -> Option<u32> {
    if value.is_finite() && value >= 0.0 && value <= f64::from(u32::MAX) {
        Some(value as u32)
    } else {
        None
    }
}

/// Decodes a `[x, y]` pair as used inside event entries.
#[must_use]
pub fn decode_location(value: &Value) -> Option<Location> {
    value.as_array().and_then(|pair| entry_location(pair))
}

/// Encodes the batch into the two lines the engine reads: build actions, then deployments.
///
/// # Errors
///
/// Returns [`ProtocolError::Json`] if serialisation fails.
pub fn encode_batch(
    batch: &ActionBatch,
    catalog: &UnitCatalog,
) -> Result<(String, String), ProtocolError> {
    let encode = |actions: &[Action]| -> Result<String, ProtocolError> {
        let entries: Vec<(&str, i32, i32)> = actions
            .iter()
            .map(|action| match *action {
                Action::Place { kind, location } => {
                    (catalog.shorthand(kind), location.x(), location.y())
                }
                Action::Upgrade { location } => (UPGRADE_SHORTHAND, location.x(), location.y()),
                Action::Remove { location } => (REMOVE_SHORTHAND, location.x(), location.y()),
            })
            .collect();
        Ok(serde_json::to_string(&entries)?)
    };

    Ok((encode(&batch.build)?, encode(&batch.deploy)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use frontline_core::{Board, TurnActions};

    const CONFIG: &str = r#"{
        "unitInformation": [
            {"shorthand": "FF", "cost1": 1.0, "startHealth": 60.0, "upgrade": {"startHealth": 120.0}},
            {"shorthand": "EF", "cost1": 4.0, "startHealth": 30.0, "attackRange": 3.5},
            {"shorthand": "DF", "cost1": 2.0, "startHealth": 75.0, "attackDamageWalker": 5.0,
             "attackRange": 2.5, "upgrade": {"cost1": 4.0, "attackDamageWalker": 15.0, "attackRange": 3.5}},
            {"shorthand": "PI", "cost2": 1.0, "startHealth": 15.0, "attackDamageWalker": 2.0,
             "attackDamageTower": 2.0, "attackRange": 3.5, "speed": 1.0},
            {"shorthand": "EI", "cost2": 3.0, "startHealth": 5.0, "attackDamageWalker": 8.0,
             "attackDamageTower": 8.0, "attackRange": 4.5, "speed": 0.5},
            {"shorthand": "SI", "cost2": 1.0, "startHealth": 40.0, "attackDamageWalker": 20.0,
             "attackRange": 4.5, "speed": 0.25},
            {"shorthand": "RM"},
            {"shorthand": "UP"}
        ]
    }"#;

    #[test]
    fn catalog_decodes_costs_and_upgrades() {
        let catalog = parse_catalog(CONFIG).expect("config");

        assert_eq!(catalog.cost(UnitKind::Demolisher), Cost::new(0.0, 3.0));
        assert_eq!(catalog.shorthand(UnitKind::Interceptor), "SI");
        assert_eq!(catalog.profile(UnitKind::Wall, true).health, 120.0);
        assert_eq!(catalog.upgrade_cost(UnitKind::Turret), Some(Cost::new(4.0, 0.0)));
        assert_eq!(catalog.upgrade_cost(UnitKind::Scout), None);
    }

    #[test]
    fn catalog_rejects_free_units() {
        let config = CONFIG.replace("\"cost2\": 3.0", "\"cost2\": 0.0");
        assert!(matches!(
            parse_catalog(&config),
            Err(ProtocolError::Catalog(CatalogError::ZeroCost(UnitKind::Demolisher)))
        ));
    }

    #[test]
    fn turn_frame_rebuilds_board_and_budgets() {
        let catalog = parse_catalog(CONFIG).expect("config");
        let line = r#"{
            "turnInfo": [0, 4, -1, 0],
            "p1Stats": [30, 12.5, 7.0, 100],
            "p2Stats": [28, 3.0, 9.5, 100],
            "p1Units": [[[5, 13, 60.0, "1"]], [], [[5, 12, 40.0, "2"]], [], [], [], [], [[5, 13, 120.0, "1"]]],
            "p2Units": [[], [], [[13, 18, 75.0, "9"]], [], [], [], [], []]
        }"#;

        let Frame::Turn(snapshot) = parse_frame(line, &catalog).expect("frame") else {
            panic!("expected turn frame");
        };
        assert_eq!(snapshot.turn, 4);
        let state = snapshot.into_state(&catalog);

        assert_eq!(state.turn_number(), 4);
        assert_eq!(state.resources(), ResourcePool::new(12.5, 7.0));
        assert_eq!(state.opponent_resources(), ResourcePool::new(3.0, 9.5));
        let wall = state.occupant(Location::new(5, 13)).copied().expect("wall");
        assert!(wall.upgraded);
        assert_eq!(wall.max_health, 120.0);
        let turret = state.occupant(Location::new(5, 12)).copied().expect("turret");
        assert_eq!(turret.health_ratio(), 40.0 / 75.0);
        assert_eq!(
            state.occupant(Location::new(13, 18)).map(|unit| unit.owner),
            Some(Owner::Opponent)
        );
    }

    #[test]
    fn action_frame_keeps_raw_events() {
        let catalog = UnitCatalog::standard();
        let line = r#"{
            "turnInfo": [1, 4, 12],
            "events": {"breach": [[[3, 10], 1, 3, "77", 2]], "damage": [], "spawn": [], "death": []}
        }"#;

        let Frame::Action(sub_frame) = parse_frame(line, &catalog).expect("frame") else {
            panic!("expected action frame");
        };
        assert_eq!(sub_frame.turn, 4);
        assert_eq!(sub_frame.frame, 12);
        assert_eq!(sub_frame.events.breach.len(), 1);
        assert!(sub_frame.events.spawn.is_empty());
    }

    #[test]
    fn action_frame_lists_opponent_mobile_units() {
        let catalog = UnitCatalog::standard();
        let line = r#"{
            "turnInfo": [1, 4, 3],
            "p1Units": [[], [], [], [[13, 2, 15.0, "5"]], [], [], [], []],
            "p2Units": [[[4, 14, 60.0, "8"]], [], [], [[12, 13, 15.0, "31"]], [[9, 16, 5.0, 32]], [["x", 1, 3.0, "33"]], [], []]
        }"#;

        let Frame::Action(sub_frame) = parse_frame(line, &catalog).expect("frame") else {
            panic!("expected action frame");
        };

        assert_eq!(
            sub_frame.opponent_units,
            vec![
                MobileSighting {
                    kind: UnitKind::Scout,
                    location: Location::new(12, 13),
                    unit_id: "31".to_owned(),
                },
                MobileSighting {
                    kind: UnitKind::Demolisher,
                    location: Location::new(9, 16),
                    unit_id: "32".to_owned(),
                },
            ]
        );
    }

    #[test]
    fn undecodable_frames_are_fatal() {
        let catalog = UnitCatalog::standard();
        assert!(matches!(parse_frame("not json", &catalog), Err(ProtocolError::Json(_))));
        assert!(matches!(
            parse_frame(r#"{"turnInfo": []}"#, &catalog),
            Err(ProtocolError::MissingTurnInfo)
        ));
        assert!(matches!(
            parse_frame(r#"{"turnInfo": [0, 1, 0], "p1Stats": [1], "p2Stats": [1, 2, 3]}"#, &catalog),
            Err(ProtocolError::MalformedStats)
        ));
        assert!(matches!(
            parse_frame(r#"{"turnInfo": [2, 9, 0]}"#, &catalog),
            Ok(Frame::EndGame)
        ));
    }

    #[test]
    fn batch_encodes_build_and_deploy_lines() {
        let catalog = UnitCatalog::standard();
        let mut state = TurnState::new(catalog.clone(), 1, ResourcePool::new(10.0, 5.0));
        let _ = state.seed_structure(UnitKind::Wall, Owner::Me, Location::new(4, 13));
        state.request_remove(Location::new(4, 13)).expect("remove");
        state
            .request_place(UnitKind::Turret, Location::new(3, 12))
            .expect("turret");
        state.request_upgrade(Location::new(3, 12)).expect("upgrade");
        assert_eq!(state.request_place_many(UnitKind::Scout, Location::new(13, 0), 2), 2);

        let (build, deploy) = encode_batch(&state.submit_turn(), &catalog).expect("encode");

        assert_eq!(build, r#"[["RM",4,13],["DF",3,12],["UP",3,12]]"#);
        assert_eq!(deploy, r#"[["PI",13,0],["PI",13,0]]"#);
    }

    #[test]
    fn event_locations_require_integral_pairs() {
        assert_eq!(
            decode_location(&serde_json::json!([3, 10])),
            Some(Location::new(3, 10))
        );
        assert_eq!(decode_location(&serde_json::json!([3.5, 10])), None);
        assert_eq!(decode_location(&serde_json::json!("3,10")), None);
    }
}
