#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Turn-scoped aggregation of sub-frame notifications.
//!
//! The aggregator never holds turn state itself. Callers obtain a fresh
//! [`TurnEvents`] context from [`EventAggregator::begin_turn`], thread it
//! through [`EventAggregator::record_sub_frame`] for every sub-frame, and
//! finally consume it with [`TurnEvents::summarize`].

use std::collections::BTreeMap;

use frontline_core::{
    BreachEvent, CrossingEvent, DamageEvent, DeathEvent, Location, Owner, SpawnEvent,
    StructureClass, UnitKind,
};
use frontline_world::protocol::{decode_location, SubFrame};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Which sub-frames of a turn contribute spawn events.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpawnRetention {
    /// Only the first sub-frame recorded into a context reports fresh spawns.
    #[default]
    FirstFrame,
    /// Every sub-frame contributes spawns.
    EveryFrame,
}

/// Filtered notifications accumulated over one turn.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TurnSummary {
    /// Breaches caused by the opponent, in arrival order.
    pub breaches: Vec<BreachEvent>,
    /// Damage dealt to the defender's structures, in arrival order.
    pub damage: Vec<DamageEvent>,
    /// Mobile units spawned by the opponent, in arrival order.
    pub spawns: Vec<SpawnEvent>,
    /// Defender structures destroyed by the opponent, in arrival order.
    pub deaths: Vec<DeathEvent>,
    /// Opponent units first seen past the midline, one per spawn id.
    pub crossings: Vec<CrossingEvent>,
    origins: BTreeMap<String, Location>,
}

impl TurnSummary {
    /// Reports whether nothing was retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.breaches.is_empty()
            && self.damage.is_empty()
            && self.spawns.is_empty()
            && self.deaths.is_empty()
            && self.crossings.is_empty()
    }

    /// Distinct breached locations in first-seen order.
    #[must_use]
    pub fn breach_locations(&self) -> Vec<Location> {
        let mut locations: Vec<Location> = Vec::new();
        for breach in &self.breaches {
            if !locations.contains(&breach.location) {
                locations.push(breach.location);
            }
        }
        locations
    }

    /// Damage deduplicated by location where the most recent report wins.
    #[must_use]
    pub fn damaged(&self) -> Vec<DamageEvent> {
        let mut latest: BTreeMap<Location, &DamageEvent> = BTreeMap::new();
        for event in &self.damage {
            let _ = latest.insert(event.location, event);
        }
        latest.into_values().cloned().collect()
    }

    /// Distinct destroyed cells with the kind that stood there.
    #[must_use]
    pub fn destroyed(&self) -> Vec<(Location, UnitKind)> {
        let mut cells: Vec<(Location, UnitKind)> = Vec::new();
        for death in &self.deaths {
            if !cells.iter().any(|(location, _)| *location == death.location) {
                cells.push((death.location, death.kind));
            }
        }
        cells
    }

    /// Launch cell of an opponent unit identified by its spawn id.
    #[must_use]
    pub fn spawn_origin(&self, spawn_id: &str) -> Option<Location> {
        self.origins.get(spawn_id).copied()
    }

    /// Records an opponent spawn. Used when assembling summaries by hand.
    pub fn push_spawn(&mut self, spawn: SpawnEvent) {
        let _ = self
            .origins
            .insert(spawn.spawn_id.clone(), spawn.location);
        self.spawns.push(spawn);
    }
}

/// Explicit per-turn context threaded through the aggregator.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TurnEvents {
    frames: u32,
    summary: TurnSummary,
}

impl TurnEvents {
    /// Number of sub-frames recorded since the context was created.
    #[must_use]
    pub fn frames_recorded(&self) -> u32 {
        self.frames
    }

    /// Reports whether no notification has been retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.summary.is_empty()
    }

    /// Read-only view of the accumulated notifications.
    #[must_use]
    pub fn summary(&self) -> &TurnSummary {
        &self.summary
    }

    /// Consumes the context, yielding the accumulated notifications.
    #[must_use]
    pub fn summarize(self) -> TurnSummary {
        self.summary
    }
}

/// Classifies and filters sub-frame notifications.
#[derive(Clone, Copy, Debug, Default)]
pub struct EventAggregator {
    retention: SpawnRetention,
}

impl EventAggregator {
    /// Creates an aggregator applying the provided spawn retention policy.
    #[must_use]
    pub fn new(retention: SpawnRetention) -> Self {
        Self { retention }
    }

    /// Starts an empty context for a new turn.
    #[must_use]
    pub fn begin_turn(&self) -> TurnEvents {
        TurnEvents::default()
    }

    /// Folds one sub-frame into the context.
    ///
    /// Malformed entries are dropped individually; the remaining entries of
    /// the batch are still processed.
    #[must_use]
    pub fn record_sub_frame(&self, mut context: TurnEvents, sub_frame: &SubFrame) -> TurnEvents {
        let first_frame = context.frames == 0;
        let summary = &mut context.summary;
        let events = &sub_frame.events;

        for entry in &events.breach {
            match decode_breach(entry, sub_frame.frame) {
                Some((breach, Owner::Opponent)) => summary.breaches.push(breach),
                Some((_, Owner::Me)) => {}
                None => debug!(%entry, "dropped malformed breach entry"),
            }
        }

        for entry in &events.damage {
            match decode_damage(entry) {
                Some(Decoded::Keep(damage)) => summary.damage.push(damage),
                Some(Decoded::Skip) => {}
                None => debug!(%entry, "dropped malformed damage entry"),
            }
        }

        let keep_spawns = first_frame || self.retention == SpawnRetention::EveryFrame;
        for entry in &events.spawn {
            match decode_spawn(entry) {
                Some(Decoded::Keep(spawn)) => {
                    let _ = summary
                        .origins
                        .insert(spawn.spawn_id.clone(), spawn.location);
                    if keep_spawns {
                        summary.spawns.push(spawn);
                    }
                }
                Some(Decoded::Skip) => {}
                None => debug!(%entry, "dropped malformed spawn entry"),
            }
        }

        for entry in &events.death {
            match decode_death(entry) {
                Some(Decoded::Keep(death)) => summary.deaths.push(death),
                Some(Decoded::Skip) => {}
                None => debug!(%entry, "dropped malformed death entry"),
            }
        }

        for sighting in &sub_frame.opponent_units {
            if !sighting.location.on_own_half()
                || summary
                    .crossings
                    .iter()
                    .any(|crossing| crossing.spawn_id == sighting.unit_id)
            {
                continue;
            }
            let Some(origin) = summary.spawn_origin(&sighting.unit_id) else {
                debug!(unit_id = %sighting.unit_id, "dropped crossing with unseen spawn id");
                continue;
            };
            summary.crossings.push(CrossingEvent {
                spawn_id: sighting.unit_id.clone(),
                kind: sighting.kind,
                origin,
                location: sighting.location,
            });
        }

        context.frames += 1;
        context
    }
}

enum Decoded<T> {
    Keep(T),
    Skip,
}

fn decode_breach(entry: &Value, frame: u32) -> Option<(BreachEvent, Owner)> {
    let fields = entry.as_array()?;
    let location = decode_location(fields.first()?)?;
    let owner = Owner::from_frame_flag(flag(fields.get(4)?)?)?;
    Some((BreachEvent { location, frame }, owner))
}

fn decode_damage(entry: &Value) -> Option<Decoded<DamageEvent>> {
    let fields = entry.as_array()?;
    let location = decode_location(fields.first()?)?;
    let amount = fields.get(1)?.as_f64()?;
    let type_index = flag(fields.get(2)?)?;
    let Some(class) = StructureClass::from_type_index(type_index) else {
        return Some(Decoded::Skip);
    };
    if let Some(owner) = fields.get(4).and_then(flag).and_then(Owner::from_frame_flag) {
        if owner != Owner::Me {
            return Some(Decoded::Skip);
        }
    }
    Some(Decoded::Keep(DamageEvent {
        location,
        amount,
        class,
    }))
}

fn decode_spawn(entry: &Value) -> Option<Decoded<SpawnEvent>> {
    let fields = entry.as_array()?;
    let location = decode_location(fields.first()?)?;
    let kind = UnitKind::from_type_index(flag(fields.get(1)?)?)?;
    let spawn_id = identifier(fields.get(2)?)?;
    let owner = Owner::from_frame_flag(flag(fields.get(3)?)?)?;
    if owner != Owner::Opponent || !kind.is_mobile() {
        return Some(Decoded::Skip);
    }
    Some(Decoded::Keep(SpawnEvent {
        location,
        kind,
        spawn_id,
        owner,
    }))
}

fn decode_death(entry: &Value) -> Option<Decoded<DeathEvent>> {
    let fields = entry.as_array()?;
    let location = decode_location(fields.first()?)?;
    let kind = UnitKind::from_type_index(flag(fields.get(1)?)?)?;
    let owner = Owner::from_frame_flag(flag(fields.get(3)?)?)?;
    let self_destruct = switch(fields.get(4)?)?;
    if owner != Owner::Me || !kind.is_structure() || self_destruct {
        return Some(Decoded::Skip);
    }
    Some(Decoded::Keep(DeathEvent {
        location,
        kind,
        owner,
        self_destruct,
    }))
}

fn flag(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|number| *number >= 0.0 && number.fract() == 0.0)
            .map(|number| number as u64)
    })
}

fn switch(value: &Value) -> Option<bool> {
    value
        .as_bool()
        .or_else(|| flag(value).map(|number| number != 0))
}

fn identifier(value: &Value) -> Option<String> {
    match value {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}
