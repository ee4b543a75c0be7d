#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Turn orchestration and strategy configuration.
//!
//! [`TurnController`] owns the event context between turns. Sub-frames fold
//! into it as they arrive; planning a turn takes the accumulated summary,
//! replaces it with a fresh context, runs defense before offense and submits
//! the batch exactly once.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use frontline_core::TurnActions;
use frontline_system_defense::{DefenseConfig, DefensePlanner};
use frontline_system_events::{EventAggregator, SpawnRetention, TurnEvents};
use frontline_system_offense::{OffenseConfig, OffensePlanner};
use frontline_world::protocol::SubFrame;
use frontline_world::{ActionBatch, TurnState};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Failures while loading the strategy configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read strategy config at {}", .path.display())]
    Io {
        /// Path that was requested.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The file is not valid strategy TOML.
    #[error("invalid strategy config: {0}")]
    Parse(#[from] toml::de::Error),
    /// A fraction lies outside the unit interval.
    #[error("`{field}` must lie within [0, 1], got {value}")]
    OutOfRange {
        /// Offending field.
        field: &'static str,
        /// Value that was supplied.
        value: f64,
    },
}

/// Strategy tuning loaded from TOML. Every field is optional.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct StrategyConfig {
    /// Seed for the launch fallback and opening interceptors.
    pub seed: Option<u64>,
    /// Which sub-frames contribute spawn events.
    pub spawn_retention: SpawnRetention,
    /// Defense planner tuning.
    pub defense: DefenseConfig,
    /// Offense planner tuning.
    pub offense: OffenseConfig,
}

impl StrategyConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the document is malformed or a fraction is
    /// out of range.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()
    }

    /// Reads, parses and validates the TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read or is invalid.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    fn validate(self) -> Result<Self, ConfigError> {
        let fractions = [
            ("defense.health-threshold", self.defense.health_threshold),
            ("defense.interceptor-share", self.defense.interceptor_share),
            ("offense.attack-discount", self.offense.attack_discount),
        ];
        for (field, value) in fractions {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfRange { field, value });
            }
        }
        Ok(self)
    }
}

/// Runs the per-turn pipeline and carries event context between turns.
#[derive(Debug)]
pub struct TurnController {
    aggregator: EventAggregator,
    events: TurnEvents,
    defense: DefensePlanner,
    offense: OffensePlanner,
    rng: ChaCha8Rng,
    seed: u64,
}

impl TurnController {
    /// Creates a controller from the strategy configuration and RNG seed.
    #[must_use]
    pub fn new(config: StrategyConfig, seed: u64) -> Self {
        let aggregator = EventAggregator::new(config.spawn_retention);
        Self {
            events: aggregator.begin_turn(),
            aggregator,
            defense: DefensePlanner::new(config.defense),
            offense: OffensePlanner::new(config.offense),
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    /// Seed the controller's RNG was created with.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Notifications recorded since the last planned turn.
    #[must_use]
    pub fn pending_events(&self) -> &TurnEvents {
        &self.events
    }

    /// Folds a sub-frame into the pending context.
    pub fn record_sub_frame(&mut self, sub_frame: &SubFrame) {
        let context = std::mem::take(&mut self.events);
        self.events = self.aggregator.record_sub_frame(context, sub_frame);
    }

    /// Plans the turn and returns the batch to submit.
    ///
    /// The pending event context is consumed and replaced before planning, so
    /// nothing recorded for this turn leaks into the next one.
    pub fn plan_turn(&mut self, mut state: TurnState) -> ActionBatch {
        let context = std::mem::replace(&mut self.events, self.aggregator.begin_turn());
        let frames = context.frames_recorded();
        let summary = context.summarize();
        let turn = state.turn_number();
        let budget = state.resources();
        debug!(
            turn,
            frames,
            breaches = summary.breaches.len(),
            damaged = summary.damage.len(),
            spawns = summary.spawns.len(),
            deaths = summary.deaths.len(),
            "turn events"
        );

        if turn == 0 {
            let opening = self.defense.opening(&mut state, &mut self.rng);
            info!(
                turn,
                placed = opening.placed,
                interceptors = opening.interceptors,
                "opening built"
            );
            return state.submit_turn();
        }

        let reserved = self.offense.project_route(&state);
        let defense = self.defense.plan(&mut state, &summary, &reserved);
        let offense = self.offense.plan(&mut state, &mut self.rng);
        let surplus = self.defense.invest_surplus(&mut state);

        info!(
            turn,
            structure = budget.structure(),
            movement = budget.movement(),
            placed = defense.placed + surplus.placed,
            upgraded = defense.upgraded,
            removed = defense.removed,
            interceptors = defense.interceptors,
            offense = ?offense,
            "turn planned"
        );

        state.submit_turn()
    }
}
