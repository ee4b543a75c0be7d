#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Engine session loop shared by the `frontline` binary and its tests.
//!
//! The engine writes one JSON message per line. The first line configures the
//! unit catalog; afterwards turn snapshots are answered with two action lines
//! and action sub-frames are folded into the controller's event context.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use frontline_core::UnitCatalog;
use frontline_system_controller::TurnController;
use frontline_world::protocol::{encode_batch, parse_catalog, parse_frame, Frame};
use tracing::{debug, info};

/// Whether the session expects further frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    /// Keep reading frames.
    Continue,
    /// The engine announced the end of the game.
    Finished,
}

/// One game against the engine.
#[derive(Debug)]
pub struct Session {
    catalog: UnitCatalog,
    controller: TurnController,
    turns_played: u32,
}

impl Session {
    /// Starts a session from the engine's configuration line.
    pub fn from_config_line(line: &str, controller: TurnController) -> Result<Self> {
        let catalog = parse_catalog(line).context("failed to decode game configuration")?;
        Ok(Self {
            catalog,
            controller,
            turns_played: 0,
        })
    }

    /// Number of turns answered so far.
    #[must_use]
    pub fn turns_played(&self) -> u32 {
        self.turns_played
    }

    /// Handles one inbound frame, writing the action lines for turn snapshots.
    pub fn handle_line<W>(&mut self, line: &str, output: &mut W) -> Result<Flow>
    where
        W: Write,
    {
        let frame = parse_frame(line, &self.catalog).context("failed to decode engine frame")?;
        match frame {
            Frame::Turn(snapshot) => {
                let turn = snapshot.turn;
                let state = snapshot.into_state(&self.catalog);
                let batch = self.controller.plan_turn(state);
                let (build, deploy) = encode_batch(&batch, &self.catalog)
                    .with_context(|| format!("failed to encode actions for turn {turn}"))?;
                writeln!(output, "{build}")?;
                writeln!(output, "{deploy}")?;
                output.flush()?;
                self.turns_played += 1;
                Ok(Flow::Continue)
            }
            Frame::Action(sub_frame) => {
                self.controller.record_sub_frame(&sub_frame);
                Ok(Flow::Continue)
            }
            Frame::EndGame => Ok(Flow::Finished),
        }
    }
}

/// Plays a full game over `input` and `output`, returning the number of turns answered.
///
/// End of input before or during the game ends the session cleanly.
pub fn run<R, W>(input: R, mut output: W, controller: TurnController) -> Result<u32>
where
    R: BufRead,
    W: Write,
{
    let mut lines = input.lines();
    let config = loop {
        let Some(line) = lines.next() else {
            info!("engine closed the input before configuring the game");
            return Ok(0);
        };
        let line = line.context("failed to read from the engine")?;
        if !line.trim().is_empty() {
            break line;
        }
    };
    let mut session = Session::from_config_line(&config, controller)?;
    debug!("game configuration received");

    for line in lines {
        let line = line.context("failed to read from the engine")?;
        if line.trim().is_empty() {
            continue;
        }
        if session.handle_line(&line, &mut output)? == Flow::Finished {
            info!(turns = session.turns_played(), "game over");
            return Ok(session.turns_played());
        }
    }

    info!(turns = session.turns_played(), "engine closed the input");
    Ok(session.turns_played())
}
