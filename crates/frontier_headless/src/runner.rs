//! Headless runner implementation.
//!
//! [`HeadlessRunner`] owns one [`Game`] and records every turn it applies
//! into a [`Replay`]. It is driven either by a scenario script
//! ([`HeadlessRunner::play_script`]) or by protocol commands
//! ([`HeadlessRunner::run`]).

use std::io::{BufRead, Write};

use frontier_core::error::GameError;
use frontier_core::game::{Game, GameStartInfo, TickOutput};
use frontier_core::hash::HashEvent;
use frontier_core::intent::Turn;
use frontier_core::replay::Replay;
use frontier_core::Tick;

use crate::error::Result;
use crate::protocol::{winner_name, Command, Response};
use crate::scenario::Scenario;

/// Headless runner configuration.
#[derive(Debug, Clone, Default)]
pub struct HeadlessConfig {
    /// Output a state line after every command that advances time.
    pub auto_state_output: bool,
    /// Leave the tick lines out and stream only hash events.
    pub hashes_only: bool,
}

/// Headless runner for scripted or controller-driven games.
pub struct HeadlessRunner {
    config: HeadlessConfig,
    game: Game,
    replay: Replay,
    game_over_sent: bool,
}

impl HeadlessRunner {
    /// Create a runner for a fresh game.
    ///
    /// # Errors
    ///
    /// Returns the error of [`Game::new`] for an invalid start info.
    pub fn new(start: GameStartInfo) -> Result<Self> {
        Self::with_config(start, HeadlessConfig::default())
    }

    /// Create a runner with custom configuration.
    ///
    /// # Errors
    ///
    /// Returns the error of [`Game::new`] for an invalid start info.
    pub fn with_config(start: GameStartInfo, config: HeadlessConfig) -> Result<Self> {
        let game = Game::new(start.clone())?;
        Ok(Self {
            config,
            game,
            replay: Replay::new(start),
            game_over_sent: false,
        })
    }

    /// Create a runner for a scenario's setup.
    ///
    /// # Errors
    ///
    /// Returns an error if the scenario's map or config is invalid.
    pub fn from_scenario(scenario: &Scenario, config: HeadlessConfig) -> Result<Self> {
        Self::with_config(scenario.start_info()?, config)
    }

    /// The game being run.
    pub fn game(&self) -> &Game {
        &self.game
    }

    /// Apply one turn and record it.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::TurnOutOfOrder`] if the turn is not for the
    /// current tick.
    pub fn step(&mut self, turn: &Turn) -> Result<TickOutput> {
        let output = self.game.execute_turn(turn)?;
        self.replay.record_turn(turn)?;
        Ok(output)
    }

    /// Play `turns` up to `ticks`, filling gaps with empty turns, and return
    /// the hash events produced. Stops early once a winner is declared.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::TurnOutOfOrder`] if a scripted turn lies in the
    /// past, or any other simulation error.
    pub fn play_script(&mut self, turns: &[Turn], ticks: Tick) -> Result<Vec<HashEvent>> {
        let mut hashes = Vec::new();
        self.play_script_with(turns, ticks, |output| {
            hashes.extend(output.hash);
            Ok(())
        })?;
        Ok(hashes)
    }

    /// [`HeadlessRunner::play_script`], handing every tick's output to
    /// `on_tick` as it is produced.
    ///
    /// # Errors
    ///
    /// As [`HeadlessRunner::play_script`], plus any error from `on_tick`.
    pub fn play_script_with<F>(&mut self, turns: &[Turn], ticks: Tick, mut on_tick: F) -> Result<()>
    where
        F: FnMut(TickOutput) -> Result<()>,
    {
        let mut script = turns.iter().peekable();
        while self.game.tick() < ticks && !self.game.is_over() {
            let tick = self.game.tick();
            let output = match script.next_if(|t| t.turn_number <= tick) {
                Some(turn) => self.step(turn)?,
                None => self.step(&Turn::empty(tick))?,
            };
            on_tick(output)?;
        }
        if let Some(stale) = script.next() {
            if stale.turn_number < self.game.tick() && !self.game.is_over() {
                return Err(GameError::TurnOutOfOrder {
                    expected: self.game.tick(),
                    received: stale.turn_number,
                }
                .into());
            }
        }
        tracing::info!(
            tick = self.game.tick(),
            winner = ?winner_name(&self.game),
            "Script finished"
        );
        Ok(())
    }

    /// Handle one protocol command and return the response lines.
    ///
    /// # Errors
    ///
    /// Simulation errors are fatal and end the session.
    pub fn handle(&mut self, cmd: Command) -> Result<Vec<Response>> {
        let cmd_name = cmd.name();
        let mut responses = Vec::new();

        match cmd {
            Command::Turn { intents } => {
                let turn = Turn::new(self.game.tick(), intents);
                let output = self.step(&turn)?;
                self.push_tick(&mut responses, output);
            }
            Command::Tick { count } => {
                for _ in 0..count {
                    let output = self.step(&Turn::empty(self.game.tick()))?;
                    self.push_tick(&mut responses, output);
                }
            }
            Command::State => responses.push(Response::state(&self.game)),
            Command::Hash => responses.push(Response::Hash {
                tick: self.game.tick(),
                hash: self.game.state_hash()?,
            }),
            Command::SaveReplay { path } => {
                self.finished_replay()?.save(&path)?;
                tracing::info!(path = %path, "Replay saved");
                responses.push(Response::ack(cmd_name));
            }
            Command::Quit => responses.push(Response::Bye),
        }

        if self.config.auto_state_output && matches!(cmd_name, "turn" | "tick") {
            responses.push(Response::state(&self.game));
        }
        if !self.game_over_sent {
            if let Some(winner) = winner_name(&self.game) {
                self.game_over_sent = true;
                responses.push(Response::GameOver {
                    winner,
                    tick: self.game.tick(),
                });
            }
        }
        Ok(responses)
    }

    fn push_tick(&self, responses: &mut Vec<Response>, output: TickOutput) {
        let lines = Response::from_tick_output(output);
        if self.config.hashes_only {
            responses.extend(lines.into_iter().filter(|r| matches!(r, Response::Hash { .. })));
        } else {
            responses.extend(lines);
        }
    }

    /// Run the command loop until `quit` or end of input.
    ///
    /// # Errors
    ///
    /// A line that cannot be decoded is a protocol error and ends the
    /// session after an `error` line is written. Simulation and IO errors
    /// also end it.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> Result<()> {
        tracing::info!(game_id = self.game.world().game_id(), "Starting interactive session");
        write_line(&mut output, &Response::ready(self.game.world().game_id(), self.game.tick()))?;

        for line in input.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let cmd = match Command::from_json(line) {
                Ok(cmd) => cmd,
                Err(e) => {
                    write_line(&mut output, &Response::error(format!("Parse error: {e}"), None))?;
                    return Err(GameError::Protocol(e.to_string()).into());
                }
            };
            let quit = matches!(cmd, Command::Quit);
            let cmd_name = cmd.name();

            match self.handle(cmd) {
                Ok(responses) => {
                    for response in &responses {
                        write_line(&mut output, response)?;
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, cmd = cmd_name, "Session ended");
                    write_line(&mut output, &Response::error(e.to_string(), Some(cmd_name)))?;
                    return Err(e);
                }
            }
            if quit {
                break;
            }
        }
        Ok(())
    }

    /// The replay so far, finalized at the current tick.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidState`] if the state cannot be hashed.
    pub fn finished_replay(&self) -> Result<Replay> {
        let mut replay = self.replay.clone();
        replay.finalize(self.game.tick(), self.game.state_hash()?);
        Ok(replay)
    }
}

fn write_line<W: Write>(output: &mut W, response: &Response) -> Result<()> {
    output.write_all(response.to_json_line().as_bytes())?;
    output.flush()?;
    Ok(())
}
