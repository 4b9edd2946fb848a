//! Lockstep session.
//!
//! A [`Session`] owns the turn timer. Every interval it seals the intents
//! received so far into a turn, broadcasts the turn to subscribed clients
//! and feeds it to the [`SimulationHost`]. Client hash reports go to the
//! host; a desync or host failure ends the session with an error.

use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use frontier_core::error::GameError;
use frontier_core::game::Game;
use frontier_core::hash::HashEvent;
use frontier_core::intent::{Intent, Turn};
use frontier_core::world::{ClientId, GameEvent};
use frontier_core::Tick;

use crate::config::ServerConfig;
use crate::error::{Result, ServerError};
use crate::host::{HostMessage, SimulationHost};
use crate::sequencer::TurnSequencer;

/// Capacity of the turn broadcast.
const TURN_BROADCAST_CAPACITY: usize = 1024;

/// Messages from connected clients.
#[derive(Debug)]
pub enum ClientMessage {
    /// An intent for the next turn.
    Intent(Intent),
    /// A client's hash for a tick.
    Hash {
        /// Reporting client.
        client: ClientId,
        /// Reported hash.
        event: HashEvent,
    },
    /// Turns a reconnecting client missed.
    CatchUp {
        /// First missed tick.
        from: Tick,
        /// Where to send them.
        reply: oneshot::Sender<Vec<Turn>>,
    },
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    /// Ticks executed by the host.
    pub ticks: Tick,
    /// Host state hash after the last tick.
    pub final_hash: u64,
    /// Winner's name, if one was declared.
    pub winner: Option<String>,
    /// Intents sequenced over the session.
    pub intents: usize,
    /// Hash events the host produced.
    pub hashes: usize,
}

/// One game between the host and its clients.
pub struct Session {
    config: ServerConfig,
    sequencer: TurnSequencer,
    turns: broadcast::Sender<Turn>,
}

impl Session {
    /// Create a session; nothing runs until [`Session::run`].
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        let (turns, _) = broadcast::channel(TURN_BROADCAST_CAPACITY);
        Self {
            config,
            sequencer: TurnSequencer::new(),
            turns,
        }
    }

    /// Receive every sealed turn.
    pub fn subscribe(&self) -> broadcast::Receiver<Turn> {
        self.turns.subscribe()
    }

    /// Run until a winner is declared, `max_ticks` is reached, or a replica
    /// fails.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DesyncDetected`] (wrapped) when a client's hash
    /// disagrees with the host's, and [`ServerError::HostClosed`] or the
    /// host's error if the simulation fails.
    pub async fn run(mut self, mut clients: mpsc::Receiver<ClientMessage>) -> Result<SessionSummary> {
        let start = self.config.start_info()?;
        info!(
            game_id = %start.game_id,
            players = start.players.len(),
            interval_ms = self.config.turn_interval_ms,
            "Session starting"
        );
        let (host, mut messages) = SimulationHost::spawn(start, &self.config)?;

        let mut timer = tokio::time::interval(Duration::from_millis(self.config.turn_interval_ms.max(1)));
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let max_ticks = self.config.max_ticks.unwrap_or(Tick::MAX);
        let mut executed: Tick = 0;
        let mut intents = 0;
        let mut hashes = 0;
        let mut clients_open = true;
        let mut game_over = false;

        let outcome = loop {
            if game_over || executed >= max_ticks {
                break Ok(());
            }
            let sealing = self.sequencer.next_turn() < max_ticks;

            tokio::select! {
                _ = timer.tick(), if sealing => {
                    let turn = self.sequencer.seal();
                    intents += turn.intents.len();
                    // No subscribers is fine.
                    let _ = self.turns.send(turn.clone());
                    if host.submit_turn(turn).await.is_err() {
                        break Err(host_failure(&mut messages).await);
                    }
                }
                message = clients.recv(), if clients_open => match message {
                    Some(ClientMessage::Intent(intent)) => self.sequencer.submit(intent),
                    Some(ClientMessage::Hash { client, event }) => {
                        if host.report_hash(client, event).await.is_err() {
                            break Err(host_failure(&mut messages).await);
                        }
                    }
                    Some(ClientMessage::CatchUp { from, reply }) => {
                        let missed = self.sequencer.turns_since(from).to_vec();
                        if reply.send(missed).is_err() {
                            debug!("Catch-up reply channel closed");
                        }
                    }
                    None => {
                        debug!("All clients gone");
                        clients_open = false;
                    }
                },
                message = messages.recv() => match message {
                    Some(HostMessage::Tick(output)) => {
                        executed = output.tick + 1;
                        game_over = output
                            .events
                            .iter()
                            .any(|e| matches!(e, GameEvent::Winner { .. }));
                    }
                    Some(HostMessage::Hash(_)) => hashes += 1,
                    Some(failure) => break Err(failure_error(failure)),
                    None => break Err(ServerError::HostClosed),
                },
            }
        };

        if let Err(e) = outcome {
            host.shutdown().await?;
            return Err(e);
        }

        let game = Game::deserialize(&host.snapshot().await?)?;
        host.shutdown().await?;
        let summary = SessionSummary {
            ticks: game.tick(),
            final_hash: game.state_hash()?,
            winner: game
                .winner()
                .and_then(|id| game.world().player(id))
                .map(|p| p.name().to_string()),
            intents,
            hashes,
        };
        info!(
            ticks = summary.ticks,
            hash = summary.final_hash,
            winner = ?summary.winner,
            "Session finished"
        );
        Ok(summary)
    }
}

/// Error for a message the host sends as it stops.
fn failure_error(message: HostMessage) -> ServerError {
    match message {
        HostMessage::Desync {
            client,
            tick,
            local_hash,
            remote_hash,
        } => {
            warn!(client = %client.0, tick, local_hash, remote_hash, "Ending session on desync");
            GameError::DesyncDetected {
                tick,
                local_hash,
                remote_hash,
            }
            .into()
        }
        HostMessage::Fatal(message) => {
            warn!(error = %message, "Ending session on host failure");
            GameError::InvalidState(message).into()
        }
        HostMessage::Tick(_) | HostMessage::Hash(_) => ServerError::HostClosed,
    }
}

/// The host refused a command: find out why it stopped.
async fn host_failure(messages: &mut mpsc::UnboundedReceiver<HostMessage>) -> ServerError {
    while let Some(message) = messages.recv().await {
        if matches!(message, HostMessage::Desync { .. } | HostMessage::Fatal(_)) {
            return failure_error(message);
        }
    }
    ServerError::HostClosed
}

#[cfg(test)]
mod tests {
    use super::*;
    use frontier_core::config::GameConfig;
    use frontier_core::game::PlayerSetup;
    use frontier_test_utils::fixtures::client;

    fn config(max_ticks: Tick) -> ServerConfig {
        ServerConfig {
            game_id: "session".to_string(),
            game: GameConfig {
                spawn_phase_ticks: 5,
                ..GameConfig::default()
            },
            map: vec!["#".repeat(16); 12],
            players: vec![
                PlayerSetup::human("alice", "client-a"),
                PlayerSetup::nation("nation-1"),
            ],
            turn_interval_ms: 1,
            max_ticks: Some(max_ticks),
            ..ServerConfig::default()
        }
    }

    #[tokio::test]
    async fn test_host_agrees_with_a_local_replica() {
        let config = config(30);
        let start = config.start_info().unwrap();
        let session = Session::new(config);
        let mut turns = session.subscribe();

        let (tx, rx) = mpsc::channel(16);
        tx.send(ClientMessage::Intent(Intent::Spawn {
            client_id: client("client-a"),
            tile: 40,
        }))
        .await
        .unwrap();
        drop(tx);

        let summary = session.run(rx).await.unwrap();
        assert_eq!(summary.ticks, 30);
        assert_eq!(summary.intents, 1);
        // Hash interval 10: ticks 0, 10 and 20.
        assert_eq!(summary.hashes, 3);

        // A client replaying the broadcast turns reaches the same state.
        let mut local = Game::new(start).unwrap();
        while let Ok(turn) = turns.try_recv() {
            local.execute_turn(&turn).unwrap();
        }
        assert_eq!(local.tick(), 30);
        assert_eq!(local.state_hash().unwrap(), summary.final_hash);
    }

    #[tokio::test]
    async fn test_desync_ends_the_session() {
        let (tx, rx) = mpsc::channel(16);
        tx.send(ClientMessage::Hash {
            client: client("client-a"),
            event: HashEvent { tick: 0, hash: 1 },
        })
        .await
        .unwrap();

        let result = Session::new(config(50)).run(rx).await;
        assert!(matches!(
            result,
            Err(ServerError::Game(GameError::DesyncDetected { tick: 0, remote_hash: 1, .. }))
        ));
        drop(tx);
    }

    #[tokio::test]
    async fn test_catch_up_returns_sealed_turns() {
        let (tx, rx) = mpsc::channel(16);
        let session = tokio::spawn(Session::new(config(20)).run(rx));

        let (reply, missed) = oneshot::channel();
        tx.send(ClientMessage::CatchUp { from: 0, reply }).await.unwrap();
        let missed = missed.await.unwrap();
        assert!(missed.iter().enumerate().all(|(i, t)| t.turn_number == i as Tick));

        drop(tx);
        let summary = session.await.unwrap().unwrap();
        assert_eq!(summary.ticks, 20);
    }

    #[tokio::test]
    async fn test_tiny_queues_do_not_stall_the_session() {
        for run in 0..5 {
            let mut config = config(400);
            config.game_id = format!("tiny-{run}");
            config.channel_capacity = 1;
            config.game.hash_interval = 1;
            let (_tx, rx) = mpsc::channel(1);

            let summary = tokio::time::timeout(Duration::from_secs(30), Session::new(config).run(rx))
                .await
                .expect("session stalled")
                .unwrap();
            assert!(summary.ticks > 0);
            assert!(summary.hashes as Tick <= summary.ticks);
        }
    }

    #[tokio::test]
    async fn test_invalid_map_is_rejected() {
        let mut config = config(10);
        config.map = Vec::new();
        let (_tx, rx) = mpsc::channel(1);
        assert!(Session::new(config).run(rx).await.is_err());
    }
}
