//! Simulation host.
//!
//! The host's replica of the game runs on a dedicated OS thread so a slow
//! tick never stalls the async runtime. It is reachable only through
//! channels: [`HostCommand`]s in, [`HostMessage`]s out. The outbound channel
//! is unbounded so the thread never blocks on a session that is itself
//! waiting to queue a command. The worker stops on the first desync or
//! simulation error, after reporting it.

use std::collections::{BTreeMap, VecDeque};
use std::thread;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use frontier_core::error::GameError;
use frontier_core::game::{Game, GameStartInfo, TickOutput};
use frontier_core::hash::{DesyncDetector, HashEvent};
use frontier_core::intent::Turn;
use frontier_core::world::ClientId;
use frontier_core::Tick;

use crate::config::ServerConfig;
use crate::error::{Result, ServerError};

/// Commands accepted by the simulation thread.
#[derive(Debug)]
pub enum HostCommand {
    /// Execute the turn for the next tick.
    Turn(Turn),
    /// A client's hash for a tick.
    RemoteHash {
        /// Reporting client.
        client: ClientId,
        /// Reported hash.
        event: HashEvent,
    },
    /// Serialize the current game, for late joiners and shutdown.
    Snapshot {
        /// Where to send the snapshot.
        reply: oneshot::Sender<std::result::Result<Vec<u8>, GameError>>,
    },
    /// Stop the thread.
    Shutdown,
}

/// Messages published by the simulation thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostMessage {
    /// A tick was executed.
    Tick(TickOutput),
    /// The host's own hash for a hash tick.
    Hash(HashEvent),
    /// A client's hash disagreed with the host's. The thread has stopped.
    Desync {
        /// Client whose replica diverged.
        client: ClientId,
        /// Tick of the mismatch.
        tick: Tick,
        /// Host hash.
        local_hash: u64,
        /// Client hash.
        remote_hash: u64,
    },
    /// The simulation failed. The thread has stopped.
    Fatal(String),
}

/// Handle to the simulation thread.
pub struct SimulationHost {
    commands: mpsc::Sender<HostCommand>,
    worker: Option<thread::JoinHandle<()>>,
}

impl SimulationHost {
    /// Create the game and start its thread.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Game`] for invalid start info and
    /// [`ServerError::Spawn`] if the thread cannot be started.
    pub fn spawn(
        start: GameStartInfo,
        config: &ServerConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<HostMessage>)> {
        let game = Game::new(start)?;
        let capacity = config.channel_capacity.max(1);
        let (command_tx, command_rx) = mpsc::channel(capacity);
        let (message_tx, message_rx) = mpsc::unbounded_channel();

        let worker = HostWorker {
            game,
            history: config.hash_history.max(1),
            local_hashes: VecDeque::new(),
            detectors: BTreeMap::new(),
            commands: command_rx,
            messages: message_tx,
        };
        let handle = thread::Builder::new()
            .name("frontier-sim".to_string())
            .spawn(move || worker.run())?;

        Ok((
            Self {
                commands: command_tx,
                worker: Some(handle),
            },
            message_rx,
        ))
    }

    async fn send(&self, command: HostCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ServerError::HostClosed)
    }

    /// Queue a turn.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::HostClosed`] if the thread has stopped.
    pub async fn submit_turn(&self, turn: Turn) -> Result<()> {
        self.send(HostCommand::Turn(turn)).await
    }

    /// Forward a client's hash report.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::HostClosed`] if the thread has stopped.
    pub async fn report_hash(&self, client: ClientId, event: HashEvent) -> Result<()> {
        self.send(HostCommand::RemoteHash { client, event }).await
    }

    /// Serialized game after every turn queued so far.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::HostClosed`] if the thread has stopped, or the
    /// serialization error.
    pub async fn snapshot(&self) -> Result<Vec<u8>> {
        let (reply, rx) = oneshot::channel();
        self.send(HostCommand::Snapshot { reply }).await?;
        Ok(rx.await.map_err(|_| ServerError::HostClosed)??)
    }

    /// Stop the thread and wait for it.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::WorkerPanicked`] if the thread panicked.
    pub async fn shutdown(mut self) -> Result<()> {
        // The thread may already have stopped on its own.
        let _ = self.commands.send(HostCommand::Shutdown).await;
        match self.worker.take() {
            Some(handle) => tokio::task::spawn_blocking(move || handle.join())
                .await
                .map_err(|_| ServerError::WorkerPanicked)?
                .map_err(|_| ServerError::WorkerPanicked),
            None => Ok(()),
        }
    }
}

struct HostWorker {
    game: Game,
    history: usize,
    local_hashes: VecDeque<HashEvent>,
    detectors: BTreeMap<ClientId, DesyncDetector>,
    commands: mpsc::Receiver<HostCommand>,
    messages: mpsc::UnboundedSender<HostMessage>,
}

impl HostWorker {
    fn run(mut self) {
        info!(game_id = self.game.world().game_id(), "Simulation thread started");
        while let Some(command) = self.commands.blocking_recv() {
            let keep_going = match command {
                HostCommand::Turn(turn) => self.execute(&turn),
                HostCommand::RemoteHash { client, event } => self.check(client, event),
                HostCommand::Snapshot { reply } => {
                    if reply.send(self.game.serialize()).is_err() {
                        debug!("Snapshot reply channel closed");
                    }
                    true
                }
                HostCommand::Shutdown => false,
            };
            if !keep_going {
                break;
            }
        }
        info!(tick = self.game.tick(), "Simulation thread stopped");
    }

    fn publish(&self, message: HostMessage) -> bool {
        self.messages.send(message).is_ok()
    }

    fn execute(&mut self, turn: &Turn) -> bool {
        let output = match self.game.execute_turn(turn) {
            Ok(output) => output,
            Err(e) => {
                error!(error = %e, turn = turn.turn_number, "Turn failed");
                self.publish(HostMessage::Fatal(e.to_string()));
                return false;
            }
        };
        let hash = output.hash;
        if !self.publish(HostMessage::Tick(output)) {
            return false;
        }

        let Some(hash) = hash else {
            return true;
        };
        self.local_hashes.push_back(hash);
        while self.local_hashes.len() > self.history {
            self.local_hashes.pop_front();
        }
        let mut desync = None;
        for (client, detector) in &mut self.detectors {
            if let Err(e) = detector.record(hash) {
                desync = Some((client.clone(), e));
                break;
            }
        }
        match desync {
            Some((client, e)) => {
                self.report_desync(client, e);
                false
            }
            None => self.publish(HostMessage::Hash(hash)),
        }
    }

    fn check(&mut self, client: ClientId, event: HashEvent) -> bool {
        let history = self.history;
        let local_hashes = &self.local_hashes;
        let detector = self.detectors.entry(client.clone()).or_insert_with(|| {
            let mut detector = DesyncDetector::new(history);
            for &local in local_hashes {
                // Nothing remote is queued yet, so this cannot fail.
                let _ = detector.record(local);
            }
            detector
        });
        match detector.check(event) {
            Ok(()) => true,
            Err(e) => {
                self.report_desync(client, e);
                false
            }
        }
    }

    fn report_desync(&self, client: ClientId, e: GameError) {
        if let GameError::DesyncDetected {
            tick,
            local_hash,
            remote_hash,
        } = e
        {
            warn!(client = %client.0, tick, "Client desynced");
            self.publish(HostMessage::Desync {
                client,
                tick,
                local_hash,
                remote_hash,
            });
        } else {
            self.publish(HostMessage::Fatal(e.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frontier_test_utils::fixtures::{duel_start, spawn_turn, CLIENT_A, SPAWN_A};

    async fn next_tick(messages: &mut mpsc::UnboundedReceiver<HostMessage>) -> TickOutput {
        loop {
            match messages.recv().await {
                Some(HostMessage::Tick(output)) => return output,
                Some(HostMessage::Hash(_)) => {}
                other => panic!("unexpected message {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_host_matches_local_replica() {
        let (host, mut messages) =
            SimulationHost::spawn(duel_start("host"), &ServerConfig::default()).unwrap();
        let mut local = Game::new(duel_start("host")).unwrap();

        let turns = [
            spawn_turn(0, &[(CLIENT_A, SPAWN_A)]),
            Turn::empty(1),
            Turn::empty(2),
        ];
        for turn in &turns {
            host.submit_turn(turn.clone()).await.unwrap();
        }
        let mut last = None;
        for turn in &turns {
            let expected = local.execute_turn(turn).unwrap();
            assert_eq!(next_tick(&mut messages).await, expected);
            last = expected.hash;
        }
        // The duel fixture hashes every tick.
        let last = last.unwrap();
        assert_eq!(last.tick, 2);
        assert_eq!(messages.recv().await, Some(HostMessage::Hash(last)));

        let snapshot = Game::deserialize(&host.snapshot().await.unwrap()).unwrap();
        assert_eq!(snapshot, local);
        host.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_unread_messages_never_block_turns() {
        let config = ServerConfig {
            channel_capacity: 1,
            ..ServerConfig::default()
        };
        let (host, _messages) = SimulationHost::spawn(duel_start("backlog"), &config).unwrap();

        // Nobody reads the messages; every turn and the snapshot still go through.
        let snapshot = tokio::time::timeout(std::time::Duration::from_secs(30), async {
            for tick in 0..50 {
                host.submit_turn(Turn::empty(tick)).await.unwrap();
            }
            host.snapshot().await.unwrap()
        })
        .await
        .expect("host stalled");
        assert_eq!(Game::deserialize(&snapshot).unwrap().tick(), 50);
        host.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_matching_report_is_accepted() {
        let (host, mut messages) =
            SimulationHost::spawn(duel_start("agree"), &ServerConfig::default()).unwrap();
        host.submit_turn(Turn::empty(0)).await.unwrap();
        let output = next_tick(&mut messages).await;
        let hash = output.hash.unwrap();

        host.report_hash(ClientId::new(CLIENT_A), hash).await.unwrap();
        host.submit_turn(Turn::empty(1)).await.unwrap();
        assert_eq!(next_tick(&mut messages).await.tick, 1);
        host.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_mismatched_report_stops_host() {
        let (host, mut messages) =
            SimulationHost::spawn(duel_start("liar"), &ServerConfig::default()).unwrap();
        // Reported before the host reaches tick 0.
        host.report_hash(ClientId::new(CLIENT_A), HashEvent { tick: 0, hash: 7 })
            .await
            .unwrap();
        host.submit_turn(Turn::empty(0)).await.unwrap();

        assert!(matches!(
            messages.recv().await,
            Some(HostMessage::Tick(TickOutput { tick: 0, .. }))
        ));
        match messages.recv().await {
            Some(HostMessage::Desync {
                client,
                tick,
                remote_hash,
                ..
            }) => {
                assert_eq!(client, ClientId::new(CLIENT_A));
                assert_eq!(tick, 0);
                assert_eq!(remote_hash, 7);
            }
            other => panic!("expected desync, got {other:?}"),
        }
        assert_eq!(messages.recv().await, None);
        assert!(host.submit_turn(Turn::empty(1)).await.is_err());
        host.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_out_of_order_turn_is_fatal() {
        let (host, mut messages) =
            SimulationHost::spawn(duel_start("skip"), &ServerConfig::default()).unwrap();
        host.submit_turn(Turn::empty(3)).await.unwrap();
        assert!(matches!(messages.recv().await, Some(HostMessage::Fatal(_))));
        assert_eq!(messages.recv().await, None);
        host.shutdown().await.unwrap();
    }
}
