//! The arena's authority loop and the handle used to talk to it
//!
//! One task owns the `GameState` and drains a single bounded mailbox. Client
//! commands and tick pulses both arrive on that mailbox, so they are applied
//! strictly in arrival order and never interleave.

use crate::config::{ArenaConfig, ConfigError};
use crate::game::{Command, GameState};
use log::{error, info};
use shared::{get_timestamp, Direction, Event, PlayerId};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ArenaError {
    #[error("arena is no longer running")]
    Closed,
}

impl<T> From<mpsc::error::SendError<T>> for ArenaError {
    fn from(_: mpsc::error::SendError<T>) -> Self {
        ArenaError::Closed
    }
}

/// Random tag identifying one arena in the logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArenaId(pub u32);

impl ArenaId {
    pub fn random() -> Self {
        ArenaId(rand::random())
    }
}

impl fmt::Display for ArenaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

/// A joined (or pending) player's view of the arena
///
/// The first event is the join snapshot. If the join was refused the
/// mailbox closes without yielding anything.
#[derive(Debug)]
pub struct PlayerSession {
    pub id: PlayerId,
    pub events: mpsc::UnboundedReceiver<Event>,
}

/// Cloneable sender side of the arena's inbound mailbox
#[derive(Debug, Clone)]
pub struct ArenaHandle {
    id: ArenaId,
    commands: mpsc::Sender<Command>,
    next_player_id: Arc<AtomicU32>,
}

impl ArenaHandle {
    pub async fn join(&self, username: impl Into<String>) -> Result<PlayerSession, ArenaError> {
        let id = PlayerId(self.next_player_id.fetch_add(1, Ordering::Relaxed));
        let (outbox, events) = mpsc::unbounded_channel();
        self.commands
            .send(Command::Join {
                id,
                username: username.into(),
                outbox,
            })
            .await?;
        Ok(PlayerSession { id, events })
    }

    pub async fn leave(&self, id: PlayerId) -> Result<(), ArenaError> {
        Ok(self.commands.send(Command::Leave { id }).await?)
    }

    pub async fn change_direction(
        &self,
        id: PlayerId,
        direction: Direction,
    ) -> Result<(), ArenaError> {
        Ok(self
            .commands
            .send(Command::ChangeDirection { id, direction })
            .await?)
    }

    /// Injects an extra tick pulse, stamped with the current time.
    pub async fn tick(&self) -> Result<(), ArenaError> {
        Ok(self
            .commands
            .send(Command::Tick {
                timestamp: get_timestamp(),
            })
            .await?)
    }

    /// Asks the loop to stop. Commands already queued are still applied.
    pub async fn shutdown(&self) -> Result<(), ArenaError> {
        Ok(self.commands.send(Command::Shutdown).await?)
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    /// Resolves once the authority loop has stopped.
    pub async fn closed(&self) {
        self.commands.closed().await
    }

    pub fn id(&self) -> ArenaId {
        self.id
    }
}

pub struct Arena;

impl Arena {
    /// Validates `config`, then starts the authority loop and its tick source.
    ///
    /// The returned join handle resolves once the loop has shut down.
    pub fn spawn(config: ArenaConfig) -> Result<(ArenaHandle, JoinHandle<()>), ConfigError> {
        config.validate()?;

        let id = ArenaId::random();
        let (commands, inbox) = mpsc::channel(config.mailbox_capacity);
        let handle = ArenaHandle {
            id,
            commands: commands.clone(),
            next_player_id: Arc::new(AtomicU32::new(1)),
        };

        let ticker = tokio::spawn(run_ticker(commands, config.tick_interval));
        let state = GameState::new(config);
        let task = tokio::spawn(run_arena(id, state, inbox, ticker));

        Ok((handle, task))
    }
}

/// Feeds a tick command into the arena mailbox every `tick_interval`.
async fn run_ticker(commands: mpsc::Sender<Command>, tick_interval: Duration) {
    let mut interval_timer = interval(tick_interval);
    interval_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    // Skip the first tick since it fires immediately
    interval_timer.tick().await;

    loop {
        interval_timer.tick().await;
        let timestamp = get_timestamp();
        if commands.send(Command::Tick { timestamp }).await.is_err() {
            break;
        }
    }
}

/// Drains the mailbox until shutdown, then applies whatever was already queued.
async fn run_arena(
    id: ArenaId,
    mut state: GameState,
    mut inbox: mpsc::Receiver<Command>,
    ticker: JoinHandle<()>,
) {
    info!(
        "[arena {}] Started: {}x{}, tick every {:?}",
        id,
        state.config().width,
        state.config().height,
        state.config().tick_interval
    );

    while let Some(command) = inbox.recv().await {
        if state.handle(command).is_break() {
            break;
        }
    }

    ticker.abort();
    inbox.close();
    while let Some(command) = inbox.recv().await {
        if let Command::Shutdown = command {
            continue;
        }
        let _ = state.handle(command);
    }

    if let Err(e) = ticker.await {
        if !e.is_cancelled() {
            error!("[arena {}] Tick source panicked: {}", id, e);
        }
    }

    info!(
        "[arena {}] Stopped after {} ticks with {} players",
        id,
        state.tick,
        state.players().len()
    );
    // Dropping the state closes every player's mailbox.
}
