//! Authoritative arena state and the handling of every command.
//!
//! `GameState` is driven one command at a time by the arena loop; each call to
//! [`GameState::handle`] runs to completion before the next command is drawn.

use crate::berries::BerryField;
use crate::config::ArenaConfig;
use crate::grid::{Cell, Grid};
use crate::identity::IdentityPool;
use crate::player_manager::{Player, PlayerManager};
use crate::snake::Snake;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{
    Color, Direction, Event, JoinSnapshot, PlayerId, Position, PositionUpdate, TickUpdate,
};
use std::ops::ControlFlow;
use tokio::sync::mpsc;

/// Everything that can be put on the arena's inbound mailbox.
#[derive(Debug)]
pub enum Command {
    Join {
        id: PlayerId,
        username: String,
        outbox: mpsc::UnboundedSender<Event>,
    },
    Leave {
        id: PlayerId,
    },
    ChangeDirection {
        id: PlayerId,
        direction: Direction,
    },
    Tick {
        timestamp: u64,
    },
    Shutdown,
}

/// Why a join was refused. The requester only sees its mailbox close.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum JoinRejection {
    #[error("username {0:?} is already taken")]
    UsernameTaken(String),
    #[error("player id {0} is already registered")]
    IdInUse(PlayerId),
    #[error("no identities left")]
    PoolExhausted,
    #[error("no free cell found in {tries} tries")]
    NoFreeCell { tries: usize },
    #[error("requester hung up before the snapshot was sent")]
    Disconnected,
}

pub struct GameState {
    pub tick: u64,
    config: ArenaConfig,
    grid: Grid,
    players: PlayerManager,
    berries: BerryField,
    identities: IdentityPool,
    rng: StdRng,
}

impl GameState {
    pub fn new(config: ArenaConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut state = Self {
            tick: 0,
            grid: Grid::new(config.width, config.height),
            players: PlayerManager::new(),
            berries: BerryField::new(),
            identities: IdentityPool::new(config.palette_size),
            rng,
            config,
        };

        let tries = state.config.berry_spawn_tries();
        for _ in 0..state.config.initial_berries {
            state
                .berries
                .spawn(&mut state.grid, &state.players, &mut state.rng, tries);
        }

        state
    }

    /// Applies one command. Breaks when the arena should stop.
    pub fn handle(&mut self, command: Command) -> ControlFlow<()> {
        match command {
            Command::Join {
                id,
                username,
                outbox,
            } => {
                if let Err(reason) = self.join(id, &username, outbox) {
                    info!("Join of {} ({}) rejected: {}", id, username, reason);
                }
            }
            Command::Leave { id } => self.leave(id),
            Command::ChangeDirection { id, direction } => self.change_direction(id, direction),
            Command::Tick { timestamp } => self.advance(timestamp),
            Command::Shutdown => return ControlFlow::Break(()),
        }
        self.reap_dead();
        ControlFlow::Continue(())
    }

    /// Registers a player and sends it the arena snapshot.
    ///
    /// On rejection `outbox` is dropped, which closes the requester's mailbox.
    pub fn join(
        &mut self,
        id: PlayerId,
        username: &str,
        outbox: mpsc::UnboundedSender<Event>,
    ) -> Result<(), JoinRejection> {
        if self.players.is_username_taken(username) {
            return Err(JoinRejection::UsernameTaken(username.to_string()));
        }
        if self.players.contains(id) {
            return Err(JoinRejection::IdInUse(id));
        }
        if self.identities.is_empty() {
            return Err(JoinRejection::PoolExhausted);
        }

        let tries = self.config.join_placement_tries;
        let at = self
            .find_spawn_cell(tries)
            .ok_or(JoinRejection::NoFreeCell { tries })?;
        let color = self
            .identities
            .acquire()
            .ok_or(JoinRejection::PoolExhausted)?;

        let snake = Snake::new(at, self.config.initial_length);
        self.grid.set(at, Cell::Snake(color));
        let mut player = Player::new(id, username.to_string(), color, snake, outbox);

        let snapshot = JoinSnapshot {
            player: player.snapshot(),
            others: self
                .players
                .iter()
                .filter(|p| p.alive)
                .map(Player::snapshot)
                .collect(),
            berries: self.berries.positions(),
            width: self.config.width,
            height: self.config.height,
        };
        if !player.send(Event::Joined(snapshot)) {
            self.release(player);
            return Err(JoinRejection::Disconnected);
        }

        let announcement = Event::PeerJoined(player.snapshot());
        self.players.broadcast(&announcement, None);
        self.players.insert(player);
        Ok(())
    }

    fn find_spawn_cell(&mut self, tries: usize) -> Option<Position> {
        for _ in 0..tries {
            let pos = Position::new(
                self.rng.gen_range(0..self.config.width),
                self.rng.gen_range(0..self.config.height),
            );
            if self.grid.is_empty(pos) && !self.players.iter().any(|p| p.snake.contains(pos)) {
                return Some(pos);
            }
        }
        None
    }

    /// Removes a player, closing its mailbox and freeing its cells and colour.
    pub fn leave(&mut self, id: PlayerId) {
        match self.players.remove(id) {
            Some(mut player) => {
                player.alive = false;
                info!("Player {} ({}) left the arena", player.id, player.username);
                self.release(player);
            }
            None => debug!("Leave for unknown player {}", id),
        }
    }

    pub fn change_direction(&mut self, id: PlayerId, direction: Direction) {
        match self.players.get_mut(id) {
            Some(player) => player.direction = Some(direction),
            None => debug!("Direction change for unknown player {}", id),
        }
    }

    /// Moves every live snake one cell and broadcasts the result.
    pub fn advance(&mut self, timestamp: u64) {
        self.tick += 1;
        let (width, height) = (self.config.width, self.config.height);

        let mut updates = Vec::with_capacity(self.players.len());
        let mut eaten = 0;

        let movers: Vec<PlayerId> = self
            .players
            .iter()
            .filter(|p| p.alive && p.direction.is_some())
            .map(|p| p.id)
            .collect();

        for id in movers {
            let Some(player) = self.players.get_mut(id) else {
                continue;
            };
            let Some(direction) = player.direction else {
                continue;
            };
            let color = player.color;

            let prev_head = player.snake.head();
            let (head, tail) = player.snake.advance(direction, width, height);
            // A reversed or still coiled body may cover the vacated cell.
            let clear_tail = !player.snake.contains(tail);

            if self.berries.consume(head) {
                player.snake.grow();
                eaten += 1;
            }

            if clear_tail {
                self.vacate(tail, color);
            }
            self.grid.set(head, Cell::Snake(color));

            updates.push(PositionUpdate {
                id,
                color,
                head,
                prev_head,
                tail,
                clear_tail,
            });
        }

        let tries = self.config.berry_spawn_tries();
        let new_berries: Vec<Position> = (0..eaten)
            .filter_map(|_| {
                self.berries
                    .spawn(&mut self.grid, &self.players, &mut self.rng, tries)
            })
            .collect();

        if self.tick % 50 == 0 {
            debug!(
                "Tick {}: {} players, {} berries",
                self.tick,
                self.players.len(),
                self.berries.len()
            );
        }

        let update = Event::Tick(TickUpdate {
            tick: self.tick,
            timestamp,
            updates,
            new_berries,
        });
        self.players.broadcast(&update, None);
    }

    fn reap_dead(&mut self) {
        for player in self.players.reap_dead() {
            info!(
                "Player {} ({}) dropped: mailbox closed",
                player.id, player.username
            );
            self.release(player);
        }
    }

    /// Returns a player's cells and colour. The player must already be out
    /// of the registry.
    fn release(&mut self, player: Player) {
        for pos in player.snake.positions() {
            self.vacate(pos, player.color);
        }
        self.identities.release(player.color);
    }

    /// Re-marks `pos` after the snake of `color` stopped covering it.
    ///
    /// The cell keeps its mark if another snake painted it, and is handed to
    /// any remaining occupant before it is emptied.
    fn vacate(&mut self, pos: Position, color: Color) {
        if self.grid.get(pos) != Cell::Snake(color) {
            return;
        }
        let cell = self
            .players
            .iter()
            .find(|p| p.snake.contains(pos))
            .map_or(Cell::Empty, |p| Cell::Snake(p.color));
        self.grid.set(pos, cell);
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn players(&self) -> &PlayerManager {
        &self.players
    }

    pub fn berries(&self) -> &BerryField {
        &self.berries
    }

    pub fn identities(&self) -> &IdentityPool {
        &self.identities
    }
}
