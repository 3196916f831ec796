//! Registry of players taking part in the arena
//!
//! This module holds the server-side record of every joined player:
//! - Identity (id, unique username, colour)
//! - The player's snake and current heading
//! - The outbound mailbox the arena pushes events into
//!
//! Only the authority loop owns a `PlayerManager`; nothing else reads or
//! writes player state directly.

use crate::snake::Snake;
use log::{debug, info};
use shared::{Color, Direction, Event, PeerSnapshot, PlayerId};
use std::collections::BTreeMap;
use tokio::sync::mpsc;

/// A joined player and the mailbox its session drains
#[derive(Debug)]
pub struct Player {
    pub id: PlayerId,
    pub username: String,
    pub color: Color,
    pub snake: Snake,
    /// `None` until the first direction change arrives
    pub direction: Option<Direction>,
    pub outbox: mpsc::UnboundedSender<Event>,
    /// Cleared when the player leaves or its mailbox is found closed
    pub alive: bool,
}

impl Player {
    pub fn new(
        id: PlayerId,
        username: String,
        color: Color,
        snake: Snake,
        outbox: mpsc::UnboundedSender<Event>,
    ) -> Self {
        Self {
            id,
            username,
            color,
            snake,
            direction: None,
            outbox,
            alive: true,
        }
    }

    /// Pushes an event to the player's mailbox
    ///
    /// A failed send means the receiving session is gone; the player is
    /// marked dead so the arena can reap it.
    pub fn send(&mut self, event: Event) -> bool {
        if !self.alive {
            return false;
        }
        if self.outbox.send(event).is_err() {
            debug!("Mailbox of {} ({}) is closed", self.id, self.username);
            self.alive = false;
        }
        self.alive
    }

    pub fn snapshot(&self) -> PeerSnapshot {
        PeerSnapshot {
            id: self.id,
            username: self.username.clone(),
            color: self.color,
            body: self.snake.positions(),
        }
    }
}

/// Owns all players, ordered by id so that tick processing is deterministic
#[derive(Debug, Default)]
pub struct PlayerManager {
    players: BTreeMap<PlayerId, Player>,
}

impl PlayerManager {
    pub fn new() -> Self {
        Self {
            players: BTreeMap::new(),
        }
    }

    pub fn is_username_taken(&self, username: &str) -> bool {
        self.players.values().any(|p| p.username == username)
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.players.contains_key(&id)
    }

    pub fn insert(&mut self, player: Player) {
        info!(
            "Player {} ({}) joined as {}",
            player.id, player.username, player.color
        );
        self.players.insert(player.id, player);
    }

    pub fn remove(&mut self, id: PlayerId) -> Option<Player> {
        self.players.remove(&id)
    }

    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn get_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.players.values_mut()
    }

    /// Sends `event` to every live player except `exclude`
    pub fn broadcast(&mut self, event: &Event, exclude: Option<PlayerId>) {
        for player in self.players.values_mut() {
            if Some(player.id) == exclude || !player.alive {
                continue;
            }
            player.send(event.clone());
        }
    }

    /// Removes every player whose mailbox was found closed
    pub fn reap_dead(&mut self) -> Vec<Player> {
        let dead: Vec<PlayerId> = self
            .players
            .values()
            .filter(|p| !p.alive)
            .map(|p| p.id)
            .collect();

        dead.into_iter()
            .filter_map(|id| self.players.remove(&id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}
