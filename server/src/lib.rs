//! # Snake Arena Server Library
//!
//! This library provides the authoritative engine for a shared-arena snake
//! game. It owns every piece of mutable game state, applies client commands
//! and tick pulses in a single serialized stream, and fans the resulting
//! updates out to each connected player.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! Snakes move on a toroidal grid, one cell per tick. Berries are placed on
//! free cells and make a snake one segment longer when eaten. All of this is
//! decided here; clients only render what they are told.
//!
//! ### Player Lifecycle
//! - Joining: username check, colour assignment, spawn-cell search
//! - Steering: direction changes applied on the next tick
//! - Leaving: cells and colour returned, mailbox closed
//!
//! ### State Broadcasting
//! A newly joined player receives a full snapshot of the arena; every player
//! receives one incremental update per tick.
//!
//! ## Architecture Design
//!
//! ### Single Authority
//! One task owns the `GameState` and drains one bounded mailbox. Client
//! commands and the periodic tick share that mailbox, so no lock ever guards
//! game state and commands never interleave with a tick.
//!
//! ### Mailboxes Out
//! Each player has its own unbounded outbound mailbox. A slow reader only
//! backs up its own queue; closing the mailbox is how the arena tells a
//! session it has been refused or that the arena has stopped.
//!
//! ## Module Organization
//!
//! ### Arena Module (`arena`)
//! The authority loop, its tick source and the cloneable `ArenaHandle`.
//!
//! ### Game Module (`game`)
//! The synchronous state machine applying one `Command` at a time.
//!
//! ### Entity Modules (`snake`, `grid`, `berries`, `identity`, `player_manager`)
//! Snake bodies, the occupancy grid, berry placement, the colour pool and
//! the player registry.
//!
//! ### Network Module (`network`)
//! A TCP transport carrying length-prefixed bincode frames between clients
//! and the arena.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::arena::Arena;
//! use server::config::ArenaConfig;
//! use shared::{Direction, Event};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (arena, task) = Arena::spawn(ArenaConfig::default())?;
//!
//!     let mut session = arena.join("alice").await?;
//!     if let Some(Event::Joined(snapshot)) = session.events.recv().await {
//!         println!("joined as {} at {}", snapshot.player.color, snapshot.player.body[0]);
//!     }
//!     arena.change_direction(session.id, Direction::Right).await?;
//!
//!     arena.shutdown().await?;
//!     task.await?;
//!     Ok(())
//! }
//! ```

pub mod arena;
pub mod berries;
pub mod config;
pub mod game;
pub mod grid;
pub mod identity;
pub mod network;
pub mod player_manager;
pub mod snake;
