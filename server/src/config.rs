//! Arena parameters, fixed for the lifetime of an arena.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArenaConfig {
    pub width: u16,
    pub height: u16,
    /// Segments of a freshly joined snake
    pub initial_length: usize,
    pub tick_interval: Duration,
    /// Number of palette colours in play; caps concurrent players
    pub palette_size: usize,
    pub initial_berries: usize,
    /// Random cells tried before a join is refused
    pub join_placement_tries: usize,
    /// Random cells tried per berry; `None` means four times the cell count
    pub berry_spawn_tries: Option<usize>,
    /// Capacity of the inbound command mailbox
    pub mailbox_capacity: usize,
    /// Seed for placement randomness; entropy when unset
    pub seed: Option<u64>,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            width: 50,
            height: 30,
            initial_length: 6,
            tick_interval: Duration::from_millis(200),
            palette_size: 5,
            initial_berries: 3,
            join_placement_tries: 250,
            berry_spawn_tries: None,
            mailbox_capacity: 128,
            seed: None,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("arena must be at least 1x1, got {width}x{height}")]
    EmptyArena { width: u16, height: u16 },
    #[error("initial snake length must be at least 1")]
    ZeroLength,
    #[error("tick interval must be non-zero")]
    ZeroTickInterval,
    #[error("palette size must be at least 1")]
    EmptyPalette,
    #[error("mailbox capacity must be at least 1")]
    ZeroMailbox,
    #[error("{initial_berries} initial berries do not fit on {cells} cells")]
    TooManyBerries { initial_berries: usize, cells: usize },
}

impl ArenaConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::EmptyArena {
                width: self.width,
                height: self.height,
            });
        }
        if self.initial_length == 0 {
            return Err(ConfigError::ZeroLength);
        }
        if self.tick_interval.is_zero() {
            return Err(ConfigError::ZeroTickInterval);
        }
        if self.palette_size == 0 {
            return Err(ConfigError::EmptyPalette);
        }
        if self.mailbox_capacity == 0 {
            return Err(ConfigError::ZeroMailbox);
        }
        if self.initial_berries > self.cell_count() {
            return Err(ConfigError::TooManyBerries {
                initial_berries: self.initial_berries,
                cells: self.cell_count(),
            });
        }
        Ok(())
    }

    pub fn cell_count(&self) -> usize {
        usize::from(self.width) * usize::from(self.height)
    }

    pub fn berry_spawn_tries(&self) -> usize {
        self.berry_spawn_tries
            .unwrap_or_else(|| self.cell_count().saturating_mul(4))
    }
}
