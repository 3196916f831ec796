//! Berry placement by rejection sampling.

use crate::grid::{Cell, Grid};
use crate::player_manager::PlayerManager;
use log::warn;
use rand::Rng;
use shared::Position;
use std::collections::BTreeSet;

#[derive(Debug, Default)]
pub struct BerryField {
    berries: BTreeSet<Position>,
}

impl BerryField {
    pub fn new() -> Self {
        Self::default()
    }

    /// Places one berry on a cell that holds neither a berry nor any snake
    /// segment, trying at most `tries` random cells.
    pub fn spawn<R: Rng>(
        &mut self,
        grid: &mut Grid,
        players: &PlayerManager,
        rng: &mut R,
        tries: usize,
    ) -> Option<Position> {
        for _ in 0..tries {
            let pos = Position::new(
                rng.gen_range(0..grid.width()),
                rng.gen_range(0..grid.height()),
            );
            if !grid.is_empty(pos) || self.berries.contains(&pos) {
                continue;
            }
            if players.iter().any(|p| p.snake.contains(pos)) {
                continue;
            }

            grid.set(pos, Cell::Berry);
            self.berries.insert(pos);
            return Some(pos);
        }

        warn!("No free cell for a berry after {} tries", tries);
        None
    }

    /// Removes the berry at `pos`, returning whether there was one.
    pub fn consume(&mut self, pos: Position) -> bool {
        self.berries.remove(&pos)
    }

    pub fn contains(&self, pos: Position) -> bool {
        self.berries.contains(&pos)
    }

    pub fn positions(&self) -> Vec<Position> {
        self.berries.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.berries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.berries.is_empty()
    }
}
