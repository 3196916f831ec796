//! Pool of player colours. The pool size caps the number of concurrent players.

use shared::Color;
use std::collections::BTreeSet;

#[derive(Debug, Clone)]
pub struct IdentityPool {
    free: BTreeSet<Color>,
}

impl IdentityPool {
    /// Builds a pool holding the first `size` palette colours.
    pub fn new(size: usize) -> Self {
        Self {
            free: Color::PALETTE.iter().copied().take(size).collect(),
        }
    }

    /// Takes the earliest free colour in palette order.
    pub fn acquire(&mut self) -> Option<Color> {
        self.free.pop_first()
    }

    pub fn release(&mut self, color: Color) {
        let returned = self.free.insert(color);
        debug_assert!(returned, "{} released while already free", color);
    }

    pub fn available(&self) -> usize {
        self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.free.is_empty()
    }
}
