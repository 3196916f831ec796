//! Snake body stored as a ring of cell positions, head first.
//!
//! Moving recycles the tail slot as the new head, so a step costs the same
//! regardless of body length. Growing duplicates the tail; the duplicate is
//! left behind on the next step, which is when the extra segment shows up.

use shared::{Direction, Position};
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct Snake {
    body: VecDeque<Position>,
}

impl Snake {
    /// Creates a snake of `length` segments coiled on `at`.
    ///
    /// Panics if `length` is zero.
    pub fn new(at: Position, length: usize) -> Self {
        assert!(length > 0, "a snake needs at least one segment");
        let mut body = VecDeque::with_capacity(length + 1);
        body.extend(std::iter::repeat(at).take(length));
        Self { body }
    }

    pub fn head(&self) -> Position {
        self.body[0]
    }

    pub fn tail(&self) -> Position {
        self.body[self.body.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    /// Moves one cell in `direction`, wrapping around the grid edges.
    ///
    /// Returns the new head and the cell the tail left.
    pub fn advance(&mut self, direction: Direction, width: u16, height: u16) -> (Position, Position) {
        let new_head = self.head().step(direction, width, height);
        let vacated = self.tail();
        self.body.pop_back();
        self.body.push_front(new_head);
        (new_head, vacated)
    }

    pub fn grow(&mut self) {
        self.body.push_back(self.tail());
    }

    pub fn contains(&self, pos: Position) -> bool {
        self.body.iter().any(|segment| *segment == pos)
    }

    pub fn positions(&self) -> Vec<Position> {
        self.body.iter().copied().collect()
    }
}
