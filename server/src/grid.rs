//! Occupancy map of the arena used for O(1) placement checks.
//!
//! A cell marked `Snake(color)` is covered by the snake of that colour. Where
//! snakes overlap, the cell carries the mark of whichever entered last.

use shared::{Color, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Empty,
    Snake(Color),
    Berry,
}

#[derive(Debug, Clone)]
pub struct Grid {
    width: u16,
    height: u16,
    cells: Vec<Cell>,
}

impl Grid {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::Empty; usize::from(width) * usize::from(height)],
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    #[cfg(test)]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    fn index(&self, pos: Position) -> usize {
        debug_assert!(pos.x < self.width && pos.y < self.height, "{} is off the grid", pos);
        usize::from(pos.y) * usize::from(self.width) + usize::from(pos.x)
    }

    pub fn get(&self, pos: Position) -> Cell {
        self.cells[self.index(pos)]
    }

    pub fn set(&mut self, pos: Position, cell: Cell) {
        let index = self.index(pos);
        self.cells[index] = cell;
    }

    pub fn is_empty(&self, pos: Position) -> bool {
        self.get(pos) == Cell::Empty
    }

    #[cfg(test)]
    pub fn count(&self, cell: Cell) -> usize {
        self.cells.iter().filter(|c| **c == cell).count()
    }
}
