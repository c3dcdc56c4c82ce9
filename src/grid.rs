//! Grid Index Module
//!
//! Maps between linear node identifiers and (x, y) coordinates on the
//! interposer node grid. Every other module addresses nodes through here.

use serde::{Deserialize, Serialize};

/// (x, y) grid coordinate
pub type Coord = (usize, usize);

/// Rectangular node grid, row-major numbering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Grid {
    pub x_dim: usize,
    pub y_dim: usize,
}

impl Grid {
    pub fn new(x_dim: usize, y_dim: usize) -> Self {
        Grid { x_dim, y_dim }
    }

    pub fn num_total_nodes(&self) -> usize {
        self.x_dim * self.y_dim
    }

    /// Memory controllers line the top and bottom edge rows
    pub fn num_mem_ctrl(&self) -> usize {
        2 * self.x_dim
    }

    /// Linear id -> (x, y)
    pub fn to_2d(&self, id: usize) -> Coord {
        (id % self.x_dim, id / self.x_dim)
    }

    /// (x, y) -> linear id
    pub fn to_1d(&self, (x, y): Coord) -> usize {
        y * self.x_dim + x
    }

    pub fn contains(&self, (x, y): Coord) -> bool {
        x < self.x_dim && y < self.y_dim
    }

    /// All coordinates in id order
    pub fn coords(&self) -> impl Iterator<Item = Coord> + '_ {
        (0..self.num_total_nodes()).map(move |id| self.to_2d(id))
    }
}
