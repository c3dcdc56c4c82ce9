//! Node Classifier
//!
//! Labels every grid node with its role and the chiplet that owns it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::grid::{Coord, Grid};
use crate::placement::GridShape;

/// Rows between the upper and lower chiplet pair in the stacked floorplan
const NON_SQUARE_GAP_ROWS: [usize; 2] = [7, 8];
/// Rows per chiplet band in the square floorplan
const SQUARE_CHIPLET_ROWS: usize = 8;
/// Columns per chiplet in the square floorplan
const SQUARE_CHIPLET_COLS: usize = 4;
/// Rows per chiplet in the stacked floorplan
const NON_SQUARE_CHIPLET_ROWS: usize = 4;

/// Role a node plays in the traffic model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeRole {
    Ordinary,
    Tsv,
    MemoryController,
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRole::Ordinary => write!(f, "NORMAL"),
            NodeRole::Tsv => write!(f, "TSV"),
            NodeRole::MemoryController => write!(f, "MEMCTRL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeLabel {
    pub role: NodeRole,
    /// Owning chiplet, `None` for edge and gap rows
    pub chiplet: Option<usize>,
}

/// Memory controllers sit on the first and last row of the grid
pub fn is_edge_row(grid: &Grid, y: usize) -> bool {
    y == 0 || y + 1 == grid.y_dim
}

/// Chiplet that owns a coordinate
pub fn chiplet_of(grid: &Grid, (x, y): Coord, shape: GridShape) -> Option<usize> {
    if is_edge_row(grid, y) {
        return None;
    }
    match shape {
        GridShape::Square => {
            Some((y / SQUARE_CHIPLET_ROWS) * 2 + x / SQUARE_CHIPLET_COLS)
        }
        GridShape::NonSquare if NON_SQUARE_GAP_ROWS.contains(&y) => None,
        GridShape::NonSquare => Some(y / NON_SQUARE_CHIPLET_ROWS),
    }
}

/// Label every node, indexed by node id
pub fn classify(grid: &Grid, sites: &BTreeSet<Coord>, shape: GridShape) -> Vec<NodeLabel> {
    grid.coords()
        .map(|coord| {
            let role = if is_edge_row(grid, coord.1) {
                NodeRole::MemoryController
            } else if sites.contains(&coord) {
                NodeRole::Tsv
            } else {
                NodeRole::Ordinary
            };
            NodeLabel {
                role,
                chiplet: chiplet_of(grid, coord, shape),
            }
        })
        .collect()
}

/// Node count per role: (ordinary, tsv, memory controller)
pub fn role_counts(labels: &[NodeLabel]) -> (usize, usize, usize) {
    labels.iter().fold((0, 0, 0), |(o, t, m), label| match label.role {
        NodeRole::Ordinary => (o + 1, t, m),
        NodeRole::Tsv => (o, t + 1, m),
        NodeRole::MemoryController => (o, t, m + 1),
    })
}
