//! Topology Builder Module
//!
//! Synthesises the interposer interconnect graph for each topology family.
//! Families are compositions of a few shared adjacency rules, so e.g. the
//! bidirectional donut reuses the folded-torus row rule and the butterfly
//! column shuffle.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};
use std::fmt;
use std::str::FromStr;

use crate::error::{NoiError, Result};
use crate::grid::{Coord, Grid};

/// NoI topology family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topology {
    /// 2D nearest-neighbour mesh
    Mesh,
    /// Concentrated mesh; declared but adds no links
    CMesh,
    /// Folded butterfly: row chains plus a radix shuffle between columns
    DButterfly,
    /// Folded torus: skip-2 links with a fold at the far edge, both axes
    FTorus,
    /// Bidirectional donut: folded-torus rows, butterfly shuffle columns
    BDonut,
}

impl Topology {
    pub const ALL: [Topology; 5] = [
        Topology::Mesh,
        Topology::CMesh,
        Topology::DButterfly,
        Topology::FTorus,
        Topology::BDonut,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Topology::Mesh => "mesh",
            Topology::CMesh => "cmesh",
            Topology::DButterfly => "dbutterfly",
            Topology::FTorus => "ftorus",
            Topology::BDonut => "bdonut",
        }
    }

    /// Adjacency rules that make up this family
    pub fn rules(&self) -> &'static [EdgeRule] {
        match self {
            Topology::Mesh => &[EdgeRule::Neighbour(Axis::Y), EdgeRule::Neighbour(Axis::X)],
            Topology::CMesh => &[],
            Topology::DButterfly => &[EdgeRule::Neighbour(Axis::X), EdgeRule::RadixShuffle],
            Topology::FTorus => &[EdgeRule::SkipTwoFold(Axis::X), EdgeRule::SkipTwoFold(Axis::Y)],
            Topology::BDonut => &[EdgeRule::SkipTwoFold(Axis::X), EdgeRule::RadixShuffle],
        }
    }
}

impl FromStr for Topology {
    type Err = NoiError;

    fn from_str(name: &str) -> Result<Self> {
        Topology::ALL
            .iter()
            .copied()
            .find(|t| t.name() == name)
            .ok_or_else(|| NoiError::invalid_topology(name))
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Grid axis an edge rule walks along
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Along a row (x varies)
    X,
    /// Along a column (y varies)
    Y,
}

/// Reusable adjacency rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeRule {
    /// i <-> i + 1 along the axis
    Neighbour(Axis),
    /// i <-> i + 2 along the axis, 0 <-> 1, and n - 2 <-> n - 1
    SkipTwoFold(Axis),
    /// Column x to column x + 1 with a perfect-shuffle row exchange whose
    /// distance doubles toward the middle column
    RadixShuffle,
}

impl EdgeRule {
    fn apply(&self, net: &mut Interconnect) {
        let grid = net.grid;
        match *self {
            EdgeRule::Neighbour(axis) => {
                let len = axis_len(&grid, axis);
                for fixed in 0..other_len(&grid, axis) {
                    for i in 0..len.saturating_sub(1) {
                        net.connect(along(axis, i, fixed), along(axis, i + 1, fixed));
                    }
                }
            }
            EdgeRule::SkipTwoFold(axis) => {
                let len = axis_len(&grid, axis);
                for fixed in 0..other_len(&grid, axis) {
                    for i in 0..len {
                        for dst in skip_two_fold_targets(i, len) {
                            net.connect(along(axis, i, fixed), along(axis, dst, fixed));
                        }
                    }
                }
            }
            EdgeRule::RadixShuffle => {
                for x in 0..grid.x_dim.saturating_sub(1) {
                    for y in 0..grid.y_dim {
                        let Some(dst_y) = shuffle_row(x, y) else {
                            continue;
                        };
                        if dst_y < grid.y_dim {
                            net.connect((x, y), (x + 1, dst_y));
                        }
                    }
                }
            }
        }
    }
}

fn axis_len(grid: &Grid, axis: Axis) -> usize {
    match axis {
        Axis::X => grid.x_dim,
        Axis::Y => grid.y_dim,
    }
}

fn other_len(grid: &Grid, axis: Axis) -> usize {
    match axis {
        Axis::X => grid.y_dim,
        Axis::Y => grid.x_dim,
    }
}

fn along(axis: Axis, i: usize, fixed: usize) -> Coord {
    match axis {
        Axis::X => (i, fixed),
        Axis::Y => (fixed, i),
    }
}

/// In-range destinations of the skip-2-with-fold rule from position `i`
fn skip_two_fold_targets(i: usize, len: usize) -> Vec<usize> {
    let targets = if i + 2 == len {
        vec![len - 1]
    } else if i == 0 {
        vec![2, 1]
    } else {
        vec![i + 2]
    };
    targets.into_iter().filter(|&dst| dst < len).collect()
}

/// Shuffle exponent for a source column; columns outside the bands get no link
fn shuffle_exponent(x: usize) -> Option<u32> {
    match x {
        0 | 6 => Some(1),
        1 | 5 => Some(2),
        2 | 4 => Some(3),
        3 => Some(4),
        _ => None,
    }
}

/// Destination row of the radix shuffle from (x, y) into column x + 1
fn shuffle_row(x: usize, y: usize) -> Option<usize> {
    let block = 1usize << shuffle_exponent(x)?;
    Some((y / block) * block + (y + block / 2) % block)
}

/// Undirected interconnect graph over every grid node
#[derive(Debug, Clone)]
pub struct Interconnect {
    pub grid: Grid,
    adjacency: Vec<BTreeSet<usize>>,
}

impl Interconnect {
    /// Graph with every node and no links
    pub fn empty(grid: Grid) -> Self {
        Interconnect {
            grid,
            adjacency: vec![BTreeSet::new(); grid.num_total_nodes()],
        }
    }

    /// Build a fresh graph for a topology family
    pub fn build(topology: Topology, grid: Grid) -> Self {
        let mut net = Self::empty(grid);
        for rule in topology.rules() {
            rule.apply(&mut net);
        }
        log::debug!(
            "Built {} on {}x{}: {} links",
            topology,
            grid.x_dim,
            grid.y_dim,
            net.num_edges()
        );
        net
    }

    /// Drop every link, keeping the node set
    pub fn clear(&mut self) {
        for neighbours in &mut self.adjacency {
            neighbours.clear();
        }
    }

    /// Add the link a <-> b; repeating an existing link is a no-op
    pub fn add_edge(&mut self, a: usize, b: usize) {
        self.adjacency[a].insert(b);
        self.adjacency[b].insert(a);
    }

    fn connect(&mut self, a: Coord, b: Coord) {
        let (a, b) = (self.grid.to_1d(a), self.grid.to_1d(b));
        self.add_edge(a, b);
    }

    pub fn num_nodes(&self) -> usize {
        self.adjacency.len()
    }

    pub fn num_edges(&self) -> usize {
        self.adjacency.iter().map(|n| n.len()).sum::<usize>() / 2
    }

    pub fn neighbours(&self, node: usize) -> &BTreeSet<usize> {
        &self.adjacency[node]
    }

    pub fn has_edge(&self, a: usize, b: usize) -> bool {
        self.adjacency[a].contains(&b)
    }

    /// Each link once, lower id first
    pub fn edges(&self) -> Vec<(usize, usize)> {
        self.adjacency
            .iter()
            .enumerate()
            .flat_map(|(a, ns)| ns.iter().filter(move |&&b| a < b).map(move |&b| (a, b)))
            .collect()
    }

    /// BFS hop counts from `src`; `None` for unreachable nodes
    pub fn distances_from(&self, src: usize) -> Vec<Option<usize>> {
        let mut dist = vec![None; self.num_nodes()];
        let mut queue = VecDeque::new();

        dist[src] = Some(0);
        queue.push_back(src);

        while let Some(node) = queue.pop_front() {
            let next = dist[node].map_or(0, |d| d + 1);
            for &n in &self.adjacency[node] {
                if dist[n].is_none() {
                    dist[n] = Some(next);
                    queue.push_back(n);
                }
            }
        }

        dist
    }

    /// Shortest-path hop count between two nodes
    pub fn distance(&self, src: usize, dst: usize) -> Result<usize> {
        self.distances_from(src)[dst].ok_or(NoiError::NoPath { src, dst })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names() {
        for topology in Topology::ALL {
            assert_eq!(topology.name().parse::<Topology>().unwrap(), topology);
        }
        let err = "hypercube".parse::<Topology>().unwrap_err();
        assert!(matches!(err, NoiError::InvalidTopology { .. }));
    }

    #[test]
    fn test_mesh_corner() {
        let net = Interconnect::build(Topology::Mesh, Grid::new(4, 4));
        let corner: Vec<_> = net.neighbours(0).iter().copied().collect();
        assert_eq!(corner, vec![1, 4]);
        // 2 * 4 * 3 links in a 4x4 mesh
        assert_eq!(net.num_edges(), 24);
        assert_eq!(net.distance(0, 15).unwrap(), 6);
    }

    #[test]
    fn test_cmesh_has_no_links() {
        let net = Interconnect::build(Topology::CMesh, Grid::new(8, 16));
        assert_eq!(net.num_edges(), 0);
        assert!(matches!(net.distance(0, 1), Err(NoiError::NoPath { src: 0, dst: 1 })));
        assert_eq!(net.distance(5, 5).unwrap(), 0);
    }

    #[test]
    fn test_duplicate_edges_are_idempotent() {
        let grid = Grid::new(4, 4);
        let mut net = Interconnect::build(Topology::Mesh, grid);
        let before: Vec<_> = (0..16).map(|n| net.distances_from(n)).collect();
        let edges = net.num_edges();

        net.add_edge(0, 1);
        net.add_edge(1, 0);
        net.add_edge(5, 6);

        assert_eq!(net.num_edges(), edges);
        let after: Vec<_> = (0..16).map(|n| net.distances_from(n)).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_skip_two_fold_targets() {
        assert_eq!(skip_two_fold_targets(0, 8), vec![2, 1]);
        assert_eq!(skip_two_fold_targets(3, 8), vec![5]);
        assert_eq!(skip_two_fold_targets(6, 8), vec![7]);
        assert!(skip_two_fold_targets(7, 8).is_empty());
        assert_eq!(skip_two_fold_targets(0, 2), vec![1]);
    }

    #[test]
    fn test_ftorus_row_links() {
        let grid = Grid::new(8, 16);
        let net = Interconnect::build(Topology::FTorus, grid);
        let row: Vec<_> = net
            .neighbours(grid.to_1d((0, 5)))
            .iter()
            .map(|&n| grid.to_2d(n))
            .filter(|&(_, y)| y == 5)
            .collect();
        assert_eq!(row, vec![(1, 5), (2, 5)]);
        assert!(net.has_edge(grid.to_1d((6, 5)), grid.to_1d((7, 5))));
        assert!(net.has_edge(grid.to_1d((5, 5)), grid.to_1d((7, 5))));
        assert!(!net.has_edge(grid.to_1d((3, 5)), grid.to_1d((4, 5))));
        // Column rule mirrors the row rule
        assert!(net.has_edge(grid.to_1d((2, 14)), grid.to_1d((2, 15))));
        assert!(net.has_edge(grid.to_1d((2, 0)), grid.to_1d((2, 1))));
    }

    #[test]
    fn test_radix_shuffle_rows() {
        assert_eq!(shuffle_row(0, 0), Some(1));
        assert_eq!(shuffle_row(0, 3), Some(2));
        assert_eq!(shuffle_row(1, 1), Some(3));
        assert_eq!(shuffle_row(2, 5), Some(1));
        assert_eq!(shuffle_row(3, 0), Some(8));
        assert_eq!(shuffle_row(3, 15), Some(7));
        assert_eq!(shuffle_row(4, 9), Some(13));
        assert_eq!(shuffle_row(6, 10), Some(11));
        assert_eq!(shuffle_row(7, 0), None);
    }

    #[test]
    fn test_dbutterfly_links() {
        let grid = Grid::new(8, 16);
        let net = Interconnect::build(Topology::DButterfly, grid);
        assert!(net.has_edge(grid.to_1d((3, 0)), grid.to_1d((4, 8))));
        assert!(net.has_edge(grid.to_1d((0, 4)), grid.to_1d((1, 4))));
        assert!(net.has_edge(grid.to_1d((0, 4)), grid.to_1d((1, 5))));
        for src in 0..grid.num_total_nodes() {
            assert!(net.distances_from(src).iter().all(Option::is_some));
        }
    }

    #[test]
    fn test_bdonut_mixes_rules() {
        let grid = Grid::new(8, 16);
        let donut = Interconnect::build(Topology::BDonut, grid);
        let torus = Interconnect::build(Topology::FTorus, grid);
        let fly = Interconnect::build(Topology::DButterfly, grid);

        // Row links come from the folded torus
        let (a, b) = (grid.to_1d((1, 3)), grid.to_1d((3, 3)));
        assert!(donut.has_edge(a, b) && torus.has_edge(a, b) && !fly.has_edge(a, b));
        // Column shuffle comes from the butterfly
        let (a, b) = (grid.to_1d((3, 2)), grid.to_1d((4, 10)));
        assert!(donut.has_edge(a, b) && fly.has_edge(a, b) && !torus.has_edge(a, b));
    }

    #[test]
    fn test_shuffle_skips_out_of_range_rows() {
        let grid = Grid::new(4, 4);
        let net = Interconnect::build(Topology::DButterfly, grid);
        // Column 2 uses blocks of 8, so row 0 would land on row 4
        let cross: Vec<_> = net
            .neighbours(grid.to_1d((2, 0)))
            .iter()
            .map(|&n| grid.to_2d(n))
            .filter(|&(x, _)| x == 3)
            .collect();
        assert_eq!(cross, vec![(3, 0)]);
    }

    #[test]
    fn test_clear_and_edges() {
        let mut net = Interconnect::build(Topology::Mesh, Grid::new(2, 2));
        assert_eq!(net.edges(), vec![(0, 1), (0, 2), (1, 3), (2, 3)]);
        net.clear();
        assert_eq!(net.num_edges(), 0);
        assert_eq!(net.num_nodes(), 4);
    }
}
