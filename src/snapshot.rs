//! Network snapshot export
//!
//! Captures one finished interconnect together with its node labels so a
//! diagram can be rendered outside the crate (JSON, or Graphviz DOT with
//! pinned grid positions).

use serde::{Deserialize, Serialize};
use std::fmt::Write;

use crate::classify::NodeRole;
use crate::error::Result;
use crate::grid::Grid;
use crate::placement::{GridShape, IsolatedSiteCache, TsvLayout};
use crate::sweep::Combination;
use crate::topology::Topology;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub id: usize,
    pub x: usize,
    pub y: usize,
    pub role: NodeRole,
    pub chiplet: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSnapshot {
    pub topology: Topology,
    pub grid: Grid,
    pub shape: GridShape,
    pub layout: TsvLayout,
    pub num_total_tsv: usize,
    pub edges: Vec<(usize, usize)>,
    pub nodes: Vec<NodeSnapshot>,
    /// Average hop count, absent if the combination cannot be scored
    pub score: Option<f64>,
}

impl NetworkSnapshot {
    pub fn capture(
        grid: Grid,
        topology: Topology,
        shape: GridShape,
        layout: &TsvLayout,
        cache: &mut IsolatedSiteCache,
    ) -> Result<Self> {
        let combination = Combination::prepare(grid, topology, shape, layout, cache)?;
        Ok(Self::from_combination(&combination))
    }

    pub fn from_combination(combination: &Combination) -> Self {
        let grid = combination.interconnect.grid;
        let nodes = combination
            .labels
            .iter()
            .enumerate()
            .map(|(id, label)| {
                let (x, y) = grid.to_2d(id);
                NodeSnapshot {
                    id,
                    x,
                    y,
                    role: label.role,
                    chiplet: label.chiplet,
                }
            })
            .collect();

        NetworkSnapshot {
            topology: combination.topology,
            grid,
            shape: combination.placement.shape,
            layout: combination.placement.layout.clone(),
            num_total_tsv: combination.placement.num_total_tsv,
            edges: combination.interconnect.edges(),
            nodes,
            score: combination.evaluate().ok().map(|r| r.average),
        }
    }

    /// Graphviz rendering; row 0 is drawn at the top
    pub fn to_dot(&self) -> String {
        let mut dot = String::new();
        let _ = writeln!(dot, "graph \"{}\" {{", self.topology);
        let _ = writeln!(dot, "  layout=neato;");
        let _ = writeln!(dot, "  node [shape=circle, style=filled, fontsize=8];");

        for node in &self.nodes {
            let color = match node.role {
                NodeRole::Ordinary => "lightblue",
                NodeRole::Tsv => "orange",
                NodeRole::MemoryController => "palegreen",
            };
            let _ = writeln!(
                dot,
                "  {} [pos=\"{},{}!\", fillcolor={}];",
                node.id,
                node.x,
                self.grid.y_dim - 1 - node.y,
                color
            );
        }
        for (a, b) in &self.edges {
            let _ = writeln!(dot, "  {} -- {};", a, b);
        }

        dot.push_str("}\n");
        dot
    }

    /// Per-node listing: role and coordinate
    pub fn node_table(&self) -> String {
        let mut s = String::new();
        for node in &self.nodes {
            let chiplet = node.chiplet.map_or_else(|| "-".to_string(), |c| c.to_string());
            let _ = writeln!(
                s,
                "{:>4} {:<8} ({}, {})  chiplet {}",
                node.id,
                node.role.to_string(),
                node.x,
                node.y,
                chiplet
            );
        }
        let count = |role| self.nodes.iter().filter(|n| n.role == role).count();
        let (ordinary, tsv, mem_ctrl) = (
            count(NodeRole::Ordinary),
            count(NodeRole::Tsv),
            count(NodeRole::MemoryController),
        );
        let _ = writeln!(
            s,
            "\n{} ordinary, {} TSV, {} memory controller nodes",
            ordinary, tsv, mem_ctrl
        );
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placement::TsvPattern;

    fn snapshot(topology: Topology) -> NetworkSnapshot {
        let mut cache = IsolatedSiteCache::seeded(5);
        NetworkSnapshot::capture(
            Grid::new(8, 16),
            topology,
            GridShape::Square,
            &TsvLayout::uniform(TsvPattern::Bundle),
            &mut cache,
        )
        .unwrap()
    }

    #[test]
    fn test_capture_mesh() {
        let snap = snapshot(Topology::Mesh);
        assert_eq!(snap.nodes.len(), 128);
        assert_eq!(snap.edges.len(), 2 * 8 * 16 - 8 - 16);
        assert_eq!(snap.num_total_tsv, 40);
        assert!(snap.score.is_some());
        assert_eq!(
            snap.nodes.iter().filter(|n| n.role == NodeRole::Tsv).count(),
            40
        );
    }

    #[test]
    fn test_unscorable_snapshot_still_exports() {
        let snap = snapshot(Topology::CMesh);
        assert!(snap.edges.is_empty());
        assert!(snap.score.is_none());
    }

    #[test]
    fn test_dot_output() {
        let snap = snapshot(Topology::Mesh);
        let dot = snap.to_dot();
        assert!(dot.starts_with("graph \"mesh\" {"));
        assert!(dot.contains("  0 [pos=\"0,15!\", fillcolor=palegreen];"));
        assert!(dot.contains("  0 -- 1;"));
        assert!(dot.contains("  0 -- 8;"));
    }

    #[test]
    fn test_json_and_table() {
        let snap = snapshot(Topology::FTorus);
        let json = serde_json::to_string(&snap).unwrap();
        let recovered: NetworkSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(recovered.edges, snap.edges);
        assert!(snap.node_table().contains("40 TSV, 16 memory controller"));
    }
}
