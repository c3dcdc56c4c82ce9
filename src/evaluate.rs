//! Hop-Count Evaluator
//!
//! Scores a classified interconnect with a traffic-weighted average hop
//! count. TSV nodes send a share of their traffic to TSVs on other chiplets
//! and the rest to memory controllers; memory controllers answer every TSV.

use serde::{Deserialize, Serialize};

use crate::classify::{NodeLabel, NodeRole};
use crate::error::{NoiError, Result};
use crate::placement::TrafficModel;
use crate::topology::Interconnect;

/// Outcome of scoring one (topology, layout) combination
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HopCountReport {
    /// Sum of per-node averages over (TSV count + memory controller count)
    pub average: f64,
    /// Weighted hop count contributed by each node, indexed by node id
    pub per_node: Vec<f64>,
    pub num_total_tsv: usize,
    pub num_mem_ctrl: usize,
}

/// Weighted hop count originating at one node
fn node_hop_count(
    net: &Interconnect,
    labels: &[NodeLabel],
    traffic: &TrafficModel,
    src: usize,
) -> Result<f64> {
    let src_label = labels[src];
    if src_label.role == NodeRole::Ordinary {
        return Ok(0.0);
    }

    let dist = net.distances_from(src);
    let mut total = 0.0;

    for (dst, label) in labels.iter().enumerate() {
        let weight = match (src_label.role, label.role) {
            (NodeRole::Tsv, NodeRole::Tsv) if src_label.chiplet != label.chiplet => {
                traffic.prob_core_to_core
            }
            (NodeRole::Tsv, NodeRole::MemoryController) => traffic.prob_core_to_mem_ctrl,
            (NodeRole::MemoryController, NodeRole::Tsv) => traffic.prob_mem_ctrl_to_core,
            _ => continue,
        };
        let hops = dist[dst].ok_or(NoiError::NoPath { src, dst })?;
        total += weight * hops as f64;
    }

    Ok(total)
}

/// Average hop count over every TSV and memory-controller node
///
/// Fails with `NoPath` as soon as a pair that exchanges traffic is
/// disconnected; a disconnected pair never counts as zero hops.
pub fn evaluate(
    net: &Interconnect,
    labels: &[NodeLabel],
    traffic: &TrafficModel,
    num_total_tsv: usize,
) -> Result<HopCountReport> {
    let num_mem_ctrl = net.grid.num_mem_ctrl();

    let per_node = (0..labels.len())
        .map(|src| node_hop_count(net, labels, traffic, src))
        .collect::<Result<Vec<f64>>>()?;

    let average = per_node.iter().sum::<f64>() / (num_total_tsv + num_mem_ctrl) as f64;

    Ok(HopCountReport {
        average,
        per_node,
        num_total_tsv,
        num_mem_ctrl,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;
    use crate::grid::Grid;
    use crate::placement::{place, GridShape, IsolatedSiteCache, TsvLayout, TsvPattern};
    use crate::topology::Topology;
    use std::collections::BTreeSet;

    fn label(role: NodeRole, chiplet: Option<usize>) -> NodeLabel {
        NodeLabel { role, chiplet }
    }

    #[test]
    fn test_border_mesh_end_to_end() {
        let grid = Grid::new(8, 16);
        let mut cache = IsolatedSiteCache::seeded(0);
        let layout = TsvLayout::uniform(TsvPattern::Border);
        let placement = place(&grid, &layout, GridShape::Square, &mut cache).unwrap();
        let net = Interconnect::build(Topology::Mesh, grid);
        let labels = classify(&grid, &placement.sites, GridShape::Square);

        let report = evaluate(&net, &labels, &placement.traffic, placement.num_total_tsv).unwrap();

        assert_eq!(report.num_total_tsv, 72);
        assert_eq!(report.num_mem_ctrl, 16);
        assert!(report.average.is_finite());
        assert!(report.average > 0.0);
        for (id, l) in labels.iter().enumerate() {
            if l.role == NodeRole::Ordinary {
                assert_eq!(report.per_node[id], 0.0);
            }
        }
    }

    #[test]
    fn test_hand_computed_line() {
        // 1x4 column: MC - TSV(c0) - TSV(c1) - MC
        let grid = Grid::new(1, 4);
        let net = Interconnect::build(Topology::Mesh, grid);
        let labels = vec![
            label(NodeRole::MemoryController, None),
            label(NodeRole::Tsv, Some(0)),
            label(NodeRole::Tsv, Some(1)),
            label(NodeRole::MemoryController, None),
        ];
        let traffic = TrafficModel::new(2, grid.num_mem_ctrl()).unwrap();

        let report = evaluate(&net, &labels, &traffic, 2).unwrap();

        // TSV: 0.15 * 1 + 0.35 * (1 + 2) = 1.2 each
        assert!((report.per_node[1] - 1.2).abs() < 1e-12);
        assert!((report.per_node[2] - 1.2).abs() < 1e-12);
        // MC: 0.5 * (1 + 2) = 1.5 each
        assert!((report.per_node[0] - 1.5).abs() < 1e-12);
        assert!((report.average - (2.0 * 1.2 + 2.0 * 1.5) / 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_same_chiplet_tsv_pairs_are_free() {
        let grid = Grid::new(1, 4);
        let net = Interconnect::build(Topology::Mesh, grid);
        let labels = vec![
            label(NodeRole::MemoryController, None),
            label(NodeRole::Tsv, Some(0)),
            label(NodeRole::Tsv, Some(0)),
            label(NodeRole::MemoryController, None),
        ];
        let traffic = TrafficModel::new(2, grid.num_mem_ctrl()).unwrap();

        let report = evaluate(&net, &labels, &traffic, 2).unwrap();
        assert!((report.per_node[1] - 0.35 * 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_disconnected_pair_fails() {
        let grid = Grid::new(8, 16);
        let mut cache = IsolatedSiteCache::seeded(0);
        let layout = TsvLayout::uniform(TsvPattern::Shielded);
        let placement = place(&grid, &layout, GridShape::Square, &mut cache).unwrap();
        let net = Interconnect::build(Topology::CMesh, grid);
        let labels = classify(&grid, &placement.sites, GridShape::Square);

        let err = evaluate(&net, &labels, &placement.traffic, placement.num_total_tsv).unwrap_err();
        assert!(matches!(err, NoiError::NoPath { .. }));
    }

    #[test]
    fn test_ordinary_only_grid_scores_zero() {
        let grid = Grid::new(4, 4);
        let net = Interconnect::build(Topology::Mesh, grid);
        let mut labels = classify(&grid, &BTreeSet::new(), GridShape::Square);
        for l in labels.iter_mut() {
            l.role = NodeRole::Ordinary;
        }
        let traffic = TrafficModel::new(1, grid.num_mem_ctrl()).unwrap();

        let report = evaluate(&net, &labels, &traffic, 1).unwrap();
        assert_eq!(report.average, 0.0);
    }
}
