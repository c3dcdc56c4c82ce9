//! Sweep Configuration Module
//!
//! Defines the parameters of a design-space sweep: which topology families
//! to evaluate, the node grid, the chiplet floorplans and the TSV patterns
//! whose 4-chiplet combinations are enumerated.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{NoiError, Result};
use crate::grid::Grid;
use crate::placement::{GridShape, TsvPattern};
use crate::topology::Topology;

/// Complete sweep configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    pub topology: TopologyConfig,
    pub tsv: TsvConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologyConfig {
    /// Topology family names, evaluated in order
    pub types: Vec<String>,
    /// Nodes per row
    pub num_x_dim_nodes: usize,
    /// Nodes per column
    pub num_y_dim_nodes: usize,
    /// Floorplans to sweep (true = 2x2 chiplets, false = stacked)
    pub is_square: Vec<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TsvConfig {
    /// Pattern vocabulary; every 4-chiplet combination is evaluated
    pub patterns: Vec<String>,
    /// Seed for the isolated-pattern sampler (entropy when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        SweepConfig {
            topology: TopologyConfig {
                types: ["mesh", "dbutterfly", "ftorus", "bdonut"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                num_x_dim_nodes: 8,
                num_y_dim_nodes: 16,
                is_square: vec![true, false],
            },
            tsv: TsvConfig {
                patterns: ["border", "bundle", "shielded", "isolated"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                seed: None,
            },
        }
    }
}

impl SweepConfig {
    /// Small configuration for quick runs and tests
    pub fn small() -> Self {
        let mut config = Self::default();
        config.topology.is_square = vec![true];
        config.tsv.patterns = vec!["border".to_string(), "bundle".to_string()];
        config.tsv.seed = Some(0);
        config
    }

    pub fn grid(&self) -> Grid {
        Grid::new(self.topology.num_x_dim_nodes, self.topology.num_y_dim_nodes)
    }

    /// Parsed topology families; an unknown name fails the whole config
    pub fn topologies(&self) -> Result<Vec<Topology>> {
        self.topology.types.iter().map(|name| name.parse()).collect()
    }

    pub fn shapes(&self) -> Vec<GridShape> {
        self.topology
            .is_square
            .iter()
            .map(|&flag| GridShape::from_flag(flag))
            .collect()
    }

    /// Pattern vocabulary; unrecognised names are kept as `Unknown`
    pub fn patterns(&self) -> Vec<TsvPattern> {
        self.tsv.patterns.iter().map(|p| TsvPattern::from(p.as_str())).collect()
    }

    /// Number of (shape, layout) combinations per topology
    pub fn combinations_per_topology(&self) -> usize {
        self.topology.is_square.len() * self.tsv.patterns.len().pow(4)
    }

    pub fn validate(&self) -> Result<()> {
        self.topologies()?;
        if self.topology.types.is_empty() {
            return Err(NoiError::invalid_config("no topology types given"));
        }
        if self.topology.num_x_dim_nodes == 0 || self.topology.num_y_dim_nodes == 0 {
            return Err(NoiError::invalid_config(format!(
                "grid {}x{} has no nodes",
                self.topology.num_x_dim_nodes, self.topology.num_y_dim_nodes
            )));
        }
        if self.topology.is_square.is_empty() {
            return Err(NoiError::invalid_config("no grid shapes given"));
        }
        if self.tsv.patterns.is_empty() {
            return Err(NoiError::invalid_config("no TSV patterns given"));
        }
        Ok(())
    }

    /// Save configuration to TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let toml_str = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_str).map_err(|e| NoiError::io(path, e))
    }

    /// Load configuration from TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let toml_str = std::fs::read_to_string(path).map_err(|e| NoiError::io(path, e))?;
        let config: SweepConfig = toml::from_str(&toml_str)?;
        config.validate()?;
        Ok(config)
    }
}
