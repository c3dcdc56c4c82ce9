//! Network-on-Interposer Hop-Count Explorer
//!
//! Ranks candidate interposer topologies for a four-chiplet processor by a
//! traffic-weighted average hop count.
//!
//! # Overview
//!
//! For a fixed X×Y node grid the explorer:
//! - places TSV landing sites on each chiplet from a per-chiplet pattern
//!   (`border`, `bundle`, `shielded`, or randomly `isolated`)
//! - builds the interconnect for a topology family (mesh, folded butterfly,
//!   folded torus, bidirectional donut)
//! - labels each node as ordinary, TSV or memory controller
//! - scores the result with shortest-path hop counts weighted by a simple
//!   core/memory traffic model
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use noi_hop_sim::prelude::*;
//!
//! let config = SweepConfig::default();
//! let mut driver = SweepDriver::from_config(&config).unwrap();
//! let report = driver.run();
//! println!("{}", report.report());
//! ```
//!
//! # Single combination
//!
//! ```rust,no_run
//! use noi_hop_sim::prelude::*;
//!
//! let grid = Grid::new(8, 16);
//! let mut cache = IsolatedSiteCache::seeded(1);
//! let layout = TsvLayout::uniform(TsvPattern::Border);
//! let combination =
//!     Combination::prepare(grid, Topology::Mesh, GridShape::Square, &layout, &mut cache).unwrap();
//! let score = combination.evaluate().unwrap();
//! println!("average hop count: {:.3}", score.average);
//! ```

pub mod classify;
pub mod config;
pub mod error;
pub mod evaluate;
pub mod grid;
pub mod placement;
pub mod snapshot;
pub mod sweep;
pub mod topology;

/// Prelude - commonly used types
pub mod prelude {
    pub use crate::classify::{classify, NodeLabel, NodeRole};
    pub use crate::config::{SweepConfig, TopologyConfig, TsvConfig};
    pub use crate::error::{NoiError, Result};
    pub use crate::evaluate::{evaluate, HopCountReport};
    pub use crate::grid::{Coord, Grid};
    pub use crate::placement::{
        place, GridShape, IsolatedSiteCache, TrafficModel, TsvLayout, TsvPattern, TsvPlacement,
    };
    pub use crate::snapshot::{NetworkSnapshot, NodeSnapshot};
    pub use crate::sweep::{
        Combination, SampleRecord, SweepDriver, SweepReport, TopologySummary,
    };
    pub use crate::topology::{Interconnect, Topology};
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
