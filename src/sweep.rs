//! Design-Space Sweep Driver
//!
//! Enumerates every (topology, floorplan, TSV layout) combination, runs
//! placement -> build -> classify -> evaluate from scratch for each one, and
//! summarises the resulting hop counts per topology.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::classify::{classify, NodeLabel};
use crate::config::SweepConfig;
use crate::error::Result;
use crate::evaluate::{evaluate, HopCountReport};
use crate::grid::Grid;
use crate::placement::{place, GridShape, IsolatedSiteCache, TsvLayout, TsvPattern, TsvPlacement};
use crate::topology::{Interconnect, Topology};

/// Everything built for one combination before scoring
#[derive(Debug, Clone)]
pub struct Combination {
    pub topology: Topology,
    pub placement: TsvPlacement,
    pub interconnect: Interconnect,
    pub labels: Vec<NodeLabel>,
}

impl Combination {
    /// Place TSVs, build the graph and label nodes
    pub fn prepare(
        grid: Grid,
        topology: Topology,
        shape: GridShape,
        layout: &TsvLayout,
        cache: &mut IsolatedSiteCache,
    ) -> Result<Self> {
        let placement = place(&grid, layout, shape, cache)?;
        let interconnect = Interconnect::build(topology, grid);
        let labels = classify(&grid, &placement.sites, shape);
        Ok(Combination {
            topology,
            placement,
            interconnect,
            labels,
        })
    }

    pub fn evaluate(&self) -> Result<HopCountReport> {
        evaluate(
            &self.interconnect,
            &self.labels,
            &self.placement.traffic,
            self.placement.num_total_tsv,
        )
    }
}

/// One evaluated combination
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleRecord {
    pub shape: GridShape,
    pub layout: TsvLayout,
    /// Average hop count, `None` when the combination could not be scored
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

/// Samples and statistics for one topology
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologySummary {
    pub topology: Topology,
    pub samples: Vec<SampleRecord>,
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
    pub failures: usize,
}

impl TopologySummary {
    fn from_samples(topology: Topology, samples: Vec<SampleRecord>) -> Self {
        let scores: Vec<f64> = samples.iter().filter_map(|s| s.score).collect();
        let failures = samples.len() - scores.len();
        let (mean, std_dev) = match mean_std(&scores) {
            Some((m, s)) => (Some(m), Some(s)),
            None => (None, None),
        };
        TopologySummary {
            topology,
            samples,
            mean,
            std_dev,
            failures,
        }
    }

    pub fn scores(&self) -> Vec<f64> {
        self.samples.iter().filter_map(|s| s.score).collect()
    }
}

/// Mean and population standard deviation; `None` for an empty sample
pub fn mean_std(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some((mean, variance.sqrt()))
}

/// Full sweep result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepReport {
    pub grid: Grid,
    pub topologies: Vec<TopologySummary>,
}

impl SweepReport {
    /// Topology with the lowest mean hop count
    pub fn best(&self) -> Option<&TopologySummary> {
        self.topologies
            .iter()
            .filter(|t| t.mean.is_some())
            .min_by(|a, b| a.mean.partial_cmp(&b.mean).unwrap_or(std::cmp::Ordering::Equal))
    }

    pub fn get(&self, topology: Topology) -> Option<&TopologySummary> {
        self.topologies.iter().find(|t| t.topology == topology)
    }

    pub fn report(&self) -> String {
        let mut s = String::new();

        s.push_str("╔══════════════════════════════════════════════════════════════╗\n");
        s.push_str("║           NoI Topology Hop-Count Sweep                       ║\n");
        s.push_str("╚══════════════════════════════════════════════════════════════╝\n\n");

        s.push_str(&format!(
            "Grid: {}x{} ({} nodes, {} memory controllers)\n\n",
            self.grid.x_dim,
            self.grid.y_dim,
            self.grid.num_total_nodes(),
            self.grid.num_mem_ctrl()
        ));

        s.push_str(&format!(
            "{:<12} {:>10} {:>10} {:>10} {:>10} {:>10}\n",
            "Topology", "Samples", "Failed", "Mean", "StdDev", "Min"
        ));
        s.push_str("──────────────────────────────────────────────────────────────────\n");

        for t in &self.topologies {
            let min = t.scores().into_iter().reduce(f64::min);
            s.push_str(&format!(
                "{:<12} {:>10} {:>10} {:>10} {:>10} {:>10}\n",
                t.topology.name(),
                t.samples.len(),
                t.failures,
                fmt_opt(t.mean),
                fmt_opt(t.std_dev),
                fmt_opt(min),
            ));
        }

        if let Some(best) = self.best() {
            s.push_str(&format!(
                "\nLowest mean hop count: {} ({})\n",
                best.topology,
                fmt_opt(best.mean)
            ));
        }

        s
    }
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.4}", v))
}

/// Sweep engine over a validated configuration
pub struct SweepDriver {
    pub grid: Grid,
    pub topologies: Vec<Topology>,
    pub shapes: Vec<GridShape>,
    pub layouts: Vec<TsvLayout>,
    cache: IsolatedSiteCache,
}

impl SweepDriver {
    /// Driver with an explicit isolated-site cache; unknown topologies fail here
    pub fn new(config: &SweepConfig, cache: IsolatedSiteCache) -> Result<Self> {
        config.validate()?;
        Ok(SweepDriver {
            grid: config.grid(),
            topologies: config.topologies()?,
            shapes: config.shapes(),
            layouts: TsvLayout::enumerate(&config.patterns()),
            cache,
        })
    }

    /// Driver whose cache is seeded from the configuration
    pub fn from_config(config: &SweepConfig) -> Result<Self> {
        let cache = match config.tsv.seed {
            Some(seed) => IsolatedSiteCache::seeded(seed),
            None => IsolatedSiteCache::new(),
        };
        Self::new(config, cache)
    }

    pub fn cache(&self) -> &IsolatedSiteCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut IsolatedSiteCache {
        &mut self.cache
    }

    pub fn total_combinations(&self) -> usize {
        self.topologies.len() * self.shapes.len() * self.layouts.len()
    }

    fn jobs(&self) -> Vec<(GridShape, TsvLayout)> {
        self.shapes
            .iter()
            .flat_map(|&shape| self.layouts.iter().map(move |l| (shape, l.clone())))
            .collect()
    }

    fn sample(
        grid: Grid,
        topology: Topology,
        shape: GridShape,
        layout: TsvLayout,
        cache: &mut IsolatedSiteCache,
    ) -> SampleRecord {
        let result =
            Combination::prepare(grid, topology, shape, &layout, cache).and_then(|c| c.evaluate());

        match result {
            Ok(report) => {
                log::debug!("{} {} {}: {:.4}", topology, shape, layout, report.average);
                SampleRecord {
                    shape,
                    layout,
                    score: Some(report.average),
                    failure: None,
                }
            }
            Err(e) => {
                log::warn!("{} {} {}: {}", topology, shape, layout, e);
                SampleRecord {
                    shape,
                    layout,
                    score: None,
                    failure: Some(e.to_string()),
                }
            }
        }
    }

    fn summarise(topology: Topology, samples: Vec<SampleRecord>) -> TopologySummary {
        let summary = TopologySummary::from_samples(topology, samples);
        log::info!(
            "{}: mean {} std dev {} ({} failed)",
            topology,
            fmt_opt(summary.mean),
            fmt_opt(summary.std_dev),
            summary.failures
        );
        summary
    }

    /// Evaluate every combination in order on the calling thread
    pub fn run(&mut self) -> SweepReport {
        let jobs = self.jobs();
        let mut topologies = Vec::with_capacity(self.topologies.len());

        for &topology in &self.topologies {
            let samples = jobs
                .iter()
                .map(|(shape, layout)| {
                    Self::sample(self.grid, topology, *shape, layout.clone(), &mut self.cache)
                })
                .collect();
            topologies.push(Self::summarise(topology, samples));
        }

        SweepReport {
            grid: self.grid,
            topologies,
        }
    }

    /// Evaluate combinations in parallel
    ///
    /// The isolated-site cache is populated for every swept shape first, in
    /// the same order `run` would populate it, and each worker gets a copy,
    /// so both entry points produce the same samples.
    pub fn run_parallel(&mut self) -> SweepReport {
        let uses_isolated = self
            .layouts
            .iter()
            .any(|l| l.patterns().contains(&TsvPattern::Isolated));
        if uses_isolated {
            for &shape in &self.shapes {
                self.cache.warm(shape);
            }
        }

        let jobs = self.jobs();
        let grid = self.grid;
        let cache = &self.cache;

        let topologies = self
            .topologies
            .iter()
            .map(|&topology| {
                let samples = jobs
                    .par_iter()
                    .map(|(shape, layout)| {
                        let mut local = cache.clone();
                        Self::sample(grid, topology, *shape, layout.clone(), &mut local)
                    })
                    .collect();
                Self::summarise(topology, samples)
            })
            .collect();

        SweepReport { grid, topologies }
    }
}
