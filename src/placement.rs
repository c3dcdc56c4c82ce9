//! TSV Placement Module
//!
//! Generates the through-silicon-via landing sites for each of the four
//! chiplets from a per-chiplet pattern, and derives the traffic model that
//! depends on how many TSVs the layout produced.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::error::{NoiError, Result};
use crate::grid::{Coord, Grid};

/// Number of chiplets on the interposer
pub const NUM_CHIPLETS: usize = 4;

/// Chiplet base offsets (linear ids) for the square floorplan
const SQUARE_CHIPLET_OFFSETS: [usize; NUM_CHIPLETS] = [8, 12, 64, 68];
/// Chiplet base offsets (linear ids) for the stacked floorplan
const NON_SQUARE_CHIPLET_OFFSETS: [usize; NUM_CHIPLETS] = [8, 32, 72, 96];

/// Fraction of TSV traffic that goes to other chiplets
const CORE_TO_CORE_SHARE: f64 = 0.3;
/// Fraction of TSV traffic that goes to memory
const CORE_TO_MEM_CTRL_SHARE: f64 = 0.7;

/// Chiplet floorplan: 2x2 arrangement or a single column of four
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GridShape {
    Square,
    NonSquare,
}

impl GridShape {
    pub fn from_flag(is_square: bool) -> Self {
        if is_square {
            GridShape::Square
        } else {
            GridShape::NonSquare
        }
    }

    pub fn is_square(&self) -> bool {
        matches!(self, GridShape::Square)
    }

    fn chiplet_offsets(&self) -> [usize; NUM_CHIPLETS] {
        match self {
            GridShape::Square => SQUARE_CHIPLET_OFFSETS,
            GridShape::NonSquare => NON_SQUARE_CHIPLET_OFFSETS,
        }
    }

    /// (largest displacement, sites per chiplet) for the isolated pattern
    fn isolated_params(&self) -> (usize, usize) {
        match self {
            GridShape::Square => (28, 7),
            GridShape::NonSquare => (24, 6),
        }
    }
}

impl fmt::Display for GridShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridShape::Square => write!(f, "Grid"),
            GridShape::NonSquare => write!(f, "List"),
        }
    }
}

/// Per-chiplet TSV pattern
///
/// Unrecognised names are kept as `Unknown` rather than rejected: they
/// produce no sites and clear the chiplet offset table for the whole layout.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TsvPattern {
    Border,
    Bundle,
    Shielded,
    Isolated,
    Unknown(String),
}

impl TsvPattern {
    pub fn name(&self) -> &str {
        match self {
            TsvPattern::Border => "border",
            TsvPattern::Bundle => "bundle",
            TsvPattern::Shielded => "shielded",
            TsvPattern::Isolated => "isolated",
            TsvPattern::Unknown(name) => name,
        }
    }

    /// Fixed displacement list, `None` for patterns that are not literal tables
    fn fixed_displacements(&self, shape: GridShape) -> Option<Vec<usize>> {
        let square = shape.is_square();
        let disp = match self {
            TsvPattern::Border if square => vec![
                0, 1, 2, 3, 8, 11, 16, 19, 24, 27, 32, 35, 40, 43, 48, 49, 50, 51,
            ],
            TsvPattern::Border => (0..=8).chain(15..=23).collect(),
            TsvPattern::Bundle if square => vec![9, 10, 17, 18, 25, 26, 33, 34, 41, 42],
            TsvPattern::Bundle => (9..=14).collect(),
            TsvPattern::Shielded if square => vec![9, 10, 25, 26, 41, 42],
            TsvPattern::Shielded => vec![9, 10, 13, 14],
            TsvPattern::Isolated | TsvPattern::Unknown(_) => return None,
        };
        Some(disp)
    }
}

impl From<&str> for TsvPattern {
    fn from(name: &str) -> Self {
        match name {
            "border" => TsvPattern::Border,
            "bundle" => TsvPattern::Bundle,
            "shielded" => TsvPattern::Shielded,
            "isolated" => TsvPattern::Isolated,
            other => TsvPattern::Unknown(other.to_string()),
        }
    }
}

impl From<String> for TsvPattern {
    fn from(name: String) -> Self {
        TsvPattern::from(name.as_str())
    }
}

impl From<TsvPattern> for String {
    fn from(pattern: TsvPattern) -> Self {
        pattern.name().to_string()
    }
}

impl fmt::Display for TsvPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One pattern per chiplet
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TsvLayout(pub [TsvPattern; NUM_CHIPLETS]);

impl TsvLayout {
    pub fn uniform(pattern: TsvPattern) -> Self {
        TsvLayout([pattern.clone(), pattern.clone(), pattern.clone(), pattern])
    }

    /// Full cartesian product patterns^4, chiplet 0 varying slowest
    pub fn enumerate(patterns: &[TsvPattern]) -> Vec<TsvLayout> {
        let mut layouts = Vec::with_capacity(patterns.len().pow(NUM_CHIPLETS as u32));

        for p0 in patterns {
            for p1 in patterns {
                for p2 in patterns {
                    for p3 in patterns {
                        layouts.push(TsvLayout([
                            p0.clone(),
                            p1.clone(),
                            p2.clone(),
                            p3.clone(),
                        ]));
                    }
                }
            }
        }

        layouts
    }

    pub fn patterns(&self) -> &[TsvPattern; NUM_CHIPLETS] {
        &self.0
    }
}

impl fmt::Display for TsvLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = &self.0;
        write!(f, "({}, {}, {}, {})", a, b, c, d)
    }
}

/// Memoised random sites for the isolated pattern, one list per shape
///
/// Once a shape has been sampled every later lookup for that shape returns
/// the same list until `reset` is called.
#[derive(Debug, Clone)]
pub struct IsolatedSiteCache {
    rng: StdRng,
    square: Option<Vec<usize>>,
    non_square: Option<Vec<usize>>,
}

impl Default for IsolatedSiteCache {
    fn default() -> Self {
        Self::new()
    }
}

impl IsolatedSiteCache {
    /// Cache seeded from OS entropy
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Cache with a reproducible random stream
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        IsolatedSiteCache {
            rng,
            square: None,
            non_square: None,
        }
    }

    fn slot(&self, shape: GridShape) -> &Option<Vec<usize>> {
        match shape {
            GridShape::Square => &self.square,
            GridShape::NonSquare => &self.non_square,
        }
    }

    fn slot_mut(&mut self, shape: GridShape) -> &mut Option<Vec<usize>> {
        match shape {
            GridShape::Square => &mut self.square,
            GridShape::NonSquare => &mut self.non_square,
        }
    }

    /// Cached displacements for a shape, if already sampled
    pub fn get(&self, shape: GridShape) -> Option<&[usize]> {
        self.slot(shape).as_deref()
    }

    /// Install a caller-chosen displacement list for a shape
    pub fn insert(&mut self, shape: GridShape, displacements: Vec<usize>) {
        *self.slot_mut(shape) = Some(displacements);
    }

    /// Forget all memoised lists; the next lookup resamples
    pub fn reset(&mut self) {
        self.square = None;
        self.non_square = None;
    }

    /// Sample the list for a shape now if it is not cached yet
    pub fn warm(&mut self, shape: GridShape) {
        self.displacements(shape);
    }

    /// Cached list for the shape, sampling distinct displacements on a miss
    pub fn displacements(&mut self, shape: GridShape) -> Vec<usize> {
        if let Some(cached) = self.get(shape) {
            return cached.to_vec();
        }

        let (max_disp, count) = shape.isolated_params();
        let mut disp = Vec::with_capacity(count);
        while disp.len() < count {
            let candidate = self.rng.gen_range(0..=max_disp);
            if !disp.contains(&candidate) {
                disp.push(candidate);
            }
        }

        log::debug!("Sampled isolated TSV displacements for {}: {:?}", shape, disp);
        self.insert(shape, disp.clone());
        disp
    }
}

/// Traffic split used by the hop-count model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrafficModel {
    pub prob_core_to_core: f64,
    pub prob_core_to_mem_ctrl: f64,
    pub prob_mem_ctrl_to_core: f64,
}

impl TrafficModel {
    /// Probabilities from TSV and memory-controller counts; `None` if either is zero
    pub fn new(num_total_tsv: usize, num_mem_ctrl: usize) -> Option<Self> {
        if num_total_tsv == 0 || num_mem_ctrl == 0 {
            return None;
        }
        Some(TrafficModel {
            prob_core_to_core: CORE_TO_CORE_SHARE / num_total_tsv as f64,
            prob_core_to_mem_ctrl: CORE_TO_MEM_CTRL_SHARE / num_mem_ctrl as f64,
            prob_mem_ctrl_to_core: 1.0 / num_total_tsv as f64,
        })
    }
}

/// Result of placing one layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TsvPlacement {
    pub shape: GridShape,
    pub layout: TsvLayout,
    /// TSV landing coordinates across all chiplets
    pub sites: BTreeSet<Coord>,
    /// Displacement-list length per chiplet
    pub per_chiplet: [usize; NUM_CHIPLETS],
    pub num_total_tsv: usize,
    pub traffic: TrafficModel,
}

impl TsvPlacement {
    pub fn contains(&self, coord: Coord) -> bool {
        self.sites.contains(&coord)
    }
}

/// Resolve TSV sites for a layout on the given floorplan
pub fn place(
    grid: &Grid,
    layout: &TsvLayout,
    shape: GridShape,
    cache: &mut IsolatedSiteCache,
) -> Result<TsvPlacement> {
    let mut offsets: Vec<usize> = shape.chiplet_offsets().to_vec();
    let mut displacements: Vec<Vec<usize>> = Vec::with_capacity(NUM_CHIPLETS);

    for pattern in layout.patterns() {
        let disp = match pattern {
            TsvPattern::Isolated => cache.displacements(shape),
            TsvPattern::Unknown(name) => {
                // The offset table is shared by every chiplet of this layout
                log::debug!("Unknown TSV pattern '{}': clearing chiplet offsets", name);
                offsets.clear();
                Vec::new()
            }
            fixed => fixed.fixed_displacements(shape).unwrap_or_default(),
        };
        displacements.push(disp);
    }

    let mut sites = BTreeSet::new();
    for (base, disp) in offsets.iter().zip(&displacements) {
        for d in disp {
            let coord = grid.to_2d(base + d);
            if !grid.contains(coord) {
                log::warn!("TSV site {:?} lies outside the {}x{} grid", coord, grid.x_dim, grid.y_dim);
            }
            sites.insert(coord);
        }
    }

    let mut per_chiplet = [0; NUM_CHIPLETS];
    for (count, disp) in per_chiplet.iter_mut().zip(&displacements) {
        *count = disp.len();
    }
    let num_total_tsv: usize = per_chiplet.iter().sum();

    let traffic =
        TrafficModel::new(num_total_tsv, grid.num_mem_ctrl()).ok_or_else(|| NoiError::InvalidLayout {
            layout: layout.to_string(),
            reason: format!(
                "{} TSVs and {} memory controllers leave the traffic model undefined",
                num_total_tsv,
                grid.num_mem_ctrl()
            ),
        })?;

    Ok(TsvPlacement {
        shape,
        layout: layout.clone(),
        sites,
        per_chiplet,
        num_total_tsv,
        traffic,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> Grid {
        Grid::new(8, 16)
    }

    #[test]
    fn test_border_square_counts() {
        let mut cache = IsolatedSiteCache::seeded(1);
        let layout = TsvLayout::uniform(TsvPattern::Border);
        let placement = place(&grid(), &layout, GridShape::Square, &mut cache).unwrap();

        assert_eq!(placement.per_chiplet, [18; 4]);
        assert_eq!(placement.num_total_tsv, 72);
        assert_eq!(placement.sites.len(), 72);
        // Chiplet 0 starts at id 8 = (0, 1)
        assert!(placement.contains((0, 1)));
        assert!((placement.traffic.prob_core_to_core - 0.3 / 72.0).abs() < 1e-12);
        assert!((placement.traffic.prob_core_to_mem_ctrl - 0.7 / 16.0).abs() < 1e-12);
        assert!((placement.traffic.prob_mem_ctrl_to_core - 1.0 / 72.0).abs() < 1e-12);
    }

    #[test]
    fn test_fixed_pattern_sizes() {
        let cases = [
            (TsvPattern::Border, GridShape::NonSquare, 18),
            (TsvPattern::Bundle, GridShape::Square, 10),
            (TsvPattern::Bundle, GridShape::NonSquare, 6),
            (TsvPattern::Shielded, GridShape::Square, 6),
            (TsvPattern::Shielded, GridShape::NonSquare, 4),
        ];
        for (pattern, shape, expected) in cases {
            let disp = pattern.fixed_displacements(shape).unwrap();
            assert_eq!(disp.len(), expected, "{} {}", pattern, shape);
        }
    }

    #[test]
    fn test_fixed_patterns_deterministic() {
        let layout = TsvLayout([
            TsvPattern::Border,
            TsvPattern::Bundle,
            TsvPattern::Shielded,
            TsvPattern::Bundle,
        ]);
        for shape in [GridShape::Square, GridShape::NonSquare] {
            let a = place(&grid(), &layout, shape, &mut IsolatedSiteCache::seeded(1)).unwrap();
            let b = place(&grid(), &layout, shape, &mut IsolatedSiteCache::seeded(2)).unwrap();
            assert_eq!(a.sites, b.sites);
            assert_eq!(a.num_total_tsv, b.num_total_tsv);
        }
    }

    #[test]
    fn test_isolated_memoized_per_shape() {
        let mut cache = IsolatedSiteCache::new();
        let layout = TsvLayout::uniform(TsvPattern::Isolated);

        let first = place(&grid(), &layout, GridShape::Square, &mut cache).unwrap();
        let second = place(&grid(), &layout, GridShape::Square, &mut cache).unwrap();
        assert_eq!(first.sites, second.sites);
        assert_eq!(first.num_total_tsv, 28);

        let list = place(&grid(), &layout, GridShape::NonSquare, &mut cache).unwrap();
        assert_eq!(list.num_total_tsv, 24);

        let square = cache.get(GridShape::Square).unwrap();
        assert_eq!(square.len(), 7);
        assert!(square.iter().all(|&d| d <= 28));
        let distinct: BTreeSet<_> = square.iter().collect();
        assert_eq!(distinct.len(), 7);
    }

    #[test]
    fn test_isolated_reset_and_insert() {
        let mut cache = IsolatedSiteCache::seeded(7);
        cache.insert(GridShape::NonSquare, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(cache.displacements(GridShape::NonSquare), vec![0, 1, 2, 3, 4, 5]);

        cache.reset();
        assert!(cache.get(GridShape::NonSquare).is_none());
        cache.warm(GridShape::NonSquare);
        assert_eq!(cache.get(GridShape::NonSquare).unwrap().len(), 6);
    }

    #[test]
    fn test_seeded_caches_agree() {
        let mut a = IsolatedSiteCache::seeded(42);
        let mut b = IsolatedSiteCache::seeded(42);
        assert_eq!(
            a.displacements(GridShape::Square),
            b.displacements(GridShape::Square)
        );
    }

    #[test]
    fn test_unknown_pattern_clears_offsets() {
        let mut cache = IsolatedSiteCache::seeded(1);
        let layout = TsvLayout([
            TsvPattern::Border,
            TsvPattern::Border,
            TsvPattern::from("diagonal"),
            TsvPattern::Border,
        ]);
        let placement = place(&grid(), &layout, GridShape::Square, &mut cache).unwrap();

        assert!(placement.sites.is_empty());
        assert_eq!(placement.per_chiplet, [18, 18, 0, 18]);
        assert_eq!(placement.num_total_tsv, 54);
    }

    #[test]
    fn test_all_unknown_is_invalid_layout() {
        let mut cache = IsolatedSiteCache::seeded(1);
        let layout = TsvLayout::uniform(TsvPattern::from("none"));
        let err = place(&grid(), &layout, GridShape::Square, &mut cache).unwrap_err();
        assert!(matches!(err, NoiError::InvalidLayout { .. }));
    }

    #[test]
    fn test_layout_enumeration() {
        let patterns = vec![TsvPattern::Border, TsvPattern::Bundle, TsvPattern::Isolated];
        let layouts = TsvLayout::enumerate(&patterns);
        assert_eq!(layouts.len(), 81);
        assert_eq!(layouts[0], TsvLayout::uniform(TsvPattern::Border));
        assert_eq!(layouts[1].0[3], TsvPattern::Bundle);
        assert_eq!(layouts[27].0[0], TsvPattern::Bundle);
    }

    #[test]
    fn test_pattern_names() {
        assert_eq!(TsvPattern::from("shielded"), TsvPattern::Shielded);
        assert_eq!(TsvPattern::from("mystery").to_string(), "mystery");
        let json = serde_json::to_string(&TsvPattern::Isolated).unwrap();
        assert_eq!(json, "\"isolated\"");
        assert_eq!(
            TsvLayout::uniform(TsvPattern::Bundle).to_string(),
            "(bundle, bundle, bundle, bundle)"
        );
    }
}
