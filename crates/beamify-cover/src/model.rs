use beamify_field::{Axis, Coord};
use hashbrown::HashMap;

use crate::coeffs::{BaseCoefficients, Bias};
use crate::configuration::{CONFIGURATIONS, Configuration, split_variable, variable_index};

// Constant per-axis nudge so out-of-grain ties resolve the same way every run.
const AXIS_TIE_BREAK: [f64; 3] = [1e-4, 2e-4, 3e-4];
const BIAS_SCALE: f64 = 1000.0;

/// Exact-cover program for one blob.
///
/// Rows are cells, columns are `10 * cell + configuration`. Every legal column has a `1` in the
/// row of each cell its run covers; the program asks for a 0/1 column selection hitting every
/// row exactly once at minimum cost.
#[derive(Clone, Debug)]
pub struct CoverModel {
    pub cells: Vec<Coord>,
    /// Upper bound per column: legal placements may be selected, illegal ones are pinned to 0.
    pub enabled: Vec<bool>,
    pub costs: Vec<f64>,
    /// Sparse constraint matrix as (row, column, value) triples.
    pub triplets: Vec<(usize, usize, f64)>,
}

impl CoverModel {
    /// Builds the program for `cells` inside a field of `extents`.
    ///
    /// With `singles_only` every run is disabled and the only legal placement is the unit block.
    pub fn build(
        cells: &[Coord],
        coeffs: &BaseCoefficients,
        bias: Bias,
        extents: (usize, usize, usize),
        singles_only: bool,
    ) -> CoverModel {
        let n = cells.len();
        let index: HashMap<Coord, usize> = cells.iter().enumerate().map(|(i, c)| (*c, i)).collect();
        let mut enabled = vec![false; n * CONFIGURATIONS];
        let mut triplets = Vec::with_capacity(n * 4);

        for (i, &cell) in cells.iter().enumerate() {
            enabled[variable_index(i, Configuration::SINGLE)] = true;
            triplets.push((i, variable_index(i, Configuration::SINGLE), 1.0));

            if singles_only {
                continue;
            }

            for axis in Axis::ALL {
                // Runs anchored here, extended while the chain of successors holds.
                for len in 2..=4 {
                    if !index.contains_key(&cell.forward(axis, len - 1)) {
                        break;
                    }
                    if let Some(cfg) = Configuration::run(axis, len) {
                        enabled[variable_index(i, cfg)] = true;
                        triplets.push((i, variable_index(i, cfg), 1.0));
                    }
                }
                // Runs anchored at a predecessor that would pass through this cell.
                for back in 1..=3 {
                    let Some(j) = cell.back(axis, back).and_then(|p| index.get(&p)) else {
                        continue;
                    };
                    for len in (back + 1)..=4 {
                        if let Some(cfg) = Configuration::run(axis, len) {
                            triplets.push((i, variable_index(*j, cfg), 1.0));
                        }
                    }
                }
            }
        }

        let ext = [extents.0, extents.1, extents.2];
        let mut costs = Vec::with_capacity(n * CONFIGURATIONS);
        for cell in cells {
            let corr = bias.correction([cell.x, cell.y, cell.z], ext);
            for cfg in Configuration::all() {
                let cost = match cfg.axis() {
                    None => coeffs.get(cfg),
                    Some(axis) => {
                        let a = axis.index();
                        coeffs.get(cfg) + corr[a] / BIAS_SCALE + AXIS_TIE_BREAK[a]
                    }
                };
                costs.push(cost);
            }
        }

        CoverModel {
            cells: cells.to_vec(),
            enabled,
            costs,
            triplets,
        }
    }

    #[inline]
    pub fn num_rows(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn num_vars(&self) -> usize {
        self.enabled.len()
    }

    pub fn legal_vars(&self) -> impl Iterator<Item = usize> + '_ {
        self.enabled
            .iter()
            .enumerate()
            .filter_map(|(v, on)| on.then_some(v))
    }

    /// Rows hit by each legal column (empty for illegal columns).
    pub fn column_rows(&self) -> Vec<Vec<usize>> {
        let mut cols = vec![Vec::new(); self.num_vars()];
        for &(row, col, val) in &self.triplets {
            if val != 0.0 && self.enabled[col] {
                cols[col].push(row);
            }
        }
        cols
    }

    /// Anchor cell and configuration for a column.
    #[inline]
    pub fn decode(&self, var: usize) -> (Coord, Configuration) {
        let (cell, cfg) = split_variable(var);
        (self.cells[cell], cfg)
    }

    /// Whether `selected` covers every row exactly once using only legal columns.
    pub fn is_exact_cover(&self, selected: &[usize]) -> bool {
        let cols = self.column_rows();
        let mut hits = vec![0u32; self.num_rows()];
        for &v in selected {
            if v >= self.num_vars() || !self.enabled[v] {
                return false;
            }
            for &r in &cols[v] {
                hits[r] += 1;
            }
        }
        hits.iter().all(|h| *h == 1)
    }

    pub fn objective(&self, selected: &[usize]) -> f64 {
        selected.iter().map(|v| self.costs[*v]).sum()
    }
}
