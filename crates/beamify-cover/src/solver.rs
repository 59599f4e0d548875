use std::time::{Duration, Instant};

use hashbrown::HashMap;

use crate::configuration::{Configuration, variable_index};
use crate::model::CoverModel;

/// Chosen columns of a solved [`CoverModel`].
#[derive(Clone, Debug, PartialEq)]
pub struct Assignment {
    pub selected: Vec<usize>,
    pub cost: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SolveOutcome {
    Solved(Assignment),
    /// The time budget ran out before optimality was proven.
    TimedOut,
    /// No exact cover exists. Cannot happen for models where every unit block is legal.
    Infeasible,
}

impl SolveOutcome {
    #[inline]
    pub fn is_solved(&self) -> bool {
        matches!(self, SolveOutcome::Solved(_))
    }
}

/// Solves 0/1 exact cover with a linear objective under a wall-clock budget.
///
/// Implementations must return instead of blocking past the budget, and must report failure
/// through [`SolveOutcome`] rather than panicking.
pub trait CoverSolver: Send + Sync {
    fn solve(&self, model: &CoverModel, budget: Duration) -> SolveOutcome;
}

const EPS: f64 = 1e-9;
const PIVOT_TOL: f64 = 1e-9;
const RATIO_TOL: f64 = 1e-12;
const INTEGRAL_TOL: f64 = 1e-7;
// Dense tableaux above this many entries fall back to per-cell shares.
const MAX_TABLEAU: usize = 1 << 22;
// Degenerate pivots in a row before switching to Bland's rule.
const STALL_LIMIT: usize = 64;

/// Exact branch-and-bound over the LP relaxation.
///
/// Independent components of the constraint graph are solved separately. Each component first
/// goes through a primal simplex on its LP relaxation, starting from the all-unit-blocks basis.
/// A 0/1 optimal vertex is returned directly. Otherwise the simplex row prices bound a depth-first
/// search that visits cells in lexicographic order and branches on the first uncovered cell,
/// lowest reduced cost first. Components too large for a dense tableau are bounded by the
/// cheapest per-cell share (cost / run length) of any column covering each cell.
#[derive(Clone, Debug)]
pub struct BranchBoundSolver {
    /// Nodes expanded between deadline checks.
    pub check_interval: u64,
}

impl Default for BranchBoundSolver {
    fn default() -> Self {
        Self {
            check_interval: 256,
        }
    }
}

struct Frame {
    pos: usize,
    next_opt: usize,
    chosen: Option<usize>,
}

enum Search {
    Done(Option<(f64, Vec<usize>)>),
    Expired,
}

enum Relaxation {
    /// Row prices were written to `bound`; `integral` is set when the LP optimum is a cover.
    Priced { integral: Option<Vec<usize>>, pivots: usize },
    /// Tableau too large or numerically unusable; `bound` keeps the per-cell shares.
    Unavailable,
    Expired,
}

struct Problem<'m> {
    model: &'m CoverModel,
    cols: Vec<Vec<usize>>,
    // Legal columns covering each row, cheapest first until repriced.
    covering: Vec<Vec<usize>>,
    // Dual-feasible price per row: every legal column costs at least the sum over its rows.
    bound: Vec<f64>,
}

impl<'m> Problem<'m> {
    fn new(model: &'m CoverModel) -> Self {
        let cols = model.column_rows();
        let n = model.num_rows();
        let mut covering: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut bound = vec![f64::INFINITY; n];
        for v in model.legal_vars() {
            let rows = &cols[v];
            if rows.is_empty() {
                continue;
            }
            let s = model.costs[v] / rows.len() as f64;
            for &r in rows {
                covering[r].push(v);
                bound[r] = bound[r].min(s);
            }
        }
        for opts in &mut covering {
            opts.sort_by(|a, b| model.costs[*a].total_cmp(&model.costs[*b]).then(a.cmp(b)));
        }
        Self {
            model,
            cols,
            covering,
            bound,
        }
    }

    /// Connected groups of rows linked by shared columns, each in lexicographic cell order.
    fn components(&self) -> Vec<Vec<usize>> {
        let n = self.model.num_rows();
        let mut parent: Vec<usize> = (0..n).collect();
        fn find(parent: &mut [usize], mut i: usize) -> usize {
            while parent[i] != i {
                parent[i] = parent[parent[i]];
                i = parent[i];
            }
            i
        }
        for rows in &self.cols {
            if let Some((&first, rest)) = rows.split_first() {
                for &r in rest {
                    let a = find(&mut parent, first);
                    let b = find(&mut parent, r);
                    if a != b {
                        parent[b] = a;
                    }
                }
            }
        }
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by_key(|&i| self.model.cells[i]);
        let mut slot = vec![usize::MAX; n];
        let mut comps: Vec<Vec<usize>> = Vec::new();
        for i in order {
            let root = find(&mut parent, i);
            if slot[root] == usize::MAX {
                slot[root] = comps.len();
                comps.push(Vec::new());
            }
            comps[slot[root]].push(i);
        }
        comps
    }

    /// Primal simplex on `min c.x, Ax = 1, x >= 0` restricted to the rows in `order`.
    ///
    /// The unit block of every row is always legal, so those columns form the starting basis and
    /// no phase one is needed. Their reduced costs give the row prices at the end.
    fn relax(&mut self, order: &[usize], deadline: Instant) -> Relaxation {
        let model = self.model;
        let costs = &model.costs;
        let m = order.len();
        let slot: HashMap<usize, usize> = order.iter().enumerate().map(|(i, r)| (*r, i)).collect();

        let mut columns: Vec<usize> = order
            .iter()
            .map(|r| variable_index(*r, Configuration::SINGLE))
            .collect();
        for &r in order {
            for &v in &self.covering[r] {
                if self.cols[v].len() > 1 && self.cols[v][0] == r {
                    columns.push(v);
                }
            }
        }
        let k = columns.len();
        if m.saturating_mul(k) > MAX_TABLEAU {
            return Relaxation::Unavailable;
        }

        let mut t = vec![0.0f64; m * k];
        let mut d = vec![0.0f64; k];
        for (j, &v) in columns.iter().enumerate() {
            d[j] = costs[v];
            for r in &self.cols[v] {
                let i = slot[r];
                t[i * k + j] = 1.0;
                d[j] -= costs[columns[i]];
            }
        }
        let mut b = vec![1.0f64; m];
        let mut basis: Vec<usize> = (0..m).collect();
        let mut pivot_row: Vec<(usize, f64)> = Vec::with_capacity(k);
        let mut stalled = 0usize;
        let mut pivots = 0usize;

        loop {
            if Instant::now() >= deadline {
                return Relaxation::Expired;
            }
            let entering = if stalled < STALL_LIMIT {
                d.iter()
                    .enumerate()
                    .filter(|(_, dj)| **dj < -EPS)
                    .min_by(|a, b| a.1.total_cmp(b.1))
                    .map(|(j, _)| j)
            } else {
                d.iter().position(|dj| *dj < -EPS)
            };
            let Some(q) = entering else { break };

            let mut leave: Option<(usize, f64)> = None;
            for i in 0..m {
                let a = t[i * k + q];
                if a <= PIVOT_TOL {
                    continue;
                }
                let ratio = b[i] / a;
                let better = match leave {
                    None => true,
                    Some((p, best)) => {
                        ratio < best - RATIO_TOL
                            || (ratio <= best + RATIO_TOL && basis[i] < basis[p])
                    }
                };
                if better {
                    leave = Some((i, ratio));
                }
            }
            // Every column is bounded by its rows, so an unbounded ray means lost precision.
            let Some((p, _)) = leave else {
                return Relaxation::Unavailable;
            };

            let piv = t[p * k + q];
            pivot_row.clear();
            for j in 0..k {
                let a = t[p * k + j];
                if a != 0.0 {
                    pivot_row.push((j, a / piv));
                }
            }
            for &(j, a) in &pivot_row {
                t[p * k + j] = a;
            }
            b[p] /= piv;
            let bp = b[p];
            for i in 0..m {
                let f = t[i * k + q];
                if i == p || f == 0.0 {
                    continue;
                }
                let row = &mut t[i * k..(i + 1) * k];
                for &(j, a) in &pivot_row {
                    let x = row[j] - f * a;
                    row[j] = if x.abs() < RATIO_TOL { 0.0 } else { x };
                }
                row[q] = 0.0;
                b[i] = (b[i] - f * bp).max(0.0);
            }
            let dq = d[q];
            for &(j, a) in &pivot_row {
                d[j] -= dq * a;
            }
            d[q] = 0.0;
            basis[p] = q;
            pivots += 1;
            if dq * bp < -EPS {
                stalled = 0;
            } else {
                stalled += 1;
            }
        }

        // Prices from the unit-block columns, shifted down by the worst rounding violation.
        let mut y: Vec<f64> = (0..m).map(|i| costs[columns[i]] - d[i]).collect();
        let mut shift = 0.0f64;
        for &v in &columns {
            let rows = &self.cols[v];
            let s: f64 = rows.iter().map(|r| y[slot[r]]).sum();
            shift = shift.max((s - costs[v]) / rows.len() as f64);
        }
        for (i, &r) in order.iter().enumerate() {
            y[i] -= shift;
            self.bound[r] = y[i];
        }

        let zero_one = b
            .iter()
            .all(|x| x.abs() < INTEGRAL_TOL || (x - 1.0).abs() < INTEGRAL_TOL);
        let integral = zero_one.then(|| {
            (0..m)
                .filter(|i| b[*i] > 0.5)
                .map(|i| columns[basis[i]])
                .collect::<Vec<usize>>()
        });
        let integral = integral.filter(|sel| {
            let mut hits = vec![0u32; m];
            for v in sel {
                for r in &self.cols[*v] {
                    hits[slot[r]] += 1;
                }
            }
            hits.iter().all(|h| *h == 1)
        });
        Relaxation::Priced { integral, pivots }
    }

    /// Re-sorts the options of every row in `order` by reduced cost under the current prices.
    fn order_by_reduced_cost(&mut self, order: &[usize]) {
        let Problem {
            model,
            cols,
            covering,
            bound,
        } = self;
        for &r in order {
            let mut keyed: Vec<(f64, f64, usize)> = covering[r]
                .iter()
                .map(|&v| {
                    let priced: f64 = cols[v].iter().map(|row| bound[*row]).sum();
                    (model.costs[v] - priced, model.costs[v], v)
                })
                .collect();
            keyed.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)).then(a.2.cmp(&b.2)));
            covering[r] = keyed.into_iter().map(|(_, _, v)| v).collect();
        }
    }

    fn search(
        &self,
        order: &[usize],
        covered: &mut [bool],
        deadline: Instant,
        check_interval: u64,
        nodes: &mut u64,
    ) -> Search {
        if order.iter().any(|r| self.covering[*r].is_empty()) {
            return Search::Done(None);
        }
        let costs = &self.model.costs;
        let mut cost = 0.0;
        let mut remaining: f64 = order.iter().map(|r| self.bound[*r]).sum();
        let mut best_cost = f64::INFINITY;
        let mut best: Vec<usize> = Vec::new();
        let mut stack = vec![Frame {
            pos: 0,
            next_opt: 0,
            chosen: None,
        }];

        while let Some(top) = stack.last_mut() {
            *nodes += 1;
            if *nodes % check_interval == 0 && Instant::now() >= deadline {
                return Search::Expired;
            }

            if let Some(v) = top.chosen.take() {
                for &r in &self.cols[v] {
                    covered[r] = false;
                    remaining += self.bound[r];
                }
                cost -= costs[v];
            }

            let opts = &self.covering[order[top.pos]];
            let mut picked = None;
            while top.next_opt < opts.len() {
                let v = opts[top.next_opt];
                top.next_opt += 1;
                let rows = &self.cols[v];
                if rows.iter().any(|r| covered[*r]) {
                    continue;
                }
                let freed: f64 = rows.iter().map(|r| self.bound[*r]).sum();
                if cost + costs[v] + (remaining - freed) >= best_cost - EPS {
                    continue;
                }
                picked = Some((v, freed));
                break;
            }

            let Some((v, freed)) = picked else {
                stack.pop();
                continue;
            };
            for &r in &self.cols[v] {
                covered[r] = true;
            }
            cost += costs[v];
            remaining -= freed;
            top.chosen = Some(v);

            let mut next = top.pos + 1;
            while next < order.len() && covered[order[next]] {
                next += 1;
            }
            if next == order.len() {
                if cost < best_cost {
                    best_cost = cost;
                    best = stack.iter().filter_map(|f| f.chosen).collect();
                }
            } else {
                stack.push(Frame {
                    pos: next,
                    next_opt: 0,
                    chosen: None,
                });
            }
        }

        for r in order {
            covered[*r] = false;
        }
        if best_cost.is_finite() {
            Search::Done(Some((best_cost, best)))
        } else {
            Search::Done(None)
        }
    }
}

impl CoverSolver for BranchBoundSolver {
    fn solve(&self, model: &CoverModel, budget: Duration) -> SolveOutcome {
        let deadline = Instant::now() + budget;
        let mut problem = Problem::new(model);
        let mut covered = vec![false; model.num_rows()];
        let mut nodes = 0u64;
        let mut pivots = 0usize;
        let mut selected = Vec::new();
        let mut total = 0.0;

        for comp in problem.components() {
            match problem.relax(&comp, deadline) {
                Relaxation::Expired => {
                    log::trace!("relaxation expired after {pivots} pivots");
                    return SolveOutcome::TimedOut;
                }
                Relaxation::Priced {
                    integral: Some(vars),
                    pivots: p,
                } => {
                    pivots += p;
                    total += model.objective(&vars);
                    selected.extend(vars);
                    continue;
                }
                Relaxation::Priced { integral: None, pivots: p } => {
                    pivots += p;
                    problem.order_by_reduced_cost(&comp);
                }
                Relaxation::Unavailable => {
                    log::trace!("component of {} cells bounded by unit shares", comp.len());
                }
            }
            match problem.search(&comp, &mut covered, deadline, self.check_interval.max(1), &mut nodes) {
                Search::Expired => {
                    log::trace!("branch-and-bound expired after {nodes} nodes");
                    return SolveOutcome::TimedOut;
                }
                Search::Done(None) => return SolveOutcome::Infeasible,
                Search::Done(Some((cost, vars))) => {
                    total += cost;
                    selected.extend(vars);
                }
            }
        }
        selected.sort_unstable();
        log::trace!(
            "solved {} cells in {pivots} pivots and {nodes} nodes",
            model.num_rows()
        );
        SolveOutcome::Solved(Assignment {
            selected,
            cost: total,
        })
    }
}
