use std::sync::Arc;
use std::time::{Duration, Instant};

use beamify_cover::{BaseCoefficients, BranchBoundSolver, CoverModel, CoverSolver, SolveOutcome};
use beamify_field::{Coord, VoxelField};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use thiserror::Error;

use crate::assemble::{PassAssembler, completed_beams};
use crate::blobs::{Blob, decompose};
use crate::config::BeamifyConfig;
use crate::labeled::LabeledField;

#[derive(Debug, Error)]
pub enum BeamifyError {
    #[error("no convergence after {passes} passes at threshold {threshold}: {reason}")]
    NonConvergence {
        passes: usize,
        threshold: usize,
        reason: &'static str,
    },
    #[error("failed to build solver pool: {0}")]
    Pool(#[from] ThreadPoolBuildError),
}

/// Statistics for one pass over the working field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PassReport {
    pub index: usize,
    pub threshold: usize,
    pub cells: usize,
    pub blobs: usize,
    pub failed: usize,
    pub four_beams: usize,
    pub terminal: bool,
}

impl PassReport {
    #[inline]
    pub fn any_failed(&self) -> bool {
        self.failed > 0
    }
}

#[derive(Clone, Debug)]
pub struct BeamifyReport {
    pub labeled: LabeledField,
    pub passes: Vec<PassReport>,
}

struct PassResult {
    labels: VoxelField,
    four_beams: Vec<Vec<Coord>>,
    blobs: usize,
    failed: usize,
}

/// Drives repeated decompose/solve/assemble passes until no new 4-length beam appears.
pub struct Beamifier {
    config: BeamifyConfig,
    coeffs: BaseCoefficients,
    solver: Arc<dyn CoverSolver>,
    pool: ThreadPool,
}

impl Beamifier {
    pub fn new(config: BeamifyConfig) -> Result<Self, BeamifyError> {
        Self::with_solver(config, Arc::new(BranchBoundSolver::default()))
    }

    pub fn with_solver(
        config: BeamifyConfig,
        solver: Arc<dyn CoverSolver>,
    ) -> Result<Self, BeamifyError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .thread_name(|i| format!("beamify-solve-{i}"))
            .build()?;
        let coeffs = config.coefficients();
        Ok(Self {
            config,
            coeffs,
            solver,
            pool,
        })
    }

    pub fn config(&self) -> &BeamifyConfig {
        &self.config
    }

    /// Beamifies every occupied cell of `field`, whose values are material ids.
    pub fn run(&self, field: &VoxelField) -> Result<BeamifyReport, BeamifyError> {
        let started = Instant::now();
        let mut work = field.clone();
        let total = work.occupied_count();
        let mut threshold = if self.config.debeamify {
            usize::MAX
        } else {
            self.config.initial_threshold.unwrap_or(total).max(1)
        };
        let mut kept: Vec<Vec<Coord>> = Vec::new();
        let mut passes: Vec<PassReport> = Vec::new();
        let mut stalled = 0usize;

        log::info!(
            target: "beamify",
            "start: {} cells, {} materials, grain={} bias={} threshold={}",
            total,
            work.materials().len(),
            self.config.grain,
            self.config.bias,
            threshold
        );

        loop {
            if passes.len() >= self.config.max_passes {
                return Err(BeamifyError::NonConvergence {
                    passes: passes.len(),
                    threshold,
                    reason: "pass limit reached",
                });
            }

            let pass_threshold = threshold;
            let pass = self.run_pass(&work, pass_threshold);
            let mut report = PassReport {
                index: passes.len(),
                threshold: pass_threshold,
                cells: work.occupied_count(),
                blobs: pass.blobs,
                failed: pass.failed,
                four_beams: pass.four_beams.len(),
                terminal: false,
            };
            if report.any_failed() {
                threshold = (threshold / 2).max(1);
            }

            if !pass.four_beams.is_empty() {
                log::info!(
                    target: "beamify",
                    "pass {}: threshold={} blobs={} failed={} four_beams={}",
                    report.index,
                    report.threshold,
                    report.blobs,
                    report.failed,
                    report.four_beams
                );
                for cells in pass.four_beams {
                    work.clear_cells(&cells);
                    kept.push(cells);
                }
                passes.push(report);
                stalled = 0;
                continue;
            }

            if !report.any_failed() {
                report.terminal = true;
                log::info!(
                    target: "beamify",
                    "pass {} terminal: blobs={} groups={} in {:.2?}",
                    report.index,
                    report.blobs,
                    pass.labels.materials().len(),
                    started.elapsed()
                );
                passes.push(report);
                let labels = merge(&kept, &pass.labels);
                return Ok(BeamifyReport {
                    labeled: LabeledField {
                        labels,
                        materials: field.clone(),
                    },
                    passes,
                });
            }

            // Failures and nothing gained: retry the same cells with smaller blobs.
            passes.push(report);
            stalled += 1;
            log::warn!(
                target: "beamify",
                "pass {} stalled with {} failed blobs; threshold {} -> {}",
                passes.len() - 1,
                pass.failed,
                pass_threshold,
                threshold
            );
            if pass_threshold == 1 {
                return Err(BeamifyError::NonConvergence {
                    passes: passes.len(),
                    threshold,
                    reason: "solver failed on single-cell blobs",
                });
            }
            if stalled > self.config.max_stalled_passes {
                return Err(BeamifyError::NonConvergence {
                    passes: passes.len(),
                    threshold,
                    reason: "too many consecutive passes without progress",
                });
            }
        }
    }

    fn run_pass(&self, work: &VoxelField, threshold: usize) -> PassResult {
        let blobs = decompose(work, threshold);
        let extents = work.dims();
        let budget = self.config.time_budget();

        let solved: Vec<(CoverModel, SolveOutcome, Duration)> = self.pool.install(|| {
            blobs
                .par_iter()
                .map(|blob| {
                    let t0 = Instant::now();
                    let model = CoverModel::build(
                        &blob.cells,
                        &self.coeffs,
                        self.config.bias,
                        extents,
                        self.config.debeamify,
                    );
                    let outcome = self.solver.solve(&model, budget);
                    (model, outcome, t0.elapsed())
                })
                .collect()
        });

        let mut asm = PassAssembler::new(work);
        let mut failed = 0;
        for (blob, (model, outcome, took)) in blobs.iter().zip(&solved) {
            match outcome {
                SolveOutcome::Solved(a) => {
                    log::debug!(
                        "blob material={} cells={} placements={} cost={:.4} in {:.2?}",
                        blob.material,
                        blob.len(),
                        a.selected.len(),
                        a.cost,
                        took
                    );
                    asm.paint(model, a);
                }
                SolveOutcome::TimedOut => {
                    failed += 1;
                    log_failure(blob, "timed out", *took);
                }
                SolveOutcome::Infeasible => {
                    failed += 1;
                    log_failure(blob, "reported infeasible (unexpected)", *took);
                }
            }
        }

        let labels = asm.finish();
        let four_beams = completed_beams(&labels);
        PassResult {
            labels,
            four_beams,
            blobs: blobs.len(),
            failed,
        }
    }
}

fn log_failure(blob: &Blob, what: &str, took: Duration) {
    log::warn!(
        "blob material={} cells={} {} after {:.2?}",
        blob.material,
        blob.len(),
        what,
        took
    );
}

/// Kept 4-length beams first, then every group of the terminal pass, renumbered from 1.
fn merge(kept: &[Vec<Coord>], terminal: &VoxelField) -> VoxelField {
    let mut out = terminal.empty_like();
    let mut next = 1u32;
    for cells in kept {
        for c in cells {
            out.set(*c, next);
        }
        next += 1;
    }
    for cells in terminal.groups().into_values() {
        for c in &cells {
            out.set(*c, next);
        }
        next += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use beamify_cover::Assignment;

    struct NeverSolves;

    impl CoverSolver for NeverSolves {
        fn solve(&self, _model: &CoverModel, _budget: Duration) -> SolveOutcome {
            SolveOutcome::TimedOut
        }
    }

    /// Times out on anything bigger than `limit` cells, otherwise all unit blocks.
    struct SmallOnly {
        limit: usize,
    }

    impl CoverSolver for SmallOnly {
        fn solve(&self, model: &CoverModel, _budget: Duration) -> SolveOutcome {
            if model.num_rows() > self.limit {
                return SolveOutcome::TimedOut;
            }
            let selected: Vec<usize> = (0..model.num_rows()).map(|i| i * 10).collect();
            let cost = model.objective(&selected);
            SolveOutcome::Solved(Assignment { selected, cost })
        }
    }

    fn line_field(n: usize) -> VoxelField {
        let mut f = VoxelField::new(n, 1, 1);
        for x in 0..n {
            f.set(Coord::new(x, 0, 0), 1);
        }
        f
    }

    fn config() -> BeamifyConfig {
        BeamifyConfig {
            workers: 2,
            time_budget_ms: 5_000,
            ..Default::default()
        }
    }

    #[test]
    fn failing_solver_halves_down_to_one_then_errors() {
        let b = Beamifier::with_solver(config(), Arc::new(NeverSolves)).unwrap();
        let err = b.run(&line_field(8)).unwrap_err();
        match err {
            BeamifyError::NonConvergence { passes, threshold, .. } => {
                // 8, 4, 2, 1
                assert_eq!(passes, 4);
                assert_eq!(threshold, 1);
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn stalled_passes_are_capped() {
        let cfg = BeamifyConfig {
            max_stalled_passes: 1,
            ..config()
        };
        let b = Beamifier::with_solver(cfg, Arc::new(NeverSolves)).unwrap();
        match b.run(&line_field(8)) {
            Err(BeamifyError::NonConvergence { passes, .. }) => assert_eq!(passes, 2),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn recovers_once_blobs_are_small_enough() {
        let b = Beamifier::with_solver(config(), Arc::new(SmallOnly { limit: 2 })).unwrap();
        let report = b.run(&line_field(8)).unwrap();
        let thresholds: Vec<usize> = report.passes.iter().map(|p| p.threshold).collect();
        assert_eq!(thresholds, vec![8, 4, 2]);
        assert!(report.passes.last().is_some_and(|p| p.terminal));
        assert_eq!(report.labeled.group_count(), 8);
        assert!(report.labeled.covers_materials());
    }

    #[test]
    fn pass_limit_is_enforced() {
        let cfg = BeamifyConfig {
            max_passes: 1,
            ..config()
        };
        let b = Beamifier::with_solver(cfg, Arc::new(NeverSolves)).unwrap();
        assert!(matches!(
            b.run(&line_field(4)),
            Err(BeamifyError::NonConvergence { passes: 1, .. })
        ));
    }

    #[test]
    fn merge_renumbers_kept_beams_before_terminal_groups() {
        let mut terminal = VoxelField::new(6, 1, 1);
        terminal.set(Coord::new(4, 0, 0), 7);
        terminal.set(Coord::new(5, 0, 0), 3);
        let kept = vec![(0..4).map(|x| Coord::new(x, 0, 0)).collect::<Vec<_>>()];
        let out = merge(&kept, &terminal);
        assert_eq!(out.get(Coord::new(0, 0, 0)), 1);
        assert_eq!(out.get(Coord::new(3, 0, 0)), 1);
        // terminal groups in ascending old-id order
        assert_eq!(out.get(Coord::new(5, 0, 0)), 2);
        assert_eq!(out.get(Coord::new(4, 0, 0)), 3);
    }
}
