use crate::engine::command::DataSummary;
use crate::engine::dispatch::EngineHandle;
use crate::fit::benchmark::run_benchmark;
use crate::fit::bootstrap::{resample_weights, spread};
use crate::fit::cancel::CancelToken;
use crate::fit::exit::SolverExit;
use crate::fit::grid::grid_search;
use crate::fit::lm::{LevmarOpts, LevmarOutcome, levmar_bc};
use crate::fit::oracle::ResidualOracle;
use crate::fit::report::{
    BootstrapEstimate, BootstrapReport, FitReport, GridReport, ParameterEstimate, RunOutcome,
    SetSamples, SetStatistic, write_bootstrap_file, write_report_files,
};
use crate::foundation::error::{FitError, FitResult};
use crate::params::aggregate::FreeParams;
use crate::params::set::Units;
use crate::scene::list::SharedScene;
use nalgebra::DMatrix;
use rand::SeedableRng;
use rand::rngs::SmallRng;

/// Minimizers selectable by ordinal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MinimizerKind {
    /// Times render/statistic cycles without changing any parameter.
    #[default]
    Benchmark,
    /// Bound-constrained Levenberg-Marquardt.
    Levmar,
    /// Exhaustive scan of a regular grid over the free-parameter bounds.
    GridSearch,
    /// Levenberg-Marquardt fit followed by refits to resampled data.
    Bootstrap,
}

impl MinimizerKind {
    pub const ALL: [MinimizerKind; 4] = [
        Self::Benchmark,
        Self::Levmar,
        Self::GridSearch,
        Self::Bootstrap,
    ];

    /// Position in [`MinimizerKind::ALL`], as shown to users.
    pub fn ordinal(self) -> u32 {
        match self {
            Self::Benchmark => 0,
            Self::Levmar => 1,
            Self::GridSearch => 2,
            Self::Bootstrap => 3,
        }
    }

    /// Unknown ordinals select the benchmark.
    pub fn from_ordinal(ordinal: u32) -> Self {
        match ordinal {
            0 => Self::Benchmark,
            1 => Self::Levmar,
            2 => Self::GridSearch,
            3 => Self::Bootstrap,
            other => {
                tracing::warn!(ordinal = other, "unknown minimizer, using benchmark");
                Self::Benchmark
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Benchmark => "Benchmark",
            Self::Levmar => "Levmar",
            Self::GridSearch => "Grid Search",
            Self::Bootstrap => "Bootstrap (Levmar)",
        }
    }
}

pub const DEFAULT_SAVE_BASENAME: &str = "/tmp/model";

/// Options for one minimizer run.
#[derive(Clone, Debug)]
pub struct MinimizerOpts {
    pub kind: MinimizerKind,
    pub levmar: LevmarOpts,
    /// Render/statistic cycles timed by the benchmark.
    pub benchmark_cycles: usize,
    /// Grid points per free parameter for the grid search.
    pub grid_steps: usize,
    /// Resampled refits after the bootstrap's full-data fit.
    pub bootstrap_iterations: usize,
    /// Seed of the bootstrap resampling.
    pub bootstrap_seed: u64,
    /// Write the result files after a fit.
    pub export: bool,
    save_basename: String,
}

impl Default for MinimizerOpts {
    fn default() -> Self {
        Self {
            kind: MinimizerKind::default(),
            levmar: LevmarOpts::default(),
            benchmark_cycles: 100,
            grid_steps: 10,
            bootstrap_iterations: 100,
            bootstrap_seed: 0,
            export: true,
            save_basename: DEFAULT_SAVE_BASENAME.to_string(),
        }
    }
}

impl MinimizerOpts {
    /// Base path of the exported result files.
    pub fn save_basename(&self) -> &str {
        &self.save_basename
    }

    /// Empty names are ignored and the previous one kept; returns whether the name was taken.
    pub fn set_save_basename(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if name.is_empty() {
            return false;
        }
        self.save_basename = name;
        true
    }
}

/// One run of a minimizer against an engine and the scene it renders.
pub struct Minimizer {
    opts: MinimizerOpts,
    engine: EngineHandle,
    scene: SharedScene,
    cancel: CancelToken,
}

impl Minimizer {
    /// A run over `scene`; nothing happens until [`Minimizer::run`].
    pub fn new(opts: MinimizerOpts, engine: EngineHandle, scene: SharedScene) -> Self {
        Self {
            opts,
            engine,
            scene,
            cancel: CancelToken::new(),
        }
    }

    pub fn opts(&self) -> &MinimizerOpts {
        &self.opts
    }

    /// Token that stops this run at its next residual evaluation.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Execute the configured minimizer on the calling thread.
    ///
    /// Holds the engine's synchronous call slot for the whole run, waiting first for a call
    /// already in flight. Other handles' calls fail with [`FitError::CallInFlight`] meanwhile.
    #[tracing::instrument(skip_all, fields(kind = self.opts.kind.name()))]
    pub fn run(&self) -> FitResult<RunOutcome> {
        let engine = self.engine.reserve()?;
        match self.opts.kind {
            MinimizerKind::Benchmark => run_benchmark(
                &engine,
                &self.scene,
                &self.cancel,
                self.opts.benchmark_cycles,
            )
            .map(RunOutcome::Benchmark),
            MinimizerKind::Levmar => self.run_levmar(&engine).map(RunOutcome::Fit),
            MinimizerKind::GridSearch => self.run_grid(&engine).map(RunOutcome::Grid),
            MinimizerKind::Bootstrap => self.run_bootstrap(&engine).map(RunOutcome::Bootstrap),
        }
    }

    fn run_levmar(&self, engine: &EngineHandle) -> FitResult<FitReport> {
        let (p0, names, bounds) = {
            let scene = self.scene.lock();
            (
                scene.free_values(Units::Normalized),
                scene.names_free(),
                scene.bounds_free(),
            )
        };
        let mut oracle = ResidualOracle::new(engine, &self.scene, &self.cancel)?;
        let summary = oracle.summary().clone();
        let m = oracle.residual_count();
        let n = p0.len();
        tracing::info!(params = n, residuals = m, "starting levmar");

        let lower = vec![0.0; n];
        let upper = vec![1.0; n];
        let outcome = levmar_bc(
            |p: &[f64], out: &mut [f64]| oracle.evaluate(p, out),
            &p0,
            m,
            &lower,
            &upper,
            &self.opts.levmar,
        )?;
        let stats = oracle.finish()?;

        self.scene
            .lock()
            .scatter_free(&outcome.p, Units::Normalized)?;
        let values = self.scene.lock().free_values(Units::Native);

        let (sets, samples) = self.evaluate_sets(engine, &summary)?;
        engine.render_sync()?;

        let covariance = if stats.cancelled {
            None
        } else {
            covariance(&outcome, &bounds)
        };
        let params = names
            .into_iter()
            .zip(values)
            .enumerate()
            .map(|(i, (name, value))| ParameterEstimate {
                name,
                value,
                std_error: covariance
                    .as_ref()
                    .map(|c| c[(i, i)].sqrt())
                    .filter(|v| v.is_finite()),
            })
            .collect();

        let report = FitReport {
            params,
            covariance: covariance
                .map(|c| c.row_iter().map(|r| r.iter().copied().collect()).collect()),
            iterations: outcome.iterations,
            evaluations: stats.evaluations,
            exit: outcome.exit,
            cancelled: stats.cancelled,
            initial_norm: outcome.initial_norm2.sqrt(),
            residual_norm: outcome.norm2.sqrt(),
            sets,
        };
        tracing::info!(
            exit = report.exit.code(),
            iterations = report.iterations,
            cancelled = report.cancelled,
            "levmar: {}",
            report.exit_message()
        );

        if self.opts.export {
            write_report_files(&self.opts.save_basename, &report, &samples)?;
        }
        Ok(report)
    }

    fn run_grid(&self, engine: &EngineHandle) -> FitResult<GridReport> {
        let (p0, names) = {
            let scene = self.scene.lock();
            (scene.free_values(Units::Normalized), scene.names_free())
        };
        let mut oracle = ResidualOracle::new(engine, &self.scene, &self.cancel)?;
        let summary = oracle.summary().clone();
        let m = oracle.residual_count();
        let steps = self.opts.grid_steps;
        tracing::info!(params = p0.len(), residuals = m, steps, "starting grid search");

        let outcome = grid_search(
            |p: &[f64], out: &mut [f64]| {
                oracle.evaluate(p, out);
                !oracle.is_stopped()
            },
            p0.len(),
            m,
            steps,
        )?;
        let stats = oracle.finish()?;

        let best = outcome.best.as_deref().unwrap_or(p0.as_slice());
        self.scene.lock().scatter_free(best, Units::Normalized)?;
        let values = self.scene.lock().free_values(Units::Native);
        let (sets, _) = self.evaluate_sets(engine, &summary)?;
        engine.render_sync()?;

        let report = GridReport {
            params: names
                .into_iter()
                .zip(values)
                .map(|(name, value)| ParameterEstimate {
                    name,
                    value,
                    std_error: None,
                })
                .collect(),
            steps,
            evaluated: outcome.evaluated,
            chi2: outcome.norm2,
            cancelled: stats.cancelled,
            sets,
        };
        tracing::info!(
            evaluated = report.evaluated,
            chi2 = report.chi2,
            cancelled = report.cancelled,
            "grid search finished"
        );
        Ok(report)
    }

    /// Fit the full data, then refit resampled data from the best fit and report the spread.
    fn run_bootstrap(&self, engine: &EngineHandle) -> FitResult<BootstrapReport> {
        let fit = self.run_levmar(engine)?;
        if fit.cancelled {
            return Ok(BootstrapReport {
                fit,
                params: Vec::new(),
                resamples: 0,
                cancelled: true,
            });
        }

        let best = self.scene.lock().free_values(Units::Normalized);
        let n = best.len();
        let (lower, upper) = (vec![0.0; n], vec![1.0; n]);
        let mut oracle = ResidualOracle::new(engine, &self.scene, &self.cancel)?;
        let m = oracle.residual_count();
        let mut rng = SmallRng::seed_from_u64(self.opts.bootstrap_seed);
        tracing::info!(
            iterations = self.opts.bootstrap_iterations,
            residuals = m,
            "starting bootstrap resamples"
        );

        let mut samples = Vec::with_capacity(self.opts.bootstrap_iterations);
        for i in 0..self.opts.bootstrap_iterations {
            let weights = resample_weights(&mut rng, m);
            let outcome = levmar_bc(
                |p: &[f64], out: &mut [f64]| {
                    oracle.evaluate(p, out);
                    for (o, w) in out.iter_mut().zip(&weights) {
                        *o *= w;
                    }
                },
                &best,
                m,
                &lower,
                &upper,
                &self.opts.levmar,
            )?;
            if oracle.is_stopped() {
                break;
            }
            if outcome.exit == SolverExit::InvalidResidual {
                tracing::debug!(resample = i, "resample gave invalid residuals, skipped");
                continue;
            }
            let mut scene = self.scene.lock();
            scene.scatter_free(&outcome.p, Units::Normalized)?;
            samples.push(scene.free_values(Units::Native));
        }
        let stats = oracle.finish()?;

        self.scene.lock().scatter_free(&best, Units::Normalized)?;
        engine.render_sync()?;

        let report = BootstrapReport {
            params: fit
                .params
                .iter()
                .zip(spread(&samples))
                .map(|(p, (mean, std_dev))| BootstrapEstimate {
                    name: p.name.clone(),
                    mean,
                    std_dev,
                })
                .collect(),
            resamples: samples.len(),
            cancelled: stats.cancelled,
            fit,
        };
        tracing::info!(
            resamples = report.resamples,
            cancelled = report.cancelled,
            "bootstrap finished"
        );
        if self.opts.export {
            write_bootstrap_file(&self.opts.save_basename, &report)?;
        }
        Ok(report)
    }

    /// Render the best fit at every set's time and collect its statistics and samples.
    fn evaluate_sets(
        &self,
        engine: &EngineHandle,
        summary: &DataSummary,
    ) -> FitResult<(Vec<SetStatistic>, Vec<SetSamples>)> {
        let mut stats = Vec::new();
        let mut samples = Vec::new();
        for (set, info) in summary.sets.iter().enumerate() {
            if info.allocated == 0 {
                continue;
            }
            self.scene.lock().set_time(info.ave_time);
            engine.render_sync()?;
            let chi2 = engine.statistic(set)?;
            stats.push(SetStatistic {
                set,
                points: info.allocated,
                chi2,
                chi2r: chi2 / info.allocated as f64,
            });
            if self.opts.export {
                let residuals = engine.residuals(set)?;
                let simulated = match engine.simulated(set) {
                    Ok(v) => Some(v),
                    Err(e @ FitError::Validation(_)) => {
                        tracing::debug!(error = %e, "no simulated values for export");
                        None
                    }
                    Err(e) => return Err(e),
                };
                samples.push(SetSamples {
                    set,
                    residuals,
                    simulated,
                });
            }
        }
        Ok((stats, samples))
    }
}

/// `pinv(JᵀJ) · ‖e‖² / (m − n)`, mapped from the unit hypercube back to native units.
fn covariance(outcome: &LevmarOutcome, bounds: &[(f64, f64)]) -> Option<DMatrix<f64>> {
    let j = outcome.jacobian.as_ref()?;
    let (m, n) = j.shape();
    if m <= n || bounds.len() != n {
        return None;
    }
    let jtj = j.transpose() * j;
    let inv = jtj.pseudo_inverse(1e-12).ok()?;
    let s2 = outcome.norm2 / (m - n) as f64;
    let range = |i: usize| bounds[i].1 - bounds[i].0;
    Some(DMatrix::from_fn(n, n, |r, c| inv[(r, c)] * s2 * range(r) * range(c)))
}

#[cfg(test)]
#[path = "../../tests/unit/fit/minimizer.rs"]
mod tests;
