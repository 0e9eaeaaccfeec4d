use crate::fit::exit::SolverExit;
use crate::foundation::error::FitResult;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Best-fit value of one free parameter, in native units.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct ParameterEstimate {
    /// `owner.name`, e.g. `m0.uniform_disk.diameter`.
    pub name: String,
    /// Value left in the scene after the run.
    pub value: f64,
    /// `sqrt(cov[i][i])`; absent when no covariance could be estimated.
    pub std_error: Option<f64>,
}

/// Goodness of fit against one observation set.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct SetStatistic {
    /// Index of the set in the context.
    pub set: usize,
    /// Observations in the set.
    pub points: usize,
    /// Sum of squared residuals at the best fit.
    pub chi2: f64,
    /// `chi2 / points`.
    pub chi2r: f64,
}

/// Everything a Levenberg-Marquardt run produced.
#[derive(Clone, Debug, serde::Serialize)]
pub struct FitReport {
    /// Free parameters in traversal order.
    pub params: Vec<ParameterEstimate>,
    /// Covariance of the free parameters in native units, row-major.
    pub covariance: Option<Vec<Vec<f64>>>,
    /// Solver iterations completed.
    pub iterations: usize,
    /// Residual-vector evaluations, Jacobian columns included.
    pub evaluations: usize,
    /// Why the solver stopped.
    pub exit: SolverExit,
    /// The run was stopped through its cancel token rather than by a numerical fault.
    pub cancelled: bool,
    /// `‖e‖₂` at the starting point.
    pub initial_norm: f64,
    /// `‖e‖₂` at the best fit.
    pub residual_norm: f64,
    /// Per-set statistics at the best fit; empty sets are skipped.
    pub sets: Vec<SetStatistic>,
}

impl FitReport {
    /// Human-readable exit reason; a cancelled run reads as a user termination.
    pub fn exit_message(&self) -> &'static str {
        self.exit.describe(self.cancelled)
    }

    /// Best-fit values in parameter order.
    pub fn values(&self) -> Vec<f64> {
        self.params.iter().map(|p| p.value).collect()
    }
}

/// Simulated values and residuals of one set at the best fit.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct SetSamples {
    pub(crate) set: usize,
    pub(crate) residuals: Vec<f64>,
    pub(crate) simulated: Option<Vec<f64>>,
}

/// Outcome of a benchmark run.
#[derive(Clone, Debug, PartialEq)]
pub struct BenchmarkReport {
    /// Cycles completed before the end or a cancel.
    pub cycles: usize,
    /// Wall time of the completed cycles.
    pub elapsed: Duration,
    pub cancelled: bool,
    /// Chi-square of every non-empty set in the last completed cycle.
    pub last_statistic: Vec<f64>,
}

impl BenchmarkReport {
    /// Cycle rate; zero when no time was measured.
    pub fn per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.cycles as f64 / secs
        } else {
            0.0
        }
    }
}

/// Outcome of a grid search.
#[derive(Clone, Debug, serde::Serialize)]
pub struct GridReport {
    /// Best grid point found, in native units; no standard errors.
    pub params: Vec<ParameterEstimate>,
    /// Grid points per free parameter.
    pub steps: usize,
    /// Grid points evaluated before the end or a cancel.
    pub evaluated: usize,
    /// `‖e‖₂²` at the best point; NaN when no point gave finite residuals.
    pub chi2: f64,
    pub cancelled: bool,
    /// Per-set statistics at the best point.
    pub sets: Vec<SetStatistic>,
}

/// Spread of one free parameter over the bootstrap resamples.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct BootstrapEstimate {
    pub name: String,
    /// Mean over the resamples, in native units.
    pub mean: f64,
    /// Sample standard deviation; absent with fewer than two resamples.
    pub std_dev: Option<f64>,
}

/// Outcome of a bootstrap run.
#[derive(Clone, Debug, serde::Serialize)]
pub struct BootstrapReport {
    /// Fit to the full data; its values are the ones left in the scene.
    pub fit: FitReport,
    /// Empty when no resample finished.
    pub params: Vec<BootstrapEstimate>,
    /// Resamples whose fit contributed to the spread.
    pub resamples: usize,
    pub cancelled: bool,
}

/// What a minimizer run produced, by minimizer kind.
#[derive(Clone, Debug)]
pub enum RunOutcome {
    Fit(FitReport),
    Benchmark(BenchmarkReport),
    Grid(GridReport),
    Bootstrap(BootstrapReport),
}

impl RunOutcome {
    /// The Levenberg-Marquardt report, for the kinds that run one.
    pub fn as_fit(&self) -> Option<&FitReport> {
        match self {
            Self::Fit(r) => Some(r),
            Self::Bootstrap(r) => Some(&r.fit),
            Self::Benchmark(_) | Self::Grid(_) => None,
        }
    }

    /// Whether the run was stopped through its cancel token.
    pub fn cancelled(&self) -> bool {
        match self {
            Self::Fit(r) => r.cancelled,
            Self::Benchmark(r) => r.cancelled,
            Self::Grid(r) => r.cancelled,
            Self::Bootstrap(r) => r.cancelled,
        }
    }
}

/// Write the result files next to `base`; returns the paths written.
pub(crate) fn write_report_files(
    base: &str,
    report: &FitReport,
    samples: &[SetSamples],
) -> FitResult<Vec<PathBuf>> {
    let mut written = Vec::new();

    let path = PathBuf::from(format!("{base}_param_names.txt"));
    let mut f = create(&path)?;
    writeln!(f, "# Parameter names in a column.")?;
    writeln!(f, "# Param0, ..., ParamN")?;
    let names: Vec<&str> = report.params.iter().map(|p| p.name.as_str()).collect();
    writeln!(f, "{}", names.join(", "))?;
    f.flush()?;
    written.push(path);

    let path = PathBuf::from(format!("{base}_params.txt"));
    let mut f = create(&path)?;
    writeln!(f, "# Best-fit values, one parameter per row.")?;
    writeln!(f, "# value, std_error")?;
    for p in &report.params {
        let err = p.std_error.unwrap_or(f64::NAN);
        writeln!(f, "{:.8e}, {:.8e}", p.value, err)?;
    }
    f.flush()?;
    written.push(path);

    let path = PathBuf::from(format!("{base}_stats.txt"));
    let mut f = create(&path)?;
    writeln!(f, "# exit: {} {}", report.exit.code(), report.exit_message())?;
    writeln!(f, "# iterations: {}", report.iterations)?;
    writeln!(f, "# set, points, chi2, chi2r")?;
    for s in &report.sets {
        writeln!(f, "{}, {}, {:.8e}, {:.8e}", s.set, s.points, s.chi2, s.chi2r)?;
    }
    f.flush()?;
    written.push(path);

    for s in samples {
        let path = PathBuf::from(format!("{base}_{}_data.txt", s.set));
        let mut f = create(&path)?;
        writeln!(f, "# index, residual, simulated")?;
        for (i, r) in s.residuals.iter().enumerate() {
            let sim = s
                .simulated
                .as_ref()
                .and_then(|v| v.get(i).copied())
                .unwrap_or(f64::NAN);
            writeln!(f, "{i}, {r:.8e}, {sim:.8e}")?;
        }
        f.flush()?;
        written.push(path);
    }

    tracing::info!(files = written.len(), base, "results exported");
    Ok(written)
}

/// Write the bootstrap spread to `{base}_bootstrap.txt`.
pub(crate) fn write_bootstrap_file(base: &str, report: &BootstrapReport) -> FitResult<PathBuf> {
    let path = PathBuf::from(format!("{base}_bootstrap.txt"));
    let mut f = create(&path)?;
    writeln!(f, "# resamples: {}", report.resamples)?;
    writeln!(f, "# name, mean, std_dev")?;
    for p in &report.params {
        let sd = p.std_dev.unwrap_or(f64::NAN);
        writeln!(f, "{}, {:.8e}, {:.8e}", p.name, p.mean, sd)?;
    }
    f.flush()?;
    tracing::info!(path = %path.display(), "bootstrap spread exported");
    Ok(path)
}

fn create(path: &Path) -> FitResult<BufWriter<File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(BufWriter::new(File::create(path)?))
}

#[cfg(test)]
#[path = "../../tests/unit/fit/report.rs"]
mod tests;
