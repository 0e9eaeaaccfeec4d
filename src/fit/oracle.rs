use crate::engine::command::DataSummary;
use crate::engine::dispatch::EngineHandle;
use crate::fit::cancel::CancelToken;
use crate::foundation::error::{FitError, FitResult};
use crate::params::aggregate::FreeParams;
use crate::params::set::Units;
use crate::scene::list::SharedScene;

/// Turns the engine into a residual function for the solver.
///
/// One evaluation scatters the candidate (normalized units) into the scene, then for every data
/// set moves the scene clock to the set's time, renders, and copies the set's residuals into its
/// slice of the output. The solver only understands non-finite residuals as a stop signal, so
/// cancellation and engine errors both write NaN; the error itself is kept and re-raised by
/// [`ResidualOracle::finish`].
pub(crate) struct ResidualOracle<'a> {
    engine: &'a EngineHandle,
    scene: &'a SharedScene,
    cancel: &'a CancelToken,
    summary: DataSummary,
    offsets: Vec<usize>,
    error: Option<FitError>,
    cancelled: bool,
    evaluations: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct OracleStats {
    pub(crate) cancelled: bool,
    pub(crate) evaluations: usize,
}

impl<'a> ResidualOracle<'a> {
    /// Fails with [`FitError::NoData`] when the context holds no data points.
    pub(crate) fn new(
        engine: &'a EngineHandle,
        scene: &'a SharedScene,
        cancel: &'a CancelToken,
    ) -> FitResult<Self> {
        let summary = engine.data_info()?;
        if summary.total_allocated() == 0 {
            return Err(FitError::no_data(format!(
                "{} data set(s) loaded, none holds any points",
                summary.sets.len()
            )));
        }
        let offsets = summary.offsets();
        Ok(Self {
            engine,
            scene,
            cancel,
            summary,
            offsets,
            error: None,
            cancelled: false,
            evaluations: 0,
        })
    }

    pub(crate) fn summary(&self) -> &DataSummary {
        &self.summary
    }

    pub(crate) fn residual_count(&self) -> usize {
        self.summary.total_allocated()
    }

    /// Cancelled or failed; every further evaluation only writes NaN.
    pub(crate) fn is_stopped(&self) -> bool {
        self.cancelled || self.error.is_some()
    }

    pub(crate) fn evaluate(&mut self, p: &[f64], out: &mut [f64]) {
        self.evaluations += 1;
        if self.error.is_none() && self.cancel.is_cancelled() {
            self.cancelled = true;
        }
        if self.cancelled || self.error.is_some() {
            poison(out);
            return;
        }
        if let Err(e) = self.try_evaluate(p, out) {
            tracing::warn!(error = %e, "residual evaluation failed");
            self.error = Some(e);
            poison(out);
        }
    }

    fn try_evaluate(&self, p: &[f64], out: &mut [f64]) -> FitResult<()> {
        self.scene.lock().scatter_free(p, Units::Normalized)?;
        for (set, info) in self.summary.sets.iter().enumerate() {
            if info.allocated == 0 {
                continue;
            }
            self.scene.lock().set_time(info.ave_time);
            self.engine.render_sync()?;
            let r = self.engine.residuals(set)?;
            if r.len() != info.allocated {
                return Err(FitError::data(format!(
                    "set {set} produced {} residuals, expected {}",
                    r.len(),
                    info.allocated
                )));
            }
            let at = self.offsets[set];
            out[at..at + r.len()].copy_from_slice(&r);
        }
        Ok(())
    }

    /// Re-raise the first engine error seen during the run, if any.
    pub(crate) fn finish(self) -> FitResult<OracleStats> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(OracleStats {
                cancelled: self.cancelled,
                evaluations: self.evaluations,
            }),
        }
    }
}

fn poison(out: &mut [f64]) {
    if let Some(first) = out.first_mut() {
        *first = f64::NAN;
    }
}
