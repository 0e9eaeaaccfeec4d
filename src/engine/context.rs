use crate::data::observation::ObservationSet;
use crate::foundation::core::{FrameF32, ImageSize};
use crate::foundation::error::{FitError, FitResult};
use crate::scene::list::ModelList;
use std::path::Path;

/// The stateful compute/render resource owned by the dispatch engine.
///
/// Implementations are constructed on the consumer thread and never leave it, so they need not
/// be `Send`. Return [`FitError::Context`] only when the context itself is broken; the engine
/// treats that as fatal. Any other error is forwarded to the caller of the operation.
pub trait RenderContext {
    /// Reallocate render targets for a new image size.
    fn resize(&mut self, size: ImageSize) -> FitResult<()>;

    /// Render the scene at its current clock into the back buffer.
    fn render(&mut self, scene: &ModelList) -> FitResult<()>;

    /// Present the back buffer (the "blit to screen" step).
    fn present(&mut self) -> FitResult<()>;

    /// Append validated observation sets; returns how many sets were added.
    fn load_data(&mut self, sets: Vec<ObservationSet>) -> FitResult<usize>;

    fn replace_data(&mut self, set: usize, data: ObservationSet) -> FitResult<()>;

    fn remove_data(&mut self, set: usize) -> FitResult<()>;

    fn data_sets(&self) -> usize;

    /// Characteristic time of a set.
    fn ave_time(&self, set: usize) -> FitResult<f64>;

    /// Residual slots used by a set; zero for an unknown set.
    fn allocated(&self, set: usize) -> usize;

    fn total_allocated(&self) -> usize {
        (0..self.data_sets()).map(|s| self.allocated(s)).sum()
    }

    /// Write the residuals of the last rendered image against `set` into `out`.
    fn residuals(&mut self, set: usize, out: &mut [f64]) -> FitResult<()>;

    /// Chi-square of the last rendered image against `set`.
    fn statistic(&mut self, set: usize) -> FitResult<f64> {
        let mut buf = vec![0.0; self.allocated(set)];
        self.residuals(set, &mut buf)?;
        Ok(buf.iter().map(|r| r * r).sum())
    }

    /// Gaussian log-likelihood of the last rendered image against `set`,
    /// `-0.5 * sum(r_i^2 + ln(2 pi sigma_i^2))`.
    fn log_like(&mut self, _set: usize) -> FitResult<f64> {
        Err(FitError::validation("this context does not report a likelihood"))
    }

    fn flux(&mut self) -> FitResult<f64> {
        Err(FitError::validation("this context does not report flux"))
    }

    fn copy_image(&mut self) -> FitResult<FrameF32> {
        Err(FitError::validation("this context cannot export images"))
    }

    fn save_image(&mut self, _path: &Path) -> FitResult<()> {
        Err(FitError::validation("this context cannot save images"))
    }

    /// Simulated counterpart of every observation in `set`.
    fn simulated(&mut self, _set: usize) -> FitResult<Vec<f64>> {
        Err(FitError::validation("this context cannot simulate data"))
    }
}
