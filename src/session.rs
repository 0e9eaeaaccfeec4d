use crate::data::observation::{DataSource, ObservationSet};
use crate::engine::command::DataSummary;
use crate::engine::context::RenderContext;
use crate::engine::dispatch::{Engine, EngineHandle, EngineOpts};
use crate::fit::cancel::CancelToken;
use crate::fit::minimizer::{Minimizer, MinimizerKind, MinimizerOpts};
use crate::fit::report::RunOutcome;
use crate::foundation::core::{FrameF32, ImageSize};
use crate::foundation::error::{FitError, FitResult};
use crate::render::raster::{RasterContext, RasterOpts};
use crate::scene::list::{ModelList, SharedScene};
use crate::scene::model::ModelKind;
use crate::scene::position::PositionKind;
use crate::scene::shader::ShaderKind;
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;

/// Options controlling a [`FitSession`].
#[derive(Clone, Debug, Default)]
pub struct SessionOpts {
    pub engine: EngineOpts,
    pub raster: RasterOpts,
    pub minimizer: MinimizerOpts,
}

struct RunningFit {
    cancel: CancelToken,
    thread: JoinHandle<FitResult<RunOutcome>>,
}

/// The interactive side of the system: owns the engine, the scene, and at most one minimizer run.
///
/// Scene edits take the scene lock directly and then queue a render so the picture follows.
/// Data and image requests go through the engine as synchronous calls. Minimizer runs happen on
/// their own thread and are stopped through their cancel token. While a run is live the minimizer
/// owns both the scene and the engine's call slot, so every editing or engine-facing method
/// here fails with [`FitError::CallInFlight`].
pub struct FitSession {
    engine: Engine,
    scene: SharedScene,
    minimizer: MinimizerOpts,
    running: Option<RunningFit>,
}

impl FitSession {
    /// Session backed by the CPU [`RasterContext`].
    pub fn new(opts: SessionOpts) -> FitResult<Self> {
        let raster = opts.raster;
        Self::with_context(opts.engine, opts.minimizer, move || RasterContext::new(raster))
    }

    /// Session backed by a custom context, built on the engine thread by `factory`.
    pub fn with_context<C, F>(
        engine: EngineOpts,
        minimizer: MinimizerOpts,
        factory: F,
    ) -> FitResult<Self>
    where
        C: RenderContext + 'static,
        F: FnOnce() -> FitResult<C> + Send + 'static,
    {
        let scene = ModelList::new().shared();
        let engine = Engine::spawn(engine, scene.clone(), factory)?;
        Ok(Self {
            engine,
            scene,
            minimizer,
            running: None,
        })
    }

    /// A handle onto the session's engine. Its synchronous calls fail while a fit is running.
    pub fn engine(&self) -> EngineHandle {
        self.engine.handle()
    }

    /// The scene shared with the engine.
    pub fn scene(&self) -> SharedScene {
        self.scene.clone()
    }

    /// Append a model; returns its index.
    pub fn add_model(&self, kind: ModelKind) -> FitResult<usize> {
        self.ensure_idle()?;
        let index = self.scene.lock().add_model(kind);
        self.engine.handle().render()?;
        Ok(index)
    }

    pub fn set_position_kind(&self, model: usize, kind: PositionKind) -> FitResult<()> {
        self.ensure_idle()?;
        self.scene.lock().set_position_kind(model, kind)?;
        self.engine.handle().render()
    }

    pub fn set_shader(&self, model: usize, kind: Option<ShaderKind>) -> FitResult<()> {
        self.ensure_idle()?;
        self.scene.lock().set_shader(model, kind)?;
        self.engine.handle().render()
    }

    /// Replace the scene with the models stored in `path`.
    pub fn open_models(&self, path: impl AsRef<Path>) -> FitResult<()> {
        self.ensure_idle()?;
        let loaded = ModelList::from_path(path)?;
        *self.scene.lock() = loaded;
        self.engine.handle().render()
    }

    /// Write the scene to `path`.
    pub fn save_models(&self, path: impl AsRef<Path>) -> FitResult<()> {
        self.scene.lock().save(path)
    }

    /// Move the scene clock and redraw.
    pub fn set_time(&self, t: f64) -> FitResult<()> {
        self.ensure_idle()?;
        self.scene.lock().set_time(t);
        self.engine.handle().render()
    }

    pub fn set_timestep(&self, dt: f64) -> FitResult<()> {
        self.ensure_idle()?;
        self.scene.lock().set_timestep(dt);
        Ok(())
    }

    /// Load observation sets from a file; returns how many were added.
    pub fn load_data(&self, path: impl Into<PathBuf>) -> FitResult<usize> {
        self.ensure_idle()?;
        self.engine.handle().load_data(DataSource::Path(path.into()))
    }

    pub fn load_sets(&self, sets: Vec<ObservationSet>) -> FitResult<usize> {
        self.ensure_idle()?;
        self.engine.handle().load_data(DataSource::Sets(sets))
    }

    pub fn replace_data(&self, set: usize, data: ObservationSet) -> FitResult<()> {
        self.ensure_idle()?;
        self.engine.handle().replace_data(set, data)
    }

    pub fn remove_data(&self, set: usize) -> FitResult<()> {
        self.ensure_idle()?;
        self.engine.handle().remove_data(set)
    }

    pub fn data_info(&self) -> FitResult<DataSummary> {
        self.ensure_idle()?;
        self.engine.handle().data_info()
    }

    /// Start the animation; the clock advances one timestep per frame.
    pub fn animate(&self) -> FitResult<()> {
        self.ensure_idle()?;
        self.engine.handle().animate()
    }

    pub fn animate_stop(&self) -> FitResult<()> {
        self.engine.handle().animate_stop()
    }

    pub fn resize(&self, size: ImageSize) -> FitResult<()> {
        self.ensure_idle()?;
        self.engine.handle().resize(size)
    }

    /// Render and wait for the frame.
    pub fn render(&self) -> FitResult<()> {
        self.ensure_idle()?;
        self.engine.handle().render_sync()
    }

    pub fn image(&self) -> FitResult<FrameF32> {
        self.ensure_idle()?;
        self.engine.handle().copy_image()
    }

    pub fn save_image(&self, path: impl Into<PathBuf>) -> FitResult<()> {
        self.ensure_idle()?;
        self.engine.handle().save_image(path)
    }

    pub fn set_minimizer(&mut self, kind: MinimizerKind) {
        self.minimizer.kind = kind;
    }

    /// Empty names are ignored; returns whether the name was taken.
    pub fn set_save_basename(&mut self, name: impl Into<String>) -> bool {
        self.minimizer.set_save_basename(name)
    }

    pub fn minimizer_opts(&self) -> &MinimizerOpts {
        &self.minimizer
    }

    pub fn minimizer_opts_mut(&mut self) -> &mut MinimizerOpts {
        &mut self.minimizer
    }

    /// Whether a run was started and has not been joined yet.
    pub fn is_fit_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|r| !r.thread.is_finished())
    }

    /// Start the configured minimizer on its own thread.
    ///
    /// Fails while a previous run is still executing. A finished but unjoined run is discarded.
    /// A running animation is stopped first, since it would move the scene clock under the fit.
    pub fn start_fit(&mut self) -> FitResult<()> {
        if self.is_fit_running() {
            return Err(FitError::validation("a minimizer is already running"));
        }
        if let Some(prev) = self.running.take() {
            let _ = prev.thread.join();
        }
        self.engine.handle().animate_stop()?;

        let minimizer = Minimizer::new(
            self.minimizer.clone(),
            self.engine.handle(),
            self.scene.clone(),
        );
        let cancel = minimizer.cancel_token();
        let thread = std::thread::Builder::new()
            .name("renderfit-minimizer".to_string())
            .spawn(move || minimizer.run())?;
        tracing::info!(kind = self.minimizer.kind.name(), "minimizer started");
        self.running = Some(RunningFit { cancel, thread });
        Ok(())
    }

    /// Ask the running minimizer to stop at its next residual evaluation.
    pub fn stop_fit(&self) {
        if let Some(r) = &self.running {
            r.cancel.cancel();
        }
    }

    /// Wait for the current run and return its outcome.
    pub fn join_fit(&mut self) -> FitResult<RunOutcome> {
        let run = self
            .running
            .take()
            .ok_or_else(|| FitError::validation("no minimizer has been started"))?;
        run.thread
            .join()
            .map_err(|_| FitError::validation("minimizer thread panicked"))?
    }

    /// Stop any run, then the engine.
    pub fn shutdown(mut self) -> FitResult<()> {
        self.stop_running();
        self.engine.stop_and_join()
    }

    fn ensure_idle(&self) -> FitResult<()> {
        if self.is_fit_running() {
            return Err(FitError::CallInFlight);
        }
        Ok(())
    }

    fn stop_running(&mut self) {
        if let Some(run) = self.running.take() {
            run.cancel.cancel();
            let _ = run.thread.join();
        }
    }
}

impl Drop for FitSession {
    fn drop(&mut self) {
        self.stop_running();
    }
}

#[cfg(test)]
#[path = "../tests/unit/session.rs"]
mod tests;
