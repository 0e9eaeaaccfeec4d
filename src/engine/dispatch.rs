use crate::data::observation::{DataSource, ObservationSet};
use crate::engine::command::{Command, DataSetInfo, DataSummary, Reply};
use crate::engine::context::RenderContext;
use crate::engine::op::{Operation, Step};
use crate::engine::queue::OpQueue;
use crate::foundation::core::{FrameF32, ImageSize};
use crate::foundation::error::{FitError, FitResult};
use crate::scene::list::SharedScene;
use parking_lot::{Condvar, Mutex};
use std::ops::Deref;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Exit status used when a fatal context error terminates the process (`EX_SOFTWARE`).
pub const FATAL_EXIT_CODE: i32 = 70;

/// What the engine does when the render context reports a fatal error.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FatalPolicy {
    /// Log the error and terminate the process.
    #[default]
    Exit,
    /// Stop the dispatch loop; pending and future calls fail with [`FitError::EngineStopped`].
    Shutdown,
}

/// Options controlling the dispatch engine.
#[derive(Clone, Debug)]
pub struct EngineOpts {
    /// Size the context is resized to before the engine reports ready.
    pub size: ImageSize,
    /// Pause between two animation frames.
    pub animate_interval: Duration,
    pub on_fatal: FatalPolicy,
}

impl Default for EngineOpts {
    fn default() -> Self {
        Self {
            size: ImageSize::default(),
            animate_interval: Duration::from_millis(40),
            on_fatal: FatalPolicy::Exit,
        }
    }
}

/// Owner of the consumer thread.
///
/// Dropping the engine submits `Stop` and joins the thread.
pub struct Engine {
    handle: EngineHandle,
    thread: Option<JoinHandle<()>>,
}

impl Engine {
    /// Start the consumer thread.
    ///
    /// `factory` runs on the new thread and builds the context there, so the context itself never
    /// crosses threads. Construction or initial-resize failures are returned here and do not
    /// trigger the fatal policy.
    pub fn spawn<C, F>(opts: EngineOpts, scene: SharedScene, factory: F) -> FitResult<Self>
    where
        C: RenderContext + 'static,
        F: FnOnce() -> FitResult<C> + Send + 'static,
    {
        let queue = Arc::new(OpQueue::new());
        let handle = EngineHandle {
            queue: Arc::clone(&queue),
            slot: Arc::new(CallSlot::default()),
            reserved: false,
        };
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<FitResult<()>>(1);

        let thread = std::thread::Builder::new()
            .name("renderfit-engine".to_string())
            .spawn(move || {
                let _close = CloseOnDrop(Arc::clone(&queue));
                let size = opts.size;
                let ctx = factory().and_then(|mut ctx| {
                    ctx.resize(size)?;
                    Ok(ctx)
                });
                let ctx = match ctx {
                    Ok(ctx) => {
                        let _ = ready_tx.send(Ok(()));
                        ctx
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                tracing::debug!(width = size.width, height = size.height, "engine ready");
                Dispatcher {
                    ctx,
                    scene,
                    queue,
                    pending_size: size,
                    animating: false,
                    opts,
                }
                .run();
            })?;

        let ready = ready_rx
            .recv()
            .unwrap_or_else(|_| Err(FitError::context("engine thread exited during startup")));
        match ready {
            Ok(()) => Ok(Self {
                handle,
                thread: Some(thread),
            }),
            Err(e) => {
                let _ = thread.join();
                Err(e)
            }
        }
    }

    /// A new unreserved handle onto this engine.
    pub fn handle(&self) -> EngineHandle {
        self.handle.clone()
    }

    /// Submit `Stop` and wait for the consumer thread to finish.
    pub fn shutdown(mut self) -> FitResult<()> {
        self.stop_and_join()
    }

    pub(crate) fn stop_and_join(&mut self) -> FitResult<()> {
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };
        // A closed queue means the loop is already on its way out.
        let _ = self.handle.stop();
        thread
            .join()
            .map_err(|_| FitError::context("engine thread panicked"))
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if let Err(e) = self.stop_and_join() {
            tracing::warn!(error = %e, "engine shutdown failed");
        }
    }
}

/// Cloneable submission handle.
///
/// Fire-and-forget methods return as soon as the request is queued. Synchronous methods block
/// until the consumer has finished the operation and return its result. Only one synchronous call
/// may be outstanding per engine; a second concurrent one fails with [`FitError::CallInFlight`].
pub struct EngineHandle {
    queue: Arc<OpQueue<Command>>,
    slot: Arc<CallSlot>,
    /// Calls skip the slot because a [`Reservation`] already holds it.
    reserved: bool,
}

impl Clone for EngineHandle {
    /// Clones never inherit a reservation.
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
            slot: Arc::clone(&self.slot),
            reserved: false,
        }
    }
}

impl EngineHandle {
    fn submit(&self, cmd: Command) -> FitResult<()> {
        self.queue.push(cmd.op(), cmd)
    }

    fn call<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> FitResult<T> {
        let _guard = if self.reserved {
            None
        } else {
            Some(SlotGuard::try_acquire(&self.slot)?)
        };
        let (tx, rx) = crossbeam_channel::bounded(1);
        self.submit(make(tx))?;
        rx.recv().map_err(|_| FitError::EngineStopped)?
    }

    /// Take the synchronous call slot for as long as the returned reservation lives.
    ///
    /// Waits for a call already in flight to finish. While reserved, calls through the
    /// reservation go straight to the queue and every other handle gets
    /// [`FitError::CallInFlight`].
    pub(crate) fn reserve(&self) -> FitResult<Reservation> {
        if self.reserved {
            return Err(FitError::CallInFlight);
        }
        if self.is_stopped() {
            return Err(FitError::EngineStopped);
        }
        self.slot.acquire_wait();
        Ok(Reservation {
            handle: Self {
                queue: Arc::clone(&self.queue),
                slot: Arc::clone(&self.slot),
                reserved: true,
            },
        })
    }

    /// Whether the consumer loop has exited or is about to.
    pub fn is_stopped(&self) -> bool {
        self.queue.is_closed()
    }

    /// Queue a render followed by a blit.
    pub fn render(&self) -> FitResult<()> {
        self.submit(Command::Render { reply: None })
    }

    /// Queue a resize; the context is reallocated, re-rendered and blitted in one step.
    pub fn resize(&self, size: ImageSize) -> FitResult<()> {
        self.submit(Command::Resize(size))
    }

    /// Queue a present of the current back buffer.
    pub fn blit(&self) -> FitResult<()> {
        self.submit(Command::Blit)
    }

    /// Start advancing the scene clock one timestep per frame. Ignored while already animating.
    pub fn animate(&self) -> FitResult<()> {
        self.submit(Command::Animate { start: true })
    }

    /// Drop pending animation frames and draw the scene where it stopped.
    pub fn animate_stop(&self) -> FitResult<()> {
        self.submit(Command::AnimateStop)
    }

    /// Ask the consumer to exit after the operation it is currently executing.
    pub fn stop(&self) -> FitResult<()> {
        self.submit(Command::Stop)
    }

    /// Render and present, returning once the frame is in the back buffer.
    pub fn render_sync(&self) -> FitResult<()> {
        self.call(|reply| Command::Render { reply: Some(reply) })
    }

    /// Residuals of the last render against one data set.
    pub fn residuals(&self, set: usize) -> FitResult<Vec<f64>> {
        self.call(|reply| Command::Residuals { set, reply })
    }

    /// Chi-square of the last render against one data set.
    pub fn statistic(&self, set: usize) -> FitResult<f64> {
        self.call(|reply| Command::Statistic { set, reply })
    }

    /// Gaussian log-likelihood of the last render against one data set.
    pub fn log_like(&self, set: usize) -> FitResult<f64> {
        self.call(|reply| Command::LogLike { set, reply })
    }

    /// Total flux of the last render.
    pub fn flux(&self) -> FitResult<f64> {
        self.call(|reply| Command::Flux { reply })
    }

    /// Copy of the presented image.
    pub fn copy_image(&self) -> FitResult<FrameF32> {
        self.call(|reply| Command::CopyImage { reply })
    }

    /// Write the presented image to `path`.
    pub fn save_image(&self, path: impl Into<PathBuf>) -> FitResult<()> {
        let path = path.into();
        self.call(|reply| Command::SaveImage { path, reply })
    }

    /// Model values of the last render at every observation of `set`.
    pub fn simulated(&self, set: usize) -> FitResult<Vec<f64>> {
        self.call(|reply| Command::Simulate { set, reply })
    }

    /// Times and sizes of the loaded data sets.
    pub fn data_info(&self) -> FitResult<DataSummary> {
        self.call(|reply| Command::DataInfo { reply })
    }

    /// Load sets; returns how many were added.
    pub fn load_data(&self, source: DataSource) -> FitResult<usize> {
        self.call(|reply| Command::LoadData { source, reply })
    }

    /// Swap one set for validated new data.
    pub fn replace_data(&self, set: usize, data: ObservationSet) -> FitResult<()> {
        self.call(|reply| Command::ReplaceData { set, data, reply })
    }

    /// Remove one set; later sets shift down by one.
    pub fn remove_data(&self, set: usize) -> FitResult<()> {
        self.call(|reply| Command::RemoveData { set, reply })
    }
}

/// Exclusive hold on an engine's synchronous call slot.
///
/// Derefs to a handle whose calls bypass the slot. Dropping it frees the slot.
pub(crate) struct Reservation {
    handle: EngineHandle,
}

impl Deref for Reservation {
    type Target = EngineHandle;

    fn deref(&self) -> &EngineHandle {
        &self.handle
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        self.handle.slot.release();
    }
}

#[derive(Default)]
struct CallSlot {
    busy: Mutex<bool>,
    freed: Condvar,
}

impl CallSlot {
    fn acquire_wait(&self) {
        let mut busy = self.busy.lock();
        while *busy {
            self.freed.wait(&mut busy);
        }
        *busy = true;
    }

    fn release(&self) {
        *self.busy.lock() = false;
        self.freed.notify_all();
    }
}

struct SlotGuard<'a>(&'a CallSlot);

impl<'a> SlotGuard<'a> {
    fn try_acquire(slot: &'a CallSlot) -> FitResult<Self> {
        let mut busy = slot.busy.lock();
        if *busy {
            return Err(FitError::CallInFlight);
        }
        *busy = true;
        Ok(Self(slot))
    }
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        self.0.release();
    }
}

/// Closes the queue when the consumer thread exits, by return or by panic, so that blocked
/// callers observe `EngineStopped` instead of waiting forever.
struct CloseOnDrop(Arc<OpQueue<Command>>);

impl Drop for CloseOnDrop {
    fn drop(&mut self) {
        let dropped = self.0.close().len();
        if dropped > 0 {
            tracing::debug!(dropped, "engine exited with pending operations");
        }
    }
}

enum Flow {
    Continue,
    Stop,
}

struct Dispatcher<C> {
    ctx: C,
    scene: SharedScene,
    queue: Arc<OpQueue<Command>>,
    pending_size: ImageSize,
    animating: bool,
    opts: EngineOpts,
}

impl<C: RenderContext> Dispatcher<C> {
    fn run(mut self) {
        while let Some((op, cmd)) = self.queue.pop() {
            let span = tracing::trace_span!("op", name = op.name());
            let _enter = span.enter();
            if let Flow::Stop = self.execute(op, cmd) {
                break;
            }
        }
        tracing::debug!("engine loop finished");
    }

    fn execute(&mut self, op: Operation, cmd: Command) -> Flow {
        if let Command::Resize(size) = &cmd {
            self.pending_size = *size;
        }
        if let Command::AnimateStop = &cmd {
            self.animating = false;
            let purged = self.queue.purge(|o| o == Operation::Animate);
            tracing::debug!(purged, "animation stopped");
        }
        if let Command::Animate { start } = cmd {
            if start && self.animating {
                tracing::debug!("animation already running");
                return Flow::Continue;
            }
            if !start && !self.animating {
                return Flow::Continue;
            }
            self.animating = true;
        }

        let cascaded = op
            .cascade()
            .iter()
            .try_for_each(|step| self.step(*step));

        match cmd {
            Command::Animate { .. } => {
                if let Flow::Stop = self.settle(op, cascaded) {
                    return Flow::Stop;
                }
                std::thread::sleep(self.opts.animate_interval);
                // Fails only once the queue is closed, which ends the animation anyway.
                let _ = self
                    .queue
                    .push(Operation::Animate, Command::Animate { start: false });
                Flow::Continue
            }
            Command::Blit | Command::Resize(_) | Command::AnimateStop => self.settle(op, cascaded),
            Command::Render { reply } => match reply {
                Some(reply) => self.answer(op, reply, cascaded),
                None => self.settle(op, cascaded),
            },
            Command::Residuals { set, reply } => {
                let r = cascaded.and_then(|()| {
                    let mut out = vec![0.0; self.ctx.allocated(set)];
                    self.ctx.residuals(set, &mut out)?;
                    Ok(out)
                });
                self.answer(op, reply, r)
            }
            Command::Statistic { set, reply } => {
                let r = cascaded.and_then(|()| self.ctx.statistic(set));
                self.answer(op, reply, r)
            }
            Command::LogLike { set, reply } => {
                let r = cascaded.and_then(|()| self.ctx.log_like(set));
                self.answer(op, reply, r)
            }
            Command::Flux { reply } => {
                let r = cascaded.and_then(|()| self.ctx.flux());
                self.answer(op, reply, r)
            }
            Command::CopyImage { reply } => {
                let r = cascaded.and_then(|()| self.ctx.copy_image());
                self.answer(op, reply, r)
            }
            Command::SaveImage { path, reply } => {
                let r = cascaded.and_then(|()| self.ctx.save_image(&path));
                self.answer(op, reply, r)
            }
            Command::Simulate { set, reply } => {
                let r = cascaded.and_then(|()| self.ctx.simulated(set));
                self.answer(op, reply, r)
            }
            Command::DataInfo { reply } => {
                let r = cascaded.and_then(|()| self.data_summary());
                self.answer(op, reply, r)
            }
            Command::LoadData { source, reply } => {
                let r = cascaded
                    .and_then(|()| source.read())
                    .and_then(|sets| self.ctx.load_data(sets));
                self.answer(op, reply, r)
            }
            Command::ReplaceData { set, data, reply } => {
                let r = cascaded
                    .and_then(|()| data.validate())
                    .and_then(|()| self.ctx.replace_data(set, data));
                self.answer(op, reply, r)
            }
            Command::RemoveData { set, reply } => {
                let r = cascaded.and_then(|()| self.ctx.remove_data(set));
                self.answer(op, reply, r)
            }
            Command::Stop => {
                let dropped = self.queue.close().len();
                tracing::debug!(dropped, "stop requested");
                Flow::Stop
            }
        }
    }

    fn step(&mut self, step: Step) -> FitResult<()> {
        match step {
            Step::ApplyResize => self.ctx.resize(self.pending_size),
            Step::AdvanceTime => {
                self.scene.lock().increment_time();
                Ok(())
            }
            Step::Render => {
                let scene = self.scene.lock();
                self.ctx.render(&scene)
            }
            Step::Blit => self.ctx.present(),
        }
    }

    fn data_summary(&self) -> FitResult<DataSummary> {
        let sets = (0..self.ctx.data_sets())
            .map(|set| {
                Ok(DataSetInfo {
                    ave_time: self.ctx.ave_time(set)?,
                    allocated: self.ctx.allocated(set),
                })
            })
            .collect::<FitResult<Vec<_>>>()?;
        Ok(DataSummary { sets })
    }

    /// Deliver a synchronous result. Fatal errors are not delivered; the reply is dropped instead.
    fn answer<T>(&self, op: Operation, reply: Reply<T>, result: FitResult<T>) -> Flow {
        match result {
            Err(e) if e.is_fatal() => self.fatal(op, e),
            result => {
                // The caller may have given up waiting; nothing to do then.
                let _ = reply.send(result);
                Flow::Continue
            }
        }
    }

    /// Outcome of a fire-and-forget operation: nobody is waiting, so errors are only logged.
    fn settle(&self, op: Operation, result: FitResult<()>) -> Flow {
        match result {
            Ok(()) => Flow::Continue,
            Err(e) if e.is_fatal() => self.fatal(op, e),
            Err(e) => {
                tracing::warn!(op = op.name(), error = %e, "operation failed");
                Flow::Continue
            }
        }
    }

    fn fatal(&self, op: Operation, e: FitError) -> Flow {
        tracing::error!(op = op.name(), error = %e, "render context failed");
        match self.opts.on_fatal {
            FatalPolicy::Exit => std::process::exit(FATAL_EXIT_CODE),
            FatalPolicy::Shutdown => {
                self.queue.close();
                Flow::Stop
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/engine/dispatch.rs"]
mod tests;
