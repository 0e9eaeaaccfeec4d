//! renderfit fits parametric sky models to observations by rendering candidate models and
//! comparing the rendered images against the data.
//!
//! All access to the render context is funnelled through one consumer thread:
//!
//! - An [`Engine`] owns the [`RenderContext`] and serves a priority queue of [`Operation`]s
//! - Callers submit work through an [`EngineHandle`], fire-and-forget or as a blocking call
//! - A [`Minimizer`] drives the free parameters of the scene ([`FreeParams`]) through the engine
//!   with a bound-constrained Levenberg-Marquardt solver, a grid scan or a bootstrap around the
//!   solver, cancellable through a [`CancelToken`]
//! - [`FitSession`] ties the pieces together for interactive use
#![forbid(unsafe_code)]

mod foundation;

pub(crate) mod data;
pub(crate) mod engine;
pub(crate) mod fit;
pub(crate) mod params;
pub(crate) mod render;
pub(crate) mod scene;
pub(crate) mod session;

pub use crate::foundation::core::{FrameF32, ImageSize};
pub use crate::foundation::error::{FitError, FitResult};

pub use crate::data::observation::{DataSource, ObservationPoint, ObservationSet};
pub use crate::engine::command::{DataSetInfo, DataSummary};
pub use crate::engine::context::RenderContext;
pub use crate::engine::dispatch::{
    Engine, EngineHandle, EngineOpts, FATAL_EXIT_CODE, FatalPolicy,
};
pub use crate::engine::op::{Operation, Step};
pub use crate::fit::cancel::CancelToken;
pub use crate::fit::exit::{SolverExit, USER_TERMINATED};
pub use crate::fit::lm::{LevmarOpts, LevmarOutcome, levmar_bc};
pub use crate::fit::minimizer::{DEFAULT_SAVE_BASENAME, Minimizer, MinimizerKind, MinimizerOpts};
pub use crate::fit::report::{
    BenchmarkReport, BootstrapEstimate, BootstrapReport, FitReport, GridReport,
    ParameterEstimate, RunOutcome, SetStatistic,
};
pub use crate::params::aggregate::FreeParams;
pub use crate::params::set::{Parameter, ParameterSet, Units};
pub use crate::render::raster::{RasterContext, RasterOpts};
pub use crate::scene::list::{ModelList, SharedScene};
pub use crate::scene::model::{Model, ModelKind};
pub use crate::scene::position::{Position, PositionKind};
pub use crate::scene::shader::{Shader, ShaderKind};
pub use crate::session::{FitSession, SessionOpts};
