use crate::data::observation::{DataSource, ObservationSet};
use crate::engine::op::Operation;
use crate::foundation::core::{FrameF32, ImageSize};
use crate::foundation::error::FitResult;
use crossbeam_channel::Sender;
use std::path::PathBuf;

/// One-shot reply channel for a synchronous call.
pub(crate) type Reply<T> = Sender<FitResult<T>>;

/// Per-set facts the optimizer needs before it starts evaluating residuals.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DataSetInfo {
    /// Characteristic time the scene clock is set to before rendering this set.
    pub ave_time: f64,
    /// Number of residual slots the set occupies.
    pub allocated: usize,
}

/// Snapshot of the data loaded into the context.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DataSummary {
    pub sets: Vec<DataSetInfo>,
}

impl DataSummary {
    pub fn total_allocated(&self) -> usize {
        self.sets.iter().map(|s| s.allocated).sum()
    }

    /// Offset of each set in a flat residual vector.
    pub fn offsets(&self) -> Vec<usize> {
        self.sets
            .iter()
            .scan(0, |acc, s| {
                let at = *acc;
                *acc += s.allocated;
                Some(at)
            })
            .collect()
    }
}

/// A request travelling through the queue: its operation, its payload, and where to answer.
pub(crate) enum Command {
    /// `start` is set for a user request and clear for the engine's own next frame.
    Animate { start: bool },
    Blit,
    Render { reply: Option<Reply<()>> },
    Resize(ImageSize),
    Residuals { set: usize, reply: Reply<Vec<f64>> },
    Statistic { set: usize, reply: Reply<f64> },
    LogLike { set: usize, reply: Reply<f64> },
    Flux { reply: Reply<f64> },
    CopyImage { reply: Reply<FrameF32> },
    SaveImage { path: PathBuf, reply: Reply<()> },
    Simulate { set: usize, reply: Reply<Vec<f64>> },
    DataInfo { reply: Reply<DataSummary> },
    LoadData { source: DataSource, reply: Reply<usize> },
    ReplaceData {
        set: usize,
        data: ObservationSet,
        reply: Reply<()>,
    },
    RemoveData { set: usize, reply: Reply<()> },
    AnimateStop,
    Stop,
}

impl Command {
    pub(crate) fn op(&self) -> Operation {
        match self {
            Self::Animate { .. } => Operation::Animate,
            Self::Blit => Operation::BlitToScreen,
            Self::Render { .. } => Operation::RenderModels,
            Self::Resize(_) => Operation::Resize,
            Self::Residuals { .. } => Operation::ComputeResiduals,
            Self::Statistic { .. } => Operation::ComputeStatistic,
            Self::LogLike { .. } => Operation::ComputeLogLike,
            Self::Flux { .. } => Operation::ComputeFlux,
            Self::CopyImage { .. } => Operation::CopyImage,
            Self::SaveImage { .. } => Operation::SaveImage,
            Self::Simulate { .. } => Operation::SimulateData,
            Self::DataInfo { .. } => Operation::DataInfo,
            Self::LoadData { .. } => Operation::LoadData,
            Self::ReplaceData { .. } => Operation::ReplaceData,
            Self::RemoveData { .. } => Operation::RemoveData,
            Self::AnimateStop => Operation::AnimateStop,
            Self::Stop => Operation::Stop,
        }
    }
}
