/// Closed set of operations the dispatch engine understands.
///
/// The discriminant is the priority: the queue always serves the highest ordinal first and breaks
/// ties by submission order. `Stop` sits at the top so a pending stop is served right after the
/// operation currently executing, however many renders are queued. `Animate` sits at the bottom
/// so any other request preempts a running animation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Operation {
    Animate = 0,
    BlitToScreen = 1,
    RenderModels = 2,
    Resize = 3,
    ComputeResiduals = 4,
    ComputeStatistic = 5,
    ComputeLogLike = 6,
    ComputeFlux = 7,
    CopyImage = 8,
    SaveImage = 9,
    SimulateData = 10,
    DataInfo = 11,
    LoadData = 12,
    ReplaceData = 13,
    RemoveData = 14,
    AnimateStop = 15,
    Stop = 16,
}

/// One sub-step of an operation's cascade.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// Apply the pending image size to the context.
    ApplyResize,
    /// Advance the scene clock by one timestep.
    AdvanceTime,
    /// Render the scene into the context's back buffer.
    Render,
    /// Present the back buffer.
    Blit,
}

impl Operation {
    pub const ALL: [Operation; 17] = [
        Self::Animate,
        Self::BlitToScreen,
        Self::RenderModels,
        Self::Resize,
        Self::ComputeResiduals,
        Self::ComputeStatistic,
        Self::ComputeLogLike,
        Self::ComputeFlux,
        Self::CopyImage,
        Self::SaveImage,
        Self::SimulateData,
        Self::DataInfo,
        Self::LoadData,
        Self::ReplaceData,
        Self::RemoveData,
        Self::AnimateStop,
        Self::Stop,
    ];

    pub fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        Self::ALL.get(usize::from(ordinal)).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Animate => "animate",
            Self::BlitToScreen => "blit_to_screen",
            Self::RenderModels => "render_models",
            Self::Resize => "resize",
            Self::ComputeResiduals => "compute_residuals",
            Self::ComputeStatistic => "compute_statistic",
            Self::ComputeLogLike => "compute_log_like",
            Self::ComputeFlux => "compute_flux",
            Self::CopyImage => "copy_image",
            Self::SaveImage => "save_image",
            Self::SimulateData => "simulate_data",
            Self::DataInfo => "data_info",
            Self::LoadData => "load_data",
            Self::ReplaceData => "replace_data",
            Self::RemoveData => "remove_data",
            Self::AnimateStop => "animate_stop",
            Self::Stop => "stop",
        }
    }

    /// Steps executed, in order, within the single dequeue of this operation.
    ///
    /// Nothing else from the queue can run between the steps of one cascade, so e.g. a resize is
    /// always followed by its re-render and blit.
    pub fn cascade(self) -> &'static [Step] {
        match self {
            Self::Resize => &[Step::ApplyResize, Step::Render, Step::Blit],
            Self::RenderModels | Self::AnimateStop => &[Step::Render, Step::Blit],
            Self::BlitToScreen => &[Step::Blit],
            Self::Animate => &[Step::AdvanceTime, Step::Render, Step::Blit],
            _ => &[],
        }
    }
}
