/// Convenience result type used throughout `renderfit`.
pub type FitResult<T> = Result<T, FitError>;

/// Top-level error type for `renderfit`.
///
/// Errors fall into two classes. [`FitError::Context`] means the compute/render context is in a
/// state it cannot recover from; the dispatch engine treats it as fatal. Every other variant is a
/// per-call failure that is forwarded to the caller that issued the request.
#[derive(thiserror::Error, Debug)]
pub enum FitError {
    /// Invalid user input (bad index, bad parameter file, out-of-range option).
    #[error("validation error: {0}")]
    Validation(String),

    /// Observation data could not be loaded or was rejected.
    #[error("data error: {0}")]
    Data(String),

    /// A fit was requested but no observation data is allocated.
    #[error("no data: {0}")]
    NoData(String),

    /// The compute/render context is unusable. Fatal to the dispatch loop.
    #[error("context error: {0}")]
    Context(String),

    /// A synchronous call was submitted while another one was still in flight.
    #[error("call rejected: another synchronous call is in flight")]
    CallInFlight,

    /// The dispatch engine has stopped and no longer accepts or answers requests.
    #[error("engine stopped")]
    EngineStopped,

    /// Save document (de)serialization failure.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Filesystem failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Anything else.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FitError {
    /// Build a [`FitError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`FitError::Data`] value.
    pub fn data(msg: impl Into<String>) -> Self {
        Self::Data(msg.into())
    }

    /// Build a [`FitError::NoData`] value.
    pub fn no_data(msg: impl Into<String>) -> Self {
        Self::NoData(msg.into())
    }

    /// Build a [`FitError::Context`] value.
    pub fn context(msg: impl Into<String>) -> Self {
        Self::Context(msg.into())
    }

    /// Build a [`FitError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Whether this error leaves the render context unusable.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Context(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
