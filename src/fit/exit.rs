/// Why the Levenberg-Marquardt solver stopped.
///
/// Codes and messages follow levmar's `info[6]` so reports stay comparable with levmar output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum SolverExit {
    SmallGradient = 1,
    SmallStep = 2,
    MaxIterations = 3,
    Singular = 4,
    NoReduction = 5,
    SmallResidual = 6,
    InvalidResidual = 7,
}

/// Message substituted for [`SolverExit::InvalidResidual`] when the run was cancelled.
pub const USER_TERMINATED: &str = "terminated by user request";

impl SolverExit {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            1 => Self::SmallGradient,
            2 => Self::SmallStep,
            3 => Self::MaxIterations,
            4 => Self::Singular,
            5 => Self::NoReduction,
            6 => Self::SmallResidual,
            7 => Self::InvalidResidual,
            _ => return None,
        })
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::SmallGradient => "stopped by small gradient J^T e",
            Self::SmallStep => "stopped by small Dp",
            Self::MaxIterations => "stopped by itmax",
            Self::Singular => "singular matrix. Restart from current p with increased mu",
            Self::NoReduction => {
                "no further error reduction is possible. Restart with increased mu"
            }
            Self::SmallResidual => "stopped by small ||e||_2",
            Self::InvalidResidual => {
                "stopped by invalid (i.e. NaN or Inf) \"func\" values. This is a user error"
            }
        }
    }

    /// Operator-facing message; a cancelled run reports [`USER_TERMINATED`] instead of code 7.
    pub fn describe(self, cancelled: bool) -> &'static str {
        if cancelled && self == Self::InvalidResidual {
            USER_TERMINATED
        } else {
            self.message()
        }
    }

    /// Whether the solver stopped because it met a convergence criterion.
    pub fn converged(self) -> bool {
        matches!(
            self,
            Self::SmallGradient | Self::SmallStep | Self::SmallResidual
        )
    }
}

impl std::fmt::Display for SolverExit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code(), self.message())
    }
}
