use crate::params::set::{Parameter, ParameterSet};

/// Limb-darkening laws applied to surfaces that have a notion of `mu = cos(theta)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShaderKind {
    LinearLimbDarkening,
    QuadraticLimbDarkening,
    PowerLawLimbDarkening,
}

impl ShaderKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::LinearLimbDarkening => "ld_linear",
            Self::QuadraticLimbDarkening => "ld_quadratic",
            Self::PowerLawLimbDarkening => "ld_power",
        }
    }

    fn default_params(self) -> Vec<Parameter> {
        match self {
            Self::LinearLimbDarkening => vec![Parameter::new("a", 0.5, 0.0, 1.0)],
            Self::QuadraticLimbDarkening => vec![
                Parameter::new("a", 0.3, 0.0, 1.0),
                Parameter::new("b", 0.2, 0.0, 1.0),
            ],
            Self::PowerLawLimbDarkening => vec![Parameter::new("alpha", 0.2, 0.0, 1.0)],
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Shader {
    kind: ShaderKind,
    pub(crate) params: ParameterSet,
}

impl Shader {
    pub fn new(kind: ShaderKind) -> Self {
        Self {
            kind,
            params: ParameterSet::new(kind.name(), kind.default_params()),
        }
    }

    pub fn kind(&self) -> ShaderKind {
        self.kind
    }

    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut ParameterSet {
        &mut self.params
    }

    /// Relative intensity at `mu` in `[0, 1]`; 1 at disk center.
    pub fn intensity(&self, mu: f64) -> f64 {
        let mu = mu.clamp(0.0, 1.0);
        let v = |n: &str| self.params.value(n).unwrap_or(0.0);
        match self.kind {
            ShaderKind::LinearLimbDarkening => 1.0 - v("a") * (1.0 - mu),
            ShaderKind::QuadraticLimbDarkening => {
                let k = 1.0 - mu;
                1.0 - v("a") * k - v("b") * k * k
            }
            ShaderKind::PowerLawLimbDarkening => mu.powf(v("alpha")),
        }
    }
}
