use crate::foundation::math::eccentric_anomaly;
use crate::params::set::{Parameter, ParameterSet};

/// How a model is placed on the sky.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionKind {
    /// Static offset in the sky plane.
    Xy,
    /// Static offset with depth.
    Xyz,
    /// Keplerian relative orbit evaluated at the scene time.
    Orbit,
}

impl PositionKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Xy => "xy",
            Self::Xyz => "xyz",
            Self::Orbit => "orbit",
        }
    }

    fn default_params(self) -> Vec<Parameter> {
        match self {
            Self::Xy => vec![
                Parameter::new("x", 0.0, -100.0, 100.0),
                Parameter::new("y", 0.0, -100.0, 100.0),
            ],
            Self::Xyz => vec![
                Parameter::new("x", 0.0, -100.0, 100.0),
                Parameter::new("y", 0.0, -100.0, 100.0),
                Parameter::new("z", 0.0, -100.0, 100.0),
            ],
            Self::Orbit => vec![
                Parameter::new("Omega", 0.0, 0.0, 360.0),
                Parameter::new("inclination", 0.0, 0.0, 180.0),
                Parameter::new("omega", 0.0, 0.0, 360.0),
                Parameter::new("alpha", 1.0, 0.0, 100.0),
                Parameter::new("e", 0.0, 0.0, 0.99),
                Parameter::new("tau", 0.0, -1.0e6, 1.0e6),
                Parameter::new("period", 1.0, 1.0e-3, 1.0e5),
            ],
        }
    }
}

/// Position sub-object owned by a model.
#[derive(Clone, Debug, PartialEq)]
pub struct Position {
    kind: PositionKind,
    pub(crate) params: ParameterSet,
}

impl Position {
    pub fn new(kind: PositionKind) -> Self {
        Self {
            kind,
            params: ParameterSet::new(kind.name(), kind.default_params()),
        }
    }

    pub fn kind(&self) -> PositionKind {
        self.kind
    }

    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut ParameterSet {
        &mut self.params
    }

    fn p(&self, name: &str) -> f64 {
        self.params.value(name).unwrap_or(0.0)
    }

    /// Sky-plane offset `(x east, y north)` and depth `z` at time `t`.
    pub fn xyz(&self, t: f64) -> (f64, f64, f64) {
        match self.kind {
            PositionKind::Xy => (self.p("x"), self.p("y"), 0.0),
            PositionKind::Xyz => (self.p("x"), self.p("y"), self.p("z")),
            PositionKind::Orbit => self.orbit_xyz(t),
        }
    }

    fn orbit_xyz(&self, t: f64) -> (f64, f64, f64) {
        let big_omega = self.p("Omega").to_radians();
        let inc = self.p("inclination").to_radians();
        let omega = self.p("omega").to_radians();
        let alpha = self.p("alpha");
        let e = self.p("e");
        let tau = self.p("tau");
        let period = self.p("period");

        let mean = std::f64::consts::TAU * (t - tau) / period;
        let big_e = eccentric_anomaly(mean, e);
        let nu = 2.0
            * ((1.0 + e).sqrt() * (big_e / 2.0).sin())
                .atan2((1.0 - e).sqrt() * (big_e / 2.0).cos());
        let r = alpha * (1.0 - e * big_e.cos());
        let (s, c) = (omega + nu).sin_cos();

        let x = r * (big_omega.sin() * c + big_omega.cos() * s * inc.cos());
        let y = r * (big_omega.cos() * c - big_omega.sin() * s * inc.cos());
        let z = r * s * inc.sin();
        (x, y, z)
    }

    /// `(inclination, position angle)` implied by an orbit, in degrees.
    pub fn orbit_angles(&self) -> Option<(f64, f64)> {
        match self.kind {
            PositionKind::Orbit => Some((self.p("inclination"), self.p("Omega"))),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/position.rs"]
mod tests;
