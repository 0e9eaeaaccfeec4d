use crate::params::aggregate::FreeParams;
use crate::params::set::{Parameter, ParameterSet};
use crate::scene::position::{Position, PositionKind};
use crate::scene::shader::{Shader, ShaderKind};

/// Catalogue of renderable model shapes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Limb-darkened sphere (uses the shader if present).
    Sphere,
    /// Uniform disk.
    UniformDisk,
    /// Circular gaussian, sized by its FWHM.
    Gaussian,
}

impl ModelKind {
    pub const ALL: [ModelKind; 3] = [Self::Sphere, Self::UniformDisk, Self::Gaussian];

    pub fn name(self) -> &'static str {
        match self {
            Self::Sphere => "sphere",
            Self::UniformDisk => "uniform_disk",
            Self::Gaussian => "gaussian",
        }
    }

    fn default_params(self) -> Vec<Parameter> {
        let mut params = vec![
            Parameter::new("inclination", 0.0, 0.0, 180.0),
            Parameter::new("position_angle", 0.0, 0.0, 360.0),
            Parameter::new("rotation", 0.0, 0.0, 360.0),
        ];
        match self {
            Self::Sphere | Self::UniformDisk => {
                params.push(Parameter::new("diameter", 1.0, 0.01, 100.0));
            }
            Self::Gaussian => params.push(Parameter::new("fwhm", 1.0, 0.01, 100.0)),
        }
        params
    }
}

/// A renderable model: its own parameters, a position, and an optional shader.
///
/// Free parameters are traversed in the order model, position, shader.
#[derive(Clone, Debug, PartialEq)]
pub struct Model {
    kind: ModelKind,
    pub(crate) params: ParameterSet,
    pub(crate) position: Position,
    pub(crate) shader: Option<Shader>,
}

impl Model {
    /// New model at an XY position with no shader.
    pub fn new(kind: ModelKind) -> Self {
        Self {
            kind,
            params: ParameterSet::new(kind.name(), kind.default_params()),
            position: Position::new(PositionKind::Xy),
            shader: None,
        }
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut ParameterSet {
        &mut self.params
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn position_mut(&mut self) -> &mut Position {
        &mut self.position
    }

    pub fn shader(&self) -> Option<&Shader> {
        self.shader.as_ref()
    }

    pub fn shader_mut(&mut self) -> Option<&mut Shader> {
        self.shader.as_mut()
    }

    /// Swap the position sub-object. Keeping the same kind is a no-op.
    pub fn set_position_kind(&mut self, kind: PositionKind) {
        if self.position.kind() != kind {
            self.position = Position::new(kind);
        }
    }

    pub fn set_shader(&mut self, kind: Option<ShaderKind>) {
        self.shader = kind.map(Shader::new);
    }

    pub(crate) fn relabel(&mut self, index: usize) {
        self.params.set_owner(format!("m{index}.{}", self.kind.name()));
        self.position
            .params
            .set_owner(format!("m{index}.{}", self.position.kind().name()));
        if let Some(shader) = self.shader.as_mut() {
            shader
                .params
                .set_owner(format!("m{index}.{}", shader.kind().name()));
        }
    }

    /// Size parameter of the shape (diameter or FWHM).
    pub fn size(&self) -> f64 {
        match self.kind {
            ModelKind::Sphere | ModelKind::UniformDisk => self.params.value("diameter"),
            ModelKind::Gaussian => self.params.value("fwhm"),
        }
        .unwrap_or(0.0)
    }
}

impl FreeParams for Model {
    fn for_each_set(&self, f: &mut dyn FnMut(&ParameterSet)) {
        f(&self.params);
        f(&self.position.params);
        if let Some(shader) = &self.shader {
            f(&shader.params);
        }
    }

    fn for_each_set_mut(&mut self, f: &mut dyn FnMut(&mut ParameterSet)) {
        f(&mut self.params);
        f(&mut self.position.params);
        if let Some(shader) = &mut self.shader {
            f(&mut shader.params);
        }
    }

    /// Orbits dictate the orientation of models that do not fit it themselves.
    fn after_scatter(&mut self) {
        let Some((inclination, position_angle)) = self.position.orbit_angles() else {
            return;
        };
        if !self.params.is_free("inclination") {
            self.params.force_value("inclination", inclination);
        }
        if !self.params.is_free("position_angle") {
            self.params.force_value("position_angle", position_angle);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/model.rs"]
mod tests;
