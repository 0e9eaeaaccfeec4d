use crate::foundation::error::{FitError, FitResult};
use crate::params::aggregate::FreeParams;
use crate::params::set::ParameterSet;
use crate::scene::model::{Model, ModelKind};
use crate::scene::position::PositionKind;
use crate::scene::shader::ShaderKind;
use parking_lot::Mutex;
use std::sync::Arc;

/// Scene shared between the dispatch engine (which renders it) and the thread that currently
/// drives parameter updates.
pub type SharedScene = Arc<Mutex<ModelList>>;

/// Ordered list of models plus the scene clock.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelList {
    models: Vec<Model>,
    time: f64,
    timestep: f64,
}

impl Default for ModelList {
    fn default() -> Self {
        Self {
            models: Vec::new(),
            time: 0.0,
            timestep: 0.05,
        }
    }
}

impl ModelList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(self) -> SharedScene {
        Arc::new(Mutex::new(self))
    }

    /// Append a model of `kind` at an XY position with no shader. Returns its index.
    pub fn add_model(&mut self, kind: ModelKind) -> usize {
        self.push(Model::new(kind))
    }

    pub fn push(&mut self, mut model: Model) -> usize {
        let index = self.models.len();
        model.relabel(index);
        self.models.push(model);
        index
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Model> {
        self.models.iter()
    }

    pub fn get(&self, index: usize) -> FitResult<&Model> {
        self.models
            .get(index)
            .ok_or_else(|| FitError::validation(format!("no model with index {index}")))
    }

    pub fn get_mut(&mut self, index: usize) -> FitResult<&mut Model> {
        self.models
            .get_mut(index)
            .ok_or_else(|| FitError::validation(format!("no model with index {index}")))
    }

    pub fn clear(&mut self) {
        self.models.clear();
    }

    pub fn set_position_kind(&mut self, index: usize, kind: PositionKind) -> FitResult<()> {
        let model = self.get_mut(index)?;
        model.set_position_kind(kind);
        model.relabel(index);
        Ok(())
    }

    pub fn set_shader(&mut self, index: usize, kind: Option<ShaderKind>) -> FitResult<()> {
        let model = self.get_mut(index)?;
        model.set_shader(kind);
        model.relabel(index);
        Ok(())
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn set_time(&mut self, t: f64) {
        self.time = t;
    }

    pub fn timestep(&self) -> f64 {
        self.timestep
    }

    pub fn set_timestep(&mut self, dt: f64) {
        self.timestep = dt;
    }

    /// Advance the clock by one timestep (animation).
    pub fn increment_time(&mut self) {
        self.time += self.timestep;
    }
}

impl FreeParams for ModelList {
    fn for_each_set(&self, f: &mut dyn FnMut(&ParameterSet)) {
        for m in &self.models {
            m.for_each_set(f);
        }
    }

    fn for_each_set_mut(&mut self, f: &mut dyn FnMut(&mut ParameterSet)) {
        for m in &mut self.models {
            m.for_each_set_mut(f);
        }
    }

    fn after_scatter(&mut self) {
        for m in &mut self.models {
            m.after_scatter();
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/list.rs"]
mod tests;
