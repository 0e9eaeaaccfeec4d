//! JSON save documents for model lists.
//!
//! Layout: one entry per model holding its type tag and parameter block, a position sub-block with
//! its own type tag, and an optional shader sub-block. Every value, bound, and free flag
//! round-trips exactly.

use crate::foundation::error::{FitError, FitResult};
use crate::params::set::Parameter;
use crate::scene::list::ModelList;
use crate::scene::model::{Model, ModelKind};
use crate::scene::position::PositionKind;
use crate::scene::shader::ShaderKind;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct SaveDoc {
    #[serde(default)]
    time: f64,
    #[serde(default = "default_timestep")]
    timestep: f64,
    models: Vec<ModelDoc>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct ModelDoc {
    #[serde(rename = "type")]
    kind: ModelKind,
    params: Vec<Parameter>,
    position: BlockDoc<PositionKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    shader: Option<BlockDoc<ShaderKind>>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct BlockDoc<K> {
    #[serde(rename = "type")]
    kind: K,
    params: Vec<Parameter>,
}

fn default_timestep() -> f64 {
    ModelList::default().timestep()
}

impl ModelList {
    fn to_doc(&self) -> SaveDoc {
        SaveDoc {
            time: self.time(),
            timestep: self.timestep(),
            models: self
                .iter()
                .map(|m| ModelDoc {
                    kind: m.kind(),
                    params: m.params().as_slice().to_vec(),
                    position: BlockDoc {
                        kind: m.position().kind(),
                        params: m.position().params().as_slice().to_vec(),
                    },
                    shader: m.shader().map(|s| BlockDoc {
                        kind: s.kind(),
                        params: s.params().as_slice().to_vec(),
                    }),
                })
                .collect(),
        }
    }

    fn from_doc(doc: &SaveDoc) -> FitResult<Self> {
        let mut list = ModelList::new();
        list.set_time(doc.time);
        list.set_timestep(doc.timestep);
        for (i, md) in doc.models.iter().enumerate() {
            let mut model = Model::new(md.kind);
            model.set_position_kind(md.position.kind);
            model.set_shader(md.shader.as_ref().map(|s| s.kind));
            model
                .params_mut()
                .restore(&md.params)
                .map_err(|e| FitError::serde(format!("model {i}: {e}")))?;
            model
                .position_mut()
                .params_mut()
                .restore(&md.position.params)
                .map_err(|e| FitError::serde(format!("model {i} position: {e}")))?;
            if let (Some(shader), Some(sd)) = (model.shader_mut(), md.shader.as_ref()) {
                shader
                    .params_mut()
                    .restore(&sd.params)
                    .map_err(|e| FitError::serde(format!("model {i} shader: {e}")))?;
            }
            list.push(model);
        }
        Ok(list)
    }

    pub fn to_json_string(&self) -> FitResult<String> {
        serde_json::to_string_pretty(&self.to_doc())
            .map_err(|e| FitError::serde(format!("encode save document: {e}")))
    }

    pub fn from_reader<R: std::io::Read>(r: R) -> FitResult<Self> {
        let doc: SaveDoc = serde_json::from_reader(r)
            .map_err(|e| FitError::serde(format!("parse save document: {e}")))?;
        Self::from_doc(&doc)
    }

    pub fn from_path(path: impl AsRef<Path>) -> FitResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            FitError::validation(format!("open save file '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> FitResult<()> {
        let path = path.as_ref();
        let mut w = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut w, &self.to_doc())
            .map_err(|e| FitError::serde(format!("write '{}': {e}", path.display())))?;
        w.flush()?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/save.rs"]
mod tests;
