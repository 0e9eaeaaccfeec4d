use crate::foundation::error::{FitError, FitResult};
use crate::foundation::math::{scale, unscale};

/// Unit system used when moving free parameters in and out of a [`ParameterSet`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Units {
    /// Physical units, exactly as stored.
    Native,
    /// Each free parameter mapped onto `[0, 1]` through its bounds.
    Normalized,
}

/// One named scalar parameter.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: f64,
    pub min: f64,
    pub max: f64,
    pub free: bool,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: f64, min: f64, max: f64) -> Self {
        Self {
            name: name.into(),
            value,
            min,
            max,
            free: false,
        }
    }

    /// Value mapped onto the unit interval.
    pub fn normalized(&self) -> f64 {
        unscale(self.value, self.min, self.max)
    }

    fn store(&mut self, v: f64, units: Units) {
        let native = match units {
            Units::Native => v,
            Units::Normalized => scale(v, self.min, self.max),
        };
        self.value = native.clamp(self.min, self.max);
    }
}

/// Fixed-length, ordered parameter vector belonging to one owner (a model, a position, a shader).
///
/// The length is set at construction and never changes. Free parameters obey
/// `min <= value <= max`; fixed parameters are never varied and may sit anywhere.
#[derive(Clone, Debug, PartialEq)]
pub struct ParameterSet {
    owner: String,
    params: Vec<Parameter>,
}

impl ParameterSet {
    /// A set owned by `owner`; its length is fixed from here on.
    pub fn new(owner: impl Into<String>, params: Vec<Parameter>) -> Self {
        Self {
            owner: owner.into(),
            params,
        }
    }

    /// Prefix used in free-parameter names, e.g. `m0.uniform_disk`.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub(crate) fn set_owner(&mut self, owner: String) {
        self.owner = owner;
    }

    /// Number of parameters, free or fixed.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Parameters in their fixed order.
    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter()
    }

    pub fn as_slice(&self) -> &[Parameter] {
        &self.params
    }

    /// Position of the named parameter, for the index-based setters.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p.name == name)
    }

    /// The named parameter, if this set has one.
    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Native value of the named parameter.
    pub fn value(&self, name: &str) -> Option<f64> {
        self.get(name).map(|p| p.value)
    }

    /// Whether the named parameter is varied by minimizers. Unknown names are fixed.
    pub fn is_free(&self, name: &str) -> bool {
        self.get(name).is_some_and(|p| p.free)
    }

    fn slot(&mut self, index: usize) -> FitResult<&mut Parameter> {
        let owner = &self.owner;
        let len = self.params.len();
        self.params.get_mut(index).ok_or_else(|| {
            FitError::validation(format!(
                "parameter index {index} out of range for '{owner}' ({len} parameters)"
            ))
        })
    }

    /// Set a native value. Free parameters are clamped into their bounds.
    pub fn set_value(&mut self, index: usize, value: f64) -> FitResult<()> {
        if !value.is_finite() {
            return Err(FitError::validation("parameter value must be finite"));
        }
        let p = self.slot(index)?;
        p.value = if p.free {
            value.clamp(p.min, p.max)
        } else {
            value
        };
        Ok(())
    }

    /// Overwrite a value without clamping. Used for derived (coupled) parameters.
    pub(crate) fn force_value(&mut self, name: &str, value: f64) {
        if let Some(p) = self.params.iter_mut().find(|p| p.name == name) {
            p.value = value;
        }
    }

    /// Mark a parameter free or fixed. Freeing it clamps the value into its bounds.
    pub fn set_free(&mut self, index: usize, free: bool) -> FitResult<()> {
        let p = self.slot(index)?;
        p.free = free;
        if free {
            p.value = p.value.clamp(p.min, p.max);
        }
        Ok(())
    }

    /// Change the bounds; a free value is clamped into the new range.
    pub fn set_bounds(&mut self, index: usize, min: f64, max: f64) -> FitResult<()> {
        if !(min.is_finite() && max.is_finite()) || min > max {
            return Err(FitError::validation(format!(
                "invalid bounds [{min}, {max}]: min must be <= max and both finite"
            )));
        }
        let p = self.slot(index)?;
        p.min = min;
        p.max = max;
        if p.free {
            p.value = p.value.clamp(min, max);
        }
        Ok(())
    }

    /// Replace every parameter from a stored block. Names and length must match exactly.
    pub(crate) fn restore(&mut self, stored: &[Parameter]) -> FitResult<()> {
        if stored.len() != self.params.len() {
            return Err(FitError::serde(format!(
                "'{}' expects {} parameters, found {}",
                self.owner,
                self.params.len(),
                stored.len()
            )));
        }
        for (dst, src) in self.params.iter().zip(stored) {
            if dst.name != src.name {
                return Err(FitError::serde(format!(
                    "'{}' parameter mismatch: expected '{}', found '{}'",
                    self.owner, dst.name, src.name
                )));
            }
        }
        self.params = stored.to_vec();
        Ok(())
    }

    /// Number of free parameters.
    pub fn free_count(&self) -> usize {
        self.params.iter().filter(|p| p.free).count()
    }

    /// Write free values contiguously into `out`; returns how many were written.
    ///
    /// `out` must hold at least [`ParameterSet::free_count`] values.
    pub(crate) fn gather_free(&self, out: &mut [f64], units: Units) -> usize {
        let mut n = 0;
        for p in self.params.iter().filter(|p| p.free) {
            out[n] = match units {
                Units::Native => p.value,
                Units::Normalized => p.normalized(),
            };
            n += 1;
        }
        n
    }

    /// Read free values from the front of `input`; returns how many were consumed.
    ///
    /// `input` must hold at least [`ParameterSet::free_count`] values.
    pub(crate) fn scatter_free(&mut self, input: &[f64], units: Units) -> usize {
        let mut n = 0;
        for p in self.params.iter_mut().filter(|p| p.free) {
            p.store(input[n], units);
            n += 1;
        }
        n
    }

    pub(crate) fn push_free_names(&self, out: &mut Vec<String>) {
        for p in self.params.iter().filter(|p| p.free) {
            out.push(format!("{}.{}", self.owner, p.name));
        }
    }

    pub(crate) fn push_free_bounds(&self, out: &mut Vec<(f64, f64)>) {
        for p in self.params.iter().filter(|p| p.free) {
            out.push((p.min, p.max));
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/params/set.rs"]
mod tests;
