use crate::foundation::error::{FitError, FitResult};
use crate::params::set::{ParameterSet, Units};

/// A composition of [`ParameterSet`]s presented as one flat vector of free parameters.
///
/// Implementors only describe *which* sets they own and in what order; every provided method
/// walks them through [`FreeParams::for_each_set`], so offsets stay stable across calls as long
/// as the traversal order is fixed. Composites simply delegate to their children, which gives
/// arbitrary nesting depth.
pub trait FreeParams {
    /// Visit owned sets in the fixed traversal order.
    fn for_each_set(&self, f: &mut dyn FnMut(&ParameterSet));

    /// Mutable twin of [`FreeParams::for_each_set`]; must use the same order.
    fn for_each_set_mut(&mut self, f: &mut dyn FnMut(&mut ParameterSet));

    /// Hook run once a scatter has written every owned set.
    fn after_scatter(&mut self) {}

    fn count_free(&self) -> usize {
        let mut n = 0;
        self.for_each_set(&mut |s| n += s.free_count());
        n
    }

    fn gather_free(&self, out: &mut [f64], units: Units) -> FitResult<()> {
        check_len(self.count_free(), out.len())?;
        let mut offset = 0;
        self.for_each_set(&mut |s| offset += s.gather_free(&mut out[offset..], units));
        Ok(())
    }

    fn scatter_free(&mut self, input: &[f64], units: Units) -> FitResult<()> {
        check_len(self.count_free(), input.len())?;
        let mut offset = 0;
        self.for_each_set_mut(&mut |s| offset += s.scatter_free(&input[offset..], units));
        self.after_scatter();
        Ok(())
    }

    fn free_values(&self, units: Units) -> Vec<f64> {
        let mut out = vec![0.0; self.count_free()];
        let mut offset = 0;
        self.for_each_set(&mut |s| offset += s.gather_free(&mut out[offset..], units));
        out
    }

    fn names_free(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.for_each_set(&mut |s| s.push_free_names(&mut out));
        out
    }

    fn bounds_free(&self) -> Vec<(f64, f64)> {
        let mut out = Vec::new();
        self.for_each_set(&mut |s| s.push_free_bounds(&mut out));
        out
    }
}

fn check_len(expected: usize, got: usize) -> FitResult<()> {
    if expected != got {
        return Err(FitError::validation(format!(
            "free parameter vector has length {got}, expected {expected}"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/params/aggregate.rs"]
mod tests;
