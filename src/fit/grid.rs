use crate::foundation::error::{FitError, FitResult};

/// Largest number of grid points a single search may visit.
pub(crate) const GRID_POINT_LIMIT: usize = 1_000_000;

/// Result of one exhaustive grid scan.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct GridOutcome {
    /// Best point in normalized units; `None` when no point gave finite residuals.
    pub(crate) best: Option<Vec<f64>>,
    /// `‖e‖₂²` at `best`.
    pub(crate) norm2: f64,
    pub(crate) evaluated: usize,
    /// `func` asked to stop before the grid was exhausted.
    pub(crate) interrupted: bool,
}

/// Coordinate of step `k` out of `steps` on the unit interval. A single step sits at the centre.
fn node(k: usize, steps: usize) -> f64 {
    if steps == 1 {
        0.5
    } else {
        k as f64 / (steps - 1) as f64
    }
}

/// Visit every point of a `steps`-per-axis grid over the unit hypercube `[0, 1]^n` and keep the
/// one with the smallest `‖f(p)‖₂²`.
///
/// `func` writes `m` residuals and returns `false` to stop the scan. Points with non-finite
/// residuals are skipped. The first axis varies fastest.
pub(crate) fn grid_search<F>(mut func: F, n: usize, m: usize, steps: usize) -> FitResult<GridOutcome>
where
    F: FnMut(&[f64], &mut [f64]) -> bool,
{
    if n == 0 {
        return Err(FitError::validation("no free parameters to search"));
    }
    if steps == 0 {
        return Err(FitError::validation("grid needs at least one step per parameter"));
    }
    let total = u32::try_from(n)
        .ok()
        .and_then(|n| steps.checked_pow(n))
        .filter(|t| *t <= GRID_POINT_LIMIT)
        .ok_or_else(|| {
            FitError::validation(format!(
                "{steps} steps over {n} parameters exceeds {GRID_POINT_LIMIT} grid points"
            ))
        })?;

    let mut index = vec![0usize; n];
    let mut p = vec![node(0, steps); n];
    let mut e = vec![0.0; m];
    let mut out = GridOutcome {
        best: None,
        norm2: f64::NAN,
        evaluated: 0,
        interrupted: false,
    };
    for _ in 0..total {
        let go_on = func(&p, &mut e);
        out.evaluated += 1;
        if !go_on {
            out.interrupted = true;
            break;
        }
        if e.iter().all(|v| v.is_finite()) {
            let norm2: f64 = e.iter().map(|v| v * v).sum();
            if out.best.is_none() || norm2 < out.norm2 {
                out.norm2 = norm2;
                out.best = Some(p.clone());
            }
        }
        // Odometer step.
        for (k, x) in index.iter_mut().zip(p.iter_mut()) {
            *k += 1;
            if *k < steps {
                *x = node(*k, steps);
                break;
            }
            *k = 0;
            *x = node(0, steps);
        }
    }
    tracing::debug!(
        evaluated = out.evaluated,
        total,
        norm2 = out.norm2,
        "grid search finished"
    );
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/fit/grid.rs"]
mod tests;
