use crate::fit::exit::SolverExit;
use crate::foundation::error::{FitError, FitResult};
use nalgebra::{DMatrix, DVector};

/// Tuning of the bound-constrained Levenberg-Marquardt solver.
///
/// Field meanings follow levmar's `opts[]` array.
#[derive(Clone, Debug, PartialEq)]
pub struct LevmarOpts {
    pub max_iterations: usize,
    /// Scale factor of the initial damping, `mu0 = mu * max(diag(JᵀJ))`.
    pub mu: f64,
    /// Stop when `‖Jᵀe‖∞` falls below this.
    pub eps1: f64,
    /// Stop when `‖Δp‖₂` falls below `eps2 · ‖p‖₂`.
    pub eps2: f64,
    /// Stop when `‖e‖₂²` falls below this.
    pub eps3: f64,
    /// Smallest forward-difference step for the Jacobian.
    pub delta: f64,
}

impl Default for LevmarOpts {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            mu: 1e-3,
            eps1: 1e-17,
            eps2: 1e-17,
            eps3: 1e-17,
            delta: 1e-6,
        }
    }
}

/// Result of one solver run.
#[derive(Clone, Debug)]
pub struct LevmarOutcome {
    /// Best parameters found; always inside the bounds.
    pub p: Vec<f64>,
    pub iterations: usize,
    /// Residual function calls, Jacobian columns included.
    pub evaluations: usize,
    pub exit: SolverExit,
    /// `‖e‖₂²` at the starting point.
    pub initial_norm2: f64,
    /// `‖e‖₂²` at `p`.
    pub norm2: f64,
    /// Residuals at `p`; empty if the very first evaluation was invalid.
    pub residuals: Vec<f64>,
    /// Forward-difference Jacobian at `p`, when it could be evaluated.
    pub jacobian: Option<DMatrix<f64>>,
}

// levmar keeps `nu` in an int and gives up when doubling overflows.
const NU_LIMIT: f64 = i32::MAX as f64;

/// Minimize `‖f(p)‖₂²` subject to `lower ≤ p ≤ upper`, with a forward-difference Jacobian.
///
/// `func` writes `m` residuals for the candidate `p`. A non-finite residual stops the solver with
/// [`SolverExit::InvalidResidual`]; callers use that to abort a run from inside `func`.
pub fn levmar_bc<F>(
    func: F,
    p0: &[f64],
    m: usize,
    lower: &[f64],
    upper: &[f64],
    opts: &LevmarOpts,
) -> FitResult<LevmarOutcome>
where
    F: FnMut(&[f64], &mut [f64]),
{
    let n = p0.len();
    if n == 0 {
        return Err(FitError::validation("no free parameters to fit"));
    }
    if m < n {
        return Err(FitError::validation(format!(
            "cannot fit {n} parameters with {m} residuals"
        )));
    }
    if lower.len() != n || upper.len() != n {
        return Err(FitError::validation("bounds must match the parameter count"));
    }
    if lower
        .iter()
        .zip(upper)
        .any(|(lo, hi)| lo.partial_cmp(hi).is_none_or(|o| o.is_gt()))
    {
        return Err(FitError::validation("lower bound above upper bound"));
    }

    let mut solver = Solver {
        func,
        lower,
        upper,
        opts,
        m,
        evaluations: 0,
    };

    let mut p = DVector::from_column_slice(p0);
    solver.project(&mut p);

    let Some(mut e) = solver.eval(&p) else {
        return Ok(LevmarOutcome {
            p: p.as_slice().to_vec(),
            iterations: 0,
            evaluations: solver.evaluations,
            exit: SolverExit::InvalidResidual,
            initial_norm2: f64::NAN,
            norm2: f64::NAN,
            residuals: Vec::new(),
            jacobian: None,
        });
    };
    let initial_norm2 = e.norm_squared();
    let mut norm2 = initial_norm2;
    let mut jac = solver.jacobian(&p, &e);

    let mut mu = 0.0;
    let mut nu = 2.0;
    let mut k = 0;
    let exit = 'outer: loop {
        if k >= opts.max_iterations {
            break SolverExit::MaxIterations;
        }
        let Some(j) = jac.as_ref() else {
            break SolverExit::InvalidResidual;
        };
        if norm2 <= opts.eps3 {
            break SolverExit::SmallResidual;
        }
        let jt = j.transpose();
        let jtj = &jt * j;
        let g = &jt * &e;
        if k == 0 {
            mu = opts.mu * jtj.diagonal().max();
        }
        if g.amax() <= opts.eps1 {
            break SolverExit::SmallGradient;
        }

        let p_norm2 = p.norm_squared();
        loop {
            let mut a = jtj.clone();
            for i in 0..n {
                a[(i, i)] += mu;
            }
            let Some(chol) = a.cholesky() else {
                mu *= nu;
                nu *= 2.0;
                if nu > NU_LIMIT {
                    break 'outer SolverExit::NoReduction;
                }
                continue;
            };
            let mut p_new = &p - chol.solve(&g);
            solver.project(&mut p_new);
            let dp = &p_new - &p;
            let dp_norm2 = dp.norm_squared();

            if dp_norm2 <= opts.eps2 * opts.eps2 * p_norm2 {
                break 'outer SolverExit::SmallStep;
            }
            if dp_norm2 >= (p_norm2 + opts.eps2) / (f64::EPSILON * f64::EPSILON) {
                break 'outer SolverExit::Singular;
            }

            let Some(e_new) = solver.eval(&p_new) else {
                break 'outer SolverExit::InvalidResidual;
            };
            let new_norm2 = e_new.norm_squared();
            if new_norm2 < norm2 {
                let predicted = dp.dot(&(&dp * mu - &g));
                let rho = if predicted > 0.0 {
                    (norm2 - new_norm2) / predicted
                } else {
                    1.0
                };
                let t = 2.0 * rho - 1.0;
                mu *= (1.0 / 3.0_f64).max(1.0 - t * t * t);
                nu = 2.0;
                p = p_new;
                e = e_new;
                norm2 = new_norm2;
                jac = solver.jacobian(&p, &e);
                break;
            }

            mu *= nu;
            nu *= 2.0;
            if nu > NU_LIMIT {
                break 'outer SolverExit::NoReduction;
            }
        }
        k += 1;
    };

    tracing::debug!(
        iterations = k,
        evaluations = solver.evaluations,
        exit = exit.code(),
        norm2,
        "levmar finished"
    );
    Ok(LevmarOutcome {
        p: p.as_slice().to_vec(),
        iterations: k,
        evaluations: solver.evaluations,
        exit,
        initial_norm2,
        norm2,
        residuals: e.as_slice().to_vec(),
        jacobian: jac,
    })
}

struct Solver<'a, F> {
    func: F,
    lower: &'a [f64],
    upper: &'a [f64],
    opts: &'a LevmarOpts,
    m: usize,
    evaluations: usize,
}

impl<F: FnMut(&[f64], &mut [f64])> Solver<'_, F> {
    fn project(&self, p: &mut DVector<f64>) {
        for (i, v) in p.iter_mut().enumerate() {
            *v = v.clamp(self.lower[i], self.upper[i]);
        }
    }

    fn eval(&mut self, p: &DVector<f64>) -> Option<DVector<f64>> {
        let mut e = DVector::zeros(self.m);
        (self.func)(p.as_slice(), e.as_mut_slice());
        self.evaluations += 1;
        e.iter().all(|v| v.is_finite()).then_some(e)
    }

    /// Forward differences; a step that would leave the box is taken backward instead.
    fn jacobian(&mut self, p: &DVector<f64>, e: &DVector<f64>) -> Option<DMatrix<f64>> {
        let n = p.len();
        let mut j = DMatrix::zeros(self.m, n);
        let mut q = p.clone();
        for c in 0..n {
            let mut d = (1e-4 * p[c]).abs().max(self.opts.delta);
            if p[c] + d > self.upper[c] {
                d = -d;
            }
            q[c] = p[c] + d;
            let e_q = self.eval(&q)?;
            q[c] = p[c];
            j.set_column(c, &((e_q - e) / d));
        }
        Some(j)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/fit/lm.rs"]
mod tests;
