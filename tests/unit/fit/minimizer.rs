use super::*;
use crate::fit::exit::SolverExit;

#[test]
fn ordinals_select_minimizers() {
    for kind in MinimizerKind::ALL {
        assert_eq!(MinimizerKind::from_ordinal(kind.ordinal()), kind);
    }
    assert_eq!(MinimizerKind::from_ordinal(1), MinimizerKind::Levmar);
    assert_eq!(MinimizerKind::from_ordinal(2), MinimizerKind::GridSearch);
    assert_eq!(MinimizerKind::from_ordinal(3).name(), "Bootstrap (Levmar)");
    assert_eq!(MinimizerKind::from_ordinal(42), MinimizerKind::Benchmark);
    assert_eq!(MinimizerKind::default(), MinimizerKind::Benchmark);
}

#[test]
fn empty_save_basename_is_ignored() {
    let mut opts = MinimizerOpts::default();
    assert_eq!(opts.save_basename(), DEFAULT_SAVE_BASENAME);
    assert!(opts.set_save_basename("/data/run1"));
    assert!(!opts.set_save_basename(""));
    assert_eq!(opts.save_basename(), "/data/run1");
}

fn outcome(jacobian: Option<DMatrix<f64>>, norm2: f64) -> LevmarOutcome {
    LevmarOutcome {
        p: vec![0.5, 0.5],
        iterations: 3,
        evaluations: 10,
        exit: SolverExit::SmallResidual,
        initial_norm2: 10.0,
        norm2,
        residuals: vec![0.0; 3],
        jacobian,
    }
}

#[test]
fn covariance_is_scaled_to_native_units() {
    let j = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
    let cov = covariance(&outcome(Some(j), 3.0), &[(0.0, 1.0), (-10.0, 10.0)]).unwrap();
    let expected = [[2.0, -20.0], [-20.0, 800.0]];
    for r in 0..2 {
        for c in 0..2 {
            assert!(
                (cov[(r, c)] - expected[r][c]).abs() < 1e-9 * expected[r][c].abs().max(1.0),
                "cov[{r}][{c}] = {}",
                cov[(r, c)]
            );
        }
    }
}

#[test]
fn covariance_needs_spare_degrees_of_freedom() {
    let square = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, 1.0]);
    assert!(covariance(&outcome(Some(square), 1.0), &[(0.0, 1.0); 2]).is_none());
    assert!(covariance(&outcome(None, 1.0), &[(0.0, 1.0); 2]).is_none());
}
