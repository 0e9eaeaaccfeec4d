use super::*;

fn linear(p: &[f64], out: &mut [f64]) {
    let xs = [0.0, 1.0, 2.0, 3.0];
    for (o, x) in out.iter_mut().zip(xs) {
        *o = p[0] * x + p[1] - (0.3 * x + 2.0);
    }
}

#[test]
fn linear_model_converges_to_truth() {
    let out = levmar_bc(
        linear,
        &[0.5, 0.0],
        4,
        &[0.0, -10.0],
        &[1.0, 10.0],
        &LevmarOpts::default(),
    )
    .unwrap();
    assert!(matches!(
        out.exit,
        SolverExit::SmallResidual | SolverExit::SmallStep
    ));
    assert!((out.p[0] - 0.3).abs() < 1e-6);
    assert!((out.p[1] - 2.0).abs() < 1e-6);
    assert!(out.norm2.sqrt() < 1e-6);
    assert!(out.iterations < 50);
    assert_eq!(out.residuals.len(), 4);
    assert_eq!(out.jacobian.as_ref().map(|j| j.shape()), Some((4, 2)));
}

#[test]
fn rosenbrock_reaches_its_minimum() {
    let rosen = |p: &[f64], out: &mut [f64]| {
        out[0] = 10.0 * (p[1] - p[0] * p[0]);
        out[1] = 1.0 - p[0];
    };
    let out = levmar_bc(
        rosen,
        &[-1.2, 1.0],
        2,
        &[-2.0, -2.0],
        &[2.0, 2.0],
        &LevmarOpts::default(),
    )
    .unwrap();
    assert!(out.exit.converged(), "exit {}", out.exit);
    assert!((out.p[0] - 1.0).abs() < 1e-5);
    assert!((out.p[1] - 1.0).abs() < 1e-5);
    assert!(out.norm2 < out.initial_norm2);
}

#[test]
fn minimum_outside_the_box_stops_at_the_bound() {
    let out = levmar_bc(
        |p: &[f64], out: &mut [f64]| out[0] = p[0] - 2.0,
        &[0.5],
        1,
        &[0.0],
        &[1.0],
        &LevmarOpts::default(),
    )
    .unwrap();
    assert_eq!(out.p, vec![1.0]);
    assert_eq!(out.exit, SolverExit::SmallStep);
}

#[test]
fn start_is_projected_into_the_box() {
    let mut first = None;
    let _ = levmar_bc(
        |p: &[f64], out: &mut [f64]| {
            first.get_or_insert(p[0]);
            out[0] = p[0];
        },
        &[5.0],
        1,
        &[-1.0],
        &[1.0],
        &LevmarOpts::default(),
    )
    .unwrap();
    assert_eq!(first, Some(1.0));
}

#[test]
fn invalid_first_evaluation_exits_with_code_seven() {
    let out = levmar_bc(
        |_: &[f64], out: &mut [f64]| out[0] = f64::NAN,
        &[0.5],
        1,
        &[0.0],
        &[1.0],
        &LevmarOpts::default(),
    )
    .unwrap();
    assert_eq!(out.exit, SolverExit::InvalidResidual);
    assert_eq!(out.iterations, 0);
    assert_eq!(out.evaluations, 1);
    assert!(out.jacobian.is_none());
}

#[test]
fn non_finite_residual_mid_run_stops_the_solver() {
    let mut calls = 0;
    let out = levmar_bc(
        |p: &[f64], out: &mut [f64]| {
            calls += 1;
            linear(p, out);
            if calls > 5 {
                out[0] = f64::INFINITY;
            }
        },
        &[0.5, 0.0],
        4,
        &[0.0, -10.0],
        &[1.0, 10.0],
        &LevmarOpts::default(),
    )
    .unwrap();
    assert_eq!(out.exit, SolverExit::InvalidResidual);
    assert_eq!(out.evaluations, 6);
    assert!(out.p.iter().all(|v| v.is_finite()));
}

#[test]
fn iteration_limit_is_reported() {
    let opts = LevmarOpts {
        max_iterations: 1,
        ..LevmarOpts::default()
    };
    let out = levmar_bc(
        |p: &[f64], out: &mut [f64]| {
            out[0] = 10.0 * (p[1] - p[0] * p[0]);
            out[1] = 1.0 - p[0];
        },
        &[-1.2, 1.0],
        2,
        &[-2.0, -2.0],
        &[2.0, 2.0],
        &opts,
    )
    .unwrap();
    assert_eq!(out.exit, SolverExit::MaxIterations);
    assert_eq!(out.iterations, 1);
}

#[test]
fn rejects_ill_posed_problems() {
    let f = |_: &[f64], _: &mut [f64]| {};
    let o = LevmarOpts::default();
    assert!(levmar_bc(f, &[], 1, &[], &[], &o).is_err());
    assert!(levmar_bc(f, &[0.0, 0.0], 1, &[0.0; 2], &[1.0; 2], &o).is_err());
    assert!(levmar_bc(f, &[0.0], 1, &[1.0], &[0.0], &o).is_err());
    assert!(levmar_bc(f, &[0.0], 1, &[0.0, 0.0], &[1.0], &o).is_err());
}
