use super::*;

fn report(cancelled: bool) -> FitReport {
    FitReport {
        params: vec![
            ParameterEstimate {
                name: "m0.sphere.diameter".to_string(),
                value: 1.5,
                std_error: Some(0.25),
            },
            ParameterEstimate {
                name: "m0.xy.x".to_string(),
                value: -0.5,
                std_error: None,
            },
        ],
        covariance: None,
        iterations: 12,
        evaluations: 40,
        exit: SolverExit::InvalidResidual,
        cancelled,
        initial_norm: 3.0,
        residual_norm: 1.0,
        sets: vec![SetStatistic {
            set: 0,
            points: 4,
            chi2: 2.0,
            chi2r: 0.5,
        }],
    }
}

#[test]
fn exit_message_depends_on_cancellation() {
    assert_eq!(report(true).exit_message(), "terminated by user request");
    assert!(report(false).exit_message().starts_with("stopped by invalid"));
    assert_eq!(report(false).values(), vec![1.5, -0.5]);
}

#[test]
fn export_writes_every_file() {
    let dir = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("target/report_export");
    let _ = std::fs::remove_dir_all(&dir);
    let base = dir.join("fit").to_string_lossy().to_string();

    let samples = vec![SetSamples {
        set: 0,
        residuals: vec![0.5, -1.0],
        simulated: Some(vec![1.0, 2.0]),
    }];
    let written = write_report_files(&base, &report(true), &samples).unwrap();
    assert_eq!(written.len(), 4);

    let names = std::fs::read_to_string(format!("{base}_param_names.txt")).unwrap();
    assert!(names.ends_with("m0.sphere.diameter, m0.xy.x\n"));

    let params = std::fs::read_to_string(format!("{base}_params.txt")).unwrap();
    let rows: Vec<&str> = params.lines().filter(|l| !l.starts_with('#')).collect();
    assert_eq!(rows.len(), 2);
    assert!(rows[0].starts_with("1.50000000e0"));
    assert!(rows[1].ends_with("NaN"));

    let stats = std::fs::read_to_string(format!("{base}_stats.txt")).unwrap();
    assert!(stats.contains("# exit: 7 terminated by user request"));

    let data = std::fs::read_to_string(format!("{base}_0_data.txt")).unwrap();
    assert_eq!(data.lines().count(), 3);
}

#[test]
fn benchmark_rate_handles_zero_elapsed() {
    let r = BenchmarkReport {
        cycles: 10,
        elapsed: Duration::ZERO,
        cancelled: false,
        last_statistic: vec![],
    };
    assert_eq!(r.per_second(), 0.0);
    let r = BenchmarkReport {
        elapsed: Duration::from_secs(2),
        ..r
    };
    assert_eq!(r.per_second(), 5.0);
}

#[test]
fn bootstrap_spread_is_written_per_parameter() {
    let dir = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("target/report_bootstrap");
    let _ = std::fs::remove_dir_all(&dir);
    let base = dir.join("fit").to_string_lossy().to_string();

    let boot = BootstrapReport {
        fit: report(false),
        params: vec![BootstrapEstimate {
            name: "m0.sphere.diameter".to_string(),
            mean: 1.25,
            std_dev: None,
        }],
        resamples: 1,
        cancelled: false,
    };
    let path = write_bootstrap_file(&base, &boot).unwrap();
    let text = std::fs::read_to_string(path).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("# resamples: 1"));
    assert_eq!(lines.nth(1), Some("m0.sphere.diameter, 1.25000000e0, NaN"));

    let outcome = RunOutcome::Bootstrap(boot);
    assert_eq!(outcome.as_fit().map(|f| f.iterations), Some(12));
    assert!(!outcome.cancelled());
}
