use super::*;

fn point(value: f64, error: f64) -> ObservationPoint {
    ObservationPoint {
        x: 0.0,
        y: 0.0,
        value,
        error,
    }
}

#[test]
fn validation_rejects_bad_errors_and_empty_sets() {
    assert!(ObservationSet::new(0.0, vec![]).validate().is_err());
    assert!(ObservationSet::new(0.0, vec![point(1.0, 0.0)]).validate().is_err());
    assert!(
        ObservationSet::new(0.0, vec![point(f64::NAN, 1.0)])
            .validate()
            .is_err()
    );
    assert!(ObservationSet::new(f64::INFINITY, vec![point(1.0, 1.0)]).validate().is_err());
    assert!(ObservationSet::new(0.0, vec![point(1.0, 0.1)]).validate().is_ok());
}

#[test]
fn reads_single_and_multi_set_files() {
    let dir = std::path::PathBuf::from("target").join("data_files");
    std::fs::create_dir_all(&dir).unwrap();

    let one = dir.join("one.json");
    std::fs::write(
        &one,
        r#"{"time": 1.5, "points": [{"x": 0.1, "y": -0.2, "value": 0.8, "error": 0.05}]}"#,
    )
    .unwrap();
    let sets = DataSource::Path(one).read().unwrap();
    assert_eq!(sets.len(), 1);
    assert_eq!(sets[0].time, 1.5);

    let many = dir.join("many.json");
    std::fs::write(
        &many,
        r#"{"sets": [
            {"time": 0.0, "points": [{"x": 0, "y": 0, "value": 1, "error": 1}]},
            {"time": 1.0, "points": [{"x": 1, "y": 1, "value": 2, "error": 1}]}
        ]}"#,
    )
    .unwrap();
    assert_eq!(DataSource::Path(many).read().unwrap().len(), 2);
}

#[test]
fn missing_file_is_a_data_error() {
    let err = DataSource::Path("target/does/not/exist.json".into())
        .read()
        .unwrap_err();
    assert!(matches!(err, FitError::Data(_)));
}
