use super::*;

fn sample() -> ParameterSet {
    let mut s = ParameterSet::new(
        "disk",
        vec![
            Parameter::new("a", 0.5, 0.0, 1.0),
            Parameter::new("b", 3.0, -10.0, 10.0),
            Parameter::new("c", 42.0, 0.0, 1.0),
        ],
    );
    s.set_free(0, true).unwrap();
    s.set_free(1, true).unwrap();
    s
}

#[test]
fn fixed_parameters_may_sit_outside_bounds() {
    let s = sample();
    assert_eq!(s.value("c"), Some(42.0));
    assert_eq!(s.free_count(), 2);
}

#[test]
fn normalized_gather_matches_bounds() {
    let s = sample();
    let mut out = [0.0; 2];
    assert_eq!(s.gather_free(&mut out, Units::Normalized), 2);
    assert!((out[0] - 0.5).abs() < 1e-12);
    assert!((out[1] - 0.65).abs() < 1e-12);
}

#[test]
fn scatter_normalized_scales_into_native_units() {
    let mut s = sample();
    assert_eq!(s.scatter_free(&[0.3, 0.6], Units::Normalized), 2);
    assert!((s.value("a").unwrap() - 0.3).abs() < 1e-12);
    assert!((s.value("b").unwrap() - 2.0).abs() < 1e-12);
    assert_eq!(s.value("c"), Some(42.0));
}

#[test]
fn scatter_clamps_free_values_into_bounds() {
    let mut s = sample();
    s.scatter_free(&[1.5, -20.0], Units::Native);
    assert_eq!(s.value("a"), Some(1.0));
    assert_eq!(s.value("b"), Some(-10.0));
}

#[test]
fn set_bounds_rejects_inverted_range() {
    let mut s = sample();
    assert!(s.set_bounds(0, 2.0, 1.0).is_err());
    assert!(s.set_bounds(7, 0.0, 1.0).is_err());
}

#[test]
fn restore_requires_matching_names() {
    let mut s = sample();
    let mut stored = s.as_slice().to_vec();
    stored[1].name = "z".to_string();
    assert!(s.restore(&stored).is_err());
    stored.pop();
    assert!(s.restore(&stored).is_err());
}

#[test]
fn free_names_are_owner_qualified() {
    let s = sample();
    let mut names = Vec::new();
    s.push_free_names(&mut names);
    assert_eq!(names, vec!["disk.a".to_string(), "disk.b".to_string()]);
}
