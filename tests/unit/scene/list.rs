use super::*;
use crate::params::set::Units;

fn free_first(set: &mut ParameterSet, name: &str) {
    let i = set.index_of(name).unwrap();
    set.set_free(i, true).unwrap();
}

#[test]
fn counts_concatenate_across_models() {
    let mut list = ModelList::new();
    let a = list.add_model(ModelKind::Sphere);
    let b = list.add_model(ModelKind::Gaussian);
    free_first(list.get_mut(a).unwrap().params_mut(), "diameter");
    free_first(list.get_mut(b).unwrap().params_mut(), "fwhm");
    free_first(list.get_mut(b).unwrap().position_mut().params_mut(), "x");

    let per_model: usize = list.iter().map(|m| m.count_free()).sum();
    assert_eq!(list.count_free(), per_model);
    assert_eq!(
        list.names_free(),
        vec!["m0.sphere.diameter", "m1.gaussian.fwhm", "m1.xy.x"]
    );

    list.scatter_free(&[2.0, 3.0, -1.0], Units::Native).unwrap();
    assert_eq!(list.get(1).unwrap().size(), 3.0);
    assert_eq!(list.get(1).unwrap().position().params().value("x"), Some(-1.0));
}

#[test]
fn short_free_vectors_are_errors_not_panics() {
    let mut list = ModelList::new();
    list.add_model(ModelKind::Gaussian);
    let model = list.get_mut(0).unwrap();
    free_first(model.params_mut(), "fwhm");
    free_first(model.position_mut().params_mut(), "x");
    free_first(model.position_mut().params_mut(), "y");

    let mut short = [0.0; 2];
    assert!(matches!(
        list.gather_free(&mut short, Units::Native),
        Err(FitError::Validation(_))
    ));
    assert!(matches!(
        list.scatter_free(&[1.0], Units::Normalized),
        Err(FitError::Validation(_))
    ));
    assert_eq!(list.get(0).unwrap().size(), 1.0);
}

#[test]
fn unknown_model_index_is_a_validation_error() {
    let mut list = ModelList::new();
    assert!(list.set_shader(0, None).is_err());
    assert!(list.get(3).is_err());
}

#[test]
fn relabels_after_position_change() {
    let mut list = ModelList::new();
    list.add_model(ModelKind::UniformDisk);
    list.set_position_kind(0, PositionKind::Orbit).unwrap();
    free_first(list.get_mut(0).unwrap().position_mut().params_mut(), "period");
    assert_eq!(list.names_free(), vec!["m0.orbit.period"]);
}

#[test]
fn clock_advances_by_timestep() {
    let mut list = ModelList::new();
    list.set_time(1.0);
    list.set_timestep(0.25);
    list.increment_time();
    list.increment_time();
    assert!((list.time() - 1.5).abs() < 1e-12);
}
