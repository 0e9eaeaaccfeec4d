use super::*;
use crate::params::set::Units;

fn free(set: &mut ParameterSet, name: &str) {
    let i = set.index_of(name).unwrap();
    set.set_free(i, true).unwrap();
}

#[test]
fn traversal_is_model_position_shader() {
    let mut m = Model::new(ModelKind::Sphere);
    m.set_shader(Some(ShaderKind::LinearLimbDarkening));
    free(m.params_mut(), "diameter");
    free(m.position_mut().params_mut(), "y");
    free(m.shader_mut().unwrap().params_mut(), "a");
    m.relabel(2);

    assert_eq!(m.count_free(), 3);
    assert_eq!(
        m.names_free(),
        vec!["m2.sphere.diameter", "m2.xy.y", "m2.ld_linear.a"]
    );
}

#[test]
fn shader_free_parameters_vanish_with_the_shader() {
    let mut m = Model::new(ModelKind::Sphere);
    m.set_shader(Some(ShaderKind::PowerLawLimbDarkening));
    free(m.shader_mut().unwrap().params_mut(), "alpha");
    assert_eq!(m.count_free(), 1);
    m.set_shader(None);
    assert_eq!(m.count_free(), 0);
}

#[test]
fn orbit_angles_overwrite_fixed_orientation_after_scatter() {
    let mut m = Model::new(ModelKind::UniformDisk);
    m.set_position_kind(PositionKind::Orbit);
    free(m.position_mut().params_mut(), "inclination");
    free(m.position_mut().params_mut(), "Omega");

    // Position order: Omega, inclination.
    m.scatter_free(&[150.0, 40.0], Units::Native).unwrap();
    assert_eq!(m.params().value("inclination"), Some(40.0));
    assert_eq!(m.params().value("position_angle"), Some(150.0));
}

#[test]
fn free_orientation_is_left_to_the_optimizer() {
    let mut m = Model::new(ModelKind::UniformDisk);
    m.set_position_kind(PositionKind::Orbit);
    free(m.params_mut(), "inclination");
    free(m.position_mut().params_mut(), "inclination");

    m.scatter_free(&[10.0, 70.0], Units::Native).unwrap();
    assert_eq!(m.params().value("inclination"), Some(10.0));
    // position_angle is fixed, so it still follows Omega (0).
    assert_eq!(m.params().value("position_angle"), Some(0.0));
}

#[test]
fn xy_models_are_not_coupled() {
    let mut m = Model::new(ModelKind::Gaussian);
    let pa = m.params().index_of("position_angle").unwrap();
    m.params_mut().set_value(pa, 33.0).unwrap();
    m.scatter_free(&[], Units::Native).unwrap();
    assert_eq!(m.params().value("position_angle"), Some(33.0));
}

#[test]
fn changing_to_same_position_kind_keeps_values() {
    let mut m = Model::new(ModelKind::Sphere);
    m.position_mut().params_mut().set_value(0, 4.0).unwrap();
    m.set_position_kind(PositionKind::Xy);
    assert_eq!(m.position().params().value("x"), Some(4.0));
    m.set_position_kind(PositionKind::Xyz);
    assert_eq!(m.position().params().value("x"), Some(0.0));
}
