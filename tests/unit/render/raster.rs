use super::*;
use crate::data::observation::ObservationPoint;
use crate::scene::position::PositionKind;
use crate::scene::shader::ShaderKind;

fn ctx(side: u32) -> RasterContext {
    let mut c = RasterContext::new(RasterOpts { scale: 0.1 }).unwrap();
    c.resize(ImageSize::square(side).unwrap()).unwrap();
    c
}

fn set_param(list: &mut ModelList, model: usize, name: &str, value: f64) {
    let m = list.get_mut(model).unwrap();
    let idx = m.params().index_of(name).unwrap();
    m.params_mut().set_value(idx, value).unwrap();
}

fn point(x: f64, y: f64, value: f64) -> ObservationPoint {
    ObservationPoint {
        x,
        y,
        value,
        error: 0.5,
    }
}

#[test]
fn rejects_bad_scale() {
    assert!(RasterContext::new(RasterOpts { scale: 0.0 }).is_err());
    assert!(RasterContext::new(RasterOpts { scale: f64::NAN }).is_err());
}

#[test]
fn uniform_disk_covers_its_diameter_only() {
    let mut c = ctx(65);
    let mut scene = ModelList::new();
    scene.add_model(ModelKind::UniformDisk);
    set_param(&mut scene, 0, "diameter", 2.0);
    c.render(&scene).unwrap();
    c.present().unwrap();

    let img = c.copy_image().unwrap();
    assert_eq!(img.get(32, 32), 1.0);
    // radius 1 mas = 10 px
    assert_eq!(img.get(32 + 9, 32), 1.0);
    assert_eq!(img.get(32 + 11, 32), 0.0);
    assert_eq!(img.get(0, 0), 0.0);
    assert_eq!(c.frames_presented(), 1);
}

#[test]
fn gaussian_falls_to_half_at_half_fwhm() {
    let mut c = ctx(65);
    let mut scene = ModelList::new();
    scene.add_model(ModelKind::Gaussian);
    set_param(&mut scene, 0, "fwhm", 2.0);
    c.render(&scene).unwrap();
    c.present().unwrap();

    let img = c.copy_image().unwrap();
    assert!((img.get(32, 32) - 1.0).abs() < 1e-6);
    assert!((img.get(42, 32) - 0.5).abs() < 1e-5);
    assert!((img.get(32, 22) - 0.5).abs() < 1e-5);
}

#[test]
fn position_offsets_move_the_model() {
    let mut c = ctx(65);
    let mut scene = ModelList::new();
    scene.add_model(ModelKind::Gaussian);
    set_param(&mut scene, 0, "fwhm", 0.5);
    let m = scene.get_mut(0).unwrap();
    let x = m.position().params().index_of("x").unwrap();
    let y = m.position().params().index_of("y").unwrap();
    m.position_mut().params_mut().set_value(x, 1.0).unwrap();
    m.position_mut().params_mut().set_value(y, 1.0).unwrap();
    c.render(&scene).unwrap();
    c.present().unwrap();

    let img = c.copy_image().unwrap();
    // +x is to the right, +y is up.
    assert!((img.get(42, 22) - 1.0).abs() < 1e-6);
    assert!(img.get(32, 32) < 1e-3);
}

#[test]
fn limb_darkening_dims_the_edge() {
    let mut c = ctx(65);
    let mut scene = ModelList::new();
    scene.add_model(ModelKind::Sphere);
    set_param(&mut scene, 0, "diameter", 4.0);
    scene
        .set_shader(0, Some(ShaderKind::LinearLimbDarkening))
        .unwrap();
    c.render(&scene).unwrap();
    c.present().unwrap();

    let img = c.copy_image().unwrap();
    let center = img.get(32, 32);
    let edge = img.get(32 + 19, 32);
    assert!((center - 1.0).abs() < 1e-6);
    assert!(edge > 0.0 && edge < center);
}

#[test]
fn orbit_position_follows_scene_time() {
    let mut c = ctx(65);
    let mut scene = ModelList::new();
    scene.add_model(ModelKind::Gaussian);
    scene.set_position_kind(0, PositionKind::Orbit).unwrap();
    c.render(&scene).unwrap();
    let first = c.flux().unwrap();
    let before = c.back.data.clone();

    scene.set_time(0.25);
    c.render(&scene).unwrap();
    assert_ne!(before, c.back.data);
    assert!((c.flux().unwrap() - first).abs() / first < 1e-2);
}

#[test]
fn residuals_compare_render_against_observations() {
    let mut c = ctx(65);
    let mut scene = ModelList::new();
    scene.add_model(ModelKind::UniformDisk);
    set_param(&mut scene, 0, "diameter", 2.0);
    let n = c
        .load_data(vec![ObservationSet::new(
            0.0,
            vec![point(0.0, 0.0, 0.5), point(3.0, 0.0, 0.0), point(0.0, 3.0, 1.0)],
        )])
        .unwrap();
    assert_eq!(n, 1);
    c.render(&scene).unwrap();

    let mut out = vec![0.0; c.allocated(0)];
    c.residuals(0, &mut out).unwrap();
    assert_eq!(out, vec![1.0, 0.0, -2.0]);
    assert_eq!(c.statistic(0).unwrap(), 5.0);
    assert_eq!(c.simulated(0).unwrap(), vec![1.0, 0.0, 0.0]);
}

#[test]
fn log_like_adds_the_gaussian_normalisation() {
    let mut c = ctx(65);
    let mut scene = ModelList::new();
    scene.add_model(ModelKind::UniformDisk);
    set_param(&mut scene, 0, "diameter", 2.0);
    c.load_data(vec![ObservationSet::new(
        0.0,
        vec![point(0.0, 0.0, 0.5), point(3.0, 0.0, 0.0)],
    )])
    .unwrap();
    c.render(&scene).unwrap();

    // Residuals 1 and 0 with sigma 0.5 on both points.
    let norm = (2.0 * std::f64::consts::PI * 0.25).ln();
    let expected = -0.5 * (1.0 + 2.0 * norm);
    assert!((c.log_like(0).unwrap() - expected).abs() < 1e-12);
    assert!(matches!(c.log_like(4), Err(FitError::Validation(_))));
}

#[test]
fn residual_buffer_must_match_the_set() {
    let mut c = ctx(16);
    c.load_data(vec![ObservationSet::new(0.0, vec![point(0.0, 0.0, 1.0)])])
        .unwrap();
    let mut short = vec![0.0; 3];
    assert!(matches!(
        c.residuals(0, &mut short),
        Err(FitError::Validation(_))
    ));
    assert_eq!(c.allocated(7), 0);
    assert!(c.ave_time(7).is_err());
}

#[test]
fn data_sets_can_be_replaced_and_removed() {
    let mut c = ctx(16);
    c.load_data(vec![
        ObservationSet::new(1.0, vec![point(0.0, 0.0, 1.0)]),
        ObservationSet::new(2.0, vec![point(0.0, 0.0, 1.0), point(0.1, 0.0, 1.0)]),
    ])
    .unwrap();
    assert_eq!(c.total_allocated(), 3);

    c.replace_data(0, ObservationSet::new(5.0, vec![point(0.0, 0.0, 2.0)]))
        .unwrap();
    assert_eq!(c.ave_time(0).unwrap(), 5.0);
    c.remove_data(0).unwrap();
    assert_eq!(c.data_sets(), 1);
    assert_eq!(c.ave_time(0).unwrap(), 2.0);
    assert!(c.remove_data(3).is_err());
}

#[test]
fn resize_reallocates_both_buffers() {
    let mut c = ctx(16);
    c.resize(ImageSize::new(40, 20).unwrap()).unwrap();
    assert_eq!(c.size(), ImageSize::new(40, 20).unwrap());
    assert_eq!(c.copy_image().unwrap().data.len(), 800);
    c.present().unwrap();
}

#[test]
fn save_image_writes_a_png() {
    let dir = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("target/raster_png");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("disk.png");

    let mut c = ctx(32);
    let mut scene = ModelList::new();
    scene.add_model(ModelKind::UniformDisk);
    c.render(&scene).unwrap();
    c.present().unwrap();
    c.save_image(&path).unwrap();

    let img = image::open(&path).unwrap().to_luma8();
    assert_eq!(img.dimensions(), (32, 32));
    assert_eq!(img.get_pixel(16, 16).0[0], 255);
    assert_eq!(img.get_pixel(0, 0).0[0], 0);
}
