use super::*;

#[test]
fn static_positions_ignore_time() {
    let mut p = Position::new(PositionKind::Xyz);
    p.params_mut().set_value(0, 1.5).unwrap();
    p.params_mut().set_value(2, -2.0).unwrap();
    assert_eq!(p.xyz(0.0), (1.5, 0.0, -2.0));
    assert_eq!(p.xyz(100.0), (1.5, 0.0, -2.0));
    assert!(p.orbit_angles().is_none());
}

#[test]
fn face_on_circular_orbit_keeps_radius() {
    let mut p = Position::new(PositionKind::Orbit);
    let alpha = p.params().index_of("alpha").unwrap();
    p.params_mut().set_value(alpha, 3.0).unwrap();
    for t in [0.0, 0.1, 0.37, 0.8] {
        let (x, y, z) = p.xyz(t);
        assert!(((x * x + y * y).sqrt() - 3.0).abs() < 1e-9);
        assert!(z.abs() < 1e-12);
    }
}

#[test]
fn orbit_is_periodic() {
    let mut p = Position::new(PositionKind::Orbit);
    let ps = p.params_mut();
    ps.set_value(ps.index_of("e").unwrap(), 0.4).unwrap();
    ps.set_value(ps.index_of("inclination").unwrap(), 60.0).unwrap();
    ps.set_value(ps.index_of("period").unwrap(), 2.5).unwrap();
    let (x0, y0, z0) = p.xyz(0.3);
    let (x1, y1, z1) = p.xyz(0.3 + 2.5);
    assert!((x0 - x1).abs() < 1e-9 && (y0 - y1).abs() < 1e-9 && (z0 - z1).abs() < 1e-9);
}

#[test]
fn orbit_reports_its_angles() {
    let mut p = Position::new(PositionKind::Orbit);
    let ps = p.params_mut();
    ps.set_value(ps.index_of("inclination").unwrap(), 35.0).unwrap();
    ps.set_value(ps.index_of("Omega").unwrap(), 120.0).unwrap();
    assert_eq!(p.orbit_angles(), Some((35.0, 120.0)));
}
