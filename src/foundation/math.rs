/// Map a unit-interval value onto `[min, max]`.
pub(crate) fn scale(x: f64, min: f64, max: f64) -> f64 {
    min + x * (max - min)
}

/// Inverse of [`scale`]. A degenerate range maps to 0.
pub(crate) fn unscale(v: f64, min: f64, max: f64) -> f64 {
    let span = max - min;
    if span == 0.0 { 0.0 } else { (v - min) / span }
}

/// Solve Kepler's equation `E - e sin E = M` for the eccentric anomaly (radians).
pub(crate) fn eccentric_anomaly(mean_anomaly: f64, e: f64) -> f64 {
    let m = mean_anomaly.rem_euclid(std::f64::consts::TAU);
    let mut big_e = if e < 0.8 { m } else { std::f64::consts::PI };
    for _ in 0..50 {
        let f = big_e - e * big_e.sin() - m;
        let fp = 1.0 - e * big_e.cos();
        let step = f / fp;
        big_e -= step;
        if step.abs() < 1e-14 {
            break;
        }
    }
    big_e
}

/// Bilinear sample of a row-major image at continuous pixel coordinates.
///
/// Pixel centers sit at integer coordinates; samples outside the image read as zero.
pub(crate) fn bilinear(data: &[f32], width: usize, height: usize, x: f64, y: f64) -> f64 {
    let x0 = x.floor();
    let y0 = y.floor();
    let tx = x - x0;
    let ty = y - y0;
    let fetch = |xi: f64, yi: f64| -> f64 {
        if xi < 0.0 || yi < 0.0 || xi >= width as f64 || yi >= height as f64 {
            return 0.0;
        }
        f64::from(data[(yi as usize) * width + (xi as usize)])
    };
    let a = fetch(x0, y0) * (1.0 - tx) + fetch(x0 + 1.0, y0) * tx;
    let b = fetch(x0, y0 + 1.0) * (1.0 - tx) + fetch(x0 + 1.0, y0 + 1.0) * tx;
    a * (1.0 - ty) + b * ty
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
