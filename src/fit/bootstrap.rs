use rand::Rng;

/// Residual weights for one bootstrap resample of `m` data points.
///
/// Draws `m` points with replacement; a point drawn `k` times gets weight `sqrt(k)`, so the
/// weighted `‖e‖₂²` equals the chi-square of the resampled data.
pub(crate) fn resample_weights<R: Rng>(rng: &mut R, m: usize) -> Vec<f64> {
    let mut counts = vec![0u32; m];
    for _ in 0..m {
        counts[rng.gen_range(0..m)] += 1;
    }
    counts.into_iter().map(|k| f64::from(k).sqrt()).collect()
}

/// Per-parameter mean and sample standard deviation over `samples`.
///
/// Every sample holds one value per parameter. The deviation is absent below two samples.
pub(crate) fn spread(samples: &[Vec<f64>]) -> Vec<(f64, Option<f64>)> {
    let Some(first) = samples.first() else {
        return Vec::new();
    };
    let count = samples.len() as f64;
    (0..first.len())
        .map(|i| {
            let mean = samples.iter().map(|s| s[i]).sum::<f64>() / count;
            let std_dev = (samples.len() > 1).then(|| {
                let ss: f64 = samples.iter().map(|s| (s[i] - mean).powi(2)).sum();
                (ss / (count - 1.0)).sqrt()
            });
            (mean, std_dev)
        })
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/fit/bootstrap.rs"]
mod tests;
