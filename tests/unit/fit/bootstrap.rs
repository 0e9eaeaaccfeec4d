use super::*;
use rand::SeedableRng;
use rand::rngs::SmallRng;

#[test]
fn weights_square_to_the_draw_count() {
    let mut rng = SmallRng::seed_from_u64(7);
    for m in [1, 4, 50] {
        let w = resample_weights(&mut rng, m);
        assert_eq!(w.len(), m);
        let draws: f64 = w.iter().map(|v| v * v).sum();
        assert!((draws - m as f64).abs() < 1e-9);
        for v in &w {
            let k = v * v;
            assert!((k - k.round()).abs() < 1e-9, "weight {v} is not sqrt of a count");
        }
    }
}

#[test]
fn same_seed_same_resample() {
    let a = resample_weights(&mut SmallRng::seed_from_u64(42), 20);
    let b = resample_weights(&mut SmallRng::seed_from_u64(42), 20);
    assert_eq!(a, b);
}

#[test]
fn spread_reports_mean_and_sample_deviation() {
    let samples = vec![vec![1.0, 10.0], vec![3.0, 10.0]];
    let s = spread(&samples);
    assert_eq!(s.len(), 2);
    assert_eq!(s[0].0, 2.0);
    assert!((s[0].1.unwrap() - 2.0_f64.sqrt()).abs() < 1e-12);
    assert_eq!(s[1], (10.0, Some(0.0)));

    assert_eq!(spread(&[vec![5.0]]), vec![(5.0, None)]);
    assert!(spread(&[]).is_empty());
}
