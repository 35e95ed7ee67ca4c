/// Approximate pi with `10^load` terms of the Leibniz series.
pub fn leibniz_pi(load: u32) -> f64 {
    let terms = 10u64.saturating_pow(load);
    let mut pi = 0.0;
    let mut denominator = 1.0;
    for i in 0..terms {
        if i % 2 == 0 {
            pi += 4.0 / denominator;
        } else {
            pi -= 4.0 / denominator;
        }
        denominator += 2.0;
    }
    pi
}
