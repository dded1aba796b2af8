use num_traits::Float;

/// Return `(min, max)` for two owned values.
pub fn sorted_pair<T: PartialOrd>(a: T, b: T) -> (T, T) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Compute a small epsilon relative to the provided step.
/// Returns a millionth of the step, used to keep boundary ticks that land a
/// rounding error outside the domain.
pub fn epsilon_from_step<T: Float>(step: &T) -> T {
    let million = T::from(1.0e6).unwrap_or_else(T::max_value);
    step.abs() / million
}

/// Direction of a strictly monotonic sequence: `Some(true)` when increasing,
/// `Some(false)` when decreasing, `None` when flat, non-finite or turning.
pub fn strict_direction(values: &[f64]) -> Option<bool> {
    if values.len() < 2 || values.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let increasing = values[1] > values[0];
    let ordered = values.windows(2).all(|w| {
        if increasing { w[1] > w[0] } else { w[1] < w[0] }
    });
    ordered.then_some(increasing)
}

/// Index of the first element that breaks strict monotonicity.
pub fn first_turn(values: &[f64]) -> Option<usize> {
    if values.len() < 2 {
        return None;
    }
    let increasing = values[1] > values[0];
    values
        .windows(2)
        .position(|w| if increasing { w[1] <= w[0] } else { w[1] >= w[0] })
        .map(|i| i + 1)
}

/// Fewest decimals (up to 12) that print `x` without visible rounding.
pub fn significant_decimals(x: f64) -> usize {
    let x = x.abs();
    if x == 0.0 || !x.is_finite() {
        return 0;
    }
    (0..12)
        .find(|&d| {
            let scaled = x * 10f64.powi(d as i32);
            (scaled - scaled.round()).abs() <= 1e-6 * scaled.max(1.0)
        })
        .unwrap_or(12)
}
