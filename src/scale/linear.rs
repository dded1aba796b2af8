use super::{tick_iter::Mark, util};
use num_traits::Float;

/// Upper bound on ticks produced by one sweep; the finest levels are dropped
/// until the sweep fits.
const MAX_TICKS: i64 = 100_000;

/// Helper to find a "nice" step size using a simple iterative approach.
/// Works directly with the generic type D without needing logarithms.
///
/// Returns the smallest value from {1, 2, 2.5, 5} x 10^k that is not below
/// `|raw_step|`.
pub(crate) fn nice_step<D: Float>(raw_step: D) -> D {
    let one = D::one();
    let two = one + one;
    let five = two + two + one;
    let ten = five + five;
    let two_and_half = five / two;

    let abs_step = raw_step.abs();
    if abs_step == D::zero() || !abs_step.is_finite() {
        return one;
    }

    // Start at 1 and scale up/down to find the right magnitude
    let mut candidate = one;

    while candidate * ten < abs_step {
        candidate = candidate * ten;
    }

    while candidate > abs_step {
        candidate = candidate / ten;
    }

    // candidate <= abs_step < 10 * candidate
    let candidates = [
        candidate,
        candidate * two,
        candidate * two_and_half,
        candidate * five,
        candidate * ten,
    ];

    for c in candidates {
        if c >= abs_step {
            return c;
        }
    }

    candidate * ten
}

/// Ratio between a step and the next finer tick level: nice steps with
/// mantissa 2.5 or 5 split in five, everything else in two.
fn subdivision<D: Float>(step: D) -> i64 {
    let ten = D::from(10.0).unwrap_or_else(D::one);
    let abs_step = step.abs();
    if abs_step == D::zero() || !abs_step.is_finite() {
        return 2;
    }
    let mantissa = abs_step / ten.powf(abs_step.log10().floor());
    let close = |target: f64| {
        D::from(target)
            .map(|t| (mantissa - t).abs() < D::from(1e-6).unwrap_or_else(D::epsilon))
            .unwrap_or(false)
    };
    if close(2.5) || close(5.0) { 5 } else { 2 }
}

pub struct LinearTickIter<D: Float> {
    state: LinearTickState<D>,
}

enum LinearTickState<D: Float> {
    Single(Option<D>),
    Sweep(LinearSweepState<D>),
    Done,
}

struct LinearSweepState<D: Float> {
    anchor: D,
    major_step: D,
    /// Ratio of each level's step to the finest step, coarsest first.
    ratios: Vec<i64>,
    index: i64,
    last_index: i64,
    clamp_min: D,
    clamp_max: D,
    epsilon: D,
}

impl<D: Float> LinearTickIter<D> {
    /// Nice-number ticks: major step sized for 5 to 10 divisions, signed so
    /// the sweep runs from `min` towards `max`.
    pub(crate) fn smart(min: D, max: D, depth: u8) -> Self {
        let span = max - min;
        let ten = D::from(10.0).unwrap_or_else(D::one);
        let step = nice_step(span / ten);
        let signed = if span < D::zero() { -step } else { step };
        Self::sweep(D::zero(), min, max, signed, depth)
    }

    /// Evenly split ticks anchored at `min`, with no snapping.
    pub(crate) fn fixed(min: D, max: D, divisions: usize, depth: u8) -> Self {
        let divisions = D::from(divisions.max(1)).unwrap_or_else(D::one);
        Self::sweep(min, min, max, (max - min) / divisions, depth)
    }

    fn sweep(anchor: D, min: D, max: D, major_step: D, depth: u8) -> Self {
        if min == max || major_step == D::zero() || !major_step.is_finite() {
            return Self {
                state: LinearTickState::Single(Some(min)),
            };
        }

        let (clamp_min, clamp_max) = util::sorted_pair(min, max);
        let mut depth = depth.max(1) as usize;

        loop {
            let mut steps = vec![major_step];
            let mut divisors = Vec::with_capacity(depth);
            for level in 1..depth {
                let divisor = subdivision(steps[level - 1]);
                divisors.push(divisor);
                steps.push(steps[level - 1] / D::from(divisor).unwrap_or_else(D::one));
            }
            let finest_step = steps[depth - 1];

            let mut ratios = vec![1i64; depth];
            for level in (0..depth.saturating_sub(1)).rev() {
                ratios[level] = ratios[level + 1] * divisors[level];
            }

            let epsilon = util::epsilon_from_step(&finest_step);
            let slack = D::from(1e-6).unwrap_or_else(D::epsilon);
            let first = ((min - anchor) / finest_step - slack).ceil().to_i64();
            let last = ((max - anchor) / finest_step + slack).floor().to_i64();

            let (Some(first), Some(last)) = (first, last) else {
                return Self {
                    state: LinearTickState::Done,
                };
            };

            if last - first > MAX_TICKS && depth > 1 {
                depth -= 1;
                continue;
            }

            return Self {
                state: LinearTickState::Sweep(LinearSweepState {
                    anchor,
                    major_step,
                    ratios,
                    index: first,
                    last_index: last.min(first + MAX_TICKS),
                    clamp_min,
                    clamp_max,
                    epsilon,
                }),
            };
        }
    }
}

impl<D: Float> Iterator for LinearTickIter<D> {
    type Item = Mark<D>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.state {
            LinearTickState::Single(slot) => slot.take().map(|value| Mark { value, level: 0 }),
            LinearTickState::Sweep(state) => {
                while state.index <= state.last_index {
                    let index = state.index;
                    state.index += 1;

                    // Calculate value based on index to avoid accumulation errors
                    let per_major = D::from(state.ratios[0]).unwrap_or_else(D::one);
                    let mut value = state.anchor
                        + state.major_step * (D::from(index).unwrap_or_else(D::zero) / per_major);

                    if value < state.clamp_min {
                        if state.clamp_min - value <= state.epsilon {
                            value = state.clamp_min;
                        } else {
                            continue;
                        }
                    } else if value > state.clamp_max {
                        if value - state.clamp_max <= state.epsilon {
                            value = state.clamp_max;
                        } else {
                            continue;
                        }
                    }

                    let level = state
                        .ratios
                        .iter()
                        .position(|ratio| index.rem_euclid(*ratio) == 0)
                        .unwrap_or(state.ratios.len() - 1);

                    return Some(Mark {
                        value,
                        level: level as u8,
                    });
                }

                self.state = LinearTickState::Done;
                None
            }
            LinearTickState::Done => None,
        }
    }
}
