use super::{linear::LinearTickIter, tick_iter::Mark, util};
use num_traits::Float;

/// Mantissas are walked in twentieths of a decade: 20 is the decade itself,
/// 199 the last step before the next one.
const MANTISSA_STEPS: i32 = 20;

/// Level of the twentieth `k` (20..200) on the smart log grid.
///
/// Decades are level 0, integer mantissas 1, halves 2, tenths 3, twentieths 4.
fn smart_level(k: i32) -> u8 {
    if k == MANTISSA_STEPS {
        0
    } else if k % 20 == 0 {
        1
    } else if k % 10 == 0 {
        2
    } else if k % 2 == 0 {
        3
    } else {
        4
    }
}

/// Range of decade exponents touching `[lo, hi]`, for a positive domain.
fn decade_range<D: Float>(lo: D, hi: D) -> Option<(i32, i32)> {
    if lo <= D::zero() || !lo.is_finite() || !hi.is_finite() {
        return None;
    }
    let e_min = lo.log10().floor().to_i32()?;
    let e_max = hi.log10().floor().to_i32()?;
    Some((e_min, e_max))
}

pub struct LogTickIter<D: Float> {
    state: LogTickIterState<D>,
}

enum LogTickIterState<D: Float> {
    Decades(DecadeState<D>),
    Fallback(LinearTickIter<D>),
    Done,
}

struct DecadeState<D: Float> {
    domain_min: D,
    domain_max: D,
    tolerance: D,
    exponent: i32,
    exponent_max: i32,
    current_decade: D,
    /// Mantissas in `[1, 10)` paired with their level, ascending.
    mantissas: Vec<(D, u8)>,
    mantissa_idx: usize,
}

impl<D: Float> LogTickIter<D> {
    /// Decades subdivided on the twentieth-mantissa grid, keeping levels
    /// below `depth`. Falls back to linear-smart ticks when fewer than two
    /// decades fall inside the domain.
    pub(crate) fn smart(min: D, max: D, depth: u8) -> Self {
        let twenty = D::from(MANTISSA_STEPS).unwrap_or_else(D::one);
        let mantissas = (MANTISSA_STEPS..MANTISSA_STEPS * 10)
            .map(|k| (k, smart_level(k)))
            .filter(|(_, level)| *level < depth.max(1))
            .filter_map(|(k, level)| D::from(k).map(|k| (k / twenty, level)))
            .collect();
        Self::decades(min, max, mantissas)
            .unwrap_or_else(|| Self::fallback(LinearTickIter::smart(min, max, depth)))
    }

    /// Decades split into `divisions` equal mantissa steps; everything
    /// between decades is level 1.
    pub(crate) fn fixed(min: D, max: D, divisions: usize, depth: u8) -> Self {
        let nine = D::from(9.0).unwrap_or_else(D::one);
        let parts = divisions.max(1);
        let count = if depth > 1 { parts } else { 1 };
        let mantissas = (0..count)
            .filter_map(|j| {
                let fraction = D::from(j)? / D::from(parts)?;
                Some((D::one() + nine * fraction, u8::from(j > 0)))
            })
            .collect();
        Self::decades(min, max, mantissas)
            .unwrap_or_else(|| Self::fallback(LinearTickIter::fixed(min, max, divisions, depth)))
    }

    fn fallback(iter: LinearTickIter<D>) -> Self {
        Self {
            state: LogTickIterState::Fallback(iter),
        }
    }

    fn decades(min: D, max: D, mantissas: Vec<(D, u8)>) -> Option<Self> {
        let (domain_min, domain_max) = util::sorted_pair(min, max);
        let (e_min, e_max) = decade_range(domain_min, domain_max)?;
        let tolerance = D::from(1e-9).unwrap_or_else(D::epsilon);
        let ten = D::from(10.0)?;

        let inside = (e_min..=e_max + 1)
            .map(|e| ten.powi(e))
            .filter(|decade| {
                *decade >= domain_min * (D::one() - tolerance)
                    && *decade <= domain_max * (D::one() + tolerance)
            })
            .count();
        if inside < 2 {
            return None;
        }

        Some(Self {
            state: LogTickIterState::Decades(DecadeState {
                domain_min,
                domain_max,
                tolerance,
                exponent: e_min,
                exponent_max: e_max + 1,
                current_decade: ten.powi(e_min),
                mantissas,
                mantissa_idx: 0,
            }),
        })
    }
}

impl<D: Float> Iterator for LogTickIter<D> {
    type Item = Mark<D>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.state {
            LogTickIterState::Decades(state) => {
                if let Some(mark) = state.next_mark() {
                    Some(mark)
                } else {
                    self.state = LogTickIterState::Done;
                    None
                }
            }
            LogTickIterState::Fallback(iter) => iter.next(),
            LogTickIterState::Done => None,
        }
    }
}

impl<D: Float> DecadeState<D> {
    fn next_mark(&mut self) -> Option<Mark<D>> {
        while self.exponent <= self.exponent_max {
            if self.mantissa_idx >= self.mantissas.len() {
                self.advance_decade();
                continue;
            }

            let (mantissa, level) = self.mantissas[self.mantissa_idx];
            self.mantissa_idx += 1;
            let value = mantissa * self.current_decade;

            let low = self.domain_min * (D::one() - self.tolerance);
            let high = self.domain_max * (D::one() + self.tolerance);
            if value < low {
                continue;
            }
            if value > high {
                // Mantissas ascend, nothing further in range.
                self.exponent = self.exponent_max + 1;
                return None;
            }

            return Some(Mark {
                value: value.max(self.domain_min).min(self.domain_max),
                level,
            });
        }
        None
    }

    fn advance_decade(&mut self) {
        self.exponent += 1;
        self.mantissa_idx = 0;
        self.current_decade = D::from(10.0)
            .map(|ten| ten.powi(self.exponent))
            .unwrap_or_else(D::infinity);
    }
}
