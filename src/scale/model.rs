use std::fmt;
use std::sync::Arc;

use log::trace;

use super::{Mapping, util};
use crate::config::{BISECTION_TOLERANCE, MAX_BISECTION_ITERATIONS};
use crate::error::{Error, Result};

/// Forward and inverse mapping for one axis.
///
/// `forward` applies the governing function; `value_at` runs it backwards,
/// through the closed-form inverse when the mapping has one and by bounded
/// bisection over the cached samples otherwise.
///
/// ```
/// use nomograph::ScaleModel;
/// use std::sync::Arc;
///
/// let model = ScaleModel::construct((1.0, 4.0), Arc::new(|u: f64| u * u), None, 100).unwrap();
/// assert_eq!(model.forward(3.0), 9.0);
/// assert!((model.value_at(6.25).unwrap() - 2.5).abs() < 1e-6);
/// ```
#[derive(Clone)]
pub struct ScaleModel {
    min: f64,
    max: f64,
    mapping: Arc<dyn Mapping>,
    align: Option<Arc<dyn Mapping>>,
    /// `(u, forward(u))`, ordered from `min` to `max`.
    samples: Vec<(f64, f64)>,
    increasing: bool,
}

impl ScaleModel {
    /// Samples `mapping` at `samples` points over `domain` and checks that it
    /// is finite and strictly monotonic there.
    pub fn construct(
        domain: (f64, f64),
        mapping: Arc<dyn Mapping>,
        align: Option<Arc<dyn Mapping>>,
        samples: usize,
    ) -> Result<Self> {
        let (min, max) = domain;
        if !min.is_finite() || !max.is_finite() {
            return Err(Error::degenerate(format!(
                "domain [{min}, {max}] is not finite"
            )));
        }
        if min == max {
            return Err(Error::degenerate(format!("domain [{min}, {max}] is empty")));
        }

        let count = samples.max(2);
        let step = (max - min) / (count - 1) as f64;
        let samples: Vec<(f64, f64)> = (0..count)
            .map(|i| {
                let u = if i + 1 == count { max } else { min + step * i as f64 };
                (u, mapping.apply(u))
            })
            .collect();

        let values: Vec<f64> = samples.iter().map(|(_, t)| *t).collect();
        let Some(increasing) = util::strict_direction(&values) else {
            let at = util::first_turn(&values)
                .map(|i| samples[i].0)
                .or_else(|| samples.iter().find(|(_, t)| !t.is_finite()).map(|(u, _)| *u))
                .unwrap_or(min);
            return Err(Error::degenerate(format!(
                "mapping is not strictly monotonic over [{min}, {max}] (near u = {at})"
            )));
        };

        Ok(Self {
            min,
            max,
            mapping,
            align,
            samples,
            increasing,
        })
    }

    /// Declared domain, in declaration order.
    pub fn domain(&self) -> (f64, f64) {
        (self.min, self.max)
    }

    /// Mapped values at the two domain ends, `(forward(min), forward(max))`.
    pub fn position_range(&self) -> (f64, f64) {
        let first = self.samples.first().map_or(0.0, |(_, t)| *t);
        let last = self.samples.last().map_or(0.0, |(_, t)| *t);
        (first, last)
    }

    pub fn is_increasing(&self) -> bool {
        self.increasing
    }

    pub fn forward(&self, u: f64) -> f64 {
        self.mapping.apply(u)
    }

    /// Value whose position a tick labelled `u` is drawn at.
    pub fn display_value(&self, u: f64) -> f64 {
        self.align.as_ref().map_or(u, |align| align.apply(u))
    }

    pub fn display_position(&self, u: f64) -> f64 {
        self.forward(self.display_value(u))
    }

    /// True when `u` lies in the domain, allowing a relative slack of 1e-9.
    pub fn contains(&self, u: f64) -> bool {
        let (lo, hi) = util::sorted_pair(self.min, self.max);
        let slack = (hi - lo) * 1e-9;
        u >= lo - slack && u <= hi + slack
    }

    /// Rejects `u` outside the domain with [`Error::OutOfDomain`].
    pub fn check(&self, u: f64) -> Result<()> {
        if self.contains(u) {
            Ok(())
        } else {
            let (min, max) = util::sorted_pair(self.min, self.max);
            Err(Error::OutOfDomain { value: u, min, max })
        }
    }

    /// Inverse of [`ScaleModel::forward`] restricted to the domain.
    pub fn value_at(&self, t: f64) -> Result<f64> {
        let (t_lo, t_hi) = util::sorted_pair(self.position_range().0, self.position_range().1);
        let slack = (t_hi - t_lo) * 1e-9;
        if !t.is_finite() || t < t_lo - slack || t > t_hi + slack {
            let (min, max) = util::sorted_pair(self.min, self.max);
            return Err(Error::OutOfDomain {
                value: t,
                min,
                max,
            });
        }

        if let Some(u) = self.mapping.inverse(t)
            && u.is_finite()
            && self.contains(u)
        {
            return Ok(u);
        }

        self.bisect(t)
    }

    fn bisect(&self, target: f64) -> Result<f64> {
        let index = self
            .samples
            .windows(2)
            .position(|w| {
                let (lo, hi) = util::sorted_pair(w[0].1, w[1].1);
                target >= lo && target <= hi
            })
            .unwrap_or(if self.is_below(target) { 0 } else { self.samples.len() - 2 });

        let (mut a, mut b) = (self.samples[index].0, self.samples[index + 1].0);
        for iteration in 0..MAX_BISECTION_ITERATIONS {
            let mid = 0.5 * (a + b);
            if (b - a).abs() <= BISECTION_TOLERANCE * (1.0 + mid.abs()) {
                trace!("bisection for {target} converged after {iteration} steps at {mid}");
                return Ok(mid);
            }
            let value = self.mapping.apply(mid);
            if value.is_nan() {
                return Err(Error::degenerate(format!("mapping is undefined at u = {mid}")));
            }
            if (value < target) == self.increasing {
                a = mid;
            } else {
                b = mid;
            }
        }

        Err(Error::DomainSolveTimeout {
            target,
            iterations: MAX_BISECTION_ITERATIONS,
        })
    }

    fn is_below(&self, t: f64) -> bool {
        let first = self.position_range().0;
        if self.increasing { t <= first } else { t >= first }
    }
}

impl fmt::Debug for ScaleModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScaleModel")
            .field("domain", &(self.min, self.max))
            .field("positions", &self.position_range())
            .field("samples", &self.samples.len())
            .field("aligned", &self.align.is_some())
            .finish()
    }
}
