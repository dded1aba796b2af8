//! Numeric settings for a build.

use serde::{Deserialize, Serialize};

/// Bisection stops once the bracket is narrower than this (relative).
pub const BISECTION_TOLERANCE: f64 = 1e-9;

/// Hard cap on bisection steps for any inverse lookup.
pub const MAX_BISECTION_ITERATIONS: usize = 60;

/// Curve axes are never sampled more coarsely than this.
pub const MIN_CURVE_SAMPLES: usize = 50;

/// Tunables shared by every stage of a build.
///
/// All fields have defaults, so a partial JSON object deserializes fine:
///
/// ```
/// use nomograph::BuildConfig;
///
/// let config: BuildConfig = serde_json::from_str(r#"{ "curve_samples": 80 }"#).unwrap();
/// assert_eq!(config.curve_samples, 80);
/// assert_eq!(config.monotonic_samples, 200);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Samples used to verify monotonicity and to bracket inverse lookups.
    pub monotonic_samples: usize,
    /// Samples used for curve axes and polyline output.
    pub curve_samples: usize,
    /// Geometric tolerance for collinearity and tag alignment checks.
    pub tolerance: f64,
    /// Length of a level-0 tick mark, in page units.
    pub tick_length: f64,
    /// Block width used when a block does not override it.
    pub block_width: f64,
    /// Block height used when a block does not override it.
    pub block_height: f64,
    /// Offset of manual-arrow pointers from their axis.
    pub arrow_length: f64,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            monotonic_samples: 200,
            curve_samples: 200,
            tolerance: 1e-6,
            tick_length: 0.2,
            block_width: 10.0,
            block_height: 10.0,
            arrow_length: 1.0,
        }
    }
}

impl BuildConfig {
    /// Curve sample count with the lower bound applied.
    pub fn curve_samples(&self) -> usize {
        self.curve_samples.max(MIN_CURVE_SAMPLES)
    }

    pub(crate) fn monotonic_samples(&self) -> usize {
        self.monotonic_samples.max(2)
    }
}
