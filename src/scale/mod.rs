//! Axis scales: value mappings, inverse lookup and tick hierarchies.
//!
//! An [`AxisSpec`] is the caller's description of one variable. Building it
//! yields a [`ScaleModel`] (value to parametric position and back) and, through
//! [`TickGenerator`], the ordered ticks drawn along the placed axis.

mod linear;
mod log;
mod manual;
mod model;
mod tick_iter;
mod ticks;
pub(crate) mod util;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub use model::ScaleModel;
pub use tick_iter::TickIter;
pub use ticks::{Tick, TickGenerator};

/// A single-method strategy mapping an axis value `u` to a real number.
///
/// Closures implement it directly, so most axes are declared with
/// `AxisSpec::new(lo, hi).function(|u: f64| u * u)`. Types that know their inverse
/// can override [`Mapping::inverse`] so [`ScaleModel::value_at`] skips
/// bisection.
pub trait Mapping: Send + Sync {
    fn apply(&self, u: f64) -> f64;

    /// Closed-form inverse, if one exists.
    fn inverse(&self, _t: f64) -> Option<f64> {
        None
    }
}

impl<F> Mapping for F
where
    F: Fn(f64) -> f64 + Send + Sync,
{
    fn apply(&self, u: f64) -> f64 {
        self(u)
    }
}

/// `u -> u`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Mapping for Identity {
    fn apply(&self, u: f64) -> f64 {
        u
    }

    fn inverse(&self, t: f64) -> Option<f64> {
        Some(t)
    }
}

/// `u -> scale * u + offset`.
#[derive(Debug, Clone, Copy)]
pub struct LinearMap {
    pub scale: f64,
    pub offset: f64,
}

impl Mapping for LinearMap {
    fn apply(&self, u: f64) -> f64 {
        self.scale * u + self.offset
    }

    fn inverse(&self, t: f64) -> Option<f64> {
        (self.scale != 0.0).then(|| (t - self.offset) / self.scale)
    }
}

/// `u -> log10(u)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Log10;

impl Mapping for Log10 {
    fn apply(&self, u: f64) -> f64 {
        u.log10()
    }

    fn inverse(&self, t: f64) -> Option<f64> {
        Some(10f64.powf(t))
    }
}

/// How ticks are produced and how the axis is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScaleType {
    /// Fixed subdivision count, no snapping to round numbers.
    Linear,
    /// Nice-number major steps from {1, 2, 2.5, 5} x 10^k.
    LinearSmart,
    /// Decades with a fixed subdivision count.
    Log,
    /// Decades subdivided at mantissas 1..9 and finer.
    LogSmart,
    /// Table labels without a connecting axis line.
    ManualPoint,
    /// Table labels on a continuous ticked line.
    ManualLine,
    /// Table labels marked by offset arrows.
    ManualArrow,
    /// Only caller-supplied marks; nothing is generated.
    ManualData,
}

impl ScaleType {
    pub fn is_manual(self) -> bool {
        matches!(
            self,
            ScaleType::ManualPoint
                | ScaleType::ManualLine
                | ScaleType::ManualArrow
                | ScaleType::ManualData
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            ScaleType::Linear => "linear",
            ScaleType::LinearSmart => "linear smart",
            ScaleType::Log => "log",
            ScaleType::LogSmart => "log smart",
            ScaleType::ManualPoint => "manual point",
            ScaleType::ManualLine => "manual line",
            ScaleType::ManualArrow => "manual arrow",
            ScaleType::ManualData => "manual data",
        }
    }
}

impl fmt::Display for ScaleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScaleType {
    type Err = Error;

    /// Accepts the spellings used by nomogram scripts (`"linear smart"`,
    /// `"manual arrow"`, ...). Underscores and hyphens count as spaces.
    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace(['_', '-'], " ");
        match normalized.as_str() {
            "linear" => Ok(ScaleType::Linear),
            "linear smart" => Ok(ScaleType::LinearSmart),
            "log" => Ok(ScaleType::Log),
            "log smart" => Ok(ScaleType::LogSmart),
            "manual point" => Ok(ScaleType::ManualPoint),
            "manual line" => Ok(ScaleType::ManualLine),
            "manual arrow" => Ok(ScaleType::ManualArrow),
            "manual data" => Ok(ScaleType::ManualData),
            _ => Err(Error::config(format!("unknown scale_type '{s}'"))),
        }
    }
}

/// Side of the axis line that tick marks are drawn on, looking from the
/// domain minimum towards the maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TickSide {
    Left,
    #[default]
    Right,
}

/// Number formatting for tick labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextFormat {
    /// As many decimals as the tick step needs.
    #[default]
    Auto,
    /// A fixed number of decimals.
    Decimals(usize),
}

impl TextFormat {
    /// `auto_decimals` is used when the format is [`TextFormat::Auto`].
    pub(crate) fn format(self, value: f64, auto_decimals: usize) -> String {
        let decimals = match self {
            TextFormat::Auto => auto_decimals,
            TextFormat::Decimals(d) => d,
        };
        let text = format!("{value:.decimals$}");
        // "-0.00" reads badly on an axis.
        if text.starts_with('-') && text[1..].chars().all(|c| c == '0' || c == '.') {
            text[1..].to_string()
        } else {
            text
        }
    }
}

/// An extra manual scale drawn on the geometry of an existing axis, such as
/// arrows pointing at a few reference values.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub scale_type: ScaleType,
    pub table: Vec<(f64, String)>,
    pub tick_side: TickSide,
}

/// Declarative description of one axis.
///
/// Built with chained setters; everything but the domain has a default
/// (identity mapping, linear-smart ticks, three tick levels, two labelled).
///
/// ```
/// use nomograph::{AxisSpec, ScaleType};
///
/// let speed = AxisSpec::new(0.0, 120.0)
///     .function(|u: f64| u / 3.6)
///     .tag("speed")
///     .scale_type(ScaleType::LinearSmart)
///     .tick_levels(3, 1);
/// assert_eq!(speed.domain(), (0.0, 120.0));
/// assert_eq!(speed.tag_name(), Some("speed"));
/// ```
#[derive(Clone)]
pub struct AxisSpec {
    pub(crate) u_min: f64,
    pub(crate) u_max: f64,
    pub(crate) function: Arc<dyn Mapping>,
    pub(crate) align: Option<Arc<dyn Mapping>>,
    pub(crate) homogeneous: Option<[Arc<dyn Mapping>; 3]>,
    pub(crate) companion: Option<Arc<dyn Mapping>>,
    pub(crate) tag: Option<String>,
    pub(crate) title: Option<String>,
    pub(crate) scale_type: ScaleType,
    pub(crate) tick_levels: u8,
    pub(crate) tick_text_levels: u8,
    pub(crate) divisions: usize,
    pub(crate) table: Vec<(f64, String)>,
    pub(crate) tick_side: TickSide,
    pub(crate) text_format: TextFormat,
    pub(crate) overlays: Vec<Overlay>,
}

impl AxisSpec {
    pub fn new(u_min: f64, u_max: f64) -> Self {
        Self {
            u_min,
            u_max,
            function: Arc::new(Identity),
            align: None,
            homogeneous: None,
            companion: None,
            tag: None,
            title: None,
            scale_type: ScaleType::LinearSmart,
            tick_levels: 3,
            tick_text_levels: 2,
            divisions: 10,
            table: Vec::new(),
            tick_side: TickSide::default(),
            text_format: TextFormat::default(),
            overlays: Vec::new(),
        }
    }

    /// Mapping used by the governing relation.
    pub fn function(mut self, f: impl Mapping + 'static) -> Self {
        self.function = Arc::new(f);
        self
    }

    /// Mapping from a labelled value to the value whose position it is drawn
    /// at. Only tick placement uses it, except on a single-axis block, where
    /// it names the value of the tagged axis each label lines up with.
    pub fn align(mut self, f: impl Mapping + 'static) -> Self {
        self.align = Some(Arc::new(f));
        self
    }

    /// Homogeneous coordinates `(f(u), g(u), h(u))` for determinant blocks.
    pub fn homogeneous(
        mut self,
        f: impl Mapping + 'static,
        g: impl Mapping + 'static,
        h: impl Mapping + 'static,
    ) -> Self {
        self.homogeneous = Some([Arc::new(f), Arc::new(g), Arc::new(h)]);
        self
    }

    /// Second coupled function for the curve axis of a compound block.
    pub fn companion(mut self, f: impl Mapping + 'static) -> Self {
        self.companion = Some(Arc::new(f));
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn scale_type(mut self, scale_type: ScaleType) -> Self {
        self.scale_type = scale_type;
        self
    }

    /// Tick nesting depth and how many of those levels carry labels.
    pub fn tick_levels(mut self, levels: u8, text_levels: u8) -> Self {
        self.tick_levels = levels;
        self.tick_text_levels = text_levels;
        self
    }

    /// Major subdivisions for the non-smart `linear`/`log` scale types.
    pub fn divisions(mut self, divisions: usize) -> Self {
        self.divisions = divisions;
        self
    }

    /// Value to label table for the manual scale types.
    pub fn manual<S: Into<String>>(mut self, table: impl IntoIterator<Item = (f64, S)>) -> Self {
        self.table = table.into_iter().map(|(v, s)| (v, s.into())).collect();
        self
    }

    pub fn tick_side(mut self, side: TickSide) -> Self {
        self.tick_side = side;
        self
    }

    pub fn text_format(mut self, format: TextFormat) -> Self {
        self.text_format = format;
        self
    }

    pub fn overlay(mut self, overlay: Overlay) -> Self {
        self.overlays.push(overlay);
        self
    }

    pub fn domain(&self) -> (f64, f64) {
        (self.u_min, self.u_max)
    }

    pub fn tag_name(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn kind(&self) -> ScaleType {
        self.scale_type
    }

    /// Builds the scale model for this axis.
    pub fn build_scale(&self, samples: usize) -> Result<ScaleModel> {
        ScaleModel::construct(
            (self.u_min, self.u_max),
            self.function.clone(),
            self.align.clone(),
            samples,
        )
    }

    /// Rejects an empty or non-finite domain.
    pub(crate) fn check_range(&self) -> Result<()> {
        if !self.u_min.is_finite() || !self.u_max.is_finite() || self.u_min == self.u_max {
            return Err(Error::InvalidRange {
                min: self.u_min,
                max: self.u_max,
            });
        }
        Ok(())
    }
}

impl fmt::Debug for AxisSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AxisSpec")
            .field("u_min", &self.u_min)
            .field("u_max", &self.u_max)
            .field("tag", &self.tag)
            .field("scale_type", &self.scale_type)
            .field("tick_levels", &self.tick_levels)
            .field("tick_text_levels", &self.tick_text_levels)
            .field("aligned", &self.align.is_some())
            .field("homogeneous", &self.homogeneous.is_some())
            .finish_non_exhaustive()
    }
}
