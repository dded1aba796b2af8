use serde::Serialize;

use super::{
    AxisSpec, Overlay, ScaleModel, ScaleType, TextFormat, TickIter, linear::LinearTickIter,
    log::LogTickIter, manual, tick_iter::Mark, util,
};
use crate::error::{Error, Result};

/// Deepest supported tick nesting.
pub const MAX_TICK_DEPTH: u8 = 5;

/// Relative visual length of each tick level.
const LEVEL_LENGTHS: [f64; MAX_TICK_DEPTH as usize] = [1.0, 0.7, 0.5, 0.35, 0.25];

/// One resolved tick mark.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tick {
    /// Labelled value.
    pub value: f64,
    /// Mapped position, `forward(display_value(value))`.
    pub position: f64,
    /// Nesting level, 0 is the coarsest.
    pub level: u8,
    /// Text for labelled levels, `None` otherwise.
    pub label: Option<String>,
    /// Length relative to a level-0 tick.
    pub length: f64,
}

/// Produces the ordered tick hierarchy of one axis.
///
/// ```
/// use nomograph::{AxisSpec, TickGenerator};
///
/// let spec = AxisSpec::new(0.0, 10.0).tick_levels(2, 1);
/// let scale = spec.build_scale(100).unwrap();
/// let ticks = TickGenerator::from_spec(&spec).unwrap().generate(&scale).unwrap();
///
/// let labels: Vec<_> = ticks.iter().filter_map(|t| t.label.as_deref()).collect();
/// assert_eq!(labels.first(), Some(&"0"));
/// assert_eq!(labels.last(), Some(&"10"));
/// assert!(ticks.iter().any(|t| t.level == 1 && t.label.is_none()));
/// ```
#[derive(Debug, Clone)]
pub struct TickGenerator {
    scale_type: ScaleType,
    depth: u8,
    text_levels: u8,
    divisions: usize,
    table: Vec<(f64, String)>,
    text_format: TextFormat,
}

impl TickGenerator {
    pub fn from_spec(spec: &AxisSpec) -> Result<Self> {
        if spec.tick_levels == 0 || spec.tick_levels > MAX_TICK_DEPTH {
            return Err(Error::config(format!(
                "tick depth must be between 1 and {MAX_TICK_DEPTH}, got {}",
                spec.tick_levels
            )));
        }
        if spec.tick_text_levels > spec.tick_levels {
            return Err(Error::config(format!(
                "{} labelled levels requested but only {} tick levels exist",
                spec.tick_text_levels, spec.tick_levels
            )));
        }
        Ok(Self {
            scale_type: spec.scale_type,
            depth: spec.tick_levels,
            text_levels: spec.tick_text_levels,
            divisions: spec.divisions,
            table: spec.table.clone(),
            text_format: spec.text_format,
        })
    }

    /// Generator for an extra manual scale laid over an existing axis.
    pub fn overlay(overlay: &Overlay) -> Result<Self> {
        if !overlay.scale_type.is_manual() {
            return Err(Error::config(format!(
                "overlays must use a manual scale type, got '{}'",
                overlay.scale_type
            )));
        }
        Ok(Self {
            scale_type: overlay.scale_type,
            depth: 1,
            text_levels: 1,
            divisions: 1,
            table: overlay.table.clone(),
            text_format: TextFormat::Auto,
        })
    }

    pub fn generate(&self, scale: &ScaleModel) -> Result<Vec<Tick>> {
        let (min, max) = scale.domain();
        let marks: Vec<Mark<f64>> = self.marks(min, max)?.collect();

        let labels = self.labels(&marks);
        marks
            .iter()
            .zip(labels)
            .map(|(mark, label)| {
                let position = scale.display_position(mark.value);
                if !position.is_finite() {
                    return Err(Error::degenerate(format!(
                        "tick at u = {} has no finite position",
                        mark.value
                    )));
                }
                Ok(Tick {
                    value: mark.value,
                    position,
                    level: mark.level,
                    label,
                    length: LEVEL_LENGTHS[usize::from(mark.level).min(LEVEL_LENGTHS.len() - 1)],
                })
            })
            .collect()
    }

    /// Raw marks ordered from the first declared domain end to the second.
    fn marks(&self, min: f64, max: f64) -> Result<TickIter<f64>> {
        let iter = match self.scale_type {
            ScaleType::LinearSmart => {
                TickIter::from_linear(LinearTickIter::smart(min, max, self.depth))
            }
            ScaleType::Linear => {
                TickIter::from_linear(LinearTickIter::fixed(min, max, self.divisions, self.depth))
            }
            ScaleType::LogSmart | ScaleType::Log => {
                if min <= 0.0 || max <= 0.0 {
                    return Err(Error::config(format!(
                        "'{}' scale needs a positive domain, got [{min}, {max}]",
                        self.scale_type
                    )));
                }
                let ascending = if self.scale_type == ScaleType::LogSmart {
                    LogTickIter::smart(min, max, self.depth)
                } else {
                    LogTickIter::fixed(min, max, self.divisions, self.depth)
                };
                let iter = TickIter::from_log(ascending);
                if min > max {
                    let mut marks: Vec<_> = iter.collect();
                    marks.reverse();
                    TickIter::from_vec(marks)
                } else {
                    iter
                }
            }
            ScaleType::ManualPoint
            | ScaleType::ManualLine
            | ScaleType::ManualArrow
            | ScaleType::ManualData => manual::table_marks(&self.table, (min, max))?,
        };
        Ok(iter)
    }

    fn labels(&self, marks: &[Mark<f64>]) -> Vec<Option<String>> {
        if self.scale_type.is_manual() {
            return self.table.iter().map(|(_, text)| Some(text.clone())).collect();
        }

        let labelled = |mark: &Mark<f64>| mark.level < self.text_levels;
        let shared_decimals = marks
            .iter()
            .filter(|m| labelled(m))
            .map(|m| util::significant_decimals(m.value))
            .max()
            .unwrap_or(0);
        let per_value = matches!(self.scale_type, ScaleType::Log | ScaleType::LogSmart);

        marks
            .iter()
            .map(|mark| {
                labelled(mark).then(|| {
                    let decimals = if per_value {
                        util::significant_decimals(mark.value)
                    } else {
                        shared_decimals
                    };
                    self.text_format.format(mark.value, decimals)
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale::TickSide;

    fn ticks(spec: &AxisSpec) -> Vec<Tick> {
        let scale = spec.build_scale(200).unwrap();
        TickGenerator::from_spec(spec).unwrap().generate(&scale).unwrap()
    }

    #[test]
    fn linear_smart_labels_share_decimals() {
        let spec = AxisSpec::new(0.0, 1.0).tick_levels(2, 1);
        let labels: Vec<String> = ticks(&spec).into_iter().filter_map(|t| t.label).collect();
        assert_eq!(labels.first().map(String::as_str), Some("0.0"));
        assert_eq!(labels.last().map(String::as_str), Some("1.0"));
        assert!(labels.contains(&"0.5".to_string()));
    }

    #[test]
    fn reversed_domain_yields_descending_ticks() {
        let spec = AxisSpec::new(0.0, -10.0).tick_levels(1, 1);
        let values: Vec<f64> = ticks(&spec).iter().map(|t| t.value).collect();
        assert_eq!(values.first(), Some(&0.0));
        assert_eq!(values.last(), Some(&-10.0));
    }

    #[test]
    fn log_ticks_follow_domain_order() {
        let spec = AxisSpec::new(1000.0, 1.0)
            .scale_type(ScaleType::LogSmart)
            .tick_levels(2, 1);
        let result = ticks(&spec);
        assert_eq!(result.first().map(|t| t.value), Some(1000.0));
        assert_eq!(result.last().map(|t| t.value), Some(1.0));
        let lengths: Vec<f64> = result.iter().map(|t| t.length).collect();
        assert!(lengths.contains(&1.0) && lengths.contains(&0.7));
    }

    #[test]
    fn log_scale_rejects_non_positive_domain() {
        let spec = AxisSpec::new(-1.0, 10.0).scale_type(ScaleType::Log);
        let scale = spec.build_scale(50).unwrap();
        let result = TickGenerator::from_spec(&spec).unwrap().generate(&scale);
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn manual_ticks_are_table_keys_under_forward() {
        let spec = AxisSpec::new(0.0, 4.0)
            .function(|u: f64| u * u + 1.0)
            .scale_type(ScaleType::ManualLine)
            .manual([(0.5, "a"), (1.25, "b"), (3.0, "c")])
            .tick_side(TickSide::Left);
        let result = ticks(&spec);
        let values: Vec<f64> = result.iter().map(|t| t.value).collect();
        assert_eq!(values, vec![0.5, 1.25, 3.0]);
        for tick in &result {
            assert_eq!(tick.position, tick.value * tick.value + 1.0);
        }
        let labels: Vec<_> = result.iter().filter_map(|t| t.label.as_deref()).collect();
        assert_eq!(labels, vec!["a", "b", "c"]);
    }

    #[test]
    fn fixed_decimals_override_auto() {
        let spec = AxisSpec::new(0.0, 10.0)
            .tick_levels(1, 1)
            .text_format(TextFormat::Decimals(2));
        let first = ticks(&spec).into_iter().next().and_then(|t| t.label);
        assert_eq!(first.as_deref(), Some("0.00"));
    }

    #[test]
    fn depth_is_validated() {
        let too_deep = AxisSpec::new(0.0, 1.0).tick_levels(6, 1);
        assert!(matches!(
            TickGenerator::from_spec(&too_deep),
            Err(Error::Configuration(_))
        ));
        let too_many_labels = AxisSpec::new(0.0, 1.0).tick_levels(2, 3);
        assert!(TickGenerator::from_spec(&too_many_labels).is_err());
    }
}
