//! Merging solved blocks into one frame.
//!
//! Blocks are solved in their own local frames. The [`AlignmentComposer`]
//! walks them in declaration order: the first axis seen for a tag becomes
//! canonical, and every later block carrying that tag is moved by a
//! similarity (translation, rotation, uniform scale, optional mirror) until
//! its axis lies on the canonical one. An axis with an alignment mapping
//! (see [`BlockSpec::single`](crate::BlockSpec::single)) is matched at the
//! tag values it maps to and never defines a tag. [`GlobalTransform`]s then
//! act on the whole composition.

use std::collections::BTreeMap;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::block::{BlockGeometry, PlacedAxis, rungs};
use crate::config::BuildConfig;
use crate::error::{BuildIssue, Error, Result};
use crate::transform::{Affine, Point, Rect};

/// Samples used to compare two straight axes.
const STRAIGHT_SAMPLES: usize = 21;

/// Tag registry threaded through composition.
#[derive(Debug)]
pub struct AlignmentComposer {
    canonical: BTreeMap<String, PlacedAxis>,
    tolerance: f64,
    curve_samples: usize,
}

impl AlignmentComposer {
    pub fn new(config: &BuildConfig) -> Self {
        Self {
            canonical: BTreeMap::new(),
            tolerance: config.tolerance,
            curve_samples: config.curve_samples(),
        }
    }

    /// Canonical placement of `tag`, once some block has defined it.
    pub fn canonical(&self, tag: &str) -> Option<&PlacedAxis> {
        self.canonical.get(tag)
    }

    /// Moves `geometry` onto the canonical axes of the tags it shares, then
    /// registers its remaining tags.
    ///
    /// On error neither `geometry` nor the registry is changed.
    pub fn place(&mut self, geometry: &mut BlockGeometry) -> Result<()> {
        let mut moved = geometry.clone();
        let known: Vec<usize> = moved
            .axes
            .iter()
            .enumerate()
            .filter(|(_, axis)| {
                axis.tag().is_some_and(|tag| self.canonical.contains_key(tag))
            })
            .map(|(index, _)| index)
            .collect();

        if moved.independent_axes && known.len() > 1 {
            for &index in &known {
                let affine = self.fit(&moved.axes[index])?;
                let axis = &mut moved.axes[index];
                axis.transform = axis.transform.then(affine);
            }
            moved.guides = rungs(&moved)?;
        } else if let Some(&first) = known.first() {
            let affine = self.fit(&moved.axes[first])?;
            moved.apply(affine);
        }

        let mut registered = Vec::new();
        for axis in &moved.axes {
            let Some(tag) = axis.tag() else {
                continue;
            };
            match self.canonical.get(tag) {
                Some(canonical) => {
                    let samples = self.samples(axis);
                    let deviation = deviation(axis, canonical, Affine::IDENTITY, samples)?;
                    self.accept(tag, axis, canonical, deviation)?;
                }
                None if axis.alignment.is_some() => {
                    return Err(Error::config(format!(
                        "aligned axis tagged '{tag}' needs an earlier block defining the tag"
                    )));
                }
                None if !registered.iter().any(|(name, _): &(String, PlacedAxis)| name == tag) => {
                    registered.push((tag.to_string(), axis.clone()));
                }
                None => {}
            }
        }

        for (tag, axis) in registered {
            debug!("tag '{tag}' defined by {} block", moved.kind);
            self.canonical.insert(tag, axis);
        }
        *geometry = moved;
        Ok(())
    }

    fn samples(&self, axis: &PlacedAxis) -> usize {
        if axis.is_straight() {
            STRAIGHT_SAMPLES
        } else {
            self.curve_samples
        }
    }

    /// Largest deviation accepted against `canonical`, relative to its length.
    fn limit(&self, canonical: &PlacedAxis) -> Result<f64> {
        let (q0, q1) = canonical.endpoints()?;
        Ok(self.tolerance * q0.distance(q1).max(1.0))
    }

    fn accept(
        &self,
        tag: &str,
        axis: &PlacedAxis,
        canonical: &PlacedAxis,
        deviation: f64,
    ) -> Result<()> {
        if !(deviation <= self.limit(canonical)?) {
            warn!(
                "{} axis tagged '{tag}' misses the canonical geometry by {deviation:e}",
                axis.role()
            );
            return Err(Error::TagAlignmentConflict {
                tag: tag.to_string(),
                deviation,
            });
        }
        Ok(())
    }

    /// Similarity taking `axis` onto the canonical axis of its tag. The
    /// mirrored fit is only used when the direct one is out of tolerance and
    /// the mirror does better.
    fn fit(&self, axis: &PlacedAxis) -> Result<Affine> {
        let tag = axis.tag().unwrap_or_default();
        let canonical = self
            .canonical
            .get(tag)
            .ok_or_else(|| Error::config(format!("tag '{tag}' has no canonical axis")))?;

        let (u0, u1) = axis.scale().domain();
        let (p0, p1) = (axis.point(u0)?, axis.point(u1)?);
        let (q0, q1) = (
            canonical.point(axis.tag_value(u0))?,
            canonical.point(axis.tag_value(u1))?,
        );
        let dp = p1 - p0;
        let norm = dp.dot(dp);
        if !(norm > 0.0 && norm.is_finite()) {
            return Err(Error::degenerate(format!(
                "axis tagged '{tag}' has coincident end points"
            )));
        }
        let dq = q1 - q0;

        // z -> a z + b and z -> a conj(z) + b
        let a = complex_mul(dq, conj(dp)) * (1.0 / norm);
        let direct = Affine::similarity(a, q0 - complex_mul(a, p0), false);
        let a_mirror = complex_mul(dq, dp) * (1.0 / norm);
        let mirrored = Affine::similarity(a_mirror, q0 - complex_mul(a_mirror, conj(p0)), true);

        let samples = self.samples(axis);
        let direct_dev = deviation(axis, canonical, direct, samples)?;
        let mirrored_dev = deviation(axis, canonical, mirrored, samples)?;
        let (affine, dev) = if direct_dev > self.limit(canonical)? && mirrored_dev < direct_dev {
            (mirrored, mirrored_dev)
        } else {
            (direct, direct_dev)
        };
        self.accept(tag, axis, canonical, dev)?;
        Ok(affine)
    }
}

fn conj(p: Point) -> Point {
    Point::new(p.x, -p.y)
}

fn complex_mul(a: Point, b: Point) -> Point {
    Point::new(a.x * b.x - a.y * b.y, a.x * b.y + a.y * b.x)
}

/// Largest distance between `affine(axis(u))` and the canonical point of the
/// tag value `u` maps to, over `samples` values of `axis`'s domain.
fn deviation(
    axis: &PlacedAxis,
    canonical: &PlacedAxis,
    affine: Affine,
    samples: usize,
) -> Result<f64> {
    let mut worst: f64 = 0.0;
    for (u, point) in axis.sample(samples)? {
        let d = affine.apply(point).distance(canonical.point(axis.tag_value(u))?);
        if d.is_nan() {
            return Ok(f64::NAN);
        }
        worst = worst.max(d);
    }
    Ok(worst)
}

/// A transform applied to the whole composition after alignment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GlobalTransform {
    /// Counter-clockwise rotation about the origin, in degrees.
    Rotate(f64),
    Scale { sx: f64, sy: f64 },
    Translate { dx: f64, dy: f64 },
    /// Fit the bounding box of everything drawn so far onto the page.
    ScalePaper,
}

impl GlobalTransform {
    /// Concrete affine map for the current composition bounds.
    pub fn resolve(&self, bounds: Option<Rect>, page: (f64, f64)) -> Result<Affine> {
        let affine = match *self {
            GlobalTransform::Rotate(degrees) => Affine::rotate(degrees.to_radians()),
            GlobalTransform::Scale { sx, sy } => Affine::scale(sx, sy),
            GlobalTransform::Translate { dx, dy } => Affine::translate(dx, dy),
            GlobalTransform::ScalePaper => {
                let rect = bounds.ok_or_else(|| Error::config("nothing to fit onto the page"))?;
                if !(rect.width > 0.0 && rect.height > 0.0) {
                    return Err(Error::config(format!(
                        "cannot fit a {} x {} drawing onto the page",
                        rect.width, rect.height
                    )));
                }
                Affine::translate(-rect.min_x(), -rect.min_y())
                    .then(Affine::scale(page.0 / rect.width, page.1 / rect.height))
            }
        };
        if !affine.is_invertible() {
            return Err(Error::config(format!("{self:?} is not invertible")));
        }
        Ok(affine)
    }
}

/// Bounding box of all blocks in the current frame.
pub(crate) fn composition_bounds(
    blocks: &[(usize, BlockGeometry)],
    curve_samples: usize,
) -> Result<Option<Rect>> {
    let mut rect: Option<Rect> = None;
    for (_, block) in blocks {
        if let Some(b) = block.bounds(curve_samples)? {
            rect = Some(match rect {
                Some(a) => a.union(&b),
                None => b,
            });
        }
    }
    Ok(rect)
}

/// Applies `transforms` in order; a transform that cannot be resolved is
/// skipped and reported.
pub(crate) fn apply_global(
    blocks: &mut [(usize, BlockGeometry)],
    transforms: &[GlobalTransform],
    page: (f64, f64),
    config: &BuildConfig,
) -> Vec<BuildIssue> {
    let mut issues = Vec::new();
    for transform in transforms {
        let resolved = composition_bounds(blocks, config.curve_samples())
            .and_then(|bounds| transform.resolve(bounds, page));
        match resolved {
            Ok(affine) if affine.is_identity() => {
                debug!("global {transform:?} leaves the composition unchanged");
            }
            Ok(affine) => {
                debug!("global {transform:?}: {:?}", affine.as_array());
                for (_, block) in blocks.iter_mut() {
                    block.apply(affine);
                }
            }
            Err(error) => {
                warn!("skipping global {transform:?}: {error}");
                issues.push(BuildIssue::global(error));
            }
        }
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{BlockSpec, Role};
    use crate::scale::AxisSpec;

    fn config() -> BuildConfig {
        BuildConfig::default()
    }

    fn left_block() -> BlockSpec {
        BlockSpec::sum()
            .axis(Role::F1, AxisSpec::new(0.0, 10.0))
            .axis(Role::F2, AxisSpec::new(0.0, 10.0))
            .axis(Role::F3, AxisSpec::new(0.0, -20.0).tag("s"))
    }

    fn right_block() -> BlockSpec {
        BlockSpec::sum()
            .axis(Role::F1, AxisSpec::new(0.0, -20.0).tag("s"))
            .axis(Role::F2, AxisSpec::new(0.0, 5.0))
            .axis(Role::F3, AxisSpec::new(0.0, 20.0))
            .size(4.0, 3.0)
    }

    #[test]
    fn shared_tags_coincide() {
        let mut composer = AlignmentComposer::new(&config());
        let mut first = left_block().solve(&config()).unwrap();
        let mut second = right_block().solve(&config()).unwrap();
        composer.place(&mut first).unwrap();
        composer.place(&mut second).unwrap();

        let a = first.axis(Role::F3).unwrap();
        let b = second.axis(Role::F1).unwrap();
        for u in [0.0, -5.0, -20.0] {
            assert!(a.point(u).unwrap().distance(b.point(u).unwrap()) < 1e-9);
        }
    }

    #[test]
    fn reversed_axis_is_matched_by_rotation() {
        let mut composer = AlignmentComposer::new(&config());
        let mut first = left_block().solve(&config()).unwrap();
        let mut flipped = right_block().mirror(false, true).solve(&config()).unwrap();
        composer.place(&mut first).unwrap();
        composer.place(&mut flipped).unwrap();
        let a = first.axis(Role::F3).unwrap();
        let b = flipped.axis(Role::F1).unwrap();
        assert!(a.point(-7.0).unwrap().distance(b.point(-7.0).unwrap()) < 1e-9);
    }

    #[test]
    fn incompatible_shapes_conflict() {
        let mut composer = AlignmentComposer::new(&config());
        let mut first = left_block().solve(&config()).unwrap();
        composer.place(&mut first).unwrap();

        let mut curved = BlockSpec::sum()
            .axis(
                Role::F1,
                AxisSpec::new(0.0, -20.0)
                    .function(|u: f64| -(u * u))
                    .tag("s"),
            )
            .axis(Role::F2, AxisSpec::new(0.0, 10.0))
            .axis(Role::F3, AxisSpec::new(0.0, 10.0))
            .solve(&config())
            .unwrap();
        let before = curved.axis(Role::F1).unwrap().point(-3.0).unwrap();
        let result = composer.place(&mut curved);
        assert!(matches!(result, Err(Error::TagAlignmentConflict { .. })));
        assert_eq!(curved.axis(Role::F1).unwrap().point(-3.0).unwrap(), before);
    }

    #[test]
    fn scale_paper_fills_the_page() {
        let mut blocks = vec![(0, left_block().solve(&config()).unwrap())];
        let issues = apply_global(
            &mut blocks,
            &[GlobalTransform::Rotate(30.0), GlobalTransform::ScalePaper],
            (20.0, 5.0),
            &config(),
        );
        assert!(issues.is_empty());
        let rect = composition_bounds(&blocks, 50).unwrap().unwrap();
        assert!(rect.min_x().abs() < 1e-9 && rect.min_y().abs() < 1e-9);
        assert!((rect.width - 20.0).abs() < 1e-9 && (rect.height - 5.0).abs() < 1e-9);
    }

    #[test]
    fn identity_transforms_are_skipped() {
        let mut blocks = vec![(0, left_block().solve(&config()).unwrap())];
        let before = blocks[0].1.axis(Role::F3).unwrap().endpoints().unwrap();
        let issues = apply_global(
            &mut blocks,
            &[
                GlobalTransform::Translate { dx: 0.0, dy: 0.0 },
                GlobalTransform::Scale { sx: 1.0, sy: 1.0 },
            ],
            (10.0, 10.0),
            &config(),
        );
        assert!(issues.is_empty());
        let axis = blocks[0].1.axis(Role::F3).unwrap();
        assert!(axis.transform.is_identity());
        assert_eq!(axis.endpoints().unwrap(), before);
    }

    #[test]
    fn singular_transform_is_reported() {
        let mut blocks = vec![(0, left_block().solve(&config()).unwrap())];
        let before = blocks[0].1.axis(Role::F1).unwrap().point(1.0).unwrap();
        let issues = apply_global(
            &mut blocks,
            &[GlobalTransform::Scale { sx: 0.0, sy: 1.0 }],
            (10.0, 10.0),
            &config(),
        );
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].block, None);
        assert!(matches!(issues[0].error, Error::Configuration(_)));
        assert_eq!(blocks[0].1.axis(Role::F1).unwrap().point(1.0).unwrap(), before);
    }
}
