use std::collections::BTreeMap;

use log::debug;

use super::{
    BlockGeometry, Constraint, Coord, Dims, PlacedAxis, Placement, RelationSolver, Role, prepare,
    required,
};
use crate::config::BuildConfig;
use crate::error::{Error, Result};
use crate::scale::{AxisSpec, ScaleModel, util};
use crate::transform::Point;

/// `F1 + F2 + F3 = 0` on three parallel vertical axes.
pub(crate) struct SumSolver;

/// Coordinate range `(c(u_min), c(u_max))` of a scale under `coord`, with the
/// sign folded in.
pub(crate) fn coordinate_range(scale: &ScaleModel, coord: Coord, sign: f64) -> (f64, f64) {
    let (t0, t1) = scale.position_range();
    (sign * coord.apply(t0), sign * coord.apply(t1))
}

/// Placements for `c_left + c_middle + c_right = 0` as `(origin, direction)`
/// pairs with `point = origin + direction * c`.
///
/// The outer rails stand at `x = 0` and `x = width`, each spreading its
/// coordinate range over the block height. The middle rail sits at the
/// weighted harmonic position `width * m1 / (m1 + m3)`, where three points
/// with a zero coordinate sum are exactly collinear.
pub(crate) fn three_rails(
    left: (f64, f64),
    right: (f64, f64),
    dims: Dims,
) -> Result<[(Point, Point); 3]> {
    let (lo1, hi1) = util::sorted_pair(left.0, left.1);
    let (lo3, hi3) = util::sorted_pair(right.0, right.1);
    let (span1, span3) = (hi1 - lo1, hi3 - lo3);
    if !(span1 > 0.0 && span3 > 0.0 && span1.is_finite() && span3.is_finite()) {
        return Err(Error::degenerate("outer axes of a sum layout need a non-empty range"));
    }

    let m1 = dims.height / span1;
    let m3 = dims.height / span3;
    let k = m1 * m3 / (m1 + m3);
    let x_middle = dims.width * m1 / (m1 + m3);

    Ok([
        (Point::new(0.0, -m1 * lo1), Point::new(0.0, m1)),
        (Point::new(x_middle, -k * (lo1 + lo3)), Point::new(0.0, -k)),
        (Point::new(dims.width, -m3 * lo3), Point::new(0.0, m3)),
    ])
}

/// One axis of a three-rail layout: role, coordinate kind and sign.
pub(crate) struct Leg<'a> {
    pub role: Role,
    pub spec: &'a AxisSpec,
    pub coord: Coord,
    pub sign: f64,
}

/// Places `left`, `middle`, `right` legs on three rails.
pub(crate) fn place_legs(
    legs: [Leg<'_>; 3],
    dims: Dims,
    config: &BuildConfig,
) -> Result<Vec<PlacedAxis>> {
    let mut prepared = Vec::with_capacity(3);
    for leg in &legs {
        let (scale, ticks) = prepare(leg.spec, config)?;
        if leg.coord == Coord::Log {
            let (t0, t1) = scale.position_range();
            if !(t0 > 0.0 && t1 > 0.0) {
                return Err(Error::config(format!(
                    "axis {} must map to positive values for a logarithmic layout",
                    leg.role
                )));
            }
        }
        prepared.push((scale, ticks));
    }

    let left = coordinate_range(&prepared[0].0, legs[0].coord, legs[0].sign);
    let right = coordinate_range(&prepared[2].0, legs[2].coord, legs[2].sign);
    let rails = three_rails(left, right, dims)?;

    Ok(legs
        .iter()
        .zip(prepared)
        .zip(rails)
        .map(|((leg, (scale, ticks)), (origin, direction))| {
            debug!(
                "{} at x = {:.4}, {:.4} per unit",
                leg.role, origin.x, direction.y
            );
            PlacedAxis::new(
                leg.role,
                leg.spec.clone(),
                scale,
                ticks,
                Placement::Straight {
                    origin,
                    direction: direction * leg.sign,
                    coord: leg.coord,
                },
            )
        })
        .collect())
}

fn direct_leg(axes: &BTreeMap<Role, AxisSpec>, role: Role) -> Result<Leg<'_>> {
    Ok(Leg {
        role,
        spec: required(axes, role, "sum")?,
        coord: Coord::Direct,
        sign: 1.0,
    })
}

impl RelationSolver for SumSolver {
    fn solve(
        &self,
        axes: &BTreeMap<Role, AxisSpec>,
        dims: Dims,
        config: &BuildConfig,
    ) -> Result<BlockGeometry> {
        let legs = [
            direct_leg(axes, Role::F1)?,
            direct_leg(axes, Role::F2)?,
            direct_leg(axes, Role::F3)?,
        ];
        let placed = place_legs(legs, dims, config)?;
        Ok(BlockGeometry::new(
            "sum",
            placed,
            vec![Constraint::Collinear([Role::F1, Role::F2, Role::F3])],
        ))
    }
}
