use std::collections::BTreeMap;

use log::debug;

use super::sum::{Leg, coordinate_range, place_legs};
use super::{
    BlockGeometry, Constraint, Coord, Dims, PlacedAxis, Placement, RelationSolver, Role, prepare,
    required,
};
use crate::config::BuildConfig;
use crate::error::{Error, Result};
use crate::scale::{AxisSpec, ScaleModel, Tick, util};
use crate::transform::Point;

/// `F1 = F2 * F3`, laid out as the sum `ln F2 - ln F1 + ln F3 = 0` with F2
/// and F3 outside and F1 in the middle.
pub(crate) struct ProductSolver;

fn log_leg(axes: &BTreeMap<Role, AxisSpec>, role: Role, sign: f64) -> Result<Leg<'_>> {
    Ok(Leg {
        role,
        spec: required(axes, role, "product")?,
        coord: Coord::Log,
        sign,
    })
}

impl RelationSolver for ProductSolver {
    fn solve(
        &self,
        axes: &BTreeMap<Role, AxisSpec>,
        dims: Dims,
        config: &BuildConfig,
    ) -> Result<BlockGeometry> {
        let legs = [
            log_leg(axes, Role::F2, 1.0)?,
            log_leg(axes, Role::F1, -1.0)?,
            log_leg(axes, Role::F3, 1.0)?,
        ];
        let placed = place_legs(legs, dims, config)?;
        Ok(BlockGeometry::new(
            "product",
            placed,
            vec![Constraint::Collinear([Role::F1, Role::F2, Role::F3])],
        ))
    }
}

/// `F1 / F2 = F3 / F4` as two sum layouts sharing an unlabelled turning axis
/// that carries the common ratio.
pub(crate) struct QuotientSolver;

struct QuotientLeg {
    role: Role,
    scale: ScaleModel,
    ticks: Vec<Tick>,
    sign: f64,
    x: f64,
    lo: f64,
    hi: f64,
}

impl RelationSolver for QuotientSolver {
    fn solve(
        &self,
        axes: &BTreeMap<Role, AxisSpec>,
        dims: Dims,
        config: &BuildConfig,
    ) -> Result<BlockGeometry> {
        let w = dims.width;
        let layout = [
            (Role::F1, 1.0, 0.0),
            (Role::F2, -1.0, w),
            (Role::F3, 1.0, w / 4.0),
            (Role::F4, -1.0, 3.0 * w / 4.0),
        ];

        let mut legs = Vec::with_capacity(4);
        for (role, sign, x) in layout {
            let spec = required(axes, role, "quotient")?;
            let (scale, ticks) = prepare(spec, config)?;
            let (t0, t1) = scale.position_range();
            if !(t0 > 0.0 && t1 > 0.0) {
                return Err(Error::config(format!(
                    "axis {role} must map to positive values in a quotient block"
                )));
            }
            let (lo, hi) = {
                let (c0, c1) = coordinate_range(&scale, Coord::Log, sign);
                util::sorted_pair(c0, c1)
            };
            legs.push(QuotientLeg {
                role,
                scale,
                ticks,
                sign,
                x,
                lo,
                hi,
            });
        }

        let widest = legs.iter().map(|leg| leg.hi - leg.lo).fold(0.0, f64::max);
        if !(widest > 0.0 && widest.is_finite()) {
            return Err(Error::degenerate("quotient axes have no usable range"));
        }
        let m = dims.height / widest;
        let shift = (legs[0].lo + legs[1].lo - legs[2].lo - legs[3].lo) / 2.0;

        // ln r ranges covered by each pair; the turning axis spans both.
        let ratio_lo = (legs[0].lo + legs[1].lo).min(legs[2].lo + legs[3].lo);
        let ratio_hi = (legs[0].hi + legs[1].hi).max(legs[2].hi + legs[3].hi);
        debug!(
            "quotient turning axis covers ratios [{:.6}, {:.6}], shift {shift:.6}",
            ratio_lo.exp(),
            ratio_hi.exp()
        );

        let turn_base = legs[0].lo + legs[1].lo;
        let mut placed = Vec::with_capacity(5);
        for (index, leg) in legs.into_iter().enumerate() {
            let offset = if index < 2 { leg.lo } else { leg.lo + shift };
            let spec = required(axes, leg.role, "quotient")?.clone();
            placed.push(PlacedAxis::new(
                leg.role,
                spec,
                leg.scale,
                leg.ticks,
                Placement::Straight {
                    origin: Point::new(leg.x, -m * offset),
                    direction: Point::new(0.0, m * leg.sign),
                    coord: Coord::Log,
                },
            ));
        }

        // Midpoint of each pair: y = m/2 * (ln r - lo1 - lo2).
        let turn_spec = AxisSpec::new(ratio_lo.exp(), ratio_hi.exp()).title("ratio");
        let turn_scale = turn_spec.build_scale(config.monotonic_samples())?;
        let mut turn = PlacedAxis::new(
            Role::Turn,
            turn_spec,
            turn_scale,
            Vec::new(),
            Placement::Straight {
                origin: Point::new(w / 2.0, -(m / 2.0) * turn_base),
                direction: Point::new(0.0, m / 2.0),
                coord: Coord::Log,
            },
        );
        turn.reference = true;
        placed.push(turn);

        Ok(BlockGeometry::new(
            "quotient",
            placed,
            vec![
                Constraint::Collinear([Role::F1, Role::Turn, Role::F2]),
                Constraint::Collinear([Role::F3, Role::Turn, Role::F4]),
            ],
        ))
    }
}
