use std::collections::BTreeMap;

use super::{
    BlockGeometry, Constraint, Coord, Dims, PlacedAxis, RelationSolver, Role, normalized_rail,
    prepare, required,
};
use crate::config::BuildConfig;
use crate::error::Result;
use crate::scale::AxisSpec;
use crate::transform::Point;

/// Two parallel rails; a value on one corresponds to the value at the same
/// relative height on the other.
pub(crate) struct LadderSolver;

impl RelationSolver for LadderSolver {
    fn solve(
        &self,
        axes: &BTreeMap<Role, AxisSpec>,
        dims: Dims,
        config: &BuildConfig,
    ) -> Result<BlockGeometry> {
        let mut placed = Vec::with_capacity(2);
        for (role, x) in [(Role::F1, 0.0), (Role::F2, dims.width)] {
            let spec = required(axes, role, "ladder")?;
            let (scale, ticks) = prepare(spec, config)?;
            let placement = normalized_rail(
                &scale,
                Coord::Direct,
                Point::new(x, 0.0),
                Point::new(0.0, 1.0),
                dims.height,
            )?;
            placed.push(PlacedAxis::new(role, spec.clone(), scale, ticks, placement));
        }

        let mut geometry = BlockGeometry::new(
            "ladder",
            placed,
            vec![Constraint::Rung([Role::F1, Role::F2])],
        );
        geometry.independent_axes = true;
        geometry.guides = rungs(&geometry)?;
        Ok(geometry)
    }
}

/// Rungs joining each level-0 tick of F1 to the matching height on F2, in the
/// current frame.
pub(crate) fn rungs(geometry: &BlockGeometry) -> Result<Vec<Vec<Point>>> {
    let left = geometry.axis_or_err(Role::F1)?;
    let right = geometry.axis_or_err(Role::F2)?;
    let mut guides = Vec::new();
    for tick in left.ticks().iter().filter(|tick| tick.level == 0) {
        let Some(fraction) = left.fraction(tick.value) else {
            continue;
        };
        if let Some(end) = right.point_at_fraction(fraction) {
            guides.push(vec![left.point(tick.value)?, end]);
        }
    }
    Ok(guides)
}
