use std::collections::BTreeMap;

use super::{
    BlockGeometry, Coord, Dims, PlacedAxis, RelationSolver, Role, normalized_rail, prepare,
    required,
};
use crate::config::BuildConfig;
use crate::error::Result;
use crate::scale::AxisSpec;
use crate::transform::Point;

/// A lone vertical rail. Its `align` mapping does not move ticks; it is kept
/// for composition, which lines `u` up with the tag value `align(u)`.
pub(crate) struct SingleSolver;

impl RelationSolver for SingleSolver {
    fn solve(
        &self,
        axes: &BTreeMap<Role, AxisSpec>,
        dims: Dims,
        config: &BuildConfig,
    ) -> Result<BlockGeometry> {
        let mut spec = required(axes, Role::F1, "single")?.clone();
        let alignment = spec.align.take();
        let (scale, ticks) = prepare(&spec, config)?;
        let placement = normalized_rail(
            &scale,
            Coord::Direct,
            Point::new(0.0, 0.0),
            Point::new(0.0, 1.0),
            dims.height,
        )?;

        let mut axis = PlacedAxis::new(Role::F1, spec, scale, ticks, placement);
        axis.alignment = alignment;
        Ok(BlockGeometry::new("single", vec![axis], Vec::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solve(spec: AxisSpec) -> BlockGeometry {
        let axes: BTreeMap<Role, AxisSpec> = [(Role::F1, spec)].into_iter().collect();
        let dims = Dims {
            width: 4.0,
            height: 10.0,
        };
        SingleSolver.solve(&axes, dims, &BuildConfig::default()).unwrap()
    }

    #[test]
    fn rail_spans_the_block_height() {
        let geometry = solve(AxisSpec::new(5.0, 100.0).function(|u: f64| u.log10()));
        let axis = geometry.axis(Role::F1).unwrap();
        let (a, b) = axis.endpoints().unwrap();
        assert!(a.x.abs() < 1e-12 && b.x.abs() < 1e-12);
        assert!((a.distance(b) - 10.0).abs() < 1e-9);
        assert!(geometry.constraints.is_empty());
    }

    #[test]
    fn align_moves_to_the_composition() {
        let geometry = solve(
            AxisSpec::new(5.0, 100.0)
                .function(|u: f64| 10.0 * u.log10())
                .align(|u: f64| 10.0 * u.log10()),
        );
        let axis = geometry.axis(Role::F1).unwrap();
        assert!(axis.spec().align.is_none());
        assert_eq!(axis.scale().display_value(20.0), 20.0);
        assert!((axis.tag_value(100.0) - 20.0).abs() < 1e-12);

        // Ticks stay at their own function
        for tick in axis.ticks() {
            assert!((tick.position - 10.0 * tick.value.log10()).abs() < 1e-9);
        }
    }
}
