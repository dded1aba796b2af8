use std::collections::BTreeMap;

use log::debug;

use super::{
    BlockGeometry, Constraint, Coord, Dims, GridSettings, PlacedAxis, Placement, RelationSolver,
    Role, normalized_rail, prepare, required,
};
use crate::config::BuildConfig;
use crate::error::{Error, Result};
use crate::scale::{AxisSpec, Mapping, ScaleType, util};
use crate::transform::Point;

/// Two families of straight grid lines, `u` along the left edge and `v`
/// along the bottom edge, with the derived quantity `G(u, v)` read off a
/// reference scale on the right edge.
pub(crate) struct GridSolver<'a> {
    pub settings: &'a GridSettings,
}

/// Piecewise-linear mapping through sorted `(x, y)` knots, invertible because
/// both columns are strictly monotonic.
#[derive(Debug, Clone)]
struct Tabulated {
    by_x: Vec<(f64, f64)>,
    by_y: Vec<(f64, f64)>,
}

impl Tabulated {
    fn new(mut knots: Vec<(f64, f64)>) -> Self {
        knots.sort_by(|a, b| a.0.total_cmp(&b.0));
        let mut by_y: Vec<(f64, f64)> = knots.iter().map(|&(x, y)| (y, x)).collect();
        by_y.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { by_x: knots, by_y }
    }

    fn interpolate(knots: &[(f64, f64)], x: f64) -> f64 {
        let i = knots
            .partition_point(|(k, _)| *k < x)
            .clamp(1, knots.len().saturating_sub(1).max(1));
        let (Some(&(x0, y0)), Some(&(x1, y1))) = (knots.get(i - 1), knots.get(i)) else {
            return f64::NAN;
        };
        y0 + (y1 - y0) * (x - x0) / (x1 - x0)
    }
}

impl Mapping for Tabulated {
    fn apply(&self, u: f64) -> f64 {
        Self::interpolate(&self.by_x, u)
    }

    fn inverse(&self, t: f64) -> Option<f64> {
        let u = Self::interpolate(&self.by_y, t);
        u.is_finite().then_some(u)
    }
}

impl RelationSolver for GridSolver<'_> {
    fn solve(
        &self,
        axes: &BTreeMap<Role, AxisSpec>,
        dims: Dims,
        config: &BuildConfig,
    ) -> Result<BlockGeometry> {
        let u_spec = required(axes, Role::F1, "grid")?;
        let v_spec = required(axes, Role::F2, "grid")?;
        let (u_scale, u_ticks) = prepare(u_spec, config)?;
        let (v_scale, v_ticks) = prepare(v_spec, config)?;

        let u_placement = normalized_rail(
            &u_scale,
            Coord::Direct,
            Point::ZERO,
            Point::new(0.0, 1.0),
            dims.height,
        )?;
        let v_placement = normalized_rail(
            &v_scale,
            Coord::Direct,
            Point::ZERO,
            Point::new(1.0, 0.0),
            dims.width,
        )?;
        let Placement::Straight {
            origin: u_origin,
            direction: u_direction,
            ..
        } = u_placement
        else {
            return Err(Error::config("grid rails must be straight"));
        };

        let u_axis = PlacedAxis::new(Role::F1, u_spec.clone(), u_scale, u_ticks, u_placement);
        let v_axis = PlacedAxis::new(Role::F2, v_spec.clone(), v_scale, v_ticks, v_placement);

        let v_edge = v_axis.value_at_fraction(1.0)?;
        let derived = self.derived_axis(&u_axis, v_edge, config)?;
        let (w_scale, w_ticks) = prepare(&derived, config)?;
        debug!(
            "grid derived axis along v = {v_edge:.6}: {} labelled points",
            w_ticks.len()
        );
        let w_axis = PlacedAxis::new(
            Role::F3,
            derived,
            w_scale,
            w_ticks,
            Placement::Straight {
                origin: Point::new(dims.width, u_origin.y),
                direction: u_direction,
                coord: Coord::Direct,
            },
        );

        let mut guides = Vec::new();
        for tick in u_axis.ticks().iter().filter(|tick| tick.level == 0) {
            let start = u_axis.point(tick.value)?;
            guides.push(vec![start, start + Point::new(dims.width, 0.0)]);
        }
        for tick in v_axis.ticks().iter().filter(|tick| tick.level == 0) {
            let start = v_axis.point(tick.value)?;
            guides.push(vec![start, start + Point::new(0.0, dims.height)]);
        }

        let mut geometry = BlockGeometry::new(
            "grid",
            vec![u_axis, v_axis, w_axis],
            vec![Constraint::Surface {
                u: Role::F1,
                v: Role::F2,
                w: Role::F3,
                surface: self.settings.surface.clone(),
            }],
        );
        geometry.guides = guides;
        Ok(geometry)
    }
}

impl GridSolver<'_> {
    /// Reference scale of `w = G(u, v_edge)` positioned by `u`, labelled at
    /// the level-0 `u` grid lines.
    fn derived_axis(
        &self,
        u_axis: &PlacedAxis,
        v_edge: f64,
        config: &BuildConfig,
    ) -> Result<AxisSpec> {
        let surface = &self.settings.surface;
        let scale = u_axis.scale();
        let (u_min, u_max) = scale.domain();

        let count = config.monotonic_samples().max(2);
        let mut us: Vec<f64> = (0..count)
            .map(|i| u_min + (u_max - u_min) * i as f64 / (count - 1) as f64)
            .chain(u_axis.ticks().iter().map(|tick| tick.value))
            .collect();
        let ascending = u_max > u_min;
        us.sort_by(|a, b| if ascending { a.total_cmp(b) } else { b.total_cmp(a) });
        us.dedup_by(|a, b| (*a - *b).abs() <= 1e-12 * (1.0 + b.abs()));

        let ws: Vec<f64> = us.iter().map(|&u| surface.eval(u, v_edge)).collect();
        if let Some(bad) = ws.iter().position(|w| !w.is_finite()) {
            return Err(Error::degenerate(format!(
                "derived function is undefined at u = {}",
                us[bad]
            )));
        }
        if let Some(turn) = util::first_turn(&ws) {
            return Err(Error::NonMonotonicDerivedScale { at: us[turn] });
        }

        let knots: Vec<(f64, f64)> = us
            .iter()
            .zip(&ws)
            .map(|(&u, &w)| (w, scale.forward(u)))
            .collect();

        let format = self.settings.derived_format;
        let table: Vec<(f64, String)> = u_axis
            .ticks()
            .iter()
            .filter(|tick| tick.level == 0)
            .map(|tick| {
                let w = surface.eval(tick.value, v_edge);
                (w, format.format(w, util::significant_decimals(w).min(3)))
            })
            .collect();

        let mut spec = AxisSpec::new(surface.eval(u_min, v_edge), surface.eval(u_max, v_edge))
            .function(Tabulated::new(knots))
            .scale_type(ScaleType::ManualLine)
            .manual(table);
        spec.tag = self.settings.derived_tag.clone();
        spec.title = self.settings.derived_title.clone();
        Ok(spec)
    }
}
