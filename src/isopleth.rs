//! Solving and drawing isopleths.
//!
//! An isopleth row names one value per role of its block, with at most one
//! unknown. The solver propagates known values through the block's
//! constraints: two known points of a collinear triple fix the third by line
//! intersection, a rung carries a relative height across, and a grid surface
//! is evaluated or solved by bisection. Every constraint then contributes one
//! polyline to the drawn path.

use std::collections::BTreeMap;

use log::{debug, trace};
use serde::Serialize;

use crate::block::{
    BlockGeometry, BlockKind, Constraint, IsoValue, Isopleth, PlacedAxis, Role, Surface,
};
use crate::config::{BISECTION_TOLERANCE, BuildConfig, MAX_BISECTION_ITERATIONS};
use crate::error::{Error, Result};
use crate::transform::{Point, line_intersection};

/// A solved isopleth in the composed frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolvedIsopleth {
    /// Declaration index of the block.
    pub block: usize,
    /// Index of the request within its block.
    pub index: usize,
    /// Resolved value per role, in row order.
    pub values: Vec<(Role, f64)>,
    /// Role that was solved for, if the row had an unknown.
    pub unknown: Option<Role>,
    /// One polyline per constraint of the block.
    pub path: Vec<Vec<Point>>,
}

impl SolvedIsopleth {
    pub fn value(&self, role: Role) -> Option<f64> {
        self.values.iter().find(|(r, _)| *r == role).map(|(_, v)| *v)
    }

    /// The solved value, if the row had an unknown.
    pub fn solved(&self) -> Option<f64> {
        self.unknown.and_then(|role| self.value(role))
    }
}

pub struct IsoplethSolver<'a> {
    config: &'a BuildConfig,
}

impl<'a> IsoplethSolver<'a> {
    pub fn new(config: &'a BuildConfig) -> Self {
        Self { config }
    }

    pub fn solve(
        &self,
        block: usize,
        index: usize,
        kind: &BlockKind,
        geometry: &BlockGeometry,
        request: &Isopleth,
    ) -> Result<SolvedIsopleth> {
        let roles = kind.isopleth_roles();
        if request.values.len() != roles.len() {
            return Err(Error::config(format!(
                "{} isopleth needs {} values, got {}",
                kind.name(),
                roles.len(),
                request.values.len()
            )));
        }

        let mut values = BTreeMap::new();
        let mut unknown = None;
        for (&role, cell) in roles.iter().zip(&request.values) {
            match *cell {
                IsoValue::Known(value) => {
                    let axis = geometry.axis_or_err(role)?;
                    if !is_derived(geometry, role) {
                        axis.scale().check(value)?;
                    }
                    values.insert(role, value);
                }
                IsoValue::Unknown if unknown.is_none() => unknown = Some(role),
                IsoValue::Unknown => {
                    return Err(Error::config("an isopleth may have at most one unknown"));
                }
            }
        }

        self.propagate(geometry, &mut values)?;

        let resolved = roles
            .iter()
            .map(|&role| {
                values
                    .get(&role)
                    .map(|&value| (role, value))
                    .ok_or_else(|| Error::config(format!("isopleth leaves axis {role} unresolved")))
            })
            .collect::<Result<Vec<_>>>()?;

        let path = geometry
            .constraints
            .iter()
            .map(|constraint| path_for(geometry, constraint, &values))
            .collect::<Result<Vec<_>>>()?;

        if let Some(role) = unknown {
            debug!(
                "block {block} isopleth {index}: {role} = {}",
                values.get(&role).copied().unwrap_or(f64::NAN)
            );
        }
        Ok(SolvedIsopleth {
            block,
            index,
            values: resolved,
            unknown,
            path,
        })
    }

    fn propagate(&self, geometry: &BlockGeometry, values: &mut BTreeMap<Role, f64>) -> Result<()> {
        loop {
            let mut progress = false;
            for constraint in &geometry.constraints {
                if let Some((role, value)) = self.step(geometry, constraint, values)? {
                    values.insert(role, value);
                    progress = true;
                }
            }
            if !progress {
                return Ok(());
            }
        }
    }

    /// One newly determined value, if `constraint` fixes one.
    fn step(
        &self,
        geometry: &BlockGeometry,
        constraint: &Constraint,
        values: &BTreeMap<Role, f64>,
    ) -> Result<Option<(Role, f64)>> {
        match constraint {
            Constraint::Collinear(roles) => {
                let missing: Vec<Role> = roles
                    .iter()
                    .copied()
                    .filter(|r| !values.contains_key(r))
                    .collect();
                let &[target] = missing.as_slice() else {
                    return Ok(None);
                };
                let mut points = roles
                    .iter()
                    .filter_map(|role| values.get(role).map(|&v| (role, v)))
                    .map(|(&role, v)| geometry.axis_or_err(role)?.point(v));
                let (Some(a), Some(b)) = (points.next(), points.next()) else {
                    return Ok(None);
                };
                let value = geometry.axis_or_err(target)?.intersect_line(a?, b?, self.config)?;
                Ok(Some((target, value)))
            }
            Constraint::Rung([from, to]) => {
                let (source, target) = match (values.get(from), values.get(to)) {
                    (Some(&v), None) => ((*from, v), *to),
                    (None, Some(&v)) => ((*to, v), *from),
                    _ => return Ok(None),
                };
                let fraction = geometry
                    .axis_or_err(source.0)?
                    .fraction(source.1)
                    .ok_or_else(|| Error::config("rungs need straight rails"))?;
                let value = geometry
                    .axis_or_err(target)?
                    .value_at_fraction(fraction)
                    .map_err(|err| match err {
                        Error::OutOfDomain { .. } => Error::NoIntersection { role: target },
                        other => other,
                    })?;
                Ok(Some((target, value)))
            }
            Constraint::Surface { u, v, w, surface } => {
                let known = (values.get(u), values.get(v), values.get(w));
                match known {
                    (Some(&uu), Some(&vv), None) => Ok(Some((*w, surface.eval(uu, vv)))),
                    (Some(&uu), None, Some(&ww)) => {
                        let axis = geometry.axis_or_err(*v)?;
                        let value = self.solve_surface(axis, ww, |x| surface.eval(uu, x))?;
                        Ok(Some((*v, value)))
                    }
                    (None, Some(&vv), Some(&ww)) => {
                        let axis = geometry.axis_or_err(*u)?;
                        let value = self.solve_surface(axis, ww, |x| surface.eval(x, vv))?;
                        Ok(Some((*u, value)))
                    }
                    _ => Ok(None),
                }
            }
        }
    }

    /// Value `x` in the domain of `axis` with `g(x) = target`, bracketed by
    /// sampling and refined by bisection.
    fn solve_surface(&self, axis: &PlacedAxis, target: f64, g: impl Fn(f64) -> f64) -> Result<f64> {
        let (min, max) = axis.scale().domain();
        let count = self.config.curve_samples();
        let residual = |x: f64| g(x) - target;

        let mut previous = (min, residual(min));
        for i in 1..count {
            let x = if i + 1 == count {
                max
            } else {
                min + (max - min) * i as f64 / (count - 1) as f64
            };
            let current = (x, residual(x));
            let ((x0, r0), (x1, r1)) = (previous, current);
            previous = current;
            if !r0.is_finite() || !r1.is_finite() {
                continue;
            }
            if r0 == 0.0 {
                return Ok(x0);
            }
            if r1 != 0.0 && r0.signum() == r1.signum() {
                continue;
            }

            let (mut lo, mut hi, mut r_lo) = (x0, x1, r0);
            for iteration in 0..MAX_BISECTION_ITERATIONS {
                let mid = 0.5 * (lo + hi);
                if (hi - lo).abs() <= BISECTION_TOLERANCE * (1.0 + mid.abs()) {
                    trace!("surface solve converged after {iteration} steps at {mid}");
                    return Ok(mid);
                }
                let r_mid = residual(mid);
                if r_mid == 0.0 {
                    return Ok(mid);
                }
                if r_mid.signum() == r_lo.signum() {
                    lo = mid;
                    r_lo = r_mid;
                } else {
                    hi = mid;
                }
            }
            return Err(Error::DomainSolveTimeout {
                target,
                iterations: MAX_BISECTION_ITERATIONS,
            });
        }
        Err(Error::NoIntersection { role: axis.role() })
    }
}

/// Whether `role` is the derived quantity of a grid surface, whose values
/// are not bounded by the edge scale.
fn is_derived(geometry: &BlockGeometry, role: Role) -> bool {
    geometry
        .constraints
        .iter()
        .any(|c| matches!(c, Constraint::Surface { w, .. } if *w == role))
}

fn point_of(geometry: &BlockGeometry, values: &BTreeMap<Role, f64>, role: Role) -> Result<Point> {
    let value = values
        .get(&role)
        .ok_or_else(|| Error::config(format!("isopleth leaves axis {role} unresolved")))?;
    geometry.axis_or_err(role)?.point(*value)
}

fn path_for(
    geometry: &BlockGeometry,
    constraint: &Constraint,
    values: &BTreeMap<Role, f64>,
) -> Result<Vec<Point>> {
    match constraint {
        Constraint::Collinear(roles) => {
            roles.iter().map(|&role| point_of(geometry, values, role)).collect()
        }
        Constraint::Rung([a, b]) => Ok(vec![
            point_of(geometry, values, *a)?,
            point_of(geometry, values, *b)?,
        ]),
        Constraint::Surface { u, v, .. } => {
            let pu = point_of(geometry, values, *u)?;
            let pv = point_of(geometry, values, *v)?;
            let direction = |role: Role| -> Result<Point> {
                let (a, b) = geometry.axis_or_err(role)?.endpoints()?;
                Ok(b - a)
            };
            let (du, dv) = (direction(*u)?, direction(*v)?);
            let corner = line_intersection(pu, dv, pv, pv + du)
                .map(|s| pu + dv * s)
                .ok_or_else(|| Error::degenerate("grid axes are parallel"))?;
            Ok(vec![pu, corner, pv])
        }
    }
}
