use std::collections::BTreeMap;
use std::sync::Arc;

use log::debug;

use super::determinant::{ProjectiveAxis, fit_projective};
use super::{BlockGeometry, Constraint, Dims, RelationSolver, Role, required};
use crate::config::BuildConfig;
use crate::error::{Error, Result};
use crate::scale::{AxisSpec, Mapping};

/// `F1(u) + F2(v) * F3(w) + F4(w) = 0`: straight F1 and F2 axes with a curved
/// F3 axis that carries the companion function F4.
///
/// Rows of the underlying determinant, with `k = |dF1| / |dF2|` balancing the
/// two straight scales:
///
/// ```text
/// | 0      F1       1      |
/// | 1      k*F2     1      |
/// | F3    -k*F4     k + F3 |
/// ```
pub(crate) struct CompoundSolver;

fn constant(value: f64) -> Arc<dyn Mapping> {
    Arc::new(move |_: f64| value)
}

fn scaled(f: Arc<dyn Mapping>, factor: f64, offset: f64) -> Arc<dyn Mapping> {
    Arc::new(move |u: f64| factor * f.apply(u) + offset)
}

fn span(spec: &AxisSpec) -> f64 {
    let (min, max) = spec.domain();
    (spec.function.apply(max) - spec.function.apply(min)).abs()
}

impl RelationSolver for CompoundSolver {
    fn solve(
        &self,
        axes: &BTreeMap<Role, AxisSpec>,
        dims: Dims,
        config: &BuildConfig,
    ) -> Result<BlockGeometry> {
        let f1 = required(axes, Role::F1, "compound")?;
        let f2 = required(axes, Role::F2, "compound")?;
        let f3 = required(axes, Role::F3, "compound")?;
        let f4 = f3.companion.clone().ok_or_else(|| {
            Error::config("axis F3 of a compound block needs a companion function")
        })?;

        let k = span(f1) / span(f2);
        if !(k.is_finite() && k > 0.0) {
            return Err(Error::degenerate(format!(
                "compound block cannot balance its straight axes (ratio {k})"
            )));
        }
        debug!("compound block scale ratio {k:.6}");

        let axes = vec![
            ProjectiveAxis {
                role: Role::F1,
                spec: f1,
                triple: [constant(0.0), f1.function.clone(), constant(1.0)],
            },
            ProjectiveAxis {
                role: Role::F2,
                spec: f2,
                triple: [constant(1.0), scaled(f2.function.clone(), k, 0.0), constant(1.0)],
            },
            ProjectiveAxis {
                role: Role::F3,
                spec: f3,
                triple: [
                    f3.function.clone(),
                    scaled(f4, -k, 0.0),
                    scaled(f3.function.clone(), 1.0, k),
                ],
            },
        ];
        let placed = fit_projective(axes, dims, config, None)?;
        Ok(BlockGeometry::new(
            "compound",
            placed,
            vec![Constraint::Collinear([Role::F1, Role::F2, Role::F3])],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::side_of_line;

    fn arc_chord() -> BTreeMap<Role, AxisSpec> {
        [
            (Role::F1, AxisSpec::new(6.0, 12.0).function(|u: f64| u * u / 4.0)),
            (Role::F2, AxisSpec::new(7.0, 15.0).function(|v: f64| -2.0 * v)),
            (
                Role::F3,
                AxisSpec::new(0.5, 2.0)
                    .function(|w: f64| w)
                    .companion(|w: f64| w * w),
            ),
        ]
        .into_iter()
        .collect()
    }

    fn dims() -> Dims {
        Dims {
            width: 10.0,
            height: 10.0,
        }
    }

    #[test]
    fn solutions_are_collinear() {
        let geometry = CompoundSolver
            .solve(&arc_chord(), dims(), &BuildConfig::default())
            .unwrap();
        let point = |role, u| geometry.axis(role).unwrap().point(u).unwrap();
        for (u, w) in [(10.5, 1.25), (8.0, 0.9), (11.0, 1.8)] {
            let (a, c, d) = (u * u / 4.0, w, w * w);
            let v = (a + d) / c / 2.0;
            if !(7.0..=15.0).contains(&v) {
                continue;
            }
            let (p1, p2, p3) = (point(Role::F1, u), point(Role::F2, v), point(Role::F3, w));
            assert!(side_of_line(p1, p2, p3).abs() / (p2 - p1).length() < 1e-6, "({u}, {w})");
        }
    }

    #[test]
    fn companion_is_required() {
        let mut axes = arc_chord();
        axes.insert(Role::F3, AxisSpec::new(0.5, 2.0));
        let result = CompoundSolver.solve(&axes, dims(), &BuildConfig::default());
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn curve_axis_is_not_straight() {
        let geometry = CompoundSolver
            .solve(&arc_chord(), dims(), &BuildConfig::default())
            .unwrap();
        assert!(!geometry.axis(Role::F3).unwrap().is_straight());
    }
}
