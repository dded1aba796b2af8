use std::collections::BTreeMap;
use std::sync::Arc;

use log::{debug, trace};

use super::{
    BlockGeometry, Constraint, Dims, IDENTITY_MATRIX, PROJECTION_EPSILON, PlacedAxis, Placement,
    RelationSolver, Role, homogeneous_at, mat_vec, prepare, required,
};
use crate::config::BuildConfig;
use crate::error::{Error, Result};
use crate::scale::{AxisSpec, Mapping};
use crate::transform::{Point, Rect};

/// `det[f_i(u_i) g_i(u_i) h_i(u_i)] = 0`, each row supplied by the axis spec.
pub(crate) struct DeterminantSolver {
    pub fit_corners: bool,
}

/// An axis whose position is given by a homogeneous triple.
pub(crate) struct ProjectiveAxis<'a> {
    pub role: Role,
    pub spec: &'a AxisSpec,
    pub triple: [Arc<dyn Mapping>; 3],
}

/// Corner targets of a projective fit: the domain ends of `left` land on
/// `(0, 0)` and `(0, H)`, those of `right` on `(W, 0)` and `(W, H)`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Corners {
    pub left: Role,
    pub right: Role,
}

/// Places projective axes and fits them into the block, either by scaling
/// their joint bounding box or by a homography onto the block corners.
///
/// The homogeneous denominator of every axis is checked before and after
/// fitting; one that nears zero or changes sign inside a domain fails the
/// whole block.
pub(crate) fn fit_projective(
    axes: Vec<ProjectiveAxis<'_>>,
    dims: Dims,
    config: &BuildConfig,
    corners: Option<Corners>,
) -> Result<Vec<PlacedAxis>> {
    let mut placed = Vec::with_capacity(axes.len());
    for axis in axes {
        let (scale, ticks) = prepare(axis.spec, config)?;
        placed.push(PlacedAxis::new(
            axis.role,
            axis.spec.clone(),
            scale,
            ticks,
            Placement::Projective {
                triple: axis.triple,
                matrix: IDENTITY_MATRIX,
            },
        ));
    }

    for axis in &placed {
        check_denominator(axis, config.curve_samples())?;
    }

    let matrix = match corners {
        Some(corners) => corner_matrix(&placed, corners, dims)?,
        None => box_matrix(&placed, dims, config.curve_samples())?,
    };
    debug!("projective fit {matrix:?}");

    for axis in &mut placed {
        if let Placement::Projective { matrix: m, .. } = &mut axis.placement {
            *m = matrix;
        }
        check_denominator(axis, config.curve_samples())?;
    }
    Ok(placed)
}

/// Rejects a projective axis whose denominator vanishes at a sample or
/// changes sign between two, which puts a pole inside the domain.
fn check_denominator(axis: &PlacedAxis, samples: usize) -> Result<()> {
    let Placement::Projective { triple, matrix } = &axis.placement else {
        return Ok(());
    };
    let (min, max) = axis.scale().domain();
    let count = samples.max(2);
    let mut previous: Option<(f64, f64)> = None;
    for i in 0..count {
        let u = if i + 1 == count {
            max
        } else {
            min + (max - min) * i as f64 / (count - 1) as f64
        };
        let [x, y, z] = mat_vec(matrix, homogeneous_at(triple, u));
        if !(z.abs() > PROJECTION_EPSILON * (x.abs() + y.abs() + z.abs())) {
            trace!("axis {} leaves the plane at u = {u}", axis.role);
            return Err(Error::DegenerateProjection { value: z });
        }
        if let Some((u0, z0)) = previous
            && z0.signum() != z.signum()
        {
            trace!("axis {} has a pole between u = {u0} and u = {u}", axis.role);
            return Err(Error::DegenerateProjection { value: z });
        }
        previous = Some((u, z));
    }
    Ok(())
}

fn box_matrix(placed: &[PlacedAxis], dims: Dims, samples: usize) -> Result<[[f64; 3]; 3]> {
    let mut bounds: Option<Rect> = None;
    for axis in placed {
        for (_, point) in axis.sample(samples)? {
            match &mut bounds {
                Some(rect) => rect.include_point(point),
                None => bounds = Some(Rect::from_points(point, point)),
            }
        }
    }
    let rect = bounds.ok_or_else(|| Error::degenerate("determinant block has no points"))?;
    let finite = rect.width.is_finite() && rect.height.is_finite();
    if !(rect.width > 0.0 && rect.height > 0.0 && finite) {
        return Err(Error::degenerate(format!(
            "determinant axes span a {} x {} box",
            rect.width, rect.height
        )));
    }
    let sx = dims.width / rect.width;
    let sy = dims.height / rect.height;
    Ok([
        [sx, 0.0, -rect.min_x() * sx],
        [0.0, sy, -rect.min_y() * sy],
        [0.0, 0.0, 1.0],
    ])
}

fn corner_matrix(placed: &[PlacedAxis], corners: Corners, dims: Dims) -> Result<[[f64; 3]; 3]> {
    let ends = |role: Role| -> Result<(Point, Point)> {
        placed
            .iter()
            .find(|axis| axis.role == role)
            .ok_or_else(|| Error::config(format!("corner fit needs axis {role}")))?
            .endpoints()
    };
    let (l0, l1) = ends(corners.left)?;
    let (r0, r1) = ends(corners.right)?;
    homography([
        (l0, Point::new(0.0, 0.0)),
        (l1, Point::new(0.0, dims.height)),
        (r0, Point::new(dims.width, 0.0)),
        (r1, Point::new(dims.width, dims.height)),
    ])
}

/// Projective map sending each source point onto its target.
pub(crate) fn homography(pairs: [(Point, Point); 4]) -> Result<[[f64; 3]; 3]> {
    let mut system = [[0.0; 9]; 8];
    for (i, (src, dst)) in pairs.iter().enumerate() {
        let (x, y) = (src.x, src.y);
        system[2 * i] = [x, y, 1.0, 0.0, 0.0, 0.0, -dst.x * x, -dst.x * y, dst.x];
        system[2 * i + 1] = [0.0, 0.0, 0.0, x, y, 1.0, -dst.y * x, -dst.y * y, dst.y];
    }
    let h = solve_linear(system)?;
    Ok([[h[0], h[1], h[2]], [h[3], h[4], h[5]], [h[6], h[7], 1.0]])
}

/// Gaussian elimination with partial pivoting on an augmented 8x9 system.
fn solve_linear(mut a: [[f64; 9]; 8]) -> Result<[f64; 8]> {
    const N: usize = 8;
    for col in 0..N {
        let pivot = (col..N)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap_or(col);
        if !(a[pivot][col].abs() > 1e-12) {
            return Err(Error::DegenerateProjection {
                value: a[pivot][col],
            });
        }
        a.swap(col, pivot);
        for row in col + 1..N {
            let factor = a[row][col] / a[col][col];
            for k in col..=N {
                a[row][k] -= factor * a[col][k];
            }
        }
    }

    let mut x = [0.0; N];
    for row in (0..N).rev() {
        let tail: f64 = (row + 1..N).map(|k| a[row][k] * x[k]).sum();
        x[row] = (a[row][N] - tail) / a[row][row];
    }
    Ok(x)
}

impl RelationSolver for DeterminantSolver {
    fn solve(
        &self,
        axes: &BTreeMap<Role, AxisSpec>,
        dims: Dims,
        config: &BuildConfig,
    ) -> Result<BlockGeometry> {
        let mut projective = Vec::with_capacity(3);
        for role in [Role::F1, Role::F2, Role::F3] {
            let spec = required(axes, role, "determinant")?;
            let triple = spec.homogeneous.clone().ok_or_else(|| {
                Error::config(format!(
                    "axis {role} of a determinant block needs homogeneous functions"
                ))
            })?;
            projective.push(ProjectiveAxis { role, spec, triple });
        }

        let corners = self.fit_corners.then_some(Corners {
            left: Role::F1,
            right: Role::F3,
        });
        let placed = fit_projective(projective, dims, config, corners)?;
        Ok(BlockGeometry::new(
            "determinant",
            placed,
            vec![Constraint::Collinear([Role::F1, Role::F2, Role::F3])],
        ))
    }
}
