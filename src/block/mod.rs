//! Relation blocks: declarative specs and the per-type geometry solvers.
//!
//! A [`BlockSpec`] binds [`AxisSpec`]s to the roles its relation type needs.
//! [`BlockSpec::solve`] validates it and hands it to the solver for its type,
//! producing a [`BlockGeometry`]: placed axes in a local frame plus the
//! geometric constraints an isopleth must satisfy.

mod compound;
mod determinant;
mod grid;
mod ladder;
mod product;
mod single;
mod sum;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::{BISECTION_TOLERANCE, BuildConfig, MAX_BISECTION_ITERATIONS};
use crate::error::{Error, Result};
use crate::scale::{AxisSpec, Mapping, ScaleModel, TextFormat, Tick, TickGenerator};
use crate::transform::{Affine, Point, Rect, line_intersection, side_of_line};

pub(crate) use ladder::rungs;

/// Position of an axis within its block's relation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Role {
    F1,
    F2,
    F3,
    F4,
    /// Unlabelled turning axis of a quotient block.
    Turn,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::F1 => "F1",
            Role::F2 => "F2",
            Role::F3 => "F3",
            Role::F4 => "F4",
            Role::Turn => "turn",
        };
        f.write_str(name)
    }
}

/// A function of two axis values, the derived quantity of a grid block.
pub trait Surface: Send + Sync {
    fn eval(&self, u: f64, v: f64) -> f64;
}

impl<F> Surface for F
where
    F: Fn(f64, f64) -> f64 + Send + Sync,
{
    fn eval(&self, u: f64, v: f64) -> f64 {
        self(u, v)
    }
}

/// Settings of a grid block beyond its two input axes.
#[derive(Clone)]
pub struct GridSettings {
    pub(crate) surface: Arc<dyn Surface>,
    pub(crate) derived_tag: Option<String>,
    pub(crate) derived_title: Option<String>,
    pub(crate) derived_format: TextFormat,
}

/// Relation type of a block.
///
/// | kind          | relation                          | roles              |
/// |---------------|-----------------------------------|--------------------|
/// | `Sum`         | `F1 + F2 + F3 = 0`                | F1 F2 F3           |
/// | `Product`     | `F1 = F2 * F3`                    | F1 F2 F3           |
/// | `Quotient`    | `F1 / F2 = F3 / F4`               | F1 F2 F3 F4        |
/// | `Determinant` | `det[f g h] = 0` per row          | F1 F2 F3           |
/// | `Grid`        | `F3 = G(F1, F2)`                  | F1 F2 (F3 derived) |
/// | `Ladder`      | equal relative position on rails  | F1 F2              |
/// | `Compound`    | `F1(u) + F2(v) F3(w) + F4(w) = 0` | F1 F2 F3           |
/// | `Single`      | none, placed by its tag           | F1                 |
#[derive(Clone)]
pub enum BlockKind {
    Sum,
    Product,
    Quotient,
    Determinant {
        /// Map the ends of F1 and F3 onto the block corners with a
        /// projective transform instead of fitting the bounding box.
        fit_corners: bool,
    },
    Grid(GridSettings),
    Ladder,
    Compound,
    /// One free axis. A tagged one is laid onto the canonical axis of its
    /// tag, and its `align` mapping gives the tag value each `u` sits at.
    Single,
}

impl BlockKind {
    pub fn name(&self) -> &'static str {
        match self {
            BlockKind::Sum => "sum",
            BlockKind::Product => "product",
            BlockKind::Quotient => "quotient",
            BlockKind::Determinant { .. } => "determinant",
            BlockKind::Grid(_) => "grid",
            BlockKind::Ladder => "ladder",
            BlockKind::Compound => "compound",
            BlockKind::Single => "single",
        }
    }

    /// Roles the caller must supply.
    pub fn required_roles(&self) -> &'static [Role] {
        match self {
            BlockKind::Quotient => &[Role::F1, Role::F2, Role::F3, Role::F4],
            BlockKind::Grid(_) | BlockKind::Ladder => &[Role::F1, Role::F2],
            BlockKind::Single => &[Role::F1],
            _ => &[Role::F1, Role::F2, Role::F3],
        }
    }

    /// Roles addressed, in order, by the cells of an isopleth row.
    pub fn isopleth_roles(&self) -> &'static [Role] {
        match self {
            BlockKind::Quotient => &[Role::F1, Role::F2, Role::F3, Role::F4],
            BlockKind::Ladder => &[Role::F1, Role::F2],
            BlockKind::Single => &[Role::F1],
            _ => &[Role::F1, Role::F2, Role::F3],
        }
    }
}

impl fmt::Debug for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockKind::Determinant { fit_corners } => f
                .debug_struct("Determinant")
                .field("fit_corners", fit_corners)
                .finish(),
            other => f.write_str(other.name()),
        }
    }
}

/// One cell of an isopleth row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum IsoValue {
    Known(f64),
    Unknown,
}

impl From<f64> for IsoValue {
    fn from(value: f64) -> Self {
        IsoValue::Known(value)
    }
}

impl From<Option<f64>> for IsoValue {
    fn from(value: Option<f64>) -> Self {
        value.map_or(IsoValue::Unknown, IsoValue::Known)
    }
}

/// A row of values, one per role of [`BlockKind::isopleth_roles`], with at
/// most one [`IsoValue::Unknown`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Isopleth {
    pub values: Vec<IsoValue>,
}

impl Isopleth {
    pub fn row<V: Into<IsoValue>>(values: impl IntoIterator<Item = V>) -> Self {
        Self {
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// Declarative description of one block.
///
/// ```
/// use nomograph::{AxisSpec, BlockSpec, BuildConfig, Role};
///
/// let block = BlockSpec::sum()
///     .axis(Role::F1, AxisSpec::new(0.0, 10.0))
///     .axis(Role::F2, AxisSpec::new(0.0, 10.0))
///     .axis(Role::F3, AxisSpec::new(0.0, -10.0));
/// let geometry = block.solve(&BuildConfig::default()).unwrap();
/// assert_eq!(geometry.axes().len(), 3);
///
/// let incomplete = BlockSpec::sum().axis(Role::F1, AxisSpec::new(0.0, 1.0));
/// assert!(incomplete.solve(&BuildConfig::default()).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct BlockSpec {
    pub(crate) kind: BlockKind,
    pub(crate) axes: BTreeMap<Role, AxisSpec>,
    pub(crate) width: Option<f64>,
    pub(crate) height: Option<f64>,
    pub(crate) mirror_x: bool,
    pub(crate) mirror_y: bool,
    pub(crate) isopleths: Vec<Isopleth>,
}

impl BlockSpec {
    pub fn new(kind: BlockKind) -> Self {
        Self {
            kind,
            axes: BTreeMap::new(),
            width: None,
            height: None,
            mirror_x: false,
            mirror_y: false,
            isopleths: Vec::new(),
        }
    }

    pub fn sum() -> Self {
        Self::new(BlockKind::Sum)
    }

    pub fn product() -> Self {
        Self::new(BlockKind::Product)
    }

    pub fn quotient() -> Self {
        Self::new(BlockKind::Quotient)
    }

    pub fn determinant() -> Self {
        Self::new(BlockKind::Determinant { fit_corners: false })
    }

    pub fn ladder() -> Self {
        Self::new(BlockKind::Ladder)
    }

    pub fn compound() -> Self {
        Self::new(BlockKind::Compound)
    }

    pub fn single() -> Self {
        Self::new(BlockKind::Single)
    }

    /// Grid block whose third quantity is `surface(u, v)`, with `u` on F1 and
    /// `v` on F2.
    pub fn grid(surface: impl Surface + 'static) -> Self {
        Self::new(BlockKind::Grid(GridSettings {
            surface: Arc::new(surface),
            derived_tag: None,
            derived_title: None,
            derived_format: TextFormat::Auto,
        }))
    }

    pub fn axis(mut self, role: Role, spec: AxisSpec) -> Self {
        self.axes.insert(role, spec);
        self
    }

    pub fn size(mut self, width: f64, height: f64) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn mirror(mut self, mirror_x: bool, mirror_y: bool) -> Self {
        self.mirror_x = mirror_x;
        self.mirror_y = mirror_y;
        self
    }

    /// Only meaningful for determinant blocks.
    pub fn fit_corners(mut self, fit: bool) -> Self {
        if let BlockKind::Determinant { fit_corners } = &mut self.kind {
            *fit_corners = fit;
        }
        self
    }

    /// Tag, title and label format of a grid block's derived axis.
    pub fn derived_axis(
        mut self,
        tag: Option<&str>,
        title: Option<&str>,
        format: TextFormat,
    ) -> Self {
        if let BlockKind::Grid(settings) = &mut self.kind {
            settings.derived_tag = tag.map(str::to_string);
            settings.derived_title = title.map(str::to_string);
            settings.derived_format = format;
        }
        self
    }

    pub fn isopleth<V: Into<IsoValue>>(mut self, row: impl IntoIterator<Item = V>) -> Self {
        self.isopleths.push(Isopleth::row(row));
        self
    }

    pub fn kind(&self) -> &BlockKind {
        &self.kind
    }

    pub fn isopleths(&self) -> &[Isopleth] {
        &self.isopleths
    }

    /// Checks roles and domains without solving.
    pub fn validate(&self) -> Result<()> {
        let required = self.kind.required_roles();
        let missing: Vec<Role> = required
            .iter()
            .filter(|role| !self.axes.contains_key(role))
            .copied()
            .collect();
        if !missing.is_empty() {
            return Err(Error::IncompatibleAxisCount {
                kind: self.kind.name(),
                missing,
            });
        }
        if let Some(extra) = self.axes.keys().find(|role| !required.contains(role)) {
            return Err(Error::config(format!(
                "{} block does not take an axis for role {extra}",
                self.kind.name()
            )));
        }
        for spec in self.axes.values() {
            spec.check_range()?;
        }
        Ok(())
    }

    /// Validates the block and places its axes in a local frame.
    pub fn solve(&self, config: &BuildConfig) -> Result<BlockGeometry> {
        self.validate()?;
        let dims = Dims {
            width: self.width.unwrap_or(config.block_width),
            height: self.height.unwrap_or(config.block_height),
        };
        if !(dims.width > 0.0 && dims.height > 0.0) {
            return Err(Error::config(format!(
                "block dimensions must be positive, got {} x {}",
                dims.width, dims.height
            )));
        }

        let solver: Box<dyn RelationSolver + '_> = match &self.kind {
            BlockKind::Sum => Box::new(sum::SumSolver),
            BlockKind::Product => Box::new(product::ProductSolver),
            BlockKind::Quotient => Box::new(product::QuotientSolver),
            BlockKind::Determinant { fit_corners } => Box::new(determinant::DeterminantSolver {
                fit_corners: *fit_corners,
            }),
            BlockKind::Grid(settings) => Box::new(grid::GridSolver { settings }),
            BlockKind::Ladder => Box::new(ladder::LadderSolver),
            BlockKind::Compound => Box::new(compound::CompoundSolver),
            BlockKind::Single => Box::new(single::SingleSolver),
        };

        let mut geometry = solver.solve(&self.axes, dims, config)?;
        if self.mirror_x || self.mirror_y {
            geometry.apply(Affine::mirror(
                self.mirror_x,
                dims.width / 2.0,
                self.mirror_y,
                dims.height / 2.0,
            ));
        }
        debug!(
            "solved {} block: {} axes, {} guides",
            self.kind.name(),
            geometry.axes.len(),
            geometry.guides.len()
        );
        Ok(geometry)
    }
}

/// Block extent in its local frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Dims {
    pub width: f64,
    pub height: f64,
}

/// One solver per relation type.
pub(crate) trait RelationSolver {
    fn solve(
        &self,
        axes: &BTreeMap<Role, AxisSpec>,
        dims: Dims,
        config: &BuildConfig,
    ) -> Result<BlockGeometry>;
}

/// How the mapped value is turned into a distance along a straight axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Coord {
    Direct,
    /// Natural logarithm; the mapped value must stay positive.
    Log,
}

impl Coord {
    pub(crate) fn apply(self, t: f64) -> f64 {
        match self {
            Coord::Direct => t,
            Coord::Log => t.ln(),
        }
    }

    pub(crate) fn invert(self, c: f64) -> f64 {
        match self {
            Coord::Direct => c,
            Coord::Log => c.exp(),
        }
    }
}

/// Where an axis lives in its block's local frame.
#[derive(Clone)]
pub(crate) enum Placement {
    /// `origin + direction * coord(forward(u))`.
    Straight {
        origin: Point,
        direction: Point,
        coord: Coord,
    },
    /// Homogeneous triple `(f, g, h)` of `u` pushed through `matrix`, then
    /// divided by its third component.
    Projective {
        triple: [Arc<dyn Mapping>; 3],
        matrix: [[f64; 3]; 3],
    },
}

pub(crate) const IDENTITY_MATRIX: [[f64; 3]; 3] =
    [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

/// Smallest `|z| / (|x| + |y| + |z|)` a homogeneous point may have.
pub(crate) const PROJECTION_EPSILON: f64 = 1e-9;

/// Projects homogeneous `(x, y, z)` to the plane.
pub(crate) fn project(x: f64, y: f64, z: f64) -> Result<Point> {
    if !(z.abs() > PROJECTION_EPSILON * (x.abs() + y.abs() + z.abs())) {
        return Err(Error::DegenerateProjection { value: z });
    }
    Ok(Point::new(x / z, y / z))
}

/// `(f(u), g(u), h(u))`.
pub(crate) fn homogeneous_at(triple: &[Arc<dyn Mapping>; 3], u: f64) -> [f64; 3] {
    [triple[0].apply(u), triple[1].apply(u), triple[2].apply(u)]
}

pub(crate) fn mat_vec(m: &[[f64; 3]; 3], v: [f64; 3]) -> [f64; 3] {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}

impl Placement {
    fn local_point(&self, scale: &ScaleModel, u: f64) -> Result<Point> {
        match self {
            Placement::Straight {
                origin,
                direction,
                coord,
            } => {
                let c = coord.apply(scale.forward(u));
                if !c.is_finite() {
                    return Err(Error::degenerate(format!(
                        "axis coordinate is undefined at u = {u}"
                    )));
                }
                Ok(*origin + *direction * c)
            }
            Placement::Projective { triple, matrix } => {
                let [x, y, z] = mat_vec(matrix, homogeneous_at(triple, u));
                project(x, y, z)
            }
        }
    }
}

/// An axis placed in its block, with its scale, ticks and current transform.
#[derive(Clone)]
pub struct PlacedAxis {
    pub(crate) role: Role,
    pub(crate) spec: AxisSpec,
    pub(crate) scale: ScaleModel,
    pub(crate) placement: Placement,
    pub(crate) transform: Affine,
    pub(crate) ticks: Vec<Tick>,
    /// Construction aid drawn without labels.
    pub(crate) reference: bool,
    /// Maps `u` to the value of the tagged canonical axis it lines up with.
    pub(crate) alignment: Option<Arc<dyn Mapping>>,
}

impl PlacedAxis {
    pub(crate) fn new(
        role: Role,
        spec: AxisSpec,
        scale: ScaleModel,
        ticks: Vec<Tick>,
        placement: Placement,
    ) -> Self {
        Self {
            role,
            spec,
            scale,
            placement,
            transform: Affine::IDENTITY,
            ticks,
            reference: false,
            alignment: None,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn spec(&self) -> &AxisSpec {
        &self.spec
    }

    pub fn scale(&self) -> &ScaleModel {
        &self.scale
    }

    pub fn ticks(&self) -> &[Tick] {
        &self.ticks
    }

    pub fn tag(&self) -> Option<&str> {
        self.spec.tag_name()
    }

    pub fn is_reference(&self) -> bool {
        self.reference
    }

    pub fn is_straight(&self) -> bool {
        matches!(self.placement, Placement::Straight { .. })
    }

    /// Value on the canonical axis of this axis' tag that `u` sits against.
    pub(crate) fn tag_value(&self, u: f64) -> f64 {
        self.alignment.as_ref().map_or(u, |align| align.apply(u))
    }

    pub(crate) fn local_point(&self, u: f64) -> Result<Point> {
        self.placement.local_point(&self.scale, u)
    }

    /// Point for value `u` in the current frame.
    pub fn point(&self, u: f64) -> Result<Point> {
        Ok(self.transform.apply(self.local_point(u)?))
    }

    /// Points for the two domain ends, in declaration order.
    pub fn endpoints(&self) -> Result<(Point, Point)> {
        let (min, max) = self.scale.domain();
        Ok((self.point(min)?, self.point(max)?))
    }

    /// `count` evenly spaced `(u, point)` pairs across the domain.
    pub fn sample(&self, count: usize) -> Result<Vec<(f64, Point)>> {
        let (min, max) = self.scale.domain();
        let count = count.max(2);
        (0..count)
            .map(|i| {
                let u = if i + 1 == count {
                    max
                } else {
                    min + (max - min) * i as f64 / (count - 1) as f64
                };
                Ok((u, self.point(u)?))
            })
            .collect()
    }

    /// Polyline of the axis path in the current frame.
    pub(crate) fn path(&self, curve_samples: usize) -> Result<Vec<Point>> {
        let count = if self.is_straight() { 2 } else { curve_samples };
        Ok(self.sample(count)?.into_iter().map(|(_, p)| p).collect())
    }

    pub(crate) fn bounds(&self, curve_samples: usize) -> Result<Option<Rect>> {
        Ok(Rect::bounding(self.path(curve_samples)?))
    }

    fn straight_coords(&self) -> Option<(Coord, f64, f64)> {
        match &self.placement {
            Placement::Straight { coord, .. } => {
                let (t0, t1) = self.scale.position_range();
                Some((*coord, coord.apply(t0), coord.apply(t1)))
            }
            Placement::Projective { .. } => None,
        }
    }

    /// Relative height of `u` on a straight axis: 0 at the lower coordinate
    /// end, 1 at the upper.
    pub(crate) fn fraction(&self, u: f64) -> Option<f64> {
        let (coord, c0, c1) = self.straight_coords()?;
        let (lo, hi) = crate::scale::util::sorted_pair(c0, c1);
        Some((coord.apply(self.scale.forward(u)) - lo) / (hi - lo))
    }

    /// Value at relative height `fraction` of a straight axis.
    pub(crate) fn value_at_fraction(&self, fraction: f64) -> Result<f64> {
        let (coord, c0, c1) = self
            .straight_coords()
            .ok_or_else(|| Error::config("relative positions need a straight axis"))?;
        let (lo, hi) = crate::scale::util::sorted_pair(c0, c1);
        self.scale.value_at(coord.invert(lo + fraction * (hi - lo)))
    }

    /// Point at relative height `fraction` of a straight axis.
    pub(crate) fn point_at_fraction(&self, fraction: f64) -> Option<Point> {
        let (_, c0, c1) = self.straight_coords()?;
        let (lo, hi) = crate::scale::util::sorted_pair(c0, c1);
        let Placement::Straight { origin, direction, .. } = &self.placement else {
            return None;
        };
        Some(self.transform.apply(*origin + *direction * (lo + fraction * (hi - lo))))
    }

    /// Value where the infinite line through `a` and `b` crosses this axis
    /// inside its domain.
    pub(crate) fn intersect_line(&self, a: Point, b: Point, config: &BuildConfig) -> Result<f64> {
        let miss = || Error::NoIntersection { role: self.role };
        match self.straight_coords() {
            Some((coord, c0, c1)) => {
                let (p0, p1) = self.endpoints()?;
                let s = line_intersection(p0, p1 - p0, a, b).ok_or_else(miss)?;
                let tol = config.tolerance;
                if !(s >= -tol && s <= 1.0 + tol) {
                    return Err(miss());
                }
                let c = c0 + s.clamp(0.0, 1.0) * (c1 - c0);
                self.scale.value_at(coord.invert(c)).map_err(|err| match err {
                    Error::OutOfDomain { .. } => miss(),
                    other => other,
                })
            }
            None => self.intersect_curve(a, b, config),
        }
    }

    fn intersect_curve(&self, a: Point, b: Point, config: &BuildConfig) -> Result<f64> {
        let side = |u: f64| -> Result<f64> { Ok(side_of_line(a, b, self.point(u)?)) };
        let samples = self.sample(config.curve_samples())?;
        let sides: Vec<(f64, f64)> = samples
            .iter()
            .map(|(u, p)| (*u, side_of_line(a, b, *p)))
            .collect();

        for pair in sides.windows(2) {
            let ((u0, d0), (u1, d1)) = (pair[0], pair[1]);
            if !d0.is_finite() || !d1.is_finite() {
                continue;
            }
            if d0 == 0.0 {
                return Ok(u0);
            }
            if d0.signum() == d1.signum() && d1 != 0.0 {
                continue;
            }

            let (mut lo, mut hi, mut d_lo) = (u0, u1, d0);
            for _ in 0..MAX_BISECTION_ITERATIONS {
                let mid = 0.5 * (lo + hi);
                if (hi - lo).abs() <= BISECTION_TOLERANCE * (1.0 + mid.abs()) {
                    return Ok(mid);
                }
                let d_mid = side(mid)?;
                if d_mid == 0.0 {
                    return Ok(mid);
                }
                if d_mid.signum() == d_lo.signum() {
                    lo = mid;
                    d_lo = d_mid;
                } else {
                    hi = mid;
                }
            }
            return Err(Error::DomainSolveTimeout {
                target: 0.0,
                iterations: MAX_BISECTION_ITERATIONS,
            });
        }

        Err(Error::NoIntersection { role: self.role })
    }
}

impl fmt::Debug for PlacedAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlacedAxis")
            .field("role", &self.role)
            .field("tag", &self.spec.tag_name())
            .field("scale", &self.scale)
            .field("straight", &self.is_straight())
            .field("ticks", &self.ticks.len())
            .finish_non_exhaustive()
    }
}

/// What an isopleth must satisfy inside one block.
#[derive(Clone)]
pub(crate) enum Constraint {
    /// The three axis points lie on one line. Roles follow the isopleth
    /// row, with reference axes in between, and are drawn in that order.
    Collinear([Role; 3]),
    /// Equal relative height on two straight rails.
    Rung([Role; 2]),
    /// `w = surface(u, v)`, with the isopleth turning at the grid point.
    Surface {
        u: Role,
        v: Role,
        w: Role,
        surface: Arc<dyn Surface>,
    },
}

/// Result of solving a block.
#[derive(Clone)]
pub struct BlockGeometry {
    pub(crate) kind: &'static str,
    pub(crate) axes: Vec<PlacedAxis>,
    pub(crate) constraints: Vec<Constraint>,
    /// Grid lines and ladder rungs in the current frame.
    pub(crate) guides: Vec<Vec<Point>>,
    /// Rails may be moved independently during composition.
    pub(crate) independent_axes: bool,
}

impl BlockGeometry {
    pub(crate) fn new(
        kind: &'static str,
        axes: Vec<PlacedAxis>,
        constraints: Vec<Constraint>,
    ) -> Self {
        Self {
            kind,
            axes,
            constraints,
            guides: Vec::new(),
            independent_axes: false,
        }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn axes(&self) -> &[PlacedAxis] {
        &self.axes
    }

    pub fn axis(&self, role: Role) -> Option<&PlacedAxis> {
        self.axes.iter().find(|axis| axis.role == role)
    }

    pub(crate) fn axis_or_err(&self, role: Role) -> Result<&PlacedAxis> {
        self.axis(role)
            .ok_or_else(|| Error::config(format!("{} block has no axis {role}", self.kind)))
    }

    pub fn guides(&self) -> &[Vec<Point>] {
        &self.guides
    }

    /// Moves the whole block.
    pub(crate) fn apply(&mut self, affine: Affine) {
        for axis in &mut self.axes {
            axis.transform = axis.transform.then(affine);
        }
        for guide in &mut self.guides {
            for point in guide.iter_mut() {
                *point = affine.apply(*point);
            }
        }
    }

    /// Bounding box of axes and guides in the current frame.
    pub(crate) fn bounds(&self, curve_samples: usize) -> Result<Option<Rect>> {
        let mut rect: Option<Rect> = None;
        let mut merge = |other: Option<Rect>| {
            rect = match (rect, other) {
                (Some(a), Some(b)) => Some(a.union(&b)),
                (a, b) => a.or(b),
            };
        };
        for axis in &self.axes {
            merge(axis.bounds(curve_samples)?);
        }
        for guide in &self.guides {
            merge(Rect::bounding(guide.iter().copied()));
        }
        Ok(rect)
    }
}

impl fmt::Debug for BlockGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockGeometry")
            .field("kind", &self.kind)
            .field("axes", &self.axes)
            .field("guides", &self.guides.len())
            .finish_non_exhaustive()
    }
}

/// Builds the scale and ticks for one declared axis.
pub(crate) fn prepare(spec: &AxisSpec, config: &BuildConfig) -> Result<(ScaleModel, Vec<Tick>)> {
    spec.check_range()?;
    let scale = spec.build_scale(config.monotonic_samples())?;
    let ticks = TickGenerator::from_spec(spec)?.generate(&scale)?;
    Ok((scale, ticks))
}

/// Looks up a role the block kind requires; validation has already run.
pub(crate) fn required<'a>(
    axes: &'a BTreeMap<Role, AxisSpec>,
    role: Role,
    kind: &'static str,
) -> Result<&'a AxisSpec> {
    axes.get(&role).ok_or_else(|| Error::IncompatibleAxisCount {
        kind,
        missing: vec![role],
    })
}

/// Straight placement that spreads the coordinate range of `scale` over
/// `length` along the unit vector `along`, starting at `start`.
pub(crate) fn normalized_rail(
    scale: &ScaleModel,
    coord: Coord,
    start: Point,
    along: Point,
    length: f64,
) -> Result<Placement> {
    let (t0, t1) = scale.position_range();
    let (c0, c1) = (coord.apply(t0), coord.apply(t1));
    let (lo, hi) = crate::scale::util::sorted_pair(c0, c1);
    let span = hi - lo;
    if !(span.is_finite() && span > 0.0) {
        return Err(Error::degenerate("axis has no usable coordinate range"));
    }
    let unit = length / span;
    Ok(Placement::Straight {
        origin: start - along * (lo * unit),
        direction: along * unit,
        coord,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sum_block() -> BlockSpec {
        BlockSpec::sum()
            .axis(Role::F1, AxisSpec::new(0.0, 10.0))
            .axis(Role::F2, AxisSpec::new(0.0, 10.0))
            .axis(Role::F3, AxisSpec::new(0.0, -10.0))
    }

    #[test]
    fn missing_roles_are_listed() {
        let block = BlockSpec::quotient().axis(Role::F2, AxisSpec::new(1.0, 2.0));
        match block.validate() {
            Err(Error::IncompatibleAxisCount { kind, missing }) => {
                assert_eq!(kind, "quotient");
                assert_eq!(missing, vec![Role::F1, Role::F3, Role::F4]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn extra_roles_are_configuration_errors() {
        let block = sum_block().axis(Role::F4, AxisSpec::new(0.0, 1.0));
        assert!(matches!(block.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn empty_domain_is_invalid_range() {
        let block = sum_block().axis(Role::F2, AxisSpec::new(1.0, 1.0));
        assert!(matches!(
            block.solve(&BuildConfig::default()),
            Err(Error::InvalidRange { .. })
        ));
    }

    #[test]
    fn mirror_flips_inside_the_block() {
        let config = BuildConfig::default();
        let plain = sum_block().solve(&config).unwrap();
        let mirrored = sum_block().mirror(true, false).solve(&config).unwrap();
        let p = plain.axis(Role::F1).unwrap().point(4.0).unwrap();
        let q = mirrored.axis(Role::F1).unwrap().point(4.0).unwrap();
        assert!((p.x - 0.0).abs() < 1e-12 && (q.x - 10.0).abs() < 1e-12);
        assert!((p.y - q.y).abs() < 1e-12);
    }

    #[test]
    fn straight_axis_intersection_inverts_scale() {
        let config = BuildConfig::default();
        let geometry = sum_block().solve(&config).unwrap();
        let axis = geometry.axis(Role::F1).unwrap();
        let target = axis.point(7.25).unwrap();
        let u = axis
            .intersect_line(target - Point::new(1.0, 0.0), target + Point::new(1.0, 0.0), &config)
            .unwrap();
        assert!((u - 7.25).abs() < 1e-9);
    }

    #[test]
    fn missed_axis_reports_its_role() {
        let config = BuildConfig::default();
        let geometry = sum_block().solve(&config).unwrap();
        let axis = geometry.axis(Role::F3).unwrap();
        let err = axis
            .intersect_line(Point::new(0.0, 50.0), Point::new(1.0, 50.0), &config)
            .unwrap_err();
        assert_eq!(err, Error::NoIntersection { role: Role::F3 });
    }

    #[test]
    fn iso_values_from_options() {
        let row = Isopleth::row([Some(1.0), None]);
        assert_eq!(row.values, vec![IsoValue::Known(1.0), IsoValue::Unknown]);
    }
}
