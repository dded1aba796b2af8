//! Nomogram construction
//!
//! `nomograph` lays out nomograms: charts where a relation between three or
//! four variables becomes a straight line drawn across scaled axes. It models
//! the scales, places the axes of each relation block, chains blocks through
//! shared axes and solves isopleths backwards for an unknown value. Typesetting
//! and rendering are left to the caller; the result is a [`Document`] of
//! page-coordinate geometry and a flat list of drawing [`Command`]s.
//!
//! # Core Concepts
//!
//! ## Scales
//!
//! An [`AxisSpec`] describes one variable: its domain, the [`Mapping`] the
//! governing relation applies to it, and how its ticks look. Building it
//! produces a [`ScaleModel`], which maps values forward and inverts positions
//! back, and a tick hierarchy from [`TickGenerator`]:
//! - `LinearSmart` / `LogSmart` pick round steps and decade mantissas
//! - `Linear` / `Log` use a fixed number of subdivisions
//! - the manual types place exactly the entries of a value table
//!
//! ## Blocks
//!
//! A [`BlockSpec`] binds axes to the [`Role`]s of one relation type:
//!
//! | kind          | relation                          |
//! |---------------|-----------------------------------|
//! | sum           | `F1 + F2 + F3 = 0`                |
//! | product       | `F1 = F2 * F3`                    |
//! | quotient      | `F1 / F2 = F3 / F4`               |
//! | determinant   | three homogeneous rows, `det = 0` |
//! | grid          | `F3 = G(F1, F2)`                  |
//! | ladder        | equal relative height on two rails|
//! | compound      | `F1 + F2 F3 + F4 = 0`             |
//! | single        | one axis, placed by its tag       |
//!
//! ## Composition
//!
//! Axes sharing a tag are pulled onto each other, the first declared block
//! defining the geometry. [`GlobalTransform`]s such as
//! [`GlobalTransform::ScalePaper`] then act on the whole chart.
//!
//! # Examples
//!
//! ## Solving a product
//!
//! ```rust
//! use nomograph::{AxisSpec, BlockSpec, Nomogram, Role};
//!
//! // dH = cp * dT
//! let block = BlockSpec::product()
//!     .axis(Role::F1, AxisSpec::new(200.0, 300.0).title("dH"))
//!     .axis(Role::F2, AxisSpec::new(0.2, 0.3).title("cp"))
//!     .axis(Role::F3, AxisSpec::new(500.0, 1500.0).title("dT"))
//!     .isopleth([Some(240.0), Some(0.24), None]);
//!
//! let build = Nomogram::new().block(block).build();
//! let dt = build.solved_value(0, 0).unwrap();
//! assert!((dt - 1000.0).abs() < 1e-6);
//! ```
//!
//! ## Chaining blocks
//!
//! ```rust
//! use nomograph::{AxisSpec, BlockSpec, GlobalTransform, Nomogram, Role};
//!
//! // a + b = s, then s + c = t, sharing the axis tagged "s"
//! let first = BlockSpec::sum()
//!     .axis(Role::F1, AxisSpec::new(0.0, 10.0))
//!     .axis(Role::F2, AxisSpec::new(0.0, 10.0))
//!     .axis(Role::F3, AxisSpec::new(0.0, -20.0).tag("s"));
//! let second = BlockSpec::sum()
//!     .axis(Role::F1, AxisSpec::new(0.0, -20.0).tag("s"))
//!     .axis(Role::F2, AxisSpec::new(0.0, 5.0))
//!     .axis(Role::F3, AxisSpec::new(0.0, 25.0));
//!
//! let build = Nomogram::new()
//!     .block(first)
//!     .block(second)
//!     .transform(GlobalTransform::ScalePaper)
//!     .build();
//! assert!(build.issues.is_empty());
//! assert!(!build.document.commands().is_empty());
//! ```

pub mod block;
pub mod compose;
pub mod config;
pub mod document;
pub mod error;
pub mod isopleth;
pub mod nomogram;
pub mod scale;
pub mod transform;

pub use block::{BlockGeometry, BlockKind, BlockSpec, IsoValue, Isopleth, PlacedAxis, Role, Surface};
pub use compose::{AlignmentComposer, GlobalTransform};
pub use config::BuildConfig;
pub use document::{AxisDocument, AxisStyle, Command, Document, PlacedTick};
pub use error::{BuildIssue, Error, Result};
pub use isopleth::{IsoplethSolver, SolvedIsopleth};
pub use nomogram::{Build, Nomogram};
pub use scale::{
    AxisSpec, Identity, LinearMap, Log10, Mapping, Overlay, ScaleModel, ScaleType, TextFormat, Tick,
    TickGenerator, TickIter, TickSide,
};
pub use transform::{Affine, Point, Rect};
