//! Error types for nomogram construction.

use thiserror::Error;

use crate::block::Role;

/// Errors raised while modelling scales, solving blocks, composing the frame
/// or solving isopleths.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Missing or extra axis roles, unknown scale type, malformed tables.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The mapping function is not usable over the declared domain.
    #[error("degenerate scale: {reason}")]
    ScaleDegenerate { reason: String },

    /// A domain with no extent.
    #[error("invalid range [{min}, {max}]")]
    InvalidRange { min: f64, max: f64 },

    /// A block is missing axes its relation type requires.
    #[error("{kind} block is missing axis roles: {missing:?}")]
    IncompatibleAxisCount {
        kind: &'static str,
        missing: Vec<Role>,
    },

    /// Division by a near-zero homogeneous coordinate.
    #[error("degenerate projection (homogeneous denominator {value:e})")]
    DegenerateProjection { value: f64 },

    /// The derived reference scale of a grid block changes direction.
    #[error("derived scale is not monotonic near u = {at}")]
    NonMonotonicDerivedScale { at: f64 },

    /// Two blocks disagree on the geometry of a shared tag.
    #[error("axes tagged '{tag}' cannot be aligned (deviation {deviation:e})")]
    TagAlignmentConflict { tag: String, deviation: f64 },

    /// The isopleth does not cross the target axis within its domain.
    #[error("isopleth does not cross axis {role:?} within its domain")]
    NoIntersection { role: Role },

    /// A known value lies outside the axis domain.
    #[error("value {value} is outside the axis domain [{min}, {max}]")]
    OutOfDomain { value: f64, min: f64, max: f64 },

    /// Inverse lookup by bisection hit the iteration cap.
    #[error("inverse lookup of {target} did not converge within {iterations} iterations")]
    DomainSolveTimeout { target: f64, iterations: usize },
}

impl Error {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }

    pub(crate) fn degenerate(reason: impl Into<String>) -> Self {
        Error::ScaleDegenerate {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// A failure recorded during a build, with the location it came from.
///
/// `block` is the declaration index of the block, `None` for failures of the
/// page-level transforms. `role` and `isopleth` narrow it down when the
/// failure belongs to one axis or one isopleth request.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{}: {error}", location(.block, .role, .isopleth))]
pub struct BuildIssue {
    pub block: Option<usize>,
    pub role: Option<Role>,
    pub isopleth: Option<usize>,
    #[source]
    pub error: Error,
}

fn location(block: &Option<usize>, role: &Option<Role>, isopleth: &Option<usize>) -> String {
    let mut out = match block {
        Some(index) => format!("block {index}"),
        None => "page".to_string(),
    };
    if let Some(index) = isopleth {
        out.push_str(&format!(", isopleth {index}"));
    }
    if let Some(role) = role {
        out.push_str(&format!(", axis {role}"));
    }
    out
}

impl BuildIssue {
    pub(crate) fn in_block(block: usize, error: Error) -> Self {
        Self {
            block: Some(block),
            role: None,
            isopleth: None,
            error,
        }
    }

    pub(crate) fn in_isopleth(block: usize, isopleth: usize, error: Error) -> Self {
        let role = match &error {
            Error::NoIntersection { role } => Some(*role),
            _ => None,
        };
        Self {
            block: Some(block),
            role,
            isopleth: Some(isopleth),
            error,
        }
    }

    pub(crate) fn global(error: Error) -> Self {
        Self {
            block: None,
            role: None,
            isopleth: None,
            error,
        }
    }
}
