//! The top-level input and the build pipeline.

use log::{debug, warn};

use crate::block::BlockSpec;
use crate::compose::{AlignmentComposer, GlobalTransform, apply_global};
use crate::config::BuildConfig;
use crate::document::Document;
use crate::error::BuildIssue;
use crate::isopleth::{IsoplethSolver, SolvedIsopleth};

/// Ordered blocks, page-level transforms and page size.
///
/// ```
/// use nomograph::{AxisSpec, BlockSpec, GlobalTransform, Nomogram, Role};
///
/// let build = Nomogram::new()
///     .page(20.0, 30.0)
///     .block(
///         BlockSpec::sum()
///             .axis(Role::F1, AxisSpec::new(0.0, 10.0))
///             .axis(Role::F2, AxisSpec::new(0.0, 10.0))
///             .axis(Role::F3, AxisSpec::new(0.0, -10.0))
///             .isopleth([Some(6.0), Some(2.0), None]),
///     )
///     .transform(GlobalTransform::ScalePaper)
///     .build();
///
/// assert!(build.issues.is_empty());
/// assert!((build.solved_value(0, 0).unwrap() + 8.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone)]
pub struct Nomogram {
    blocks: Vec<BlockSpec>,
    transforms: Vec<GlobalTransform>,
    width: f64,
    height: f64,
    config: BuildConfig,
}

impl Default for Nomogram {
    fn default() -> Self {
        Self {
            blocks: Vec::new(),
            transforms: Vec::new(),
            width: 10.0,
            height: 10.0,
            config: BuildConfig::default(),
        }
    }
}

impl Nomogram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn block(mut self, block: BlockSpec) -> Self {
        self.blocks.push(block);
        self
    }

    /// Appends a page-level transform; they run in the order added.
    pub fn transform(mut self, transform: GlobalTransform) -> Self {
        self.transforms.push(transform);
        self
    }

    pub fn page(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn config(mut self, config: BuildConfig) -> Self {
        self.config = config;
        self
    }

    pub fn blocks(&self) -> &[BlockSpec] {
        &self.blocks
    }

    /// Solves, composes and draws every block.
    ///
    /// A failing block is left out of the document and reported; the rest
    /// still build. A failing isopleth is reported without touching its
    /// block's geometry.
    pub fn build(&self) -> Build {
        let config = &self.config;
        let mut issues = Vec::new();
        let mut composer = AlignmentComposer::new(config);

        let mut solved = Vec::with_capacity(self.blocks.len());
        for (index, spec) in self.blocks.iter().enumerate() {
            let placed = spec.solve(config).and_then(|mut geometry| {
                composer.place(&mut geometry)?;
                Ok(geometry)
            });
            match placed {
                Ok(geometry) => solved.push((index, geometry)),
                Err(error) => {
                    warn!("dropping {} block {index}: {error}", spec.kind().name());
                    issues.push(BuildIssue::in_block(index, error));
                }
            }
        }

        issues.extend(apply_global(
            &mut solved,
            &self.transforms,
            (self.width, self.height),
            config,
        ));

        let mut document = Document::new(self.width, self.height);
        let solver = IsoplethSolver::new(config);
        for (index, geometry) in &solved {
            if let Err(error) = document.add_block(*index, geometry, config) {
                warn!("dropping block {index} from the document: {error}");
                issues.push(BuildIssue::in_block(*index, error));
                continue;
            }
            let spec = &self.blocks[*index];
            for (k, request) in spec.isopleths().iter().enumerate() {
                match solver.solve(*index, k, spec.kind(), geometry, request) {
                    Ok(isopleth) => document.add_isopleth(isopleth),
                    Err(error) => {
                        warn!("isopleth {k} of block {index} failed: {error}");
                        issues.push(BuildIssue::in_isopleth(*index, k, error));
                    }
                }
            }
        }

        debug!(
            "built {} of {} blocks, {} isopleths, {} issues",
            solved.len(),
            self.blocks.len(),
            document.isopleths.len(),
            issues.len()
        );
        Build { document, issues }
    }
}

/// Output of [`Nomogram::build`].
#[derive(Debug, Clone)]
pub struct Build {
    pub document: Document,
    pub issues: Vec<BuildIssue>,
}

impl Build {
    pub fn isopleth(&self, block: usize, index: usize) -> Option<&SolvedIsopleth> {
        self.document
            .isopleths
            .iter()
            .find(|iso| iso.block == block && iso.index == index)
    }

    /// Value solved for by isopleth `index` of block `block`.
    pub fn solved_value(&self, block: usize, index: usize) -> Option<f64> {
        self.isopleth(block, index).and_then(SolvedIsopleth::solved)
    }
}
