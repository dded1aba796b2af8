//! The geometry document handed to a renderer.
//!
//! Everything is in final page coordinates. [`Document::commands`] flattens
//! the document into a list of drawing commands; typesetting and rasterising
//! them is left to the caller.

use serde::Serialize;

use crate::block::{BlockGeometry, PlacedAxis, Role};
use crate::config::BuildConfig;
use crate::error::Result;
use crate::isopleth::SolvedIsopleth;
use crate::scale::{ScaleType, Tick, TickGenerator, TickSide};
use crate::transform::Point;

/// How an axis is drawn, derived from its scale type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisStyle {
    /// Continuous path with tick marks.
    Line,
    /// Labelled dots, no path.
    Point,
    /// Labels with pointers offset from the axis.
    Arrow,
    /// Path with caller-supplied marks as dots.
    Data,
    /// Unlabelled construction axis.
    Reference,
}

impl AxisStyle {
    fn of(scale_type: ScaleType, reference: bool) -> Self {
        if reference {
            return AxisStyle::Reference;
        }
        match scale_type {
            ScaleType::ManualPoint => AxisStyle::Point,
            ScaleType::ManualArrow => AxisStyle::Arrow,
            ScaleType::ManualData => AxisStyle::Data,
            _ => AxisStyle::Line,
        }
    }
}

/// One tick in page coordinates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedTick {
    pub value: f64,
    /// Point on the axis.
    pub anchor: Point,
    /// Outer end of the tick mark, or the pointer tail for arrows.
    pub end: Point,
    pub level: u8,
    pub label: Option<String>,
    pub length: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisDocument {
    pub block: usize,
    pub role: Role,
    pub tag: Option<String>,
    pub title: Option<String>,
    pub style: AxisStyle,
    /// Set for extra scales drawn on another axis's geometry.
    pub overlay: bool,
    pub path: Vec<Point>,
    pub ticks: Vec<PlacedTick>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub width: f64,
    pub height: f64,
    pub axes: Vec<AxisDocument>,
    /// Grid lines and ladder rungs.
    pub guides: Vec<Vec<Point>>,
    pub isopleths: Vec<SolvedIsopleth>,
}

/// A drawing command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Command {
    MoveTo(Point),
    LineTo(Point),
    Dot(Point),
    Arrow { from: Point, to: Point },
    Label { at: Point, text: String },
}

impl Document {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            axes: Vec::new(),
            guides: Vec::new(),
            isopleths: Vec::new(),
        }
    }

    /// Adds every axis of a composed block; nothing is added on error.
    pub(crate) fn add_block(
        &mut self,
        block: usize,
        geometry: &BlockGeometry,
        config: &BuildConfig,
    ) -> Result<()> {
        let mut axes = Vec::new();
        for axis in geometry.axes() {
            axes.push(axis_document(block, axis, config)?);
            for overlay in &axis.spec().overlays {
                let ticks = TickGenerator::overlay(overlay)?.generate(axis.scale())?;
                let style = AxisStyle::of(overlay.scale_type, false);
                axes.push(AxisDocument {
                    block,
                    role: axis.role(),
                    tag: axis.tag().map(str::to_string),
                    title: None,
                    style,
                    overlay: true,
                    path: Vec::new(),
                    ticks: place_ticks(axis, &ticks, overlay.tick_side, style, config)?,
                });
            }
        }
        self.axes.extend(axes);
        self.guides.extend(geometry.guides().iter().cloned());
        Ok(())
    }

    pub(crate) fn add_isopleth(&mut self, isopleth: SolvedIsopleth) {
        self.isopleths.push(isopleth);
    }

    pub fn axes_of(&self, block: usize) -> impl Iterator<Item = &AxisDocument> {
        self.axes.iter().filter(move |axis| axis.block == block)
    }

    /// Flattens the document into drawing commands: axes first, then guides,
    /// then isopleths.
    pub fn commands(&self) -> Vec<Command> {
        let mut out = Vec::new();
        for axis in &self.axes {
            if axis.style != AxisStyle::Point {
                polyline(&mut out, &axis.path);
            }
            for tick in &axis.ticks {
                match axis.style {
                    AxisStyle::Line | AxisStyle::Reference => {
                        out.push(Command::MoveTo(tick.anchor));
                        out.push(Command::LineTo(tick.end));
                    }
                    AxisStyle::Point | AxisStyle::Data => out.push(Command::Dot(tick.anchor)),
                    AxisStyle::Arrow => out.push(Command::Arrow {
                        from: tick.end,
                        to: tick.anchor,
                    }),
                }
                if let Some(text) = &tick.label {
                    out.push(Command::Label {
                        at: tick.end,
                        text: text.clone(),
                    });
                }
            }
            if let (Some(title), Some(end)) = (&axis.title, axis.path.last()) {
                out.push(Command::Label {
                    at: *end,
                    text: title.clone(),
                });
            }
        }
        for guide in &self.guides {
            polyline(&mut out, guide);
        }
        for isopleth in &self.isopleths {
            for segment in &isopleth.path {
                polyline(&mut out, segment);
                out.extend(segment.iter().map(|p| Command::Dot(*p)));
            }
        }
        out
    }
}

fn polyline(out: &mut Vec<Command>, points: &[Point]) {
    let mut iter = points.iter();
    if let Some(first) = iter.next() {
        out.push(Command::MoveTo(*first));
        out.extend(iter.map(|p| Command::LineTo(*p)));
    }
}

fn axis_document(block: usize, axis: &PlacedAxis, config: &BuildConfig) -> Result<AxisDocument> {
    let spec = axis.spec();
    let style = AxisStyle::of(spec.kind(), axis.is_reference());
    let path = match style {
        AxisStyle::Point => Vec::new(),
        _ => axis.path(config.curve_samples())?,
    };
    Ok(AxisDocument {
        block,
        role: axis.role(),
        tag: axis.tag().map(str::to_string),
        title: spec.title.clone(),
        style,
        overlay: false,
        path,
        ticks: place_ticks(axis, axis.ticks(), spec.tick_side, style, config)?,
    })
}

/// Unit tangent at `u`, oriented from the first domain end to the second.
fn tangent(axis: &PlacedAxis, u: f64) -> Result<Point> {
    let (min, max) = axis.scale().domain();
    let h = (max - min) * 1e-6;
    let (a, b) = if axis.scale().contains(u + h) {
        (u, u + h)
    } else {
        (u - h, u)
    };
    let d = axis.point(b)? - axis.point(a)?;
    let len = d.length();
    Ok(if len > 0.0 { d * (1.0 / len) } else { Point::ZERO })
}

fn place_ticks(
    axis: &PlacedAxis,
    ticks: &[Tick],
    side: TickSide,
    style: AxisStyle,
    config: &BuildConfig,
) -> Result<Vec<PlacedTick>> {
    let sign = match side {
        TickSide::Left => 1.0,
        TickSide::Right => -1.0,
    };
    ticks
        .iter()
        .map(|tick| {
            let u = axis.scale().display_value(tick.value);
            let anchor = axis.point(u)?;
            let normal = tangent(axis, u)?.normal() * sign;
            let offset = match style {
                AxisStyle::Arrow => config.arrow_length,
                _ => config.tick_length * tick.length,
            };
            Ok(PlacedTick {
                value: tick.value,
                anchor,
                end: anchor + normal * offset,
                level: tick.level,
                label: match style {
                    AxisStyle::Reference => None,
                    _ => tick.label.clone(),
                },
                length: tick.length,
            })
        })
        .collect()
}
