// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The resolved drawing model.
//!
//! A [`Shape`] is the fully materialized form of a shape or morph-shape
//! definition: style tables are resolved, bitmap references are replaced
//! by image data, and edges carry absolute coordinates relative to the
//! shape's own top-left corner.

use std::rc::Rc;

use crate::character::ImageData;
use crate::color::{Color, ColorTransform};
use crate::geom::{Matrix, Point, Rectangle};
use crate::tag::{GradientRecord, GradientSpread};

mod builder;
mod morph;
mod processor;

pub(crate) use builder::{ActiveLine, ShapeBuilder};
pub(crate) use morph::MorphShapeProcessor;
pub(crate) use processor::ShapeProcessor;

/// A resolved fill.
#[derive(Clone, Debug, PartialEq)]
pub enum Fill {
    /// A solid color.
    Solid(Color),
    /// A linear gradient.
    Linear(Gradient),
    /// A radial gradient, optionally focal.
    Radial(Gradient),
    /// A bitmap pattern.
    Bitmap(BitmapFill),
}

impl Fill {
    /// Returns a copy with every color folded through `transforms`.
    pub fn transform_colors(&self, transforms: &[ColorTransform]) -> Fill {
        match self {
            Fill::Solid(c) => Fill::Solid(c.transformed(transforms)),
            Fill::Linear(g) => Fill::Linear(g.transform_colors(transforms)),
            Fill::Radial(g) => Fill::Radial(g.transform_colors(transforms)),
            Fill::Bitmap(b) => Fill::Bitmap(b.clone()),
        }
    }
}

/// A resolved gradient.
///
/// The gradient square is 32768×32768 twips centered on the origin;
/// `matrix` places it into the shape.
#[derive(Clone, Debug, PartialEq)]
pub struct Gradient {
    /// Placement of the gradient square.
    pub matrix: Matrix,
    /// Behavior outside the gradient square.
    pub spread: GradientSpread,
    /// Color stops in record order.
    pub records: Vec<GradientRecord>,
    /// Focal point offset for radial gradients, in `[-1, 1]`.
    pub focal_point: Option<f32>,
}

impl Gradient {
    fn transform_colors(&self, transforms: &[ColorTransform]) -> Gradient {
        Gradient {
            records: self
                .records
                .iter()
                .map(|r| GradientRecord {
                    ratio: r.ratio,
                    color: r.color.transformed(transforms),
                })
                .collect(),
            ..self.clone()
        }
    }
}

/// A resolved bitmap fill.
#[derive(Clone, Debug, PartialEq)]
pub struct BitmapFill {
    /// The image painted by the fill.
    pub image: Rc<ImageData>,
    /// Maps bitmap pixels into the shape's twip space.
    pub matrix: Matrix,
    /// Bilinear smoothing requested.
    pub is_smoothed: bool,
    /// Tiled rather than clamped.
    pub is_repeating: bool,
}

/// The style a path is drawn with: an area fill, a stroke, or both.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PathStyle {
    /// Area fill.
    pub fill: Option<Fill>,
    /// Stroke width in twips.
    pub line_width: Option<i32>,
    /// Stroke color, used when `line_fill` is absent.
    pub line_color: Option<Color>,
    /// Fill painted along the stroke.
    pub line_fill: Option<Fill>,
}

impl PathStyle {
    pub(crate) fn area(fill: Fill) -> PathStyle {
        PathStyle {
            fill: Some(fill),
            ..PathStyle::default()
        }
    }

    pub(crate) fn line(line: &ActiveLine) -> PathStyle {
        PathStyle {
            fill: None,
            line_width: Some(line.width),
            line_color: line.color,
            line_fill: line.fill.clone(),
        }
    }

    fn transform_colors(&self, transforms: &[ColorTransform]) -> PathStyle {
        PathStyle {
            fill: self.fill.as_ref().map(|f| f.transform_colors(transforms)),
            line_width: self.line_width,
            line_color: self.line_color.map(|c| c.transformed(transforms)),
            line_fill: self
                .line_fill
                .as_ref()
                .map(|f| f.transform_colors(transforms)),
        }
    }
}

/// A single edge of a path, in absolute twip coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Edge {
    /// A straight segment.
    Straight {
        /// Segment start.
        from: Point,
        /// Segment end.
        to: Point,
    },
    /// A quadratic segment.
    Curved {
        /// Segment start.
        from: Point,
        /// Quadratic control point.
        control: Point,
        /// Segment end.
        to: Point,
    },
}

impl Edge {
    /// Returns the edge start point.
    pub fn from(&self) -> Point {
        match *self {
            Edge::Straight { from, .. } | Edge::Curved { from, .. } => from,
        }
    }

    /// Returns the edge end point.
    pub fn to(&self) -> Point {
        match *self {
            Edge::Straight { to, .. } | Edge::Curved { to, .. } => to,
        }
    }

    /// Returns the edge walked in the opposite direction.
    pub fn reversed(&self) -> Edge {
        match *self {
            Edge::Straight { from, to } => Edge::Straight { from: to, to: from },
            Edge::Curved { from, control, to } => Edge::Curved {
                from: to,
                control,
                to: from,
            },
        }
    }

    fn translated(&self, dx: i32, dy: i32) -> Edge {
        let t = |p: Point| Point::new(p.x + dx, p.y + dy);
        match *self {
            Edge::Straight { from, to } => Edge::Straight {
                from: t(from),
                to: t(to),
            },
            Edge::Curved { from, control, to } => Edge::Curved {
                from: t(from),
                control: t(control),
                to: t(to),
            },
        }
    }
}

/// A styled run of edges forming one continuous subpath.
#[derive(Clone, Debug, PartialEq)]
pub struct Path {
    /// The style the run is drawn with.
    pub style: PathStyle,
    /// The edges, in record order.
    pub edges: Vec<Edge>,
    /// Walk the edges back to front. Set for left (fill-style-0) fills,
    /// whose recorded orientation is opposite to their painted one.
    pub reverse: bool,
}

impl Path {
    /// Returns the edges in painting order, honoring [`Path::reverse`].
    pub fn drawing_edges(&self) -> Vec<Edge> {
        if self.reverse {
            self.edges.iter().rev().map(Edge::reversed).collect()
        } else {
            self.edges.clone()
        }
    }
}

/// A materialized shape.
///
/// Edges are stored relative to the shape's top-left corner; the offset
/// records where that corner sits in the defining tag's coordinate space.
#[derive(Clone, Debug, PartialEq)]
pub struct Shape {
    /// Width in twips.
    pub width: i32,
    /// Height in twips.
    pub height: i32,
    /// X position of the top-left corner in the defining tag's space.
    pub x_offset: i32,
    /// Y position of the top-left corner in the defining tag's space.
    pub y_offset: i32,
    /// The styled subpaths, in definition order.
    pub paths: Vec<Path>,
}

impl Shape {
    pub(crate) fn new(bounds: Rectangle, paths: Vec<Path>) -> Shape {
        let paths = paths
            .into_iter()
            .map(|p| Path {
                style: p.style,
                edges: p
                    .edges
                    .iter()
                    .map(|e| e.translated(-bounds.x_min, -bounds.y_min))
                    .collect(),
                reverse: p.reverse,
            })
            .collect();

        Shape {
            width: bounds.width(),
            height: bounds.height(),
            x_offset: bounds.x_min,
            y_offset: bounds.y_min,
            paths,
        }
    }

    /// Returns the shape bounds in the defining tag's coordinate space.
    pub fn bounds(&self) -> Rectangle {
        Rectangle {
            x_min: self.x_offset,
            x_max: self.x_offset + self.width,
            y_min: self.y_offset,
            y_max: self.y_offset + self.height,
        }
    }

    /// Returns a copy with every fill and stroke color folded through
    /// `transforms`, clamping after each stage.
    pub fn transform_colors(&self, transforms: &[ColorTransform]) -> Shape {
        if transforms.is_empty() {
            return self.clone();
        }

        Shape {
            paths: self
                .paths
                .iter()
                .map(|p| Path {
                    style: p.style.transform_colors(transforms),
                    edges: p.edges.clone(),
                    reverse: p.reverse,
                })
                .collect(),
            ..self.clone()
        }
    }
}
