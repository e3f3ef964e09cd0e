// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use crate::color::Color;
use crate::geom::Rectangle;
use crate::shape::{Edge, Fill, Path, PathStyle, Shape};

/// A resolved line style held in the builder's line register.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ActiveLine {
    pub width: i32,
    pub color: Option<Color>,
    pub fill: Option<Fill>,
}

/// Accumulates edges between style changes and flushes them into styled
/// paths. Shared by the static and the morph processors.
///
/// The three style registers persist across flushes; a style-change
/// record only overwrites the registers it names.
#[derive(Default)]
pub(crate) struct ShapeBuilder {
    paths: Vec<Path>,
    pending: Vec<Edge>,
    pub fill0: Option<Fill>,
    pub fill1: Option<Fill>,
    pub line: Option<ActiveLine>,
}

impl ShapeBuilder {
    pub fn new() -> Self {
        ShapeBuilder::default()
    }

    pub fn push_edge(&mut self, edge: Edge) {
        self.pending.push(edge);
    }

    /// Flushes the accumulated edges: one path per active style register.
    /// The left fill is emitted reversed, the right fill and the stroke
    /// forward. Edges with no active style are dropped.
    pub fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let edges = std::mem::take(&mut self.pending);

        if let Some(fill) = self.fill0.clone() {
            self.push_path(PathStyle::area(fill), edges.clone(), true);
        }
        if let Some(fill) = self.fill1.clone() {
            self.push_path(PathStyle::area(fill), edges.clone(), false);
        }
        if let Some(line) = self.line.clone() {
            self.push_path(PathStyle::line(&line), edges, false);
        }
    }

    /// Appends a path, merging it into the previous one when both carry
    /// the same style, the same orientation and continuous endpoints.
    fn push_path(&mut self, style: PathStyle, edges: Vec<Edge>, reverse: bool) {
        if let Some(last) = self.paths.last_mut() {
            if last.reverse == reverse && last.style == style {
                let continuous = if reverse {
                    // Drawn back to front: the new run precedes the old one.
                    edges.last().map(Edge::to) == last.edges.first().map(Edge::from)
                } else {
                    last.edges.last().map(Edge::to) == edges.first().map(Edge::from)
                };
                if continuous {
                    if reverse {
                        let mut merged = edges;
                        merged.append(&mut last.edges);
                        last.edges = merged;
                    } else {
                        last.edges.extend(edges);
                    }
                    return;
                }
            }
        }

        self.paths.push(Path { style, edges, reverse });
    }

    /// Flushes any pending edges and shifts everything into the local
    /// coordinate space of `bounds`.
    pub fn finish(mut self, bounds: Rectangle) -> Shape {
        self.flush();
        Shape::new(bounds, self.paths)
    }
}
