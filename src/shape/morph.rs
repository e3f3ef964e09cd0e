// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::collections::HashMap;

use crate::character::ImageCharacter;
use crate::error::{Error, ErrorMask};
use crate::geom::{Matrix, Point, Rectangle};
use crate::shape::processor::resolve_bitmap;
use crate::shape::{ActiveLine, BitmapFill, Edge, Fill, Gradient, Shape, ShapeBuilder};
use crate::tag::{
    CharacterId, DefineMorphShape, GradientRecord, MorphFillStyle, MorphGradient,
    MorphLineStyle, ShapeRecord,
};

/// Materializes a [`DefineMorphShape`] tag at a fixed ratio.
///
/// The start edge stream drives the walk; the end stream is advanced in
/// lock step, stepping over its style-change records, which contribute
/// nothing but pen moves. A straight edge paired with a curved one is
/// promoted to a degenerate quadratic whose control point is the segment
/// midpoint, so the pair can be interpolated curve-to-curve.
pub(crate) struct MorphShapeProcessor<'a> {
    images: &'a HashMap<CharacterId, ImageCharacter>,
    mask: ErrorMask,
}

impl<'a> MorphShapeProcessor<'a> {
    pub fn new(images: &'a HashMap<CharacterId, ImageCharacter>, mask: ErrorMask) -> Self {
        MorphShapeProcessor { images, mask }
    }

    pub fn process(&self, tag: &DefineMorphShape, ratio: f64) -> Result<Shape, Error> {
        let ratio = ratio.clamp(0.0, 1.0);

        let fills = self.interpolate_fills(&tag.fill_styles, ratio)?;
        let lines = self.interpolate_lines(&tag.line_styles, ratio)?;

        let mut builder = ShapeBuilder::new();
        let mut start_cur = Point::new(0, 0);
        let mut end_cur = Point::new(0, 0);
        let mut end_records = tag.end_records.iter().peekable();

        for record in &tag.start_records {
            match record {
                ShapeRecord::StyleChange(change) => {
                    builder.flush();

                    if let Some(index) = change.fill_style_0 {
                        builder.fill0 = self.select(&fills, index)?;
                    }
                    if let Some(index) = change.fill_style_1 {
                        builder.fill1 = self.select(&fills, index)?;
                    }
                    if let Some(index) = change.line_style {
                        builder.line = self.select(&lines, index)?;
                    }
                    if let Some(to) = change.move_to {
                        start_cur = to;
                        // The end stream mirrors pen moves with its own
                        // style-change record.
                        if let Some(ShapeRecord::StyleChange(end_change)) = end_records.peek() {
                            if let Some(end_to) = end_change.move_to {
                                end_cur = end_to;
                            }
                            end_records.next();
                        }
                    }
                }
                start_edge => {
                    // Style changes on the end stream are inert here apart
                    // from the pen moves they carry.
                    while let Some(ShapeRecord::StyleChange(end_change)) = end_records.peek() {
                        if let Some(end_to) = end_change.move_to {
                            end_cur = end_to;
                        }
                        end_records.next();
                    }

                    let start_abs = absolute_edge(start_edge, &mut start_cur);
                    let end_abs = match end_records.next() {
                        Some(end_edge) => absolute_edge(end_edge, &mut end_cur),
                        None if self.mask.contains(ErrorMask::UNPROCESSABLE_DATA) => {
                            return Err(Error::InvalidData(
                                "morph edge streams are misaligned".into(),
                            ));
                        }
                        None => {
                            log::warn!("morph end edges exhausted, reusing the start edge");
                            start_abs
                        }
                    };

                    builder.push_edge(interpolate_edge(&start_abs, &end_abs, ratio));
                }
            }
        }

        builder.flush();
        let bounds = interpolate_bounds(&tag.start_bounds, &tag.end_bounds, ratio);
        Ok(builder.finish(bounds))
    }

    fn select<T: Clone>(&self, table: &[T], index: u32) -> Result<Option<T>, Error> {
        if index == 0 {
            return Ok(None);
        }
        match table.get(index as usize - 1) {
            Some(style) => Ok(Some(style.clone())),
            None if self.mask.contains(ErrorMask::UNPROCESSABLE_DATA) => Err(Error::InvalidData(
                format!("style index {} is out of range", index),
            )),
            None => {
                log::warn!("style index {} is out of range, cleared", index);
                Ok(None)
            }
        }
    }

    fn interpolate_fills(&self, styles: &[MorphFillStyle], ratio: f64) -> Result<Vec<Fill>, Error> {
        styles
            .iter()
            .map(|style| self.interpolate_fill(style, ratio))
            .collect()
    }

    fn interpolate_fill(&self, style: &MorphFillStyle, ratio: f64) -> Result<Fill, Error> {
        Ok(match style {
            MorphFillStyle::Color { start, end } => Fill::Solid(start.lerp(end, ratio)),
            MorphFillStyle::LinearGradient(gradient) => {
                Fill::Linear(interpolate_gradient(gradient, None, ratio))
            }
            MorphFillStyle::RadialGradient(gradient) => {
                Fill::Radial(interpolate_gradient(gradient, None, ratio))
            }
            MorphFillStyle::FocalGradient {
                gradient,
                start_focal_point,
                end_focal_point,
            } => {
                let focal = start_focal_point + (end_focal_point - start_focal_point) * ratio as f32;
                Fill::Radial(interpolate_gradient(gradient, Some(focal), ratio))
            }
            MorphFillStyle::Bitmap {
                id,
                start_matrix,
                end_matrix,
                is_smoothed,
                is_repeating,
            } => Fill::Bitmap(BitmapFill {
                image: resolve_bitmap(self.images, self.mask, *id)?,
                matrix: interpolate_matrix(start_matrix, end_matrix, ratio),
                is_smoothed: *is_smoothed,
                is_repeating: *is_repeating,
            }),
        })
    }

    fn interpolate_lines(
        &self,
        styles: &[MorphLineStyle],
        ratio: f64,
    ) -> Result<Vec<ActiveLine>, Error> {
        styles
            .iter()
            .map(|style| {
                let width = lerp_i32(style.start_width, style.end_width, ratio);
                Ok(match &style.fill {
                    Some(fill) => ActiveLine {
                        width,
                        color: None,
                        fill: Some(self.interpolate_fill(fill, ratio)?),
                    },
                    None => ActiveLine {
                        width,
                        color: Some(style.start_color.lerp(&style.end_color, ratio)),
                        fill: None,
                    },
                })
            })
            .collect()
    }
}

fn interpolate_gradient(gradient: &MorphGradient, focal: Option<f32>, ratio: f64) -> Gradient {
    Gradient {
        matrix: interpolate_matrix(&gradient.start_matrix, &gradient.end_matrix, ratio),
        spread: gradient.spread,
        records: gradient
            .records
            .iter()
            .map(|record| GradientRecord {
                ratio: lerp_u8(record.start_ratio, record.end_ratio, ratio),
                color: record.start_color.lerp(&record.end_color, ratio),
            })
            .collect(),
        focal_point: focal,
    }
}

fn interpolate_matrix(start: &Matrix, end: &Matrix, ratio: f64) -> Matrix {
    let lerp_f32 = |a: f32, b: f32| a + (b - a) * ratio as f32;
    Matrix {
        scale_x: lerp_f32(start.scale_x, end.scale_x),
        rotate_skew_0: lerp_f32(start.rotate_skew_0, end.rotate_skew_0),
        rotate_skew_1: lerp_f32(start.rotate_skew_1, end.rotate_skew_1),
        scale_y: lerp_f32(start.scale_y, end.scale_y),
        translate_x: lerp_i32(start.translate_x, end.translate_x, ratio),
        translate_y: lerp_i32(start.translate_y, end.translate_y, ratio),
    }
}

fn interpolate_bounds(start: &Rectangle, end: &Rectangle, ratio: f64) -> Rectangle {
    Rectangle {
        x_min: lerp_i32(start.x_min, end.x_min, ratio),
        x_max: lerp_i32(start.x_max, end.x_max, ratio),
        y_min: lerp_i32(start.y_min, end.y_min, ratio),
        y_max: lerp_i32(start.y_max, end.y_max, ratio),
    }
}

/// Resolves a relative edge record against the pen position, advancing it.
fn absolute_edge(record: &ShapeRecord, cur: &mut Point) -> Edge {
    match *record {
        ShapeRecord::StraightEdge { delta_x, delta_y } => {
            let from = *cur;
            let to = Point::new(from.x + delta_x, from.y + delta_y);
            *cur = to;
            Edge::Straight { from, to }
        }
        ShapeRecord::CurvedEdge {
            control_delta_x,
            control_delta_y,
            anchor_delta_x,
            anchor_delta_y,
        } => {
            let from = *cur;
            let control = Point::new(from.x + control_delta_x, from.y + control_delta_y);
            let to = Point::new(control.x + anchor_delta_x, control.y + anchor_delta_y);
            *cur = to;
            Edge::Curved { from, control, to }
        }
        ShapeRecord::StyleChange(_) => {
            // Callers filter style changes out before pairing.
            Edge::Straight { from: *cur, to: *cur }
        }
    }
}

fn interpolate_edge(start: &Edge, end: &Edge, ratio: f64) -> Edge {
    match (start, end) {
        (
            Edge::Straight { from: sf, to: st },
            Edge::Straight { from: ef, to: et },
        ) => Edge::Straight {
            from: lerp_point(sf, ef, ratio),
            to: lerp_point(st, et, ratio),
        },
        _ => {
            let (sf, sc, st) = as_quadratic(start);
            let (ef, ec, et) = as_quadratic(end);
            Edge::Curved {
                from: lerp_point(&sf, &ef, ratio),
                control: lerp_point(&sc, &ec, ratio),
                to: lerp_point(&st, &et, ratio),
            }
        }
    }
}

/// Views any edge as a quadratic; a straight edge becomes degenerate with
/// its midpoint as the control point.
fn as_quadratic(edge: &Edge) -> (Point, Point, Point) {
    match *edge {
        Edge::Curved { from, control, to } => (from, control, to),
        Edge::Straight { from, to } => {
            let control = Point::new((from.x + to.x) / 2, (from.y + to.y) / 2);
            (from, control, to)
        }
    }
}

fn lerp_point(a: &Point, b: &Point, ratio: f64) -> Point {
    Point::new(lerp_i32(a.x, b.x, ratio), lerp_i32(a.y, b.y, ratio))
}

fn lerp_i32(a: i32, b: i32, ratio: f64) -> i32 {
    (a as f64 + (b as f64 - a as f64) * ratio).round() as i32
}

fn lerp_u8(a: u8, b: u8, ratio: f64) -> u8 {
    (a as f64 + (b as f64 - a as f64) * ratio).round().clamp(0.0, 255.0) as u8
}
