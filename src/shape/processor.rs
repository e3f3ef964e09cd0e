// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::collections::HashMap;
use std::rc::Rc;

use crate::character::{ImageCharacter, ImageData};
use crate::error::{Error, ErrorMask};
use crate::geom::Point;
use crate::shape::{ActiveLine, BitmapFill, Edge, Fill, Gradient, Shape, ShapeBuilder};
use crate::tag::{CharacterId, DefineShape, FillStyle, LineStyle, ShapeRecord};

/// Materializes a [`DefineShape`] tag into a [`Shape`].
pub(crate) struct ShapeProcessor<'a> {
    images: &'a HashMap<CharacterId, ImageCharacter>,
    mask: ErrorMask,
}

impl<'a> ShapeProcessor<'a> {
    pub fn new(images: &'a HashMap<CharacterId, ImageCharacter>, mask: ErrorMask) -> Self {
        ShapeProcessor { images, mask }
    }

    pub fn process(&self, tag: &DefineShape) -> Result<Shape, Error> {
        let mut fills = self.resolve_fills(&tag.styles.fill_styles)?;
        let mut lines = self.resolve_lines(&tag.styles.line_styles)?;

        let mut builder = ShapeBuilder::new();
        let mut cur = Point::new(0, 0);

        for record in &tag.records {
            match record {
                ShapeRecord::StyleChange(change) => {
                    builder.flush();

                    if let Some(styles) = &change.new_styles {
                        fills = self.resolve_fills(&styles.fill_styles)?;
                        lines = self.resolve_lines(&styles.line_styles)?;
                    }
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
                        cur = to;
                    }
                }
                ShapeRecord::StraightEdge { delta_x, delta_y } => {
                    let to = Point::new(cur.x + delta_x, cur.y + delta_y);
                    builder.push_edge(Edge::Straight { from: cur, to });
                    cur = to;
                }
                ShapeRecord::CurvedEdge {
                    control_delta_x,
                    control_delta_y,
                    anchor_delta_x,
                    anchor_delta_y,
                } => {
                    let control = Point::new(cur.x + control_delta_x, cur.y + control_delta_y);
                    let to = Point::new(control.x + anchor_delta_x, control.y + anchor_delta_y);
                    builder.push_edge(Edge::Curved { from: cur, control, to });
                    cur = to;
                }
            }
        }

        Ok(builder.finish(tag.bounds))
    }

    /// Looks up a 1-based style index. Index 0 clears the register.
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

    fn resolve_fills(&self, styles: &[FillStyle]) -> Result<Vec<Fill>, Error> {
        styles.iter().map(|s| self.resolve_fill(s)).collect()
    }

    fn resolve_fill(&self, style: &FillStyle) -> Result<Fill, Error> {
        Ok(match style {
            FillStyle::Color(color) => Fill::Solid(*color),
            FillStyle::LinearGradient(gradient) => Fill::Linear(Gradient {
                matrix: gradient.matrix,
                spread: gradient.spread,
                records: gradient.records.clone(),
                focal_point: None,
            }),
            FillStyle::RadialGradient(gradient) => Fill::Radial(Gradient {
                matrix: gradient.matrix,
                spread: gradient.spread,
                records: gradient.records.clone(),
                focal_point: None,
            }),
            FillStyle::FocalGradient { gradient, focal_point } => Fill::Radial(Gradient {
                matrix: gradient.matrix,
                spread: gradient.spread,
                records: gradient.records.clone(),
                focal_point: Some(*focal_point),
            }),
            FillStyle::Bitmap { id, matrix, is_smoothed, is_repeating } => {
                Fill::Bitmap(BitmapFill {
                    image: self.resolve_bitmap(*id)?,
                    matrix: *matrix,
                    is_smoothed: *is_smoothed,
                    is_repeating: *is_repeating,
                })
            }
        })
    }

    fn resolve_lines(&self, styles: &[LineStyle]) -> Result<Vec<ActiveLine>, Error> {
        styles
            .iter()
            .map(|style| {
                Ok(match &style.fill {
                    Some(fill) => ActiveLine {
                        width: style.width,
                        color: None,
                        fill: Some(self.resolve_fill(fill)?),
                    },
                    None => ActiveLine {
                        width: style.width,
                        color: Some(style.color),
                        fill: None,
                    },
                })
            })
            .collect()
    }

    fn resolve_bitmap(&self, id: CharacterId) -> Result<Rc<ImageData>, Error> {
        resolve_bitmap(self.images, self.mask, id)
    }
}

/// Resolves a bitmap fill reference through the image dictionary,
/// substituting the empty image when the error class is masked off.
pub(crate) fn resolve_bitmap(
    images: &HashMap<CharacterId, ImageCharacter>,
    mask: ErrorMask,
    id: CharacterId,
) -> Result<Rc<ImageData>, Error> {
    match images.get(&id) {
        Some(image) => Ok(image.data.clone()),
        None if mask.contains(ErrorMask::UNPROCESSABLE_DATA) => Err(Error::InvalidData(format!(
            "character {} is not an image",
            id
        ))),
        None => {
            log::warn!("character {} is not an image, using an empty one", id);
            Ok(Rc::new(ImageData::empty()))
        }
    }
}
