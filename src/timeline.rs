// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Display-list replay.
//!
//! The processor walks a control-tag list, keeping one object per depth,
//! and snapshots the table at every `ShowFrame`. After the walk, every
//! frame is rewritten to the final union bounds, so all frames of one
//! timeline share identical bounds.

use std::collections::BTreeMap;

use crate::color::ColorTransform;
use crate::error::{Error, ErrorMask};
use crate::extractor::SwfExtractor;
use crate::geom::{Matrix, Rectangle};
use crate::tag::{BlendMode, CharacterId, Depth, Filter, PlaceObject, Tag};

/// A single object placed at a depth.
#[derive(Clone, Debug)]
pub struct FrameObject {
    /// The placed character.
    pub character_id: CharacterId,
    /// The depth slot the object occupies.
    pub depth: Depth,
    /// Character bounds projected through the placement matrix.
    pub bounds: Rectangle,
    /// The drawing matrix: the placement matrix with the character's
    /// top-left corner translated in, matching the local coordinate
    /// space shapes are materialized in.
    pub matrix: Matrix,
    /// The placement matrix exactly as the tag carried it.
    pub place_matrix: Matrix,
    /// Color adjustment from the place tag.
    pub color_transform: Option<ColorTransform>,
    /// When set, the object clips depths up to this value instead of
    /// painting.
    pub clip_depth: Option<Depth>,
    /// Instance name.
    pub name: Option<String>,
    /// Surface filters. Carried, not rendered.
    pub filters: Vec<Filter>,
    /// Blend mode. Carried, not rendered.
    pub blend_mode: BlendMode,
    /// Morph ratio, 0 to 65535.
    pub ratio: Option<u16>,
    /// Additional color adjustments accumulated while descending a sprite
    /// tree, applied after `color_transform` in order.
    pub color_transforms: Vec<ColorTransform>,
}

impl FrameObject {
    /// Returns every color adjustment in application order.
    pub fn all_color_transforms(&self) -> Vec<ColorTransform> {
        let mut all = Vec::with_capacity(self.color_transforms.len() + 1);
        if let Some(ct) = self.color_transform {
            all.push(ct);
        }
        all.extend_from_slice(&self.color_transforms);
        all
    }

    /// Returns the morph ratio mapped into `[0, 1]`.
    pub fn morph_ratio(&self) -> f64 {
        match self.ratio {
            Some(ratio) => ratio as f64 / 65535.0,
            None => 0.0,
        }
    }
}

/// One rendered state of a timeline.
#[derive(Clone, Debug, Default)]
pub struct Frame {
    /// The timeline bounds. Identical for every frame of a timeline.
    pub bounds: Rectangle,
    /// The visible objects, ordered by depth ascending.
    pub objects: Vec<FrameObject>,
    /// Bytecode blocks attached to the frame. Carried, never executed.
    pub actions: Vec<Vec<u8>>,
    /// The frame label, when one was declared.
    pub label: Option<String>,
}

impl Frame {
    /// Returns the object occupying `depth`, if any.
    pub fn object_at_depth(&self, depth: Depth) -> Option<&FrameObject> {
        self.objects.iter().find(|o| o.depth == depth)
    }
}

/// A replayed display list: the union bounds and one entry per frame.
#[derive(Clone, Debug)]
pub struct Timeline {
    /// Union bounds of every kept object.
    pub bounds: Rectangle,
    /// The frames, in `ShowFrame` order. Never empty.
    pub frames: Vec<Frame>,
}

impl Timeline {
    /// The sentinel returned when a timeline cannot be built and the
    /// error class is masked off: empty bounds, one object-less frame.
    pub fn empty() -> Timeline {
        Timeline {
            bounds: Rectangle::default(),
            frames: vec![Frame::default()],
        }
    }

    /// Returns the number of frames.
    pub fn frames_count(&self) -> usize {
        self.frames.len()
    }

    /// Finds the first frame declared with `label`.
    pub fn frame_by_label(&self, label: &str) -> Option<(usize, &Frame)> {
        self.frames
            .iter()
            .enumerate()
            .find(|(_, frame)| frame.label.as_deref() == Some(label))
    }

    /// Returns a copy with every frame rewritten to `bounds`.
    pub(crate) fn with_bounds(&self, bounds: Rectangle) -> Timeline {
        Timeline {
            bounds,
            frames: self
                .frames
                .iter()
                .map(|frame| Frame {
                    bounds,
                    ..frame.clone()
                })
                .collect(),
        }
    }
}

/// Objects and unions larger than this many twips in either dimension
/// (8192 pixels) are left out of the timeline bounds.
pub(crate) const MAX_BOUNDS: i32 = 163_840;

/// Outcome of resolving the character named by a place record.
enum Placed {
    Bounds(Rectangle),
    Undefined,
    SelfReference,
}

/// Replays a control-tag list into a [`Timeline`].
pub(crate) struct TimelineProcessor<'a> {
    extractor: &'a mut SwfExtractor,
    mask: ErrorMask,
    objects: BTreeMap<Depth, FrameObject>,
    frames: Vec<Frame>,
    actions: Vec<Vec<u8>>,
    label: Option<String>,
    union: Option<Rectangle>,
}

impl<'a> TimelineProcessor<'a> {
    pub fn process(extractor: &'a mut SwfExtractor, tags: &[Tag]) -> Result<Timeline, Error> {
        let mask = extractor.error_mask();
        let mut processor = TimelineProcessor {
            extractor,
            mask,
            objects: BTreeMap::new(),
            frames: Vec::new(),
            actions: Vec::new(),
            label: None,
            union: None,
        };

        for tag in tags {
            match tag {
                Tag::End => break,
                Tag::ShowFrame => processor.show_frame(),
                Tag::DoAction(data) => processor.actions.push(data.clone()),
                Tag::FrameLabel(label) => processor.label = Some(label.clone()),
                Tag::RemoveObject { depth, .. } => {
                    processor.objects.remove(depth);
                }
                Tag::PlaceObject(place) => processor.place(place)?,
                // Definitions, sounds and anything else are not
                // display-list records.
                _ => {}
            }
        }

        processor.finish()
    }

    fn show_frame(&mut self) {
        self.frames.push(Frame {
            bounds: Rectangle::default(),
            objects: self.objects.values().cloned().collect(),
            actions: std::mem::take(&mut self.actions),
            label: self.label.take(),
        });
    }

    /// Resolves the bounds a placement needs, distinguishing undefined
    /// ids from self-references, which are dropped rather than reported.
    fn resolve_placed(&mut self, id: CharacterId) -> Result<Placed, Error> {
        if self.extractor.is_materializing(id) {
            if self.mask.contains(ErrorMask::CIRCULAR_REFERENCE) {
                return Err(Error::CircularReference(id));
            }
            log::warn!("sprite {} is placed inside itself, dropped", id);
            return Ok(Placed::SelfReference);
        }
        match self.extractor.resolve_bounds(id)? {
            Some(bounds) => Ok(Placed::Bounds(bounds)),
            None => Ok(Placed::Undefined),
        }
    }

    fn place(&mut self, tag: &PlaceObject) -> Result<(), Error> {
        if !tag.is_move {
            let id = match tag.character_id {
                Some(id) => id,
                None => return self.invalid("a new placement carries no character id".into()),
            };
            let char_bounds = match self.resolve_placed(id)? {
                Placed::Bounds(bounds) => bounds,
                Placed::SelfReference => return Ok(()),
                Placed::Undefined => {
                    return self.invalid(format!("placed character {} is not defined", id));
                }
            };

            let place_matrix = tag.matrix.unwrap_or_default();
            let bounds = char_bounds.transform(&place_matrix);
            let object = FrameObject {
                character_id: id,
                depth: tag.depth,
                bounds,
                matrix: place_matrix.translate(char_bounds.x_min, char_bounds.y_min),
                place_matrix,
                color_transform: tag.color_transform,
                clip_depth: tag.clip_depth,
                name: tag.name.clone(),
                filters: tag.filters.clone().unwrap_or_default(),
                blend_mode: tag.blend_mode.unwrap_or_default(),
                ratio: tag.ratio,
                color_transforms: Vec::new(),
            };
            self.include_bounds(bounds);
            self.objects.insert(tag.depth, object);
            return Ok(());
        }

        if !self.objects.contains_key(&tag.depth) {
            return self.invalid(format!("modification of the empty depth {}", tag.depth));
        }

        if let Some(new_id) = tag.character_id {
            // Swap in the new character, redoing the translation dance
            // against its bounds.
            let place_matrix = match tag.matrix {
                Some(matrix) => matrix,
                None => self.objects[&tag.depth].place_matrix,
            };
            let char_bounds = match self.resolve_placed(new_id)? {
                Placed::Bounds(bounds) => bounds,
                Placed::SelfReference => return Ok(()),
                Placed::Undefined => {
                    return self.invalid(format!("placed character {} is not defined", new_id));
                }
            };
            let bounds = char_bounds.transform(&place_matrix);
            self.include_bounds(bounds);
            if let Some(object) = self.objects.get_mut(&tag.depth) {
                object.character_id = new_id;
                object.place_matrix = place_matrix;
                object.matrix = place_matrix.translate(char_bounds.x_min, char_bounds.y_min);
                object.bounds = bounds;
            }
        } else if let Some(place_matrix) = tag.matrix {
            let id = self.objects[&tag.depth].character_id;
            let char_bounds = match self.resolve_placed(id)? {
                Placed::Bounds(bounds) => bounds,
                Placed::SelfReference => return Ok(()),
                Placed::Undefined => {
                    return self.invalid(format!("placed character {} is not defined", id));
                }
            };
            let bounds = char_bounds.transform(&place_matrix);
            self.include_bounds(bounds);
            if let Some(object) = self.objects.get_mut(&tag.depth) {
                object.place_matrix = place_matrix;
                object.matrix = place_matrix.translate(char_bounds.x_min, char_bounds.y_min);
                object.bounds = bounds;
            }
        }

        if let Some(object) = self.objects.get_mut(&tag.depth) {
            if tag.color_transform.is_some() {
                object.color_transform = tag.color_transform;
            }
            if tag.ratio.is_some() {
                object.ratio = tag.ratio;
            }
            if tag.name.is_some() {
                object.name = tag.name.clone();
            }
            if tag.clip_depth.is_some() {
                object.clip_depth = tag.clip_depth;
            }
            if let Some(filters) = &tag.filters {
                object.filters = filters.clone();
            }
            if let Some(blend_mode) = tag.blend_mode {
                object.blend_mode = blend_mode;
            }
        }

        Ok(())
    }

    /// Grows the running union, leaving out oversized objects and any
    /// object whose inclusion would push the union itself past
    /// [`MAX_BOUNDS`].
    fn include_bounds(&mut self, bounds: Rectangle) {
        if bounds.width() > MAX_BOUNDS || bounds.height() > MAX_BOUNDS {
            return;
        }
        let candidate = match &self.union {
            Some(union) => union.union(&bounds),
            None => bounds,
        };
        if candidate.width() > MAX_BOUNDS || candidate.height() > MAX_BOUNDS {
            return;
        }
        self.union = Some(candidate);
    }

    fn invalid(&self, details: String) -> Result<(), Error> {
        if self.mask.contains(ErrorMask::UNPROCESSABLE_DATA) {
            Err(Error::InvalidData(details))
        } else {
            log::warn!("{}, skipped", details);
            Ok(())
        }
    }

    fn finish(self) -> Result<Timeline, Error> {
        if self.frames.is_empty() {
            if self.mask.contains(ErrorMask::UNPROCESSABLE_DATA) {
                return Err(Error::InvalidData("the timeline has no frames".into()));
            }
            log::warn!("the timeline has no frames, substituting an empty one");
            return Ok(Timeline::empty());
        }

        let bounds = self.union.unwrap_or_default();
        let mut frames = self.frames;
        for frame in &mut frames {
            frame.bounds = bounds;
        }
        Ok(Timeline { bounds, frames })
    }
}
