// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The extraction facade.
//!
//! A [`SwfExtractor`] owns the parsed file and every cache built from it:
//! the per-category dictionaries, materialized shapes keyed by id,
//! morph shapes keyed by id and ratio, sprite timelines and the root
//! timeline. Everything is built on first access and dropped by
//! [`SwfExtractor::release`].
//!
//! Characters are addressed by id throughout; frame objects and nested
//! sprites never own their referents, which keeps self-referential
//! sprites from forming ownership cycles. Re-entrant timeline
//! materialization is caught with an in-flight id set.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::character::{Character, ImageCharacter, MorphShapeDef, ShapeDef, SpriteDef};
use crate::color::{Color, ColorTransform};
use crate::error::{Error, ErrorMask};
use crate::geom::{Matrix, Rectangle};
use crate::shape::{MorphShapeProcessor, Shape, ShapeProcessor};
use crate::tag::{CharacterId, Movie, Tag};
use crate::timeline::{Frame, Timeline, TimelineProcessor};
use crate::writer::{group_key, SvgCanvas};

/// Extraction settings.
#[derive(Clone, Debug)]
pub struct Options {
    /// Which error classes fail loudly. Defaults to all of them.
    pub error_mask: ErrorMask,
    /// Keep stroke widths below one pixel instead of clamping them.
    pub subpixel_stroke_width: bool,
    /// Byte budget consulted by
    /// [`SwfExtractor::release_if_over_budget`]. `None` disables the
    /// budget entirely.
    pub memory_limit: Option<usize>,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            error_mask: ErrorMask::default(),
            subpixel_stroke_width: false,
            memory_limit: None,
        }
    }
}

/// Extracts characters and timelines from a parsed file and renders
/// them to SVG.
///
/// An extractor is single-actor state: nothing in it is synchronized.
/// Front ends that want parallelism partition files across workers,
/// each owning its own extractor.
#[derive(Debug)]
pub struct SwfExtractor {
    movie: Movie,
    options: Options,

    shapes: Option<HashMap<CharacterId, ShapeDef>>,
    morph_shapes: Option<HashMap<CharacterId, MorphShapeDef>>,
    sprites: Option<HashMap<CharacterId, SpriteDef>>,
    images: Option<HashMap<CharacterId, ImageCharacter>>,
    exported: Option<HashMap<String, CharacterId>>,

    shape_cache: HashMap<CharacterId, Rc<Shape>>,
    morph_cache: HashMap<(CharacterId, String), Rc<Shape>>,
    sprite_timelines: HashMap<CharacterId, Rc<Timeline>>,
    root_timeline: Option<Rc<Timeline>>,
    in_flight: HashSet<CharacterId>,
}

impl SwfExtractor {
    /// Creates an extractor over a parsed file.
    pub fn new(movie: Movie, options: Options) -> SwfExtractor {
        SwfExtractor {
            movie,
            options,
            shapes: None,
            morph_shapes: None,
            sprites: None,
            images: None,
            exported: None,
            shape_cache: HashMap::new(),
            morph_cache: HashMap::new(),
            sprite_timelines: HashMap::new(),
            root_timeline: None,
            in_flight: HashSet::new(),
        }
    }

    /// Returns the declared display bounds.
    pub fn display_bounds(&self) -> Rectangle {
        self.movie.bounds
    }

    /// Returns the declared frame rate.
    pub fn frame_rate(&self) -> f32 {
        self.movie.frame_rate
    }

    /// Returns the declared root frame count.
    pub fn frame_count(&self) -> u16 {
        self.movie.frame_count
    }

    /// Returns the declared stage background color, if any.
    pub fn background_color(&self) -> Option<Color> {
        self.movie.tags.iter().find_map(|tag| match tag {
            Tag::SetBackgroundColor(color) => Some(*color),
            _ => None,
        })
    }

    pub(crate) fn error_mask(&self) -> ErrorMask {
        self.options.error_mask
    }

    /// Checks whether a sprite timeline is currently being materialized,
    /// which is how a self-referential placement is recognized.
    pub(crate) fn is_materializing(&self, id: CharacterId) -> bool {
        self.in_flight.contains(&id)
    }

    /// The shape dictionary. Built on first access.
    pub fn shapes(&mut self) -> &HashMap<CharacterId, ShapeDef> {
        if self.shapes.is_none() {
            let mut dictionary = HashMap::new();
            for tag in self.movie.tags.iter() {
                if let Tag::DefineShape(t) = tag {
                    if t.id != 0 {
                        dictionary.insert(t.id, ShapeDef { id: t.id, tag: Rc::clone(t) });
                    }
                }
            }
            self.shapes = Some(dictionary);
        }
        match &self.shapes {
            Some(dictionary) => dictionary,
            None => unreachable!(),
        }
    }

    /// The morph-shape dictionary. Built on first access.
    pub fn morph_shapes(&mut self) -> &HashMap<CharacterId, MorphShapeDef> {
        if self.morph_shapes.is_none() {
            let mut dictionary = HashMap::new();
            for tag in self.movie.tags.iter() {
                if let Tag::DefineMorphShape(t) = tag {
                    if t.id != 0 {
                        dictionary.insert(t.id, MorphShapeDef { id: t.id, tag: Rc::clone(t) });
                    }
                }
            }
            self.morph_shapes = Some(dictionary);
        }
        match &self.morph_shapes {
            Some(dictionary) => dictionary,
            None => unreachable!(),
        }
    }

    /// The sprite dictionary. Built on first access.
    pub fn sprites(&mut self) -> &HashMap<CharacterId, SpriteDef> {
        if self.sprites.is_none() {
            let mut dictionary = HashMap::new();
            for tag in self.movie.tags.iter() {
                if let Tag::DefineSprite(t) = tag {
                    if t.id != 0 {
                        dictionary.insert(t.id, SpriteDef { id: t.id, tag: Rc::clone(t) });
                    }
                }
            }
            self.sprites = Some(dictionary);
        }
        match &self.sprites {
            Some(dictionary) => dictionary,
            None => unreachable!(),
        }
    }

    /// The image dictionary: lossless images, table-sharing JPEGs and
    /// self-contained JPEGs, in that order of precedence. An id claimed
    /// by an earlier category is never overwritten by a later one.
    pub fn images(&mut self) -> &HashMap<CharacterId, ImageCharacter> {
        if self.images.is_none() {
            self.images = Some(scan_images(&self.movie.tags));
        }
        match &self.images {
            Some(dictionary) => dictionary,
            None => unreachable!(),
        }
    }

    /// The exported-name table, concatenated over every ExportAssets
    /// tag. The first mapping of a name wins.
    pub fn exported(&mut self) -> &HashMap<String, CharacterId> {
        if self.exported.is_none() {
            let mut names = HashMap::new();
            for tag in self.movie.tags.iter() {
                if let Tag::ExportAssets(assets) = tag {
                    for asset in assets {
                        names.entry(asset.name.clone()).or_insert(asset.id);
                    }
                }
            }
            self.exported = Some(names);
        }
        match &self.exported {
            Some(names) => names,
            None => unreachable!(),
        }
    }

    /// Resolves an exported name to its character id.
    pub fn by_name(&mut self, name: &str) -> Result<CharacterId, Error> {
        match self.exported().get(name) {
            Some(id) => Ok(*id),
            None => Err(Error::NameNotExported(name.to_string())),
        }
    }

    /// The union view over all dictionaries. Never fails: unknown ids
    /// come back as [`Character::Missing`]. When an id is defined in
    /// several categories the first of shapes, morph shapes, sprites and
    /// images wins.
    pub fn character(&mut self, id: CharacterId) -> Character {
        if let Some(def) = self.shapes().get(&id) {
            return Character::Shape(def.clone());
        }
        if let Some(def) = self.morph_shapes().get(&id) {
            return Character::MorphShape(def.clone());
        }
        if let Some(def) = self.sprites().get(&id) {
            return Character::Sprite(def.clone());
        }
        if let Some(def) = self.images().get(&id) {
            return Character::Image(def.clone());
        }
        Character::Missing(id)
    }

    /// Materializes the shape with the given id. Memoized.
    pub fn shape(&mut self, id: CharacterId) -> Result<Rc<Shape>, Error> {
        if let Some(shape) = self.shape_cache.get(&id) {
            return Ok(Rc::clone(shape));
        }

        let tag = match self.shapes().get(&id) {
            Some(def) => Rc::clone(&def.tag),
            None => {
                return Err(Error::InvalidData(format!(
                    "character {} is not a shape",
                    id
                )))
            }
        };

        self.images();
        let mask = self.options.error_mask;
        let shape = {
            let images = match &self.images {
                Some(dictionary) => dictionary,
                None => unreachable!(),
            };
            ShapeProcessor::new(images, mask).process(&tag)?
        };

        let shape = Rc::new(shape);
        self.shape_cache.insert(id, Rc::clone(&shape));
        Ok(shape)
    }

    /// Materializes the morph shape with the given id at a ratio in
    /// `[0, 1]`. Memoized per ratio, rounded to four decimals.
    pub fn morph_shape(&mut self, id: CharacterId, ratio: f64) -> Result<Rc<Shape>, Error> {
        let key = (id, format!("{:.4}", ratio.clamp(0.0, 1.0)));
        if let Some(shape) = self.morph_cache.get(&key) {
            return Ok(Rc::clone(shape));
        }

        let tag = match self.morph_shapes().get(&id) {
            Some(def) => Rc::clone(&def.tag),
            None => {
                return Err(Error::InvalidData(format!(
                    "character {} is not a morph shape",
                    id
                )))
            }
        };

        self.images();
        let mask = self.options.error_mask;
        let shape = {
            let images = match &self.images {
                Some(dictionary) => dictionary,
                None => unreachable!(),
            };
            MorphShapeProcessor::new(images, mask).process(&tag, ratio)?
        };

        let shape = Rc::new(shape);
        self.morph_cache.insert(key, Rc::clone(&shape));
        Ok(shape)
    }

    /// Materializes the timeline of the sprite with the given id.
    /// Memoized. A sprite that reaches itself while materializing either
    /// fails with [`Error::CircularReference`] or, with that class
    /// masked off, sees an empty timeline in place of itself.
    pub fn sprite_timeline(&mut self, id: CharacterId) -> Result<Rc<Timeline>, Error> {
        if let Some(timeline) = self.sprite_timelines.get(&id) {
            return Ok(Rc::clone(timeline));
        }

        if self.in_flight.contains(&id) {
            if self.options.error_mask.contains(ErrorMask::CIRCULAR_REFERENCE) {
                return Err(Error::CircularReference(id));
            }
            log::warn!("sprite {} references itself, substituting an empty timeline", id);
            return Ok(Rc::new(Timeline::empty()));
        }

        let tags = match self.sprites().get(&id) {
            Some(def) => Rc::clone(&def.tag.tags),
            None => {
                if self.options.error_mask.contains(ErrorMask::UNPROCESSABLE_DATA) {
                    return Err(Error::InvalidData(format!(
                        "character {} is not a sprite",
                        id
                    )));
                }
                log::warn!("character {} is not a sprite, substituting an empty timeline", id);
                return Ok(Rc::new(Timeline::empty()));
            }
        };

        self.in_flight.insert(id);
        let result = TimelineProcessor::process(self, &tags);
        self.in_flight.remove(&id);

        let timeline = Rc::new(result?);
        self.sprite_timelines.insert(id, Rc::clone(&timeline));
        Ok(timeline)
    }

    /// Builds the root timeline from the file's top-level display-list
    /// tags. Memoized. With `use_file_bounds` every frame is rewritten
    /// to the declared display bounds.
    pub fn timeline(&mut self, use_file_bounds: bool) -> Result<Rc<Timeline>, Error> {
        let timeline = match self.root_timeline.clone() {
            Some(timeline) => timeline,
            None => {
                let tags = Rc::clone(&self.movie.tags);
                let timeline = Rc::new(TimelineProcessor::process(self, &tags)?);
                self.root_timeline = Some(Rc::clone(&timeline));
                timeline
            }
        };

        if use_file_bounds {
            Ok(Rc::new(timeline.with_bounds(self.movie.bounds)))
        } else {
            Ok(timeline)
        }
    }

    /// Returns the bounds of any defined character, or `None` for an id
    /// nobody defined. Sprite bounds come from the materialized timeline.
    pub(crate) fn resolve_bounds(&mut self, id: CharacterId) -> Result<Option<Rectangle>, Error> {
        match self.character(id) {
            Character::Shape(def) => Ok(Some(def.bounds())),
            Character::MorphShape(def) => Ok(Some(def.bounds())),
            Character::Image(def) => Ok(Some(def.bounds())),
            Character::Sprite(def) => Ok(Some(self.sprite_timeline(def.id)?.bounds)),
            Character::Missing(_) => Ok(None),
        }
    }

    /// Returns the bounds of a character, empty for missing ids.
    pub fn character_bounds(&mut self, id: CharacterId) -> Result<Rectangle, Error> {
        Ok(self.resolve_bounds(id)?.unwrap_or_default())
    }

    /// Counts the frames a character contributes: one for the flat
    /// kinds, the timeline length for sprites. The recursive flavor
    /// takes the maximum over placed children as well, as an upper bound
    /// of animation length. Missing characters count zero.
    pub fn frames_count(&mut self, id: CharacterId, recursive: bool) -> Result<usize, Error> {
        let mut visited = HashSet::new();
        self.frames_count_inner(id, recursive, &mut visited)
    }

    fn frames_count_inner(
        &mut self,
        id: CharacterId,
        recursive: bool,
        visited: &mut HashSet<CharacterId>,
    ) -> Result<usize, Error> {
        match self.character(id) {
            Character::Missing(_) => Ok(0),
            Character::Sprite(def) => {
                if !visited.insert(def.id) {
                    return Ok(0);
                }
                let timeline = self.sprite_timeline(def.id)?;
                let mut count = timeline.frames_count();
                if recursive {
                    for frame in &timeline.frames {
                        for object in &frame.objects {
                            let nested =
                                self.frames_count_inner(object.character_id, true, visited)?;
                            count = count.max(nested);
                        }
                    }
                }
                Ok(count)
            }
            _ => Ok(1),
        }
    }

    /// Drops every cache. The next access rebuilds from the tag list.
    pub fn release(&mut self) {
        self.shapes = None;
        self.morph_shapes = None;
        self.sprites = None;
        self.images = None;
        self.exported = None;
        self.shape_cache.clear();
        self.morph_cache.clear();
        self.sprite_timelines.clear();
        self.root_timeline = None;
        self.in_flight.clear();
    }

    /// Releases the caches when `used` exceeds the byte budget. The
    /// explicit `limit` falls back to [`Options::memory_limit`]; with
    /// neither set this is a no-op. Returns whether a release happened.
    pub fn release_if_over_budget(&mut self, used: usize, limit: Option<usize>) -> bool {
        let limit = match limit.or(self.options.memory_limit) {
            Some(limit) => limit,
            None => return false,
        };
        if used > limit {
            self.release();
            return true;
        }
        false
    }

    /// Renders a character to a standalone SVG document, using the first
    /// frame for sprites. Missing characters yield an empty document.
    pub fn render_character(&mut self, id: CharacterId) -> Result<String, Error> {
        self.render_character_frame(id, 0)
    }

    /// Renders a character to a standalone SVG document at a frame.
    /// The frame wraps around for sprites and is ignored by the flat
    /// kinds.
    pub fn render_character_frame(&mut self, id: CharacterId, frame: usize) -> Result<String, Error> {
        let bounds = self.character_bounds(id)?;
        let mut canvas = SvgCanvas::new(bounds, self.options.subpixel_stroke_width);

        match self.character(id) {
            Character::Shape(def) => {
                let shape = self.shape(def.id)?;
                canvas.draw_shape(&shape, &Matrix::IDENTITY);
            }
            Character::MorphShape(def) => {
                let shape = self.morph_shape(def.id, 0.0)?;
                canvas.draw_shape(&shape, &Matrix::IDENTITY);
            }
            Character::Image(def) => {
                canvas.draw_image(&def.data, &Matrix::IDENTITY);
            }
            Character::Sprite(def) => {
                let timeline = self.sprite_timeline(def.id)?;
                let index = frame % timeline.frames_count().max(1);
                let base = Matrix::translation(-timeline.bounds.x_min, -timeline.bounds.y_min);
                if let Some(frame) = timeline.frames.get(index) {
                    self.draw_frame(&mut canvas, frame, index, &base, &[])?;
                }
            }
            Character::Missing(_) => {}
        }

        canvas.render()
    }

    /// Renders a morph shape at a ratio in `[0, 1]` to a standalone SVG
    /// document.
    pub fn render_morph_shape(&mut self, id: CharacterId, ratio: f64) -> Result<String, Error> {
        let shape = self.morph_shape(id, ratio)?;
        let mut canvas = SvgCanvas::new(shape.bounds(), self.options.subpixel_stroke_width);
        canvas.draw_shape(&shape, &Matrix::IDENTITY);
        canvas.render()
    }

    /// Renders one frame of the root timeline, using the file's declared
    /// display bounds.
    pub fn render_frame(&mut self, frame: usize) -> Result<String, Error> {
        let timeline = self.timeline(true)?;
        let current = match timeline.frames.get(frame) {
            Some(current) => current,
            None => return Err(Error::FrameOutOfRange(frame)),
        };

        let mut canvas = SvgCanvas::new(current.bounds, self.options.subpixel_stroke_width);
        let base = Matrix::translation(-current.bounds.x_min, -current.bounds.y_min);
        self.draw_frame(&mut canvas, current, frame, &base, &[])?;
        canvas.render()
    }

    /// Renders every frame of the root timeline to one SVG document per
    /// frame. Animation containers are assembled by external transcoders
    /// from these.
    pub fn render_timeline(&mut self) -> Result<Vec<String>, Error> {
        let timeline = self.timeline(true)?;
        let mut documents = Vec::with_capacity(timeline.frames.len());
        for index in 0..timeline.frames.len() {
            documents.push(self.render_frame(index)?);
        }
        Ok(documents)
    }

    /// Draws the objects of one frame, depth ascending. Clip layers mask
    /// rather than paint and are not emitted.
    fn draw_frame(
        &mut self,
        canvas: &mut SvgCanvas,
        frame: &Frame,
        frame_index: usize,
        base: &Matrix,
        inherited: &[ColorTransform],
    ) -> Result<(), Error> {
        for object in &frame.objects {
            if object.clip_depth.is_some() {
                continue;
            }

            let matrix = base.multiply(&object.matrix);
            // The object's own adjustment applies first, then whatever
            // the enclosing sprites contributed.
            let mut transforms = object.all_color_transforms();
            transforms.extend_from_slice(inherited);

            self.draw_object(canvas, object.character_id, object.morph_ratio(), frame_index, &matrix, &transforms)?;
        }
        Ok(())
    }

    fn draw_object(
        &mut self,
        canvas: &mut SvgCanvas,
        id: CharacterId,
        morph_ratio: f64,
        frame_index: usize,
        matrix: &Matrix,
        transforms: &[ColorTransform],
    ) -> Result<(), Error> {
        match self.character(id) {
            Character::Shape(def) => {
                let shape = self.shape(def.id)?;
                let shape = if transforms.is_empty() {
                    shape
                } else {
                    Rc::new(shape.transform_colors(transforms))
                };
                canvas.draw_shape(&shape, matrix);
            }
            Character::MorphShape(def) => {
                let shape = self.morph_shape(def.id, morph_ratio)?;
                let shape = if transforms.is_empty() {
                    shape
                } else {
                    Rc::new(shape.transform_colors(transforms))
                };
                canvas.draw_shape(&shape, matrix);
            }
            Character::Image(def) => {
                canvas.draw_image(&def.data, matrix);
            }
            Character::Sprite(def) => {
                let timeline = self.sprite_timeline(def.id)?;
                let index = frame_index % timeline.frames_count().max(1);
                let key = group_key(def.id, index, transforms);

                let group = match canvas.cached_group(key) {
                    Some(group) => group,
                    None => {
                        // Group content is local: the placing matrix
                        // translates the sprite's top-left corner back in.
                        let base =
                            Matrix::translation(-timeline.bounds.x_min, -timeline.bounds.y_min);
                        canvas.begin_group();
                        if let Some(frame) = timeline.frames.get(index) {
                            self.draw_frame(canvas, frame, index, &base, transforms)?;
                        }
                        canvas.end_group(key)
                    }
                };
                canvas.draw_use(&group, matrix);
            }
            Character::Missing(_) => {}
        }
        Ok(())
    }
}

/// Scans the image-definition categories in precedence order.
fn scan_images(tags: &[Tag]) -> HashMap<CharacterId, ImageCharacter> {
    let mut lossless = HashMap::new();
    let mut shared_jpeg = HashMap::new();
    let mut plain_jpeg = HashMap::new();
    let mut tables: &[u8] = &[];

    for tag in tags {
        match tag {
            Tag::DefineBitsLossless(t) if t.id != 0 => {
                lossless.insert(t.id, ImageCharacter::from_lossless(t));
            }
            Tag::JpegTables(data) => tables = data,
            Tag::DefineBits { id, data } if *id != 0 => {
                shared_jpeg.insert(*id, ImageCharacter::from_blob(*id, glue_jpeg(tables, data)));
            }
            Tag::DefineBitsJpeg2 { id, data } if *id != 0 => {
                plain_jpeg.insert(*id, ImageCharacter::from_blob(*id, data.clone()));
            }
            Tag::DefineBitsJpeg3(t) if t.id != 0 => {
                plain_jpeg.insert(t.id, ImageCharacter::from_jpeg3(t));
            }
            _ => {}
        }
    }

    let mut images = lossless;
    for (id, image) in shared_jpeg {
        images.entry(id).or_insert(image);
    }
    for (id, image) in plain_jpeg {
        images.entry(id).or_insert(image);
    }
    images
}

/// Splices the shared encoding tables in front of a table-less JPEG
/// scan, dropping the end-of-image and start-of-image markers that would
/// otherwise collide.
fn glue_jpeg(tables: &[u8], data: &[u8]) -> Vec<u8> {
    if tables.len() < 4 {
        return data.to_vec();
    }

    let mut blob = Vec::with_capacity(tables.len() + data.len());
    blob.extend_from_slice(&tables[..tables.len() - 2]);
    if data.starts_with(&[0xFF, 0xD8]) {
        blob.extend_from_slice(&data[2..]);
    } else {
        blob.extend_from_slice(data);
    }
    blob
}
