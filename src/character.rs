// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Dictionary entries.
//!
//! Every addressable definition in a file becomes one of the types below.
//! They are thin handles around the shared tag data; the heavy lifting
//! (shape materialization, timeline replay) is memoized by the extractor,
//! which owns all of the dictionaries.

use std::rc::Rc;

use crate::geom::Rectangle;
use crate::tag::{
    CharacterId, DefineBitsJpeg3, DefineBitsLossless, DefineMorphShape, DefineShape,
    DefineSprite,
};

/// A 1×1 transparent PNG, base64-encoded. Stands in for bitmap references
/// that do not resolve to an image character.
const EMPTY_PNG_BASE64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAAC0lEQVR42mNgAAIAAAUAAen63NgAAAAASUVORK5CYII=";

/// A shape definition handle.
#[derive(Clone, Debug)]
pub struct ShapeDef {
    /// The character id.
    pub id: CharacterId,
    /// The defining tag.
    pub tag: Rc<DefineShape>,
}

impl ShapeDef {
    /// Returns the declared bounds.
    pub fn bounds(&self) -> Rectangle {
        self.tag.bounds
    }
}

/// A morph-shape definition handle.
#[derive(Clone, Debug)]
pub struct MorphShapeDef {
    /// The character id.
    pub id: CharacterId,
    /// The defining tag.
    pub tag: Rc<DefineMorphShape>,
}

impl MorphShapeDef {
    /// Returns the declared bounds of the start form.
    pub fn bounds(&self) -> Rectangle {
        self.tag.start_bounds
    }
}

/// A sprite definition handle. The nested timeline is materialized
/// lazily by the extractor.
#[derive(Clone, Debug)]
pub struct SpriteDef {
    /// The character id.
    pub id: CharacterId,
    /// The defining tag.
    pub tag: Rc<DefineSprite>,
}

impl SpriteDef {
    /// Returns the declared frame count.
    pub fn frame_count(&self) -> u16 {
        self.tag.frame_count
    }
}

/// An image character: an embeddable blob plus its pixel size.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageCharacter {
    /// The character id.
    pub id: CharacterId,
    /// The blob.
    pub data: Rc<ImageData>,
}

impl ImageCharacter {
    /// Returns the image bounds in twips, anchored at the origin.
    pub fn bounds(&self) -> Rectangle {
        Rectangle::new(0, self.data.width as i32 * 20, 0, self.data.height as i32 * 20)
    }

    pub(crate) fn from_lossless(tag: &DefineBitsLossless) -> ImageCharacter {
        ImageCharacter {
            id: tag.id,
            data: Rc::new(ImageData {
                format: ImageFormat::Png,
                width: tag.width as u32,
                height: tag.height as u32,
                data: tag.data.clone(),
            }),
        }
    }

    pub(crate) fn from_blob(id: CharacterId, data: Vec<u8>) -> ImageCharacter {
        ImageCharacter {
            id,
            data: Rc::new(ImageData::from_blob(data)),
        }
    }

    pub(crate) fn from_jpeg3(tag: &DefineBitsJpeg3) -> ImageCharacter {
        ImageCharacter::from_blob(tag.id, tag.data.clone())
    }
}

/// An embeddable raster blob.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageData {
    /// The blob encoding.
    pub format: ImageFormat,
    /// Pixel width. Zero when the blob could not be sized.
    pub width: u32,
    /// Pixel height. Zero when the blob could not be sized.
    pub height: u32,
    /// The encoded bytes.
    pub data: Vec<u8>,
}

impl ImageData {
    /// Builds an entry from a self-describing blob, detecting its format
    /// and pixel size from the content.
    pub fn from_blob(data: Vec<u8>) -> ImageData {
        let format = match imagesize::image_type(&data) {
            Ok(imagesize::ImageType::Png) => ImageFormat::Png,
            Ok(imagesize::ImageType::Gif) => ImageFormat::Gif,
            // SWF image tags hold JPEG unless proven otherwise.
            _ => ImageFormat::Jpeg,
        };

        let (width, height) = match imagesize::blob_size(&data) {
            Ok(size) => (size.width as u32, size.height as u32),
            Err(_) => {
                log::warn!("could not detect the size of an embedded image");
                (0, 0)
            }
        };

        ImageData { format, width, height, data }
    }

    /// The 1×1 transparent placeholder substituted for unresolvable
    /// bitmap references.
    pub fn empty() -> ImageData {
        use base64::Engine;
        let data = base64::engine::general_purpose::STANDARD
            .decode(EMPTY_PNG_BASE64)
            .unwrap_or_default();
        ImageData {
            format: ImageFormat::Png,
            width: 1,
            height: 1,
            data,
        }
    }

    /// Returns the MIME subtype used in data URLs.
    pub fn mime(&self) -> &'static str {
        match self.format {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Gif => "gif",
        }
    }
}

/// Encoding of an [`ImageData`] blob.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageFormat {
    /// A PNG blob.
    Png,
    /// A JPEG blob.
    Jpeg,
    /// A GIF blob.
    Gif,
}

/// The union view over all dictionaries returned by
/// [`SwfExtractor::character`](crate::SwfExtractor::character).
///
/// A lookup never fails: ids nobody defined come back as
/// [`Character::Missing`], which draws nothing and has empty bounds.
#[derive(Clone, Debug)]
pub enum Character {
    /// A shape definition.
    Shape(ShapeDef),
    /// A morph-shape definition.
    MorphShape(MorphShapeDef),
    /// A sprite definition.
    Sprite(SpriteDef),
    /// An image definition.
    Image(ImageCharacter),
    /// The sentinel for an id with no definition.
    Missing(CharacterId),
}

impl Character {
    /// Returns the character id the lookup was made with.
    pub fn id(&self) -> CharacterId {
        match self {
            Character::Shape(d) => d.id,
            Character::MorphShape(d) => d.id,
            Character::Sprite(d) => d.id,
            Character::Image(d) => d.id,
            Character::Missing(id) => *id,
        }
    }

    /// Checks that the lookup found a definition.
    pub fn is_missing(&self) -> bool {
        matches!(self, Character::Missing(_))
    }
}
