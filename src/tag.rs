// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The typed tag records consumed by the extractor.
//!
//! A byte-level SWF parser sits upstream and is expected to produce these
//! records; any tag source honoring the field contracts below works. Raster
//! payloads arrive as ready-to-embed blobs: decoding, alpha-plane merging
//! and lossless-to-PNG transcoding are codec concerns handled before the
//! records reach this crate.
//!
//! Definition tags that dictionaries keep a handle on are wrapped in [`Rc`]
//! so that the tag list stays cheaply re-scannable.

use std::rc::Rc;

use crate::color::{Color, ColorTransform};
use crate::geom::{Matrix, Point, Rectangle};

/// A character dictionary key.
pub type CharacterId = u16;

/// A display-list z-order slot.
pub type Depth = u16;

/// A parsed file: the header fields the extractor needs plus the tag list.
#[derive(Clone, Debug)]
pub struct Movie {
    /// Declared display bounds in twips.
    pub bounds: Rectangle,
    /// Declared playback speed in frames per second.
    pub frame_rate: f32,
    /// Declared number of frames of the root timeline.
    pub frame_count: u16,
    /// The top-level tag list. Shared so dictionaries can re-scan it.
    pub tags: Rc<Vec<Tag>>,
}

/// A single tag record.
#[derive(Clone, Debug, PartialEq)]
pub enum Tag {
    /// DefineShape versions 1 to 4.
    DefineShape(Rc<DefineShape>),
    /// DefineMorphShape versions 1 and 2.
    DefineMorphShape(Rc<DefineMorphShape>),
    /// DefineSprite with its nested control tags.
    DefineSprite(Rc<DefineSprite>),
    /// DefineBitsLossless versions 1 and 2.
    DefineBitsLossless(Rc<DefineBitsLossless>),
    /// DefineBits: a JPEG scan that borrows the tables from [`Tag::JpegTables`].
    DefineBits {
        /// The character id of the image.
        id: CharacterId,
        /// The JPEG scan data, without encoding tables.
        data: Vec<u8>,
    },
    /// The shared JPEG encoding tables used by every [`Tag::DefineBits`].
    JpegTables(Vec<u8>),
    /// DefineBitsJPEG2: a self-contained JPEG blob.
    DefineBitsJpeg2 {
        /// The character id of the image.
        id: CharacterId,
        /// The JPEG blob.
        data: Vec<u8>,
    },
    /// DefineBitsJPEG3 and DefineBitsJPEG4.
    DefineBitsJpeg3(Rc<DefineBitsJpeg3>),
    /// ExportAssets: name aliases for character ids.
    ExportAssets(Vec<ExportedAsset>),
    /// The declared background color of the stage.
    SetBackgroundColor(Color),
    /// Ends the current frame.
    ShowFrame,
    /// Labels the current frame.
    FrameLabel(String),
    /// ActionScript bytecode attached to the current frame.
    DoAction(Vec<u8>),
    /// PlaceObject versions 1 to 3.
    PlaceObject(Box<PlaceObject>),
    /// RemoveObject versions 1 and 2.
    RemoveObject {
        /// The depth to clear.
        depth: Depth,
        /// The id the version 1 tag repeats. Ignored.
        character_id: Option<CharacterId>,
    },
    /// Terminates a tag list.
    End,
    /// Any tag the extractor has no use for (sounds, fonts, text, ...).
    Unknown {
        /// The raw tag code.
        code: u16,
    },
}

impl Tag {
    /// Returns the character id a definition tag registers, if any.
    pub fn character_id(&self) -> Option<CharacterId> {
        match self {
            Tag::DefineShape(t) => Some(t.id),
            Tag::DefineMorphShape(t) => Some(t.id),
            Tag::DefineSprite(t) => Some(t.id),
            Tag::DefineBitsLossless(t) => Some(t.id),
            Tag::DefineBits { id, .. } => Some(*id),
            Tag::DefineBitsJpeg2 { id, .. } => Some(*id),
            Tag::DefineBitsJpeg3(t) => Some(t.id),
            _ => None,
        }
    }
}

/// A shape definition.
#[derive(Clone, Debug, PartialEq)]
pub struct DefineShape {
    /// Tag version, 1 to 4.
    pub version: u8,
    /// The character id.
    pub id: CharacterId,
    /// Declared shape bounds in twips.
    pub bounds: Rectangle,
    /// Initial fill and line style tables.
    pub styles: ShapeStyles,
    /// The edge and style-change records. The stream ends with the list;
    /// an explicit end record is consumed by the parser.
    pub records: Vec<ShapeRecord>,
}

/// Fill and line style tables active for a run of shape records.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ShapeStyles {
    /// Fill styles, referenced 1-based by style-change records.
    pub fill_styles: Vec<FillStyle>,
    /// Line styles, referenced 1-based by style-change records.
    pub line_styles: Vec<LineStyle>,
}

/// A single shape record.
#[derive(Clone, Debug, PartialEq)]
pub enum ShapeRecord {
    /// Selects styles, moves the pen, or swaps in new style tables.
    StyleChange(StyleChangeData),
    /// A straight edge, relative to the current position.
    StraightEdge {
        /// X delta in twips.
        delta_x: i32,
        /// Y delta in twips.
        delta_y: i32,
    },
    /// A quadratic edge, relative to the current position.
    CurvedEdge {
        /// Control point X delta in twips.
        control_delta_x: i32,
        /// Control point Y delta in twips.
        control_delta_y: i32,
        /// Anchor X delta from the control point, in twips.
        anchor_delta_x: i32,
        /// Anchor Y delta from the control point, in twips.
        anchor_delta_y: i32,
    },
}

/// Payload of a [`ShapeRecord::StyleChange`].
///
/// Style indices are 1-based into the active tables; index 0 clears the
/// style register.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StyleChangeData {
    /// Absolute pen position, when the record moves the pen.
    pub move_to: Option<Point>,
    /// New fill-style-0 (left fill) index.
    pub fill_style_0: Option<u32>,
    /// New fill-style-1 (right fill) index.
    pub fill_style_1: Option<u32>,
    /// New line-style index.
    pub line_style: Option<u32>,
    /// Replacement style tables (DefineShape2+).
    pub new_styles: Option<ShapeStyles>,
}

/// A fill style as stored in a definition tag.
#[derive(Clone, Debug, PartialEq)]
pub enum FillStyle {
    /// A solid color fill.
    Color(Color),
    /// A linear gradient fill.
    LinearGradient(Gradient),
    /// A radial gradient fill.
    RadialGradient(Gradient),
    /// A radial gradient with a focal point (DefineShape4).
    FocalGradient {
        /// The gradient.
        gradient: Gradient,
        /// Focal point offset along the gradient axis, in `[-1, 1]`.
        focal_point: f32,
    },
    /// A bitmap fill referencing an image character.
    Bitmap {
        /// The referenced image character.
        id: CharacterId,
        /// Maps bitmap pixels into the shape's twip space.
        matrix: Matrix,
        /// Bilinear smoothing requested.
        is_smoothed: bool,
        /// Tiled rather than clamped.
        is_repeating: bool,
    },
}

/// Gradient data shared by the linear and radial fill variants.
///
/// Gradients live in a fixed 32768×32768 twip square centered on the
/// origin; `matrix` maps that square into the shape.
#[derive(Clone, Debug, PartialEq)]
pub struct Gradient {
    /// Placement of the gradient square.
    pub matrix: Matrix,
    /// Behavior outside the gradient square.
    pub spread: GradientSpread,
    /// Color stops in record order.
    pub records: Vec<GradientRecord>,
}

/// Behavior of a gradient outside its defined square.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GradientSpread {
    /// Clamp to the edge colors.
    Pad,
    /// Mirror back and forth.
    Reflect,
    /// Tile.
    Repeat,
}

/// A single gradient color stop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GradientRecord {
    /// Stop position, 0 to 255.
    pub ratio: u8,
    /// Stop color.
    pub color: Color,
}

/// A line style as stored in a definition tag.
#[derive(Clone, Debug, PartialEq)]
pub struct LineStyle {
    /// Stroke width in twips.
    pub width: i32,
    /// Stroke color, used when `fill` is absent.
    pub color: Color,
    /// Fill painted along the stroke (LineStyle2).
    pub fill: Option<FillStyle>,
}

/// A morph shape definition: a start form, an end form, and paired styles.
#[derive(Clone, Debug, PartialEq)]
pub struct DefineMorphShape {
    /// Tag version, 1 or 2.
    pub version: u8,
    /// The character id.
    pub id: CharacterId,
    /// Declared bounds of the start form.
    pub start_bounds: Rectangle,
    /// Declared bounds of the end form.
    pub end_bounds: Rectangle,
    /// Paired fill styles.
    pub fill_styles: Vec<MorphFillStyle>,
    /// Paired line styles.
    pub line_styles: Vec<MorphLineStyle>,
    /// Edge records of the start form.
    pub start_records: Vec<ShapeRecord>,
    /// Edge records of the end form. Style changes here carry only pen
    /// moves; the style tables are shared with the start form.
    pub end_records: Vec<ShapeRecord>,
}

/// A fill style carrying both endpoints of the morph.
#[derive(Clone, Debug, PartialEq)]
pub enum MorphFillStyle {
    /// A solid fill blending between two colors.
    Color {
        /// Fill color of the start form.
        start: Color,
        /// Fill color of the end form.
        end: Color,
    },
    /// A linear gradient fill.
    LinearGradient(MorphGradient),
    /// A radial gradient fill.
    RadialGradient(MorphGradient),
    /// A radial gradient with interpolated focal points.
    FocalGradient {
        /// The gradient.
        gradient: MorphGradient,
        /// Focal point of the start form.
        start_focal_point: f32,
        /// Focal point of the end form.
        end_focal_point: f32,
    },
    /// A bitmap fill with interpolated placement.
    Bitmap {
        /// The referenced image character.
        id: CharacterId,
        /// Placement in the start form.
        start_matrix: Matrix,
        /// Placement in the end form.
        end_matrix: Matrix,
        /// Bilinear smoothing requested.
        is_smoothed: bool,
        /// Tiled rather than clamped.
        is_repeating: bool,
    },
}

/// Gradient data with paired start/end placements and stops.
#[derive(Clone, Debug, PartialEq)]
pub struct MorphGradient {
    /// Placement of the gradient square in the start form.
    pub start_matrix: Matrix,
    /// Placement of the gradient square in the end form.
    pub end_matrix: Matrix,
    /// Behavior outside the gradient square.
    pub spread: GradientSpread,
    /// Paired color stops.
    pub records: Vec<MorphGradientRecord>,
}

/// A gradient stop carrying both endpoints of the morph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MorphGradientRecord {
    /// Stop position in the start form.
    pub start_ratio: u8,
    /// Stop position in the end form.
    pub end_ratio: u8,
    /// Stop color in the start form.
    pub start_color: Color,
    /// Stop color in the end form.
    pub end_color: Color,
}

/// A line style carrying both endpoints of the morph.
#[derive(Clone, Debug, PartialEq)]
pub struct MorphLineStyle {
    /// Stroke width of the start form, in twips.
    pub start_width: i32,
    /// Stroke width of the end form, in twips.
    pub end_width: i32,
    /// Stroke color of the start form.
    pub start_color: Color,
    /// Stroke color of the end form.
    pub end_color: Color,
    /// Fill painted along the stroke (MorphLineStyle2).
    pub fill: Option<MorphFillStyle>,
}

/// A sprite definition: a reusable nested timeline.
#[derive(Clone, Debug, PartialEq)]
pub struct DefineSprite {
    /// The character id.
    pub id: CharacterId,
    /// Declared number of frames.
    pub frame_count: u16,
    /// The nested control tags. Shared so the timeline can be rebuilt
    /// after a cache release.
    pub tags: Rc<Vec<Tag>>,
}

/// A lossless image definition.
#[derive(Clone, Debug, PartialEq)]
pub struct DefineBitsLossless {
    /// Tag version, 1 or 2 (2 adds an alpha channel).
    pub version: u8,
    /// The character id.
    pub id: CharacterId,
    /// Pixel width.
    pub width: u16,
    /// Pixel height.
    pub height: u16,
    /// The pixel data, transcoded to PNG by the upstream codec.
    pub data: Vec<u8>,
}

/// A self-contained JPEG definition with an optional alpha plane.
#[derive(Clone, Debug, PartialEq)]
pub struct DefineBitsJpeg3 {
    /// Tag version, 3 or 4.
    pub version: u8,
    /// The character id.
    pub id: CharacterId,
    /// The image blob. JPEG in practice, but PNG and GIF blobs are legal
    /// here since SWF 8.
    pub data: Vec<u8>,
    /// The zlib-compressed alpha plane. Merging it into the image is a
    /// codec concern; this crate embeds `data` as-is.
    pub alpha_data: Vec<u8>,
}

/// A single name→id pair from an ExportAssets tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportedAsset {
    /// The exported character.
    pub id: CharacterId,
    /// The published name. Kept verbatim, even when it looks numeric.
    pub name: String,
}

/// A PlaceObject record: places a new character at a depth or modifies
/// the one already there.
#[derive(Clone, Debug, PartialEq)]
pub struct PlaceObject {
    /// Tag version, 1 to 3.
    pub version: u8,
    /// The depth slot addressed by the record.
    pub depth: Depth,
    /// The character to place, or the replacement on a move.
    pub character_id: Option<CharacterId>,
    /// Modifies the object already at `depth` instead of placing a new one.
    pub is_move: bool,
    /// Placement matrix.
    pub matrix: Option<Matrix>,
    /// Color adjustment applied to the object.
    pub color_transform: Option<ColorTransform>,
    /// Morph ratio, 0 to 65535.
    pub ratio: Option<u16>,
    /// Instance name.
    pub name: Option<String>,
    /// Turns the object into a clip mask covering depths up to this value.
    pub clip_depth: Option<Depth>,
    /// Surface filters (PlaceObject3).
    pub filters: Option<Vec<Filter>>,
    /// Blend mode (PlaceObject3).
    pub blend_mode: Option<BlendMode>,
}

impl PlaceObject {
    /// Creates a minimal version 2 placement of `id` at `depth`.
    pub fn place(depth: Depth, id: CharacterId) -> Self {
        PlaceObject {
            version: 2,
            depth,
            character_id: Some(id),
            is_move: false,
            matrix: None,
            color_transform: None,
            ratio: None,
            name: None,
            clip_depth: None,
            filters: None,
            blend_mode: None,
        }
    }

    /// Creates a minimal version 2 modification of the object at `depth`.
    pub fn modify(depth: Depth) -> Self {
        PlaceObject {
            character_id: None,
            is_move: true,
            ..PlaceObject::place(depth, 0)
        }
    }
}

/// A surface filter attached to a placed object.
///
/// Filters are carried through the frame model; the SVG writer does not
/// emit them.
#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    /// A drop shadow.
    DropShadow(DropShadowFilter),
    /// A box blur.
    Blur(BlurFilter),
    /// An inner or outer glow.
    Glow(GlowFilter),
    /// A 4×5 color matrix.
    ColorMatrix(ColorMatrixFilter),
}

/// Parameters of a drop-shadow filter.
#[derive(Clone, Debug, PartialEq)]
pub struct DropShadowFilter {
    /// Shadow color.
    pub color: Color,
    /// Horizontal blur radius in pixels.
    pub blur_x: f64,
    /// Vertical blur radius in pixels.
    pub blur_y: f64,
    /// Shadow angle in radians.
    pub angle: f64,
    /// Shadow distance in pixels.
    pub distance: f64,
    /// Shadow strength.
    pub strength: f32,
    /// Inner shadow.
    pub is_inner: bool,
    /// Knockout mode.
    pub is_knockout: bool,
}

/// Parameters of a blur filter.
#[derive(Clone, Debug, PartialEq)]
pub struct BlurFilter {
    /// Horizontal blur radius in pixels.
    pub blur_x: f64,
    /// Vertical blur radius in pixels.
    pub blur_y: f64,
    /// Number of blur passes.
    pub num_passes: u8,
}

/// Parameters of a glow filter.
#[derive(Clone, Debug, PartialEq)]
pub struct GlowFilter {
    /// Glow color.
    pub color: Color,
    /// Horizontal blur radius in pixels.
    pub blur_x: f64,
    /// Vertical blur radius in pixels.
    pub blur_y: f64,
    /// Glow strength.
    pub strength: f32,
    /// Inner glow.
    pub is_inner: bool,
    /// Knockout mode.
    pub is_knockout: bool,
}

/// Parameters of a color-matrix filter.
#[derive(Clone, Debug, PartialEq)]
pub struct ColorMatrixFilter {
    /// The 4×5 matrix in row-major order.
    pub matrix: [f64; 20],
}

/// Compositing mode of a placed object.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BlendMode {
    /// Default compositing.
    #[default]
    Normal,
    /// Renders the object into an offscreen layer first.
    Layer,
    /// Multiplies colors.
    Multiply,
    /// Screens colors.
    Screen,
    /// Keeps the lighter channel.
    Lighten,
    /// Keeps the darker channel.
    Darken,
    /// Absolute channel difference.
    Difference,
    /// Saturating add.
    Add,
    /// Saturating subtract.
    Subtract,
    /// Channel inversion.
    Invert,
    /// Copies the alpha channel.
    Alpha,
    /// Erases by alpha.
    Erase,
    /// Overlay compositing.
    Overlay,
    /// Hard-light compositing.
    HardLight,
}
