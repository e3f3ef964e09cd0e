// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
`swfsvg` extracts the graphical characters of a Flash SWF file and
renders them to SVG.

The crate sits between a byte-level SWF parser and whatever consumes the
vector output. A parser hands over typed [tag records](tag); from those,
a [`SwfExtractor`] builds addressable dictionaries of shapes, morph
shapes, sprites and images, replays display lists into per-frame object
tables, and lazily materializes geometry:

- Shape records are resolved into styled subpaths with absolute
  coordinates, one path per style run.
- Morph shapes are interpolated at any ratio, pairing start and end
  edges and promoting straight segments to degenerate quadratics where
  the topologies disagree.
- Timelines replay place/remove records into depth-ordered frames that
  all share the timeline's final union bounds.
- SVG documents are assembled with a single shared `<defs>`: gradients,
  bitmap patterns, embedded rasters and reused sprite frames are each
  emitted once and referenced by stable ids.

Everything is built on first access and memoized;
[`SwfExtractor::release`] drops the caches so the same extractor can be
reused under memory pressure. A configurable [`ErrorMask`] decides which
malformed-input classes fail loudly and which degrade to sentinels.

What the crate deliberately does not do: parse SWF bytes, decode raster
codecs, execute ActionScript, or produce animated raster output. Frame
SVGs are handed to external transcoders for that.
*/

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod tag;

mod character;
mod color;
mod error;
mod extractor;
mod geom;
mod shape;
mod timeline;
mod writer;

pub use crate::character::{
    Character, ImageCharacter, ImageData, ImageFormat, MorphShapeDef, ShapeDef, SpriteDef,
};
pub use crate::color::{Color, ColorTransform};
pub use crate::error::{Error, ErrorMask};
pub use crate::extractor::{Options, SwfExtractor};
pub use crate::geom::{Matrix, Point, Rectangle, TWIPS_PER_PIXEL};
pub use crate::shape::{BitmapFill, Edge, Fill, Gradient, Path, PathStyle, Shape};
pub use crate::timeline::{Frame, FrameObject, Timeline};
pub use crate::writer::{Drawer, SvgCanvas};
