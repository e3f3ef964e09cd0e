// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use bitflags::bitflags;

use crate::tag::CharacterId;

bitflags! {
    /// Selects which error classes are raised.
    ///
    /// An error class that is *not* present in the mask is downgraded:
    /// the offending operation substitutes a sentinel (an empty timeline,
    /// a transparent fill, an empty image) or skips the record, and logs
    /// a warning instead of failing.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ErrorMask: u32 {
        /// Malformed tags coming out of the parser.
        const INVALID_TAG = 1 << 0;
        /// Trailing bytes after a fully parsed record.
        const EXTRA_DATA = 1 << 1;
        /// Structural violations found while building shapes or timelines.
        const UNPROCESSABLE_DATA = 1 << 2;
        /// Re-entrant sprite timeline materialization.
        const CIRCULAR_REFERENCE = 1 << 3;
    }
}

impl Default for ErrorMask {
    fn default() -> Self {
        ErrorMask::all()
    }
}

/// List of all errors.
#[derive(Debug)]
pub enum Error {
    /// A structural violation detected during shape or timeline construction.
    ///
    /// Unknown fill indices, a new placement without a character id,
    /// a modification of an empty depth, a missing `ShowFrame`,
    /// a bitmap reference that is not an image character.
    InvalidData(String),

    /// A sprite timeline referenced itself while being materialized.
    CircularReference(CharacterId),

    /// The requested export name is not published by the file.
    NameNotExported(String),

    /// The requested frame does not exist.
    FrameOutOfRange(usize),

    /// `render()` was called on an included (child) canvas.
    IncludedCanvas,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            Error::InvalidData(ref details) => {
                write!(f, "invalid data: {}", details)
            }
            Error::CircularReference(id) => {
                write!(f, "character {} references itself", id)
            }
            Error::NameNotExported(ref name) => {
                write!(f, "name '{}' is not exported", name)
            }
            Error::FrameOutOfRange(frame) => {
                write!(f, "frame {} is out of range", frame)
            }
            Error::IncludedCanvas => {
                write!(f, "an included canvas cannot be rendered on its own")
            }
        }
    }
}

impl std::error::Error for Error {}
