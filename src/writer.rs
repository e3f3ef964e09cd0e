// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! SVG output.
//!
//! Drawing builds an in-memory element tree rather than streaming,
//! because `<defs>` deduplication keeps mutating a growing table while
//! body content is appended. Serialization through [`xmlwriter`] happens
//! once, in [`SvgCanvas::render`].
//!
//! Twip coordinates are divided by 20 exactly once, here: path data,
//! stroke widths and the translation column of every matrix.

use std::collections::HashMap;
use std::hash::Hasher;

use siphasher::sip::SipHasher13;
use xmlwriter::XmlWriter;

use crate::character::ImageData;
use crate::color::{Color, ColorTransform};
use crate::error::Error;
use crate::geom::{Matrix, Point, Rectangle, TWIPS_PER_PIXEL};
use crate::shape::{BitmapFill, Fill, Gradient, Path, Shape};
use crate::tag::{CharacterId, GradientSpread};

/// Half-extent of the 32768×32768 twip gradient square, in pixels.
const GRADIENT_EXTENT: f64 = 819.2;

/// A drawing surface accepting materialized shapes.
pub trait Drawer {
    /// Draws a shape under the given transform.
    fn shape(&mut self, shape: &Shape, matrix: &Matrix);
}

/// An SVG element under construction.
#[derive(Clone, Debug)]
struct XmlElement {
    name: &'static str,
    attributes: Vec<(&'static str, String)>,
    children: Vec<XmlElement>,
}

impl XmlElement {
    fn new(name: &'static str) -> XmlElement {
        XmlElement {
            name,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    fn set(&mut self, name: &'static str, value: impl Into<String>) {
        self.attributes.push((name, value.into()));
    }

    fn push(&mut self, child: XmlElement) {
        self.children.push(child);
    }

    fn write(&self, xml: &mut XmlWriter) {
        xml.start_element(self.name);
        for (name, value) in &self.attributes {
            xml.write_attribute(name, value);
        }
        for child in &self.children {
            child.write(xml);
        }
        xml.end_element();
    }
}

/// A canvas assembling one SVG document.
///
/// Gradients, bitmap patterns, embedded rasters and sprite-frame groups
/// all land in a single `<defs>` keyed by a stable content hash, so a
/// reused definition is emitted once and referenced many times.
///
/// Nested sprite frames render through [`SvgCanvas::begin_group`] /
/// [`SvgCanvas::end_group`]: the content goes into a `<g>` inside
/// `<defs>` and the caller places `<use>` references. While such an
/// included scope is open the canvas cannot be rendered.
#[derive(Debug)]
pub struct SvgCanvas {
    bounds: Rectangle,
    subpixel_stroke_width: bool,
    body: Vec<XmlElement>,
    stack: Vec<Vec<XmlElement>>,
    defs: Vec<XmlElement>,
    def_ids: HashMap<u64, String>,
    image_ids: HashMap<u64, String>,
    group_ids: HashMap<u64, String>,
    next_object: u32,
}

impl SvgCanvas {
    /// Creates a canvas whose root `<svg>` is sized to `bounds`.
    pub fn new(bounds: Rectangle, subpixel_stroke_width: bool) -> SvgCanvas {
        SvgCanvas {
            bounds,
            subpixel_stroke_width,
            body: Vec::new(),
            stack: Vec::new(),
            defs: Vec::new(),
            def_ids: HashMap::new(),
            image_ids: HashMap::new(),
            group_ids: HashMap::new(),
            next_object: 0,
        }
    }

    /// Hands out the next `object-N` id.
    pub fn next_object_id(&mut self) -> String {
        let id = format!("object-{}", self.next_object);
        self.next_object += 1;
        id
    }

    fn target(&mut self) -> &mut Vec<XmlElement> {
        match self.stack.last_mut() {
            Some(target) => target,
            None => &mut self.body,
        }
    }

    /// Draws a shape as a `<g>` of styled `<path>` elements.
    pub fn draw_shape(&mut self, shape: &Shape, matrix: &Matrix) {
        let mut group = XmlElement::new("g");
        group.set("transform", transform_value(matrix));
        for path in &shape.paths {
            let element = self.path_element(path);
            group.push(element);
        }
        self.target().push(group);
    }

    /// Draws an image under the given transform.
    pub fn draw_image(&mut self, image: &ImageData, matrix: &Matrix) {
        let mut group = XmlElement::new("g");
        group.set("transform", transform_value(matrix));
        let element = self.image_element(image);
        group.push(element);
        self.target().push(group);
    }

    /// Places a `<use>` reference to a previously defined group.
    pub fn draw_use(&mut self, id: &str, matrix: &Matrix) {
        let mut element = XmlElement::new("use");
        element.set("xlink:href", format!("#{}", id));
        element.set("transform", transform_value(matrix));
        self.target().push(element);
    }

    /// Returns the id of an already rendered group, if any.
    pub(crate) fn cached_group(&self, key: u64) -> Option<String> {
        self.group_ids.get(&key).cloned()
    }

    /// Opens an included scope: subsequent draws are collected for a
    /// reusable `<defs>` group instead of the document body.
    pub(crate) fn begin_group(&mut self) {
        self.stack.push(Vec::new());
    }

    /// Closes the innermost included scope, wraps it into an id-carrying
    /// `<g>` inside `<defs>`, and returns that id.
    pub(crate) fn end_group(&mut self, key: u64) -> String {
        let children = self.stack.pop().unwrap_or_default();
        let id = self.next_object_id();
        let mut group = XmlElement::new("g");
        group.set("id", id.clone());
        group.children = children;
        self.defs.push(group);
        self.group_ids.insert(key, id.clone());
        id
    }

    /// Serializes the document.
    ///
    /// Fails with [`Error::IncludedCanvas`] while an included scope is
    /// still open.
    pub fn render(self) -> Result<String, Error> {
        if !self.stack.is_empty() {
            return Err(Error::IncludedCanvas);
        }

        let mut xml = XmlWriter::new(xmlwriter::Options::default());
        xml.start_element("svg");
        xml.write_attribute("xmlns", "http://www.w3.org/2000/svg");
        xml.write_attribute("xmlns:xlink", "http://www.w3.org/1999/xlink");
        xml.write_attribute(
            "width",
            &format!("{}px", fmt_num(self.bounds.width() as f64 / TWIPS_PER_PIXEL)),
        );
        xml.write_attribute(
            "height",
            &format!("{}px", fmt_num(self.bounds.height() as f64 / TWIPS_PER_PIXEL)),
        );

        if !self.defs.is_empty() {
            xml.start_element("defs");
            for def in &self.defs {
                def.write(&mut xml);
            }
            xml.end_element();
        }

        for element in &self.body {
            element.write(&mut xml);
        }

        Ok(xml.end_document())
    }

    fn path_element(&mut self, path: &Path) -> XmlElement {
        let mut element = XmlElement::new("path");

        match &path.style.fill {
            Some(fill) => {
                let paint = self.paint(fill);
                element.set("fill", paint.value);
                if let Some(opacity) = paint.opacity {
                    element.set("fill-opacity", fmt_num(opacity));
                }
                element.set("fill-rule", "evenodd");
            }
            None => element.set("fill", "none"),
        }

        if let Some(width) = path.style.line_width {
            if let Some(fill) = &path.style.line_fill {
                let paint = self.paint(fill);
                element.set("stroke", paint.value);
                if let Some(opacity) = paint.opacity {
                    element.set("stroke-opacity", fmt_num(opacity));
                }
            } else if let Some(color) = path.style.line_color {
                element.set("stroke", color.hex());
                if let Some(opacity) = color.opacity() {
                    element.set("stroke-opacity", fmt_num(opacity));
                }
            }

            let mut stroke_width = width as f64 / TWIPS_PER_PIXEL;
            if !self.subpixel_stroke_width && stroke_width < 1.0 {
                stroke_width = 1.0;
                element.set("vector-effect", "non-scaling-stroke");
            }
            element.set("stroke-width", fmt_num(stroke_width));
            element.set("stroke-linecap", "round");
            element.set("stroke-linejoin", "round");
        }

        element.set("d", path_data(path));
        element
    }

    fn paint(&mut self, fill: &Fill) -> Paint {
        match fill {
            Fill::Solid(color) => Paint {
                value: color.hex(),
                opacity: color.opacity(),
            },
            Fill::Linear(gradient) => Paint {
                value: format!("url(#{})", self.gradient_id(gradient, true)),
                opacity: None,
            },
            Fill::Radial(gradient) => Paint {
                value: format!("url(#{})", self.gradient_id(gradient, false)),
                opacity: None,
            },
            Fill::Bitmap(bitmap) => Paint {
                value: format!("url(#{})", self.pattern_id(bitmap)),
                opacity: None,
            },
        }
    }

    /// Emits a gradient definition once and returns its id.
    fn gradient_id(&mut self, gradient: &Gradient, linear: bool) -> String {
        let hash = hash_gradient(gradient, linear);
        if let Some(id) = self.def_ids.get(&hash) {
            return id.clone();
        }

        let id = format!("gradient-{:016x}", hash);
        let mut element = XmlElement::new(if linear {
            "linearGradient"
        } else {
            "radialGradient"
        });
        element.set("id", id.clone());
        element.set("gradientUnits", "userSpaceOnUse");
        if linear {
            element.set("x1", fmt_num(-GRADIENT_EXTENT));
            element.set("x2", fmt_num(GRADIENT_EXTENT));
        } else {
            element.set("cx", "0");
            element.set("cy", "0");
            element.set("r", fmt_num(GRADIENT_EXTENT));
            if let Some(focal) = gradient.focal_point {
                element.set("fx", "0");
                element.set("fy", fmt_num(focal as f64 * GRADIENT_EXTENT));
            }
        }
        element.set("gradientTransform", transform_value(&gradient.matrix));
        match gradient.spread {
            GradientSpread::Pad => {}
            GradientSpread::Reflect => element.set("spreadMethod", "reflect"),
            GradientSpread::Repeat => element.set("spreadMethod", "repeat"),
        }

        for record in &gradient.records {
            let mut stop = XmlElement::new("stop");
            stop.set("offset", fmt_num(record.ratio as f64 / 255.0));
            stop.set("stop-color", record.color.hex());
            if let Some(opacity) = record.color.opacity() {
                stop.set("stop-opacity", fmt_num(opacity));
            }
            element.push(stop);
        }

        self.defs.push(element);
        self.def_ids.insert(hash, id.clone());
        id
    }

    /// Emits a bitmap pattern definition once and returns its id.
    fn pattern_id(&mut self, bitmap: &BitmapFill) -> String {
        let hash = hash_bitmap_fill(bitmap);
        if let Some(id) = self.def_ids.get(&hash) {
            return id.clone();
        }

        let id = format!("pattern-{:016x}", hash);
        let mut element = XmlElement::new("pattern");
        element.set("id", id.clone());
        element.set("patternUnits", "userSpaceOnUse");
        element.set("width", bitmap.image.width.to_string());
        element.set("height", bitmap.image.height.to_string());
        element.set(
            "viewBox",
            format!("0 0 {} {}", bitmap.image.width, bitmap.image.height),
        );
        // The fill matrix maps bitmap pixels into twip space; fold in the
        // twip-to-pixel scale so pattern content stays in pixels.
        element.set("patternTransform", pattern_transform_value(&bitmap.matrix));
        if !bitmap.is_smoothed {
            element.set("image-rendering", "optimizeSpeed");
        }

        let image = self.image_element(&bitmap.image);
        element.push(image);

        self.defs.push(element);
        self.def_ids.insert(hash, id.clone());
        id
    }

    /// Returns an `<image>` carrying the blob on first use, or a `<use>`
    /// referencing the already embedded copy.
    fn image_element(&mut self, image: &ImageData) -> XmlElement {
        let hash = hash_bytes(&image.data);
        if let Some(id) = self.image_ids.get(&hash) {
            let mut element = XmlElement::new("use");
            element.set("xlink:href", format!("#{}", id));
            return element;
        }

        let id = format!("image-{:016x}", hash);
        let mut element = XmlElement::new("image");
        element.set("id", id.clone());
        element.set("width", image.width.to_string());
        element.set("height", image.height.to_string());
        element.set("xlink:href", data_url(image));
        self.image_ids.insert(hash, id);
        element
    }
}

impl Drawer for SvgCanvas {
    fn shape(&mut self, shape: &Shape, matrix: &Matrix) {
        self.draw_shape(shape, matrix);
    }
}

struct Paint {
    value: String,
    opacity: Option<f64>,
}

fn data_url(image: &ImageData) -> String {
    use base64::Engine;
    format!(
        "data:image/{};base64,{}",
        image.mime(),
        base64::engine::general_purpose::STANDARD.encode(&image.data)
    )
}

/// Builds the `d` attribute. Coordinates leave twip space here.
fn path_data(path: &Path) -> String {
    let mut data = String::new();
    let mut cur: Option<Point> = None;

    for edge in path.drawing_edges() {
        let from = edge.from();
        if cur != Some(from) {
            push_command(&mut data, "M", &[from]);
        }
        match edge {
            crate::shape::Edge::Straight { to, .. } => push_command(&mut data, "L", &[to]),
            crate::shape::Edge::Curved { control, to, .. } => {
                push_command(&mut data, "Q", &[control, to])
            }
        }
        cur = Some(edge.to());
    }

    data
}

fn push_command(data: &mut String, command: &str, points: &[Point]) {
    if !data.is_empty() {
        data.push(' ');
    }
    data.push_str(command);
    for point in points {
        data.push(' ');
        data.push_str(&fmt_num(point.x as f64 / TWIPS_PER_PIXEL));
        data.push(' ');
        data.push_str(&fmt_num(point.y as f64 / TWIPS_PER_PIXEL));
    }
}

/// Formats a matrix for `transform` attributes: the linear part is
/// unitless, the translation column leaves twip space.
pub(crate) fn transform_value(matrix: &Matrix) -> String {
    format!(
        "matrix({}, {}, {}, {}, {}, {})",
        fmt_num(matrix.scale_x as f64),
        fmt_num(matrix.rotate_skew_0 as f64),
        fmt_num(matrix.rotate_skew_1 as f64),
        fmt_num(matrix.scale_y as f64),
        fmt_num(matrix.translate_x as f64 / TWIPS_PER_PIXEL),
        fmt_num(matrix.translate_y as f64 / TWIPS_PER_PIXEL),
    )
}

/// Formats a bitmap fill matrix: every component is scaled by 1/20 so the
/// pattern maps pixel content straight into pixel space.
fn pattern_transform_value(matrix: &Matrix) -> String {
    format!(
        "matrix({}, {}, {}, {}, {}, {})",
        fmt_num(matrix.scale_x as f64 / TWIPS_PER_PIXEL),
        fmt_num(matrix.rotate_skew_0 as f64 / TWIPS_PER_PIXEL),
        fmt_num(matrix.rotate_skew_1 as f64 / TWIPS_PER_PIXEL),
        fmt_num(matrix.scale_y as f64 / TWIPS_PER_PIXEL),
        fmt_num(matrix.translate_x as f64 / TWIPS_PER_PIXEL),
        fmt_num(matrix.translate_y as f64 / TWIPS_PER_PIXEL),
    )
}

fn fmt_num(value: f64) -> String {
    if value.fract() == 0.0 {
        return format!("{}", value as i64);
    }

    // Round before printing to avoid artifacts like 29.999999999999996.
    let rounded = (value * 100_000_000_000.0).round() / 100_000_000_000.0;
    format!("{}", rounded)
}

fn hash_gradient(gradient: &Gradient, linear: bool) -> u64 {
    let mut hasher = SipHasher13::new();
    hasher.write_u8(if linear { 1 } else { 2 });
    hash_matrix(&mut hasher, &gradient.matrix);
    hasher.write_u8(match gradient.spread {
        GradientSpread::Pad => 0,
        GradientSpread::Reflect => 1,
        GradientSpread::Repeat => 2,
    });
    for record in &gradient.records {
        hasher.write_u8(record.ratio);
        hash_color(&mut hasher, &record.color);
    }
    if let Some(focal) = gradient.focal_point {
        hasher.write_u32(focal.to_bits());
    }
    hasher.finish()
}

fn hash_bitmap_fill(bitmap: &BitmapFill) -> u64 {
    let mut hasher = SipHasher13::new();
    hasher.write_u8(3);
    hasher.write_u64(hash_bytes(&bitmap.image.data));
    hash_matrix(&mut hasher, &bitmap.matrix);
    hasher.write_u8(bitmap.is_smoothed as u8);
    hasher.write_u8(bitmap.is_repeating as u8);
    hasher.finish()
}

fn hash_bytes(data: &[u8]) -> u64 {
    let mut hasher = SipHasher13::new();
    hasher.write(data);
    hasher.finish()
}

/// Fingerprints a sprite frame rendering: the character, the frame and
/// every color adjustment that reaches it.
pub(crate) fn group_key(
    id: CharacterId,
    frame: usize,
    transforms: &[ColorTransform],
) -> u64 {
    let mut hasher = SipHasher13::new();
    hasher.write_u16(id);
    hasher.write_usize(frame);
    for ct in transforms {
        hasher.write_u32(ct.red_mult.to_bits());
        hasher.write_u32(ct.green_mult.to_bits());
        hasher.write_u32(ct.blue_mult.to_bits());
        hasher.write_u32(ct.alpha_mult.to_bits());
        hasher.write_i16(ct.red_add);
        hasher.write_i16(ct.green_add);
        hasher.write_i16(ct.blue_add);
        hasher.write_i16(ct.alpha_add);
    }
    hasher.finish()
}

fn hash_matrix(hasher: &mut SipHasher13, matrix: &Matrix) {
    hasher.write_u32(matrix.scale_x.to_bits());
    hasher.write_u32(matrix.rotate_skew_0.to_bits());
    hasher.write_u32(matrix.rotate_skew_1.to_bits());
    hasher.write_u32(matrix.scale_y.to_bits());
    hasher.write_i32(matrix.translate_x);
    hasher.write_i32(matrix.translate_y);
}

fn hash_color(hasher: &mut SipHasher13, color: &Color) {
    hasher.write_u8(color.red);
    hasher.write_u8(color.green);
    hasher.write_u8(color.blue);
    hasher.write_u8(color.alpha.unwrap_or(255));
}
