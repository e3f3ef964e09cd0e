// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/// An RGB color with an optional alpha component.
///
/// `alpha == None` denotes a fully opaque color whose SVG output carries
/// no opacity attribute at all. Tags that encode alpha explicitly produce
/// `Some(alpha)`, which may emit `opacity = alpha / 255`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    /// The red component value.
    pub red: u8,
    /// The green component value.
    pub green: u8,
    /// The blue component value.
    pub blue: u8,
    /// The alpha component value, when the defining tag stores one.
    pub alpha: Option<u8>,
}

impl Color {
    /// Creates an opaque color without a stored alpha channel.
    pub const fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Color { red, green, blue, alpha: None }
    }

    /// Creates a color with an explicit alpha channel.
    pub const fn rgba(red: u8, green: u8, blue: u8, alpha: u8) -> Self {
        Color { red, green, blue, alpha: Some(alpha) }
    }

    /// Returns the `#rrggbb` hex form used by SVG attributes.
    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.red, self.green, self.blue)
    }

    /// Returns the SVG opacity value, or `None` when the color is opaque.
    pub fn opacity(&self) -> Option<f64> {
        match self.alpha {
            Some(a) if a < 255 => Some(a as f64 / 255.0),
            _ => None,
        }
    }

    /// Linear blend towards `other`. A missing alpha is treated as 255.
    pub fn lerp(&self, other: &Color, ratio: f64) -> Color {
        let a = lerp_u8(self.alpha.unwrap_or(255), other.alpha.unwrap_or(255), ratio);
        Color {
            red: lerp_u8(self.red, other.red, ratio),
            green: lerp_u8(self.green, other.green, ratio),
            blue: lerp_u8(self.blue, other.blue, ratio),
            alpha: Some(a),
        }
    }

    /// Applies `transforms` in order, clamping to `[0, 255]` after each.
    pub fn transformed(&self, transforms: &[ColorTransform]) -> Color {
        let mut color = *self;
        for transform in transforms {
            color = transform.apply(color);
        }
        color
    }
}

fn lerp_u8(a: u8, b: u8, ratio: f64) -> u8 {
    (a as f64 + (b as f64 - a as f64) * ratio).round().clamp(0.0, 255.0) as u8
}

/// A per-channel multiply-then-add color adjustment.
///
/// Each stage clamps its result to `[0, 255]`, which is why composing two
/// transforms algebraically is not equivalent to applying them in
/// sequence. Callers keep an ordered list and fold it with
/// [`Color::transformed`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorTransform {
    /// Red multiplier.
    pub red_mult: f32,
    /// Green multiplier.
    pub green_mult: f32,
    /// Blue multiplier.
    pub blue_mult: f32,
    /// Alpha multiplier.
    pub alpha_mult: f32,
    /// Red additive term.
    pub red_add: i16,
    /// Green additive term.
    pub green_add: i16,
    /// Blue additive term.
    pub blue_add: i16,
    /// Alpha additive term.
    pub alpha_add: i16,
}

impl ColorTransform {
    /// The transform that leaves every color unchanged.
    pub const IDENTITY: ColorTransform = ColorTransform {
        red_mult: 1.0,
        green_mult: 1.0,
        blue_mult: 1.0,
        alpha_mult: 1.0,
        red_add: 0,
        green_add: 0,
        blue_add: 0,
        alpha_add: 0,
    };

    /// Creates a multiply-only transform.
    pub const fn multiply(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        ColorTransform {
            red_mult: red,
            green_mult: green,
            blue_mult: blue,
            alpha_mult: alpha,
            red_add: 0,
            green_add: 0,
            blue_add: 0,
            alpha_add: 0,
        }
    }

    /// Checks that the transform leaves colors unchanged.
    pub fn is_identity(&self) -> bool {
        *self == ColorTransform::IDENTITY
    }

    /// Applies the transform to a single color, clamping each channel.
    pub fn apply(&self, color: Color) -> Color {
        let touches_alpha = self.alpha_mult != 1.0 || self.alpha_add != 0;
        let alpha = if color.alpha.is_none() && !touches_alpha {
            None
        } else {
            Some(apply_channel(
                color.alpha.unwrap_or(255),
                self.alpha_mult,
                self.alpha_add,
            ))
        };

        Color {
            red: apply_channel(color.red, self.red_mult, self.red_add),
            green: apply_channel(color.green, self.green_mult, self.green_add),
            blue: apply_channel(color.blue, self.blue_mult, self.blue_add),
            alpha,
        }
    }
}

impl Default for ColorTransform {
    fn default() -> Self {
        ColorTransform::IDENTITY
    }
}

fn apply_channel(value: u8, mult: f32, add: i16) -> u8 {
    (value as f32 * mult + add as f32).round().clamp(0.0, 255.0) as u8
}
