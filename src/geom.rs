// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Twip-space geometry.
//!
//! All coordinates are twentieths of a pixel (twips) stored as signed
//! integers. Division by 20 happens once, at SVG writing time.

/// Number of twips in a pixel.
pub const TWIPS_PER_PIXEL: f64 = 20.0;

/// A 2D point in twips.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Point {
    /// Position along the X-axis.
    pub x: i32,

    /// Position along the Y-axis.
    pub y: i32,
}

impl Point {
    /// Creates a new point.
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Point { x, y }
    }
}

/// An axis-aligned rectangle in twips.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rectangle {
    /// The minimum x-position of the rectangle.
    pub x_min: i32,
    /// The maximum x-position of the rectangle.
    pub x_max: i32,
    /// The minimum y-position of the rectangle.
    pub y_min: i32,
    /// The maximum y-position of the rectangle.
    pub y_max: i32,
}

impl Rectangle {
    /// Creates a new rectangle from its edges.
    pub const fn new(x_min: i32, x_max: i32, y_min: i32, y_max: i32) -> Self {
        Rectangle { x_min, x_max, y_min, y_max }
    }

    /// Returns the rectangle width.
    #[inline]
    pub fn width(&self) -> i32 {
        self.x_max - self.x_min
    }

    /// Returns the rectangle height.
    #[inline]
    pub fn height(&self) -> i32 {
        self.y_max - self.y_min
    }

    /// Checks that the rectangle encloses no area.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.x_max <= self.x_min || self.y_max <= self.y_min
    }

    /// Returns the smallest rectangle enclosing both rectangles.
    pub fn union(&self, other: &Rectangle) -> Rectangle {
        Rectangle {
            x_min: self.x_min.min(other.x_min),
            x_max: self.x_max.max(other.x_max),
            y_min: self.y_min.min(other.y_min),
            y_max: self.y_max.max(other.y_max),
        }
    }

    /// Returns the axis-aligned bounding box of the four corners
    /// projected through `matrix`.
    pub fn transform(&self, matrix: &Matrix) -> Rectangle {
        let corners = [
            matrix.apply(self.x_min as f64, self.y_min as f64),
            matrix.apply(self.x_max as f64, self.y_min as f64),
            matrix.apply(self.x_min as f64, self.y_max as f64),
            matrix.apply(self.x_max as f64, self.y_max as f64),
        ];

        let mut x_min = f64::INFINITY;
        let mut x_max = f64::NEG_INFINITY;
        let mut y_min = f64::INFINITY;
        let mut y_max = f64::NEG_INFINITY;
        for (x, y) in corners {
            x_min = x_min.min(x);
            x_max = x_max.max(x);
            y_min = y_min.min(y);
            y_max = y_max.max(y);
        }

        Rectangle {
            x_min: x_min.round() as i32,
            x_max: x_max.round() as i32,
            y_min: y_min.round() as i32,
            y_max: y_max.round() as i32,
        }
    }
}

/// A 2×3 affine transformation matrix.
///
/// Maps a point as `x' = scale_x·x + rotate_skew_1·y + translate_x`,
/// `y' = rotate_skew_0·x + scale_y·y + translate_y`.
/// Translation is in twips, the linear part is unitless.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Matrix {
    /// Scale along the X-axis. The `a` component of an SVG matrix.
    pub scale_x: f32,
    /// First rotate/skew term. The `b` component of an SVG matrix.
    pub rotate_skew_0: f32,
    /// Second rotate/skew term. The `c` component of an SVG matrix.
    pub rotate_skew_1: f32,
    /// Scale along the Y-axis. The `d` component of an SVG matrix.
    pub scale_y: f32,
    /// Translation along the X-axis in twips.
    pub translate_x: i32,
    /// Translation along the Y-axis in twips.
    pub translate_y: i32,
}

impl Matrix {
    /// The identity matrix.
    pub const IDENTITY: Matrix = Matrix {
        scale_x: 1.0,
        rotate_skew_0: 0.0,
        rotate_skew_1: 0.0,
        scale_y: 1.0,
        translate_x: 0,
        translate_y: 0,
    };

    /// Creates a pure translation matrix.
    pub const fn translation(x: i32, y: i32) -> Matrix {
        Matrix {
            scale_x: 1.0,
            rotate_skew_0: 0.0,
            rotate_skew_1: 0.0,
            scale_y: 1.0,
            translate_x: x,
            translate_y: y,
        }
    }

    /// Composes a translation on the right: `self · T(dx, dy)`.
    pub fn translate(&self, dx: i32, dy: i32) -> Matrix {
        let tx = self.scale_x as f64 * dx as f64 + self.rotate_skew_1 as f64 * dy as f64;
        let ty = self.rotate_skew_0 as f64 * dx as f64 + self.scale_y as f64 * dy as f64;
        Matrix {
            translate_x: self.translate_x + tx.round() as i32,
            translate_y: self.translate_y + ty.round() as i32,
            ..*self
        }
    }

    /// Composes two matrices: `self · other`.
    pub fn multiply(&self, other: &Matrix) -> Matrix {
        let a = self.scale_x as f64;
        let b = self.rotate_skew_0 as f64;
        let c = self.rotate_skew_1 as f64;
        let d = self.scale_y as f64;

        let oa = other.scale_x as f64;
        let ob = other.rotate_skew_0 as f64;
        let oc = other.rotate_skew_1 as f64;
        let od = other.scale_y as f64;

        Matrix {
            scale_x: (a * oa + c * ob) as f32,
            rotate_skew_0: (b * oa + d * ob) as f32,
            rotate_skew_1: (a * oc + c * od) as f32,
            scale_y: (b * oc + d * od) as f32,
            translate_x: self.translate_x
                + (a * other.translate_x as f64 + c * other.translate_y as f64).round() as i32,
            translate_y: self.translate_y
                + (b * other.translate_x as f64 + d * other.translate_y as f64).round() as i32,
        }
    }

    /// Maps a point through the matrix.
    #[inline]
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.scale_x as f64 * x + self.rotate_skew_1 as f64 * y + self.translate_x as f64,
            self.rotate_skew_0 as f64 * x + self.scale_y as f64 * y + self.translate_y as f64,
        )
    }

    /// Checks that this is the identity matrix.
    pub fn is_identity(&self) -> bool {
        *self == Matrix::IDENTITY
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Matrix::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rectangle_union() {
        let a = Rectangle::new(0, 100, 0, 50);
        let b = Rectangle::new(-20, 40, 30, 90);
        assert_eq!(a.union(&b), Rectangle::new(-20, 100, 0, 90));
    }

    #[test]
    fn rectangle_transform_translates() {
        let r = Rectangle::new(0, 200, 0, 100);
        let m = Matrix::translation(2000, -40);
        assert_eq!(r.transform(&m), Rectangle::new(2000, 2200, -40, 60));
    }

    #[test]
    fn rectangle_transform_rotation_grows_bbox() {
        // 90 degrees clockwise.
        let r = Rectangle::new(0, 200, 0, 100);
        let m = Matrix {
            scale_x: 0.0,
            rotate_skew_0: 1.0,
            rotate_skew_1: -1.0,
            scale_y: 0.0,
            translate_x: 0,
            translate_y: 0,
        };
        assert_eq!(r.transform(&m), Rectangle::new(-100, 0, 0, 200));
    }

    #[test]
    fn matrix_translate_composes_on_the_right() {
        let m = Matrix {
            scale_x: 2.0,
            ..Matrix::IDENTITY
        };
        let t = m.translate(10, 20);
        assert_eq!(t.translate_x, 20);
        assert_eq!(t.translate_y, 20);
    }

    #[test]
    fn matrix_multiply_identity() {
        let m = Matrix {
            scale_x: 2.0,
            rotate_skew_0: 0.5,
            rotate_skew_1: -0.5,
            scale_y: 3.0,
            translate_x: 7,
            translate_y: -7,
        };
        assert_eq!(m.multiply(&Matrix::IDENTITY), m);
        assert_eq!(Matrix::IDENTITY.multiply(&m), m);
    }
}
