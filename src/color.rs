use std::ops::{ Add, Sub, Mul };

use crate::feq;

/// The largest value a color channel can hold in an output image.
pub const CHANNEL_MAX: f64 = 255.0;

/// A color.
///
/// Represented with red-green-blue (RGB) values on the scale of an 8-bit
/// image: light intensities and pixel colors range from `0.0` to `255.0`.
/// Reflectances (e.g. a material's diffuse color) use the same type on a
/// `0.0` to `1.0` scale and are combined with `hadamard`.
///
/// # Examples
///
/// Blend an intensity with a reflectance:
///
/// ```
/// # use bounce_tracer::color::Color;
/// let light = Color::rgb(200.0, 100.0, 50.0);
/// let diffuse = Color::rgb(0.5, 1.0, 0.0);
/// assert_eq!(light * diffuse, Color::rgb(100.0, 100.0, 0.0));
/// ```
#[derive(Copy, Clone, Debug, Default, PartialOrd)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

/// Partial equality on two colors.
///
/// `Color`s are compared component-wise, accounting for possible floating
/// point error in comparisons.
impl PartialEq for Color {
    fn eq(&self, other: &Color) -> bool {
        feq(self.r, other.r) &&
            feq(self.g, other.g) &&
            feq(self.b, other.b)
    }
}

impl From<[f64; 3]> for Color {
    fn from(v: [f64; 3]) -> Color {
        Color { r: v[0], g: v[1], b: v[2] }
    }
}

impl From<[u8; 3]> for Color {
    fn from(v: [u8; 3]) -> Color {
        Color { r: v[0] as f64, g: v[1] as f64, b: v[2] as f64 }
    }
}

impl Color {
    /// Creates a color with red, green and blue values.
    pub fn rgb(r: f64, g: f64, b: f64) -> Color {
        Color { r, g, b }
    }

    /// The color black.
    pub fn black() -> Color {
        Color { r: 0.0, g: 0.0, b: 0.0 }
    }

    /// The color white, at full 8-bit intensity.
    pub fn white() -> Color {
        Color { r: CHANNEL_MAX, g: CHANNEL_MAX, b: CHANNEL_MAX }
    }

    /// Computes the Hadamard product of two colors.
    ///
    /// The hadamard product multiplies each component of the two colors, and
    /// yields a new color containing those products.
    pub fn hadamard(c1: &Color, c2: &Color) -> Color {
        Color {
            r: c1.r * c2.r,
            g: c1.g * c2.g,
            b: c1.b * c2.b,
        }
    }

    /// Truncates each channel to an integer and clamps it to `[0, 255]`.
    ///
    /// Values past the ends saturate instead of wrapping around.
    ///
    /// ```
    /// # use bounce_tracer::color::Color;
    /// let c = Color::rgb(300.7, 12.9, -4.0).clamp_channels();
    /// assert_eq!(c, Color::rgb(255.0, 12.0, 0.0));
    /// ```
    pub fn clamp_channels(&self) -> Color {
        let clamp = |c: f64| c.trunc().max(0.0).min(CHANNEL_MAX);

        Color {
            r: clamp(self.r),
            g: clamp(self.g),
            b: clamp(self.b),
        }
    }

    /// Converts to 8-bit channels, saturating at the ends.
    pub fn to_rgb8(&self) -> [u8; 3] {
        let c = self.clamp_channels();
        [c.r as u8, c.g as u8, c.b as u8]
    }
}

/// Adds two colors together.
///
/// Components are added together individually.
impl Add<Color> for Color {
    type Output = Color;

    fn add(self, other: Color) -> Self::Output {
        Color {
            r: self.r + other.r,
            g: self.g + other.g,
            b: self.b + other.b,
        }
    }
}

/// Subtracts one color from another.
impl Sub<Color> for Color {
    type Output = Color;

    fn sub(self, other: Color) -> Self::Output {
        Color {
            r: self.r - other.r,
            g: self.g - other.g,
            b: self.b - other.b,
        }
    }
}

/// Multiplies a color by a scalar.
impl Mul<f64> for Color {
    type Output = Color;

    fn mul(self, other: f64) -> Self::Output {
        Color {
            r: self.r * other,
            g: self.g * other,
            b: self.b * other,
        }
    }
}

/// Multiplies a scalar by a color.
impl Mul<Color> for f64 {
    type Output = Color;

    fn mul(self, other: Color) -> Self::Output {
        other * self
    }
}

/// Multiplies a color by a color.
///
/// For colors `c1` and `c2`, `c1 * c2` is shorthand for
/// `Color::hadamard(&c1, &c2)`.
impl Mul<Color> for Color {
    type Output = Color;

    fn mul(self, other: Color) -> Self::Output {
        Color::hadamard(&self, &other)
    }
}

#[test]
fn add_colors() {
    let c1 = Color::rgb(0.9, 0.6, 0.75);
    let c2 = Color::rgb(0.7, 0.1, 0.25);
    let c3 = Color { r: 1.6, g: 0.7, b: 1.0 };

    assert_eq!(c1 + c2, c3);
}

#[test]
fn subtract_colors() {
    let c1 = Color::rgb(0.9, 0.6, 0.75);
    let c2 = Color::rgb(0.7, 0.1, 0.25);
    let c3 = Color { r: 0.2, g: 0.5, b: 0.5 };

    assert_eq!(c1 - c2, c3);
}

#[test]
fn multiply_colors() {
    let c1 = Color::rgb(0.2, 0.3, 0.4);
    let c2 = Color { r: 0.4, g: 0.6, b: 0.8 };

    assert_eq!(c1 * 2.0, c2);
}

#[test]
fn clamp_saturates_instead_of_wrapping() {
    let c = Color::rgb(256.0, 511.0, 254.99);

    assert_eq!(c.to_rgb8(), [255, 255, 254]);
}
