use std::ops::{ Add, Sub, Neg, Mul, Div };

use crate::feq;

/// A homogeneous 4D tuple.
///
/// Points carry `w == 1.0` and vectors carry `w == 0.0`. Light positions are
/// the one place where other values of `w` are meaningful; see
/// `Light::direction_from`.
#[derive(Debug, Default, Copy, Clone, PartialOrd)]
pub struct Tuple4D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64
}

/// Tuples are compared component-wise within `FEQ_EPSILON`.
///
/// Code which needs bit-exact comparisons (e.g. merging bounding spheres)
/// compares the fields directly instead.
impl PartialEq for Tuple4D {
    fn eq(&self, other: &Tuple4D) -> bool {
        feq(self.x, other.x) &&
            feq(self.y, other.y) &&
            feq(self.z, other.z) &&
            feq(self.w, other.w)
    }
}

impl Tuple4D {
    pub fn tuple(x: f64, y: f64, z: f64, w: f64) -> Tuple4D {
        Tuple4D { x, y, z, w }
    }

    pub fn point(x: f64, y: f64, z: f64) -> Tuple4D {
        Tuple4D { x, y, z, w: 1.0 }
    }

    pub fn vector(x: f64, y: f64, z: f64) -> Tuple4D {
        Tuple4D { x, y, z, w: 0.0 }
    }

    pub fn is_point(&self) -> bool {
        self.w == 1.0
    }

    pub fn is_vector(&self) -> bool {
        self.w == 0.0
    }

    /// Drops the `w` component, producing a vector.
    pub fn xyz(&self) -> Tuple4D {
        Tuple4D::vector(self.x, self.y, self.z)
    }

    /// Checks that every component is exactly equal to `other`'s.
    pub fn exact_eq(&self, other: &Tuple4D) -> bool {
        self.x == other.x
            && self.y == other.y
            && self.z == other.z
            && self.w == other.w
    }

    pub fn magnitude(&self) -> f64 {
        f64::sqrt(
            self.x.powi(2)
            + self.y.powi(2)
            + self.z.powi(2)
            + self.w.powi(2)
        )
    }

    /// The euclidean distance between two points.
    pub fn distance(&self, other: &Tuple4D) -> f64 {
        (*self - *other).xyz().magnitude()
    }

    /// Scales the tuple to unit length.
    ///
    /// A zero-length tuple has no direction and is returned unchanged.
    pub fn normalize(&self) -> Tuple4D {
        let mag = self.magnitude();
        if mag == 0.0 {
            return *self;
        }

        Tuple4D {
            x: self.x / mag,
            y: self.y / mag,
            z: self.z / mag,
            w: self.w / mag,
        }
    }

    pub fn dot(&self, other: &Tuple4D) -> f64 {
        self.x * other.x
            + self.y * other.y
            + self.z * other.z
            + self.w * other.w
    }

    pub fn cross(&self, other: &Tuple4D) -> Tuple4D {
        Tuple4D {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
            w: 0.0
        }
    }

    /// Mirrors an outgoing vector about a normal.
    ///
    /// Takes a vector pointing *away* from the surface (towards a light or
    /// the viewer) and returns its mirror image on the other side of the
    /// normal.
    pub fn mirror(&self, normal: &Tuple4D) -> Tuple4D {
        (*normal * 2.0 * self.dot(normal)) - *self
    }
}

impl From<[f64; 3]> for Tuple4D {
    fn from(v: [f64; 3]) -> Tuple4D {
        Tuple4D::point(v[0], v[1], v[2])
    }
}

impl From<[f64; 4]> for Tuple4D {
    fn from(v: [f64; 4]) -> Tuple4D {
        Tuple4D::tuple(v[0], v[1], v[2], v[3])
    }
}

impl Add for Tuple4D {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
            w: self.w + other.w
        }
    }
}

impl Sub for Tuple4D {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
            w: self.w - other.w
        }
    }
}

impl Neg for Tuple4D {
    type Output = Self;

    fn neg(self) -> Self {
        Self {
            x: -self.x,
            y: -self.y,
            z: -self.z,
            w: -self.w
        }
    }
}

/// Implements scalar right-multiplication for a 4D tuple.
///
/// ```
/// use bounce_tracer::tuple::Tuple4D;
///
/// let t = Tuple4D::tuple(1.0, 2.0, 3.0, 4.0);
/// assert_eq!(t * 5.0, Tuple4D::tuple(5.0, 10.0, 15.0, 20.0));
/// ```
impl Mul<f64> for Tuple4D {
    type Output = Self;

    fn mul(self, other: f64) -> Self {
        Self {
            x: self.x * other,
            y: self.y * other,
            z: self.z * other,
            w: self.w * other
        }
    }
}

/// Implements scalar left-multiplication for a 4D tuple.
impl Mul<Tuple4D> for f64 {
    type Output = Tuple4D;

    fn mul(self, other: Tuple4D) -> Tuple4D {
        other * self
    }
}

/// Divides each component by a scalar. Used for centroids.
impl Div<f64> for Tuple4D {
    type Output = Self;

    fn div(self, other: f64) -> Self {
        Self {
            x: self.x / other,
            y: self.y / other,
            z: self.z / other,
            w: self.w / other
        }
    }
}

/* Tests */

#[test]
fn add_tuples() {
    let a1 = Tuple4D::tuple(3.0, -2.0, 5.0, 1.0);
    let a2 = Tuple4D::tuple(-2.0, 3.0, 1.0, 0.0);

    assert_eq!(a1 + a2, Tuple4D::tuple(1.0, 1.0, 6.0, 1.0));
}

#[test]
fn sub_points() {
    let p1 = Tuple4D::point(3.0, 2.0, 1.0);
    let p2 = Tuple4D::point(5.0, 6.0, 7.0);

    assert_eq!(p1 - p2, Tuple4D::vector(-2.0, -4.0, -6.0));
}

#[test]
fn distance_between_points() {
    let p1 = Tuple4D::point(1.0, 2.0, 3.0);
    let p2 = Tuple4D::point(4.0, 6.0, 3.0);

    assert_eq!(p1.distance(&p2), 5.0);
}

#[test]
fn normalize_dirty() {
    let v = Tuple4D::vector(1.0, 2.0, 3.0);
    let e = Tuple4D::vector(
        1.0 / f64::sqrt(14.0),
        2.0 / f64::sqrt(14.0),
        3.0 / f64::sqrt(14.0)
    );

    assert_eq!(v.normalize(), e);
}

#[test]
fn normalize_zero_vector() {
    let v = Tuple4D::vector(0.0, 0.0, 0.0);

    assert!(v.normalize().exact_eq(&v));
}

#[test]
fn cross_vectors() {
    let a = Tuple4D::vector(1.0, 2.0, 3.0);
    let b = Tuple4D::vector(2.0, 3.0, 4.0);

    assert_eq!(a.cross(&b), Tuple4D::vector(-1.0, 2.0, -1.0));
    assert_eq!(b.cross(&a), Tuple4D::vector(1.0, -2.0, 1.0));
}

#[test]
fn mirror_45() {
    let v = Tuple4D::vector(-1.0, 1.0, 0.0);
    let n = Tuple4D::vector(0.0, 1.0, 0.0);

    assert_eq!(v.mirror(&n), Tuple4D::vector(1.0, 1.0, 0.0));
}

#[test]
fn mirror_keeps_the_normal() {
    let n = Tuple4D::vector(0.0, 0.0, 1.0);

    assert_eq!(n.mirror(&n), n);
}
