use std::ops::{ Index, IndexMut, Mul };
use std::convert::From;

use crate::feq;
use crate::consts::SINGULAR_EPSILON;
use crate::tuple::Tuple4D;

/// A 4x4 matrix.
///
/// These matrices encode the affine transforms applied to shape templates
/// when they are placed in a world. Points and vectors (`w` components of
/// `1.0` and `0.0`, respectively) are multiplied on the right.
///
/// # Examples
///
/// Scaling, then translating a point:
///
/// ```
/// # use bounce_tracer::tuple::Tuple4D;
/// # use bounce_tracer::matrix::Matrix4D;
/// let m = Matrix4D::translation(1.0, 0.0, 0.0) * Matrix4D::scaling(2.0, 2.0, 2.0);
/// let p = Tuple4D::point(1.0, 1.0, 1.0);
/// assert_eq!(m * p, Tuple4D::point(3.0, 2.0, 2.0));
/// ```
#[derive(Copy, Clone, Debug, Default, PartialOrd)]
pub struct Matrix4D {
    data: [f64; 16],
}

/// Matrices are compared element-wise. Note that equality is approximate, as
/// `Matrix4D` elements are floating point numbers.
impl PartialEq for Matrix4D {
    fn eq(&self, other: &Matrix4D) -> bool {
        self.data.iter().zip(other.data.iter()).all(|(x, y)| feq(*x, *y))
    }
}

impl Matrix4D {
    /// Creates a new `Matrix4D`. All elements are initialized to `0.0`.
    pub fn new() -> Matrix4D {
        Matrix4D { data: [0.0; 16] }
    }

    /// Instantiates a 4x4 identity matrix.
    pub fn identity() -> Matrix4D {
        let mut buf = [0.0; 16];
        buf[0] = 1.0; buf[5] = 1.0; buf[10] = 1.0; buf[15] = 1.0;

        Matrix4D { data: buf }
    }

    /// Instantiates a 4x4 translation matrix.
    ///
    /// This matrix offsets a point by `x`, `y` and `z`. Vectors are left
    /// untouched.
    pub fn translation(x: f64, y: f64, z: f64) -> Matrix4D {
        let mut trans = Self::identity();
        trans[(0, 3)] = x;
        trans[(1, 3)] = y;
        trans[(2, 3)] = z;

        trans
    }

    /// Instantiates a 4x4 scaling matrix.
    ///
    /// This matrix scales vectors or points by `x`, `y` and `z` along the X, Y
    /// and Z axes, respectively.
    pub fn scaling(x: f64, y: f64, z: f64) -> Matrix4D {
        let mut scale = Self::identity();
        scale[(0, 0)] = x;
        scale[(1, 1)] = y;
        scale[(2, 2)] = z;

        scale
    }

    /// Instantiates a rotation from a viewing direction and an up vector.
    ///
    /// The rows of the rotation are an orthonormal basis: `bz` along
    /// `look_at`, `bx` perpendicular to both `up` and `look_at`, and `by`
    /// completing the right-handed frame. A point is expressed in that basis
    /// when multiplied on the right.
    ///
    /// ```
    /// # use bounce_tracer::tuple::Tuple4D;
    /// # use bounce_tracer::matrix::Matrix4D;
    /// let m = Matrix4D::orientation(
    ///     Tuple4D::vector(0.0, 0.0, 1.0),
    ///     Tuple4D::vector(0.0, 1.0, 0.0),
    /// );
    /// assert_eq!(m, Matrix4D::identity());
    /// ```
    pub fn orientation(look_at: Tuple4D, up: Tuple4D) -> Matrix4D {
        let bz = look_at.xyz().normalize();
        let bx = up.xyz().cross(&look_at.xyz()).normalize();
        let by = bz.cross(&bx);

        let mut rotate = Self::identity();
        for (r, basis) in [bx, by, bz].iter().enumerate() {
            rotate[(r, 0)] = basis.x;
            rotate[(r, 1)] = basis.y;
            rotate[(r, 2)] = basis.z;
        }

        rotate
    }
}

impl From<[f64; 16]> for Matrix4D {
    fn from(data: [f64; 16]) -> Matrix4D {
        Matrix4D { data }
    }
}

impl Index<(usize, usize)> for Matrix4D {
    type Output = f64;

    fn index<'a>(&'a self, index: (usize, usize)) -> &'a f64 {
        &self.data[(index.0 * 4) + index.1]
    }
}

impl IndexMut<(usize, usize)> for Matrix4D {
    fn index_mut<'a>(&'a mut self, index: (usize, usize)) -> &'a mut f64 {
        &mut self.data[(index.0 * 4) + index.1]
    }
}

/// Multiplication between two matrices.
///
/// Note that matrix multiplication is not commutative; in other words, for
/// matrix `A` and matrix `B`, `A * B` is not necessarily equal to `B * A`.
///
/// # Examples
///
/// ```
/// # use bounce_tracer::matrix::Matrix4D;
/// let m1 = Matrix4D::scaling(2.0, 3.0, 4.0);
/// let m2 = Matrix4D::scaling(4.0, 3.0, 2.0);
/// assert_eq!(m1 * m2, Matrix4D::scaling(8.0, 9.0, 8.0));
/// ```
impl Mul<Matrix4D> for Matrix4D {
    type Output = Matrix4D;

    fn mul(self, other: Matrix4D) -> Matrix4D {
        let mut res = Matrix4D::new();

        for r in 0..4 {
            for c in 0..4 {
                res[(r, c)] = self[(r, 0)] * other[(0, c)]
                    + self[(r, 1)] * other[(1, c)]
                    + self[(r, 2)] * other[(2, c)]
                    + self[(r, 3)] * other[(3, c)]
            }
        }

        res
    }
}

/// Multiplication between a matrix and a `Tuple4D`.
///
/// ```
/// # use bounce_tracer::tuple::Tuple4D;
/// # use bounce_tracer::matrix::Matrix4D;
/// let v = Tuple4D::vector(1.0, 4.0, 5.0);
/// let m = Matrix4D::scaling(2.0, 2.0, 2.0);
/// assert_eq!(m * v, Tuple4D::vector(2.0, 8.0, 10.0));
/// ```
impl Mul<Tuple4D> for Matrix4D {
    type Output = Tuple4D;

    fn mul(self, other: Tuple4D) -> Tuple4D {
        let mut buf: [f64; 4] = Default::default();

        for r in 0..4 {
            buf[r] = self[(r, 0)] * other.x
                + self[(r, 1)] * other.y
                + self[(r, 2)] * other.z
                + self[(r, 3)] * other.w;
        }

        Tuple4D { x: buf[0], y: buf[1], z: buf[2], w: buf[3] }
    }
}

/// An augmented 3x4 matrix, i.e. a 3x3 linear system with its right-hand
/// side in the last column.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Matrix3x4 {
    data: [[f64; 4]; 3],
}

impl Matrix3x4 {
    /// Builds the system `[a | b | c] * x = rhs` from three column vectors.
    ///
    /// Only the `x`, `y` and `z` components of each tuple are used.
    pub fn from_columns(a: Tuple4D, b: Tuple4D, c: Tuple4D, rhs: Tuple4D)
        -> Matrix3x4 {
        Matrix3x4 {
            data: [
                [a.x, b.x, c.x, rhs.x],
                [a.y, b.y, c.y, rhs.y],
                [a.z, b.z, c.z, rhs.z],
            ]
        }
    }

    /// Solves the system by Gaussian elimination with partial pivoting.
    ///
    /// Returns `None` if the system is singular (or numerically close to it).
    pub fn solve(&self) -> Option<[f64; 3]> {
        let mut m = self.data;

        for col in 0..3 {
            // Partial pivoting: largest magnitude in this column.
            let pivot = (col..3).max_by(|&a, &b| {
                m[a][col].abs().partial_cmp(&m[b][col].abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })?;

            if !(m[pivot][col].abs() > SINGULAR_EPSILON) {
                return None;
            }
            m.swap(col, pivot);

            for row in 0..3 {
                if row == col {
                    continue;
                }

                let factor = m[row][col] / m[col][col];
                for k in col..4 {
                    m[row][k] -= factor * m[col][k];
                }
            }
        }

        Some([
            m[0][3] / m[0][0],
            m[1][3] / m[1][1],
            m[2][3] / m[2][2],
        ])
    }
}

#[test]
fn identity() {
    let i = Matrix4D::identity();
    let a: Matrix4D = [ 0.0, 1.0,  2.0,  4.0,
                        1.0, 2.0,  4.0,  8.0,
                        2.0, 4.0,  8.0, 16.0,
                        4.0, 8.0, 16.0, 32.0, ].into();

    assert_eq!(a * i, a);
}

#[test]
fn translation_ignores_vectors() {
    let m = Matrix4D::translation(5.0, -3.0, 2.0);
    let v = Tuple4D::vector(-3.0, 4.0, 5.0);

    assert_eq!(m * v, v);
    assert_eq!(m * Tuple4D::point(-3.0, 4.0, 5.0), Tuple4D::point(2.0, 1.0, 7.0));
}

#[test]
fn orientation_is_orthonormal() {
    let m = Matrix4D::orientation(
        Tuple4D::vector(1.0, 1.0, 0.0),
        Tuple4D::vector(0.0, 0.0, 1.0),
    );

    let v = Tuple4D::vector(0.3, -1.2, 2.0);
    assert!(feq((m * v).magnitude(), v.magnitude()));
}

#[test]
fn solve_simple_system() {
    // x + y + z = 6, 2y + 5z = -4, 2x + 5y - z = 27
    let m = Matrix3x4::from_columns(
        Tuple4D::vector(1.0, 0.0, 2.0),
        Tuple4D::vector(1.0, 2.0, 5.0),
        Tuple4D::vector(1.0, 5.0, -1.0),
        Tuple4D::vector(6.0, -4.0, 27.0),
    );

    let x = m.solve().unwrap();
    assert!(feq(x[0], 5.0));
    assert!(feq(x[1], 3.0));
    assert!(feq(x[2], -2.0));
}

#[test]
fn solve_singular_system() {
    let m = Matrix3x4::from_columns(
        Tuple4D::vector(1.0, 2.0, 3.0),
        Tuple4D::vector(2.0, 4.0, 6.0),
        Tuple4D::vector(0.0, 1.0, 0.0),
        Tuple4D::vector(1.0, 1.0, 1.0),
    );

    assert_eq!(m.solve(), None);
}
