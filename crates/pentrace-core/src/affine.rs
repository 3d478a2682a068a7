//! 2×3 affine transforms over pixel coordinates.
//!
//! - Homogeneous composition and inversion.
//! - Point mapping (rounded to integer pixels).
//! - Rigid (rotation + translation + uniform scale) least-squares estimation
//!   from tracked point pairs.

use nalgebra::{Matrix2x3, Matrix3, Matrix4, Vector4};

use crate::geometry::Point;

// ── Error type ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum AffineError {
    TooFewPoints { needed: usize, got: usize },
    Singular,
}

impl std::fmt::Display for AffineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooFewPoints { needed, got } => {
                write!(f, "too few point pairs: need {}, got {}", needed, got)
            }
            Self::Singular => write!(f, "transform is singular"),
        }
    }
}

impl std::error::Error for AffineError {}

// ── Transform ────────────────────────────────────────────────────────────

/// Affine transform stored as the top two rows of a 3×3 homogeneous matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineTransform {
    m: Matrix2x3<f64>,
}

impl AffineTransform {
    pub fn identity() -> Self {
        Self::from_rows([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]])
    }

    /// Pure translation by `(dx, dy)`.
    pub fn translation(dx: f64, dy: f64) -> Self {
        Self::from_rows([[1.0, 0.0, dx], [0.0, 1.0, dy]])
    }

    pub fn from_rows(rows: [[f64; 3]; 2]) -> Self {
        Self {
            m: Matrix2x3::new(
                rows[0][0], rows[0][1], rows[0][2], rows[1][0], rows[1][1], rows[1][2],
            ),
        }
    }

    /// The two matrix rows `[[a, b, tx], [c, d, ty]]`.
    pub fn rows(&self) -> [[f64; 3]; 2] {
        [
            [self.m[(0, 0)], self.m[(0, 1)], self.m[(0, 2)]],
            [self.m[(1, 0)], self.m[(1, 1)], self.m[(1, 2)]],
        ]
    }

    /// Lift to a full 3×3 homogeneous matrix with last row `[0, 0, 1]`.
    pub fn to_homogeneous(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.m[(0, 0)],
            self.m[(0, 1)],
            self.m[(0, 2)],
            self.m[(1, 0)],
            self.m[(1, 1)],
            self.m[(1, 2)],
            0.0,
            0.0,
            1.0,
        )
    }

    /// Take the top two rows of a homogeneous matrix. The last row is assumed
    /// to be `[0, 0, 1]`.
    pub fn from_homogeneous(h: &Matrix3<f64>) -> Self {
        Self::from_rows([
            [h[(0, 0)], h[(0, 1)], h[(0, 2)]],
            [h[(1, 0)], h[(1, 1)], h[(1, 2)]],
        ])
    }

    /// Map a point in continuous coordinates.
    pub fn apply_f64(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.m[(0, 0)] * x + self.m[(0, 1)] * y + self.m[(0, 2)],
            self.m[(1, 0)] * x + self.m[(1, 1)] * y + self.m[(1, 2)],
        )
    }

    /// Map an integer pixel position, rounding the result.
    pub fn apply(&self, p: Point) -> Point {
        let (x, y) = self.apply_f64(p.x as f64, p.y as f64);
        Point::new(x.round() as i32, y.round() as i32)
    }

    /// `self ∘ other`: apply `other` first, then `self`.
    pub fn compose(&self, other: &AffineTransform) -> AffineTransform {
        Self::from_homogeneous(&(self.to_homogeneous() * other.to_homogeneous()))
    }

    pub fn inverse(&self) -> Result<AffineTransform, AffineError> {
        match self.to_homogeneous().try_inverse() {
            Some(inv) => Ok(Self::from_homogeneous(&inv)),
            None => Err(AffineError::Singular),
        }
    }
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::identity()
    }
}

// ── Rigid estimation ─────────────────────────────────────────────────────

/// Minimum point pairs accepted by [`estimate_rigid`].
pub const MIN_RIGID_PAIRS: usize = 3;

/// Least-squares rigid transform (rotation + uniform scale + translation)
/// mapping `src[i]` onto `dst[i]`.
///
/// Solves for `[[a, -b, tx], [b, a, ty]]` via the 4×4 normal equations.
pub fn estimate_rigid(
    src: &[(f64, f64)],
    dst: &[(f64, f64)],
) -> Result<AffineTransform, AffineError> {
    let n = src.len().min(dst.len());
    if n < MIN_RIGID_PAIRS {
        return Err(AffineError::TooFewPoints {
            needed: MIN_RIGID_PAIRS,
            got: n,
        });
    }

    let mut ata = Matrix4::<f64>::zeros();
    let mut atb = Vector4::<f64>::zeros();
    for i in 0..n {
        let (x, y) = src[i];
        let (u, v) = dst[i];
        // Row for the x equation: [x, -y, 1, 0] · [a, b, tx, ty] = u
        // Row for the y equation: [y,  x, 0, 1] · [a, b, tx, ty] = v
        let rx = Vector4::new(x, -y, 1.0, 0.0);
        let ry = Vector4::new(y, x, 0.0, 1.0);
        ata += rx * rx.transpose() + ry * ry.transpose();
        atb += rx * u + ry * v;
    }

    let sol = ata.lu().solve(&atb).ok_or(AffineError::Singular)?;
    let (a, b, tx, ty) = (sol[0], sol[1], sol[2], sol[3]);
    Ok(AffineTransform::from_rows([[a, -b, tx], [b, a, ty]]))
}

/// Mean Euclidean residual of `t` over the point pairs.
pub fn mean_residual(t: &AffineTransform, src: &[(f64, f64)], dst: &[(f64, f64)]) -> f64 {
    let n = src.len().min(dst.len());
    if n == 0 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let (px, py) = t.apply_f64(src[i].0, src[i].1);
        let dx = px - dst[i].0;
        let dy = py - dst[i].1;
        sum += (dx * dx + dy * dy).sqrt();
    }
    sum / n as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn assert_rows_eq(t: &AffineTransform, expect: [[f64; 3]; 2], eps: f64) {
        let rows = t.rows();
        for r in 0..2 {
            for c in 0..3 {
                assert_relative_eq!(rows[r][c], expect[r][c], epsilon = eps);
            }
        }
    }

    #[test]
    fn compose_with_inverse_is_identity() {
        let angle = 0.3_f64;
        let (s, c) = angle.sin_cos();
        let t = AffineTransform::from_rows([[c, -s, 12.5], [s, c, -4.0]]);
        let round_trip = t.compose(&t.inverse().unwrap());
        assert_rows_eq(&round_trip, [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]], 1e-12);
    }

    #[test]
    fn identity_maps_points_onto_themselves() {
        let t = AffineTransform::identity();
        assert_eq!(t.apply(Point::new(17, -3)), Point::new(17, -3));
    }

    #[test]
    fn apply_rounds_to_nearest_pixel() {
        let t = AffineTransform::translation(0.6, -0.6);
        assert_eq!(t.apply(Point::new(10, 10)), Point::new(11, 9));
    }

    #[test]
    fn singular_transform_fails_to_invert() {
        let t = AffineTransform::from_rows([[0.0, 0.0, 1.0], [0.0, 0.0, 2.0]]);
        assert_eq!(t.inverse(), Err(AffineError::Singular));
    }

    #[test]
    fn estimate_recovers_pure_translation() {
        let src = [(10.0, 20.0), (40.0, 25.0), (30.0, 60.0), (5.0, 55.0)];
        let dst: Vec<_> = src.iter().map(|&(x, y)| (x + 7.0, y - 3.0)).collect();
        let t = estimate_rigid(&src, &dst).unwrap();
        assert_rows_eq(&t, [[1.0, 0.0, 7.0], [0.0, 1.0, -3.0]], 1e-9);
        assert!(mean_residual(&t, &src, &dst) < 1e-9);
    }

    #[test]
    fn estimate_recovers_rotation_about_origin() {
        let angle = 25.0_f64.to_radians();
        let (s, c) = angle.sin_cos();
        let src = [(100.0, 40.0), (150.0, 90.0), (60.0, 120.0), (80.0, 30.0)];
        let dst: Vec<_> = src
            .iter()
            .map(|&(x, y)| (c * x - s * y + 5.0, s * x + c * y - 11.0))
            .collect();
        let t = estimate_rigid(&src, &dst).unwrap();
        assert_rows_eq(&t, [[c, -s, 5.0], [s, c, -11.0]], 1e-9);
    }

    #[test]
    fn estimate_rejects_too_few_pairs() {
        let src = [(0.0, 0.0), (1.0, 1.0)];
        let dst = [(0.0, 0.0), (1.0, 1.0)];
        assert_eq!(
            estimate_rigid(&src, &dst),
            Err(AffineError::TooFewPoints { needed: 3, got: 2 })
        );
    }
}
