//! Quadric error forms.

use nalgebra::{Matrix4, Point3, Vector3, Vector4};

/// A symmetric 4x4 error form accumulating squared distances to planes.
///
/// The error of placing a vertex at `v` is `vᵀ·Q·v` with `v` extended to
/// `(x, y, z, 1)`. Planes are accumulated and retired with rank-one
/// updates over all sixteen entries; doing the full outer product (rather
/// than exploiting symmetry) keeps the round-off identical across the
/// `(i, j)` and `(j, i)` entries, so the matrix stays numerically
/// symmetric through long add/remove sequences.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quadric {
    /// The accumulated form.
    pub q: Matrix4<f32>,
}

impl Quadric {
    /// The zero form: no planes accumulated, zero error everywhere.
    pub fn zero() -> Self {
        Self {
            q: Matrix4::zeros(),
        }
    }

    /// Accumulate the plane with unit normal `normal` and offset `d`
    /// (`d = -normal . p` for a point `p` on the plane).
    pub fn add_plane(&mut self, normal: &Vector3<f32>, d: f32) {
        let p = Vector4::new(normal.x, normal.y, normal.z, d);
        self.q += p * p.transpose();
    }

    /// Retire a previously accumulated plane.
    pub fn remove_plane(&mut self, normal: &Vector3<f32>, d: f32) {
        let p = Vector4::new(normal.x, normal.y, normal.z, d);
        self.q -= p * p.transpose();
    }

    /// Evaluate the form at a homogeneous vector.
    pub fn evaluate_homogeneous(&self, v: &Vector4<f32>) -> f32 {
        (self.q * v).dot(v)
    }

    /// Evaluate the form at a point (extended with w = 1).
    pub fn evaluate(&self, p: &Point3<f32>) -> f32 {
        self.evaluate_homogeneous(&Vector4::new(p.x, p.y, p.z, 1.0))
    }

    /// Sum of two forms.
    pub fn sum(&self, other: &Quadric) -> Quadric {
        Quadric { q: self.q + other.q }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plane_distance_error() {
        // The plane z = 0.
        let mut q = Quadric::zero();
        q.add_plane(&Vector3::new(0.0, 0.0, 1.0), 0.0);

        assert!((q.evaluate(&Point3::new(0.0, 0.0, 0.0))).abs() < 1.0e-6);
        assert!((q.evaluate(&Point3::new(0.0, 0.0, 1.0)) - 1.0).abs() < 1.0e-6);
        // Distance squared, independent of x and y.
        assert!((q.evaluate(&Point3::new(5.0, 3.0, 2.0)) - 4.0).abs() < 1.0e-6);
    }

    #[test]
    fn test_sum_of_planes() {
        let mut qx = Quadric::zero();
        qx.add_plane(&Vector3::new(1.0, 0.0, 0.0), 0.0);
        let mut qy = Quadric::zero();
        qy.add_plane(&Vector3::new(0.0, 1.0, 0.0), 0.0);

        let q = qx.sum(&qy);
        // Combined error is x^2 + y^2.
        assert!((q.evaluate(&Point3::new(3.0, 4.0, 0.0)) - 25.0).abs() < 1.0e-5);
    }

    #[test]
    fn test_remove_plane_restores_zero() {
        let n = Vector3::new(0.6, 0.0, 0.8);
        let mut q = Quadric::zero();
        q.add_plane(&n, -1.25);
        q.remove_plane(&n, -1.25);
        assert_eq!(q.q, Matrix4::zeros());
    }

    #[test]
    fn test_offset_plane() {
        // The plane z = 2: normal (0,0,1), d = -2.
        let mut q = Quadric::zero();
        q.add_plane(&Vector3::new(0.0, 0.0, 1.0), -2.0);
        assert!((q.evaluate(&Point3::new(0.0, 0.0, 2.0))).abs() < 1.0e-6);
        assert!((q.evaluate(&Point3::new(1.0, 1.0, 5.0)) - 9.0).abs() < 1.0e-6);
    }
}
