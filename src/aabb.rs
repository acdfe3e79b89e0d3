//! Axis-aligned bounding boxes.

use nalgebra::{Point3, Vector3};

/// An axis-aligned bounding box over `f32` coordinates.
///
/// A freshly constructed box is *empty*: `min` is `+INFINITY` and `max` is
/// `-INFINITY` on every axis, so the first [`Aabb::encapsulate_point`] call
/// snaps the box onto that point. Callers treat the empty state as a
/// sentinel; no geometric quantity of an empty box is meaningful.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Componentwise minimum corner.
    pub min: Point3<f32>,
    /// Componentwise maximum corner.
    pub max: Point3<f32>,
}

impl Aabb {
    /// Create an empty box (min = +INF, max = -INF).
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
            max: Point3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        }
    }

    /// Create a box from explicit corners.
    pub fn new(min: Point3<f32>, max: Point3<f32>) -> Self {
        Self { min, max }
    }

    /// Create the tightest box containing every point in `points`.
    pub fn from_points<'a, I: IntoIterator<Item = &'a Point3<f32>>>(points: I) -> Self {
        let mut aabb = Self::empty();
        for p in points {
            aabb.encapsulate_point(p);
        }
        aabb
    }

    /// True if the box contains no points.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Center of the box.
    pub fn center(&self) -> Point3<f32> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Edge lengths of the box.
    pub fn size(&self) -> Vector3<f32> {
        self.max - self.min
    }

    /// Half the edge lengths of the box.
    pub fn extents(&self) -> Vector3<f32> {
        self.size() * 0.5
    }

    /// Volume of the box.
    pub fn volume(&self) -> f32 {
        let s = self.size();
        s.x * s.y * s.z
    }

    /// Grow the box to contain `point`.
    pub fn encapsulate_point(&mut self, point: &Point3<f32>) {
        self.min = Point3::from(self.min.coords.inf(&point.coords));
        self.max = Point3::from(self.max.coords.sup(&point.coords));
    }

    /// Grow the box to contain `other`.
    pub fn encapsulate(&mut self, other: &Aabb) {
        if other.is_empty() {
            return;
        }
        self.encapsulate_point(&other.min);
        self.encapsulate_point(&other.max);
    }

    /// True if `other` lies entirely inside this box (within `tolerance`).
    pub fn contains(&self, other: &Aabb, tolerance: f32) -> bool {
        self.min.x <= other.min.x + tolerance
            && self.min.y <= other.min.y + tolerance
            && self.min.z <= other.min.z + tolerance
            && self.max.x >= other.max.x - tolerance
            && self.max.y >= other.max.y - tolerance
            && self.max.z >= other.max.z - tolerance
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_state() {
        let aabb = Aabb::empty();
        assert!(aabb.is_empty());
        assert_eq!(aabb.min.x, f32::INFINITY);
        assert_eq!(aabb.max.x, f32::NEG_INFINITY);
    }

    #[test]
    fn test_encapsulate_point() {
        let mut aabb = Aabb::empty();
        aabb.encapsulate_point(&Point3::new(1.0, 2.0, 3.0));
        assert_eq!(aabb.min, Point3::new(1.0, 2.0, 3.0));
        assert_eq!(aabb.max, Point3::new(1.0, 2.0, 3.0));

        aabb.encapsulate_point(&Point3::new(-1.0, 0.0, 5.0));
        assert_eq!(aabb.min, Point3::new(-1.0, 0.0, 3.0));
        assert_eq!(aabb.max, Point3::new(1.0, 2.0, 5.0));
        assert!(!aabb.is_empty());
    }

    #[test]
    fn test_encapsulate_box() {
        let mut a = Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        let b = Aabb::new(Point3::new(-1.0, 0.5, 0.5), Point3::new(0.5, 2.0, 0.5));
        a.encapsulate(&b);
        assert_eq!(a.min, Point3::new(-1.0, 0.0, 0.0));
        assert_eq!(a.max, Point3::new(1.0, 2.0, 1.0));

        // Folding in an empty box is a no-op.
        let before = a;
        a.encapsulate(&Aabb::empty());
        assert_eq!(a, before);
    }

    #[test]
    fn test_metrics() {
        let aabb = Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 4.0, 8.0));
        assert_eq!(aabb.center(), Point3::new(1.0, 2.0, 4.0));
        assert_eq!(aabb.size(), Vector3::new(2.0, 4.0, 8.0));
        assert_eq!(aabb.extents(), Vector3::new(1.0, 2.0, 4.0));
        assert_eq!(aabb.volume(), 64.0);
    }

    #[test]
    fn test_contains() {
        let outer = Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 10.0, 10.0));
        let inner = Aabb::new(Point3::new(1.0, 1.0, 1.0), Point3::new(9.0, 9.0, 9.0));
        assert!(outer.contains(&inner, 0.0));
        assert!(!inner.contains(&outer, 0.0));
    }
}
