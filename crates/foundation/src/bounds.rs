//! Axis-aligned bounding boxes.

use crate::math::{Vec2, Vec3};

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb2 {
    pub min: [f64; 2],
    pub max: [f64; 2],
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb3 {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl Aabb2 {
    pub fn new(min: [f64; 2], max: [f64; 2]) -> Self {
        Aabb2 { min, max }
    }

    pub fn from_points(points: &[Vec2]) -> Option<Self> {
        let first = points.first()?;
        let mut b = Aabb2::new([first.x, first.y], [first.x, first.y]);
        for p in &points[1..] {
            b.min = [b.min[0].min(p.x), b.min[1].min(p.y)];
            b.max = [b.max[0].max(p.x), b.max[1].max(p.y)];
        }
        Some(b)
    }

    pub fn width(&self) -> f64 {
        self.max[0] - self.min[0]
    }

    pub fn height(&self) -> f64 {
        self.max[1] - self.min[1]
    }
}

impl Aabb3 {
    pub fn new(min: [f64; 3], max: [f64; 3]) -> Self {
        Aabb3 { min, max }
    }

    pub fn from_points(points: &[Vec3]) -> Option<Self> {
        let first = points.first()?;
        let mut b = Aabb3::new(first.as_array(), first.as_array());
        for p in &points[1..] {
            b = b.union(&Aabb3::new(p.as_array(), p.as_array()));
        }
        Some(b)
    }

    pub fn union(&self, other: &Self) -> Self {
        Aabb3::new(
            [
                self.min[0].min(other.min[0]),
                self.min[1].min(other.min[1]),
                self.min[2].min(other.min[2]),
            ],
            [
                self.max[0].max(other.max[0]),
                self.max[1].max(other.max[1]),
                self.max[2].max(other.max[2]),
            ],
        )
    }

    pub fn intersects(&self, other: &Self) -> bool {
        (0..3).all(|axis| self.min[axis] <= other.max[axis] && other.min[axis] <= self.max[axis])
    }

    pub fn center(&self) -> Vec3 {
        Vec3::new(
            (self.min[0] + self.max[0]) * 0.5,
            (self.min[1] + self.max[1]) * 0.5,
            (self.min[2] + self.max[2]) * 0.5,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{Aabb2, Aabb3};
    use crate::math::{Vec2, Vec3};

    #[test]
    fn aabb2_from_points() {
        let b = Aabb2::from_points(&[Vec2::new(1.0, -2.0), Vec2::new(-3.0, 4.0)]).unwrap();
        assert_eq!(b.min, [-3.0, -2.0]);
        assert_eq!(b.max, [1.0, 4.0]);
        assert_eq!(b.width(), 4.0);
        assert!(Aabb2::from_points(&[]).is_none());
    }

    #[test]
    fn aabb3_union_and_intersects() {
        let a = Aabb3::from_points(&[Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 1.0)]).unwrap();
        let b = Aabb3::new([2.0, 0.0, 0.0], [3.0, 1.0, 1.0]);
        assert!(!a.intersects(&b));
        let u = a.union(&b);
        assert_eq!(u.max, [3.0, 1.0, 1.0]);
        assert!(u.intersects(&b));
        assert_eq!(u.center(), Vec3::new(1.5, 0.5, 0.5));
    }
}
