use foundation::bounds::Aabb3;
use foundation::math::Vec3;

/// World-space bounds of a node's geometry, used as the picking broadphase.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ComponentBounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl ComponentBounds {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, point: Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    pub fn as_aabb(&self) -> Aabb3 {
        Aabb3::new(self.min.as_array(), self.max.as_array())
    }
}

impl From<Aabb3> for ComponentBounds {
    fn from(b: Aabb3) -> Self {
        Self::new(
            Vec3::new(b.min[0], b.min[1], b.min[2]),
            Vec3::new(b.max[0], b.max[1], b.max[2]),
        )
    }
}
