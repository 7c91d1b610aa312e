use foundation::bounds::Aabb3;
use foundation::math::Vec3;

/// Contiguous run of triangles drawn with one material slot.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MeshGroup {
    pub start: usize,
    pub count: usize,
    pub material: usize,
}

/// Indexed triangle mesh of an extruded region ring.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SolidMesh {
    pub positions: Vec<Vec3>,
    /// Normalized height of each vertex, feeding the side gradient.
    pub heights: Vec<f32>,
    pub triangles: Vec<[u32; 3]>,
    pub groups: Vec<MeshGroup>,
    /// Planar area of the extruded outline (always > 0 for a built mesh).
    pub footprint_area: f64,
    pub depth: f64,
}

impl SolidMesh {
    pub fn bounds(&self) -> Option<Aabb3> {
        Aabb3::from_points(&self.positions)
    }

    pub fn triangle(&self, index: usize) -> Option<[Vec3; 3]> {
        let [a, b, c] = *self.triangles.get(index)?;
        Some([
            *self.positions.get(a as usize)?,
            *self.positions.get(b as usize)?,
            *self.positions.get(c as usize)?,
        ])
    }

    /// Triangles drawn with material slot `material`.
    pub fn triangles_with_material(&self, material: usize) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        self.groups
            .iter()
            .filter(move |g| g.material == material)
            .flat_map(|g| g.start..g.start + g.count)
            .filter_map(|i| self.triangle(i))
    }
}

/// Polyline in scene space; `closed` joins the last point back to the first.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Polyline {
    pub points: Vec<Vec3>,
    pub closed: bool,
}

impl Polyline {
    pub fn segment_count(&self) -> usize {
        match self.points.len() {
            0 | 1 => 0,
            n if self.closed => n,
            n => n - 1,
        }
    }
}
