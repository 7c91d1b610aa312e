//! Planar ring → extruded solid + top outline.

use earcutr::earcut;
use foundation::bounds::Aabb2;
use foundation::math::{Vec2, Vec3};
use scene::components::{CAP_MATERIAL, MeshGroup, Polyline, SIDE_MATERIAL, SolidMesh};

/// Why a ring produced no geometry. Never fatal: the caller skips the ring.
#[derive(Debug, Clone, PartialEq)]
pub enum RingError {
    TooFewPoints { count: usize },
    NonFinite { index: usize },
    ZeroArea,
    Triangulation(String),
}

impl std::fmt::Display for RingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RingError::TooFewPoints { count } => {
                write!(f, "ring needs at least 3 distinct points, got {count}")
            }
            RingError::NonFinite { index } => write!(f, "ring point {index} is not finite"),
            RingError::ZeroArea => write!(f, "ring encloses no area"),
            RingError::Triangulation(reason) => write!(f, "cap triangulation failed: {reason}"),
        }
    }
}

impl std::error::Error for RingError {}

#[derive(Debug, Clone, PartialEq)]
pub struct Extrusion {
    pub solid: SolidMesh,
    pub outline: Polyline,
}

/// Extrudes rings along +z with flat caps.
///
/// Vertex layout of the solid: the top ring (`z = depth`) occupies
/// `0..n`, the bottom ring (`z = 0`) occupies `n..2n`. Group 0 holds top and
/// bottom caps, group 1 the side walls.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PolygonExtruder {
    depth: f64,
    outline_z_offset: f64,
}

impl PolygonExtruder {
    pub fn new(depth: f64, outline_z_offset: f64) -> Self {
        Self {
            depth,
            outline_z_offset,
        }
    }

    pub fn depth(&self) -> f64 {
        self.depth
    }

    pub fn outline_z(&self) -> f64 {
        self.depth + self.outline_z_offset
    }

    pub fn extrude(&self, ring: &[Vec2]) -> Result<Extrusion, RingError> {
        if let Some(index) = ring.iter().position(|p| !p.is_finite()) {
            return Err(RingError::NonFinite { index });
        }

        let mut points = dedup_ring(ring);
        if points.len() < 3 {
            return Err(RingError::TooFewPoints {
                count: points.len(),
            });
        }

        let signed = signed_area(&points);
        let extent = extent(&points);
        if signed.abs() <= AREA_EPS * extent * extent {
            return Err(RingError::ZeroArea);
        }
        if signed < 0.0 {
            points.reverse();
        }

        let coords: Vec<f64> = points.iter().flat_map(|p| [p.x, p.y]).collect();
        let cap = earcut(&coords, &[], 2).map_err(|e| RingError::Triangulation(format!("{e:?}")))?;
        if cap.len() < 3 {
            return Err(RingError::Triangulation("no triangles".to_string()));
        }

        Ok(Extrusion {
            solid: self.build_solid(&points, &cap, signed.abs()),
            outline: Polyline {
                points: points.iter().map(|p| p.extend(self.outline_z())).collect(),
                closed: true,
            },
        })
    }

    fn build_solid(&self, ring: &[Vec2], cap: &[usize], area: f64) -> SolidMesh {
        let n = ring.len();
        let mut positions = Vec::with_capacity(n * 2);
        positions.extend(ring.iter().map(|p| p.extend(self.depth)));
        positions.extend(ring.iter().map(|p| p.extend(0.0)));
        let mut heights = vec![1.0_f32; n];
        heights.resize(n * 2, 0.0);

        let mut triangles: Vec<[u32; 3]> = Vec::with_capacity(cap.len() / 3 * 2 + n * 2);
        for tri in cap.chunks_exact(3) {
            let [a, b, c] = upward(ring, [tri[0], tri[1], tri[2]]);
            triangles.push([a as u32, b as u32, c as u32]);
            let (a, b, c) = (a + n, b + n, c + n);
            triangles.push([a as u32, c as u32, b as u32]);
        }
        let cap_count = triangles.len();

        // Counter-clockwise ring: (bottom_i, bottom_j, top_j) faces outward.
        for i in 0..n {
            let j = (i + 1) % n;
            let (ti, tj, bi, bj) = (i as u32, j as u32, (i + n) as u32, (j + n) as u32);
            triangles.push([bi, bj, tj]);
            triangles.push([bi, tj, ti]);
        }
        let side_count = triangles.len() - cap_count;

        SolidMesh {
            positions,
            heights,
            triangles,
            groups: vec![
                MeshGroup {
                    start: 0,
                    count: cap_count,
                    material: CAP_MATERIAL,
                },
                MeshGroup {
                    start: cap_count,
                    count: side_count,
                    material: SIDE_MATERIAL,
                },
            ],
            footprint_area: area,
            depth: self.depth,
        }
    }
}

const DUP_EPS: f64 = 1e-12;
const AREA_EPS: f64 = 1e-12;

/// Drop consecutive duplicates and the closing point if it repeats the first.
fn dedup_ring(ring: &[Vec2]) -> Vec<Vec2> {
    let mut out: Vec<Vec2> = Vec::with_capacity(ring.len());
    for p in ring {
        if out.last().is_some_and(|q| same_point(*q, *p)) {
            continue;
        }
        out.push(*p);
    }
    while out.len() >= 2 && same_point(out[0], out[out.len() - 1]) {
        out.pop();
    }
    out
}

fn same_point(a: Vec2, b: Vec2) -> bool {
    (a.x - b.x).abs() <= DUP_EPS && (a.y - b.y).abs() <= DUP_EPS
}

/// Shoelace formula; positive for counter-clockwise rings.
pub fn signed_area(ring: &[Vec2]) -> f64 {
    let n = ring.len();
    let mut twice = 0.0;
    for i in 0..n {
        let a = ring[i];
        let b = ring[(i + 1) % n];
        twice += a.x * b.y - b.x * a.y;
    }
    twice * 0.5
}

fn extent(ring: &[Vec2]) -> f64 {
    Aabb2::from_points(ring).map_or(0.0, |b| b.width().max(b.height()))
}

fn upward(ring: &[Vec2], tri: [usize; 3]) -> [usize; 3] {
    let [a, b, c] = tri;
    let (pa, pb, pc) = (ring[a], ring[b], ring[c]);
    let cross = (pb.x - pa.x) * (pc.y - pa.y) - (pb.y - pa.y) * (pc.x - pa.x);
    if cross < 0.0 { [a, c, b] } else { [a, b, c] }
}

/// Face normal of a triangle (unnormalized).
pub fn triangle_normal(tri: [Vec3; 3]) -> Vec3 {
    (tri[1] - tri[0]).cross(tri[2] - tri[0])
}

#[cfg(test)]
mod tests {
    use super::{PolygonExtruder, RingError, signed_area, triangle_normal};
    use foundation::math::Vec2;
    use scene::components::{CAP_MATERIAL, SIDE_MATERIAL};

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    fn ring(points: &[[f64; 2]]) -> Vec<Vec2> {
        points.iter().map(|p| Vec2::new(p[0], p[1])).collect()
    }

    fn extruder() -> PolygonExtruder {
        PolygonExtruder::new(6.0, 0.5)
    }

    #[test]
    fn valid_ring_has_positive_area_and_depth() {
        let square = ring(&[[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 2.0], [0.0, 0.0]]);
        let out = extruder().extrude(&square).expect("extrusion");

        assert!(out.solid.footprint_area > 0.0);
        assert_close(out.solid.footprint_area, 4.0, 1e-12);
        assert_eq!(out.solid.depth, 6.0);
        let bounds = out.solid.bounds().expect("bounds");
        assert_eq!(bounds.min[2], 0.0);
        assert_eq!(bounds.max[2], 6.0);

        // Closing duplicate dropped: 4 distinct vertices per level.
        assert_eq!(out.solid.positions.len(), 8);
        assert_eq!(out.solid.triangles_with_material(CAP_MATERIAL).count(), 4);
        assert_eq!(out.solid.triangles_with_material(SIDE_MATERIAL).count(), 8);
    }

    #[test]
    fn outline_sits_above_the_top_face() {
        let tri = ring(&[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]);
        let out = extruder().extrude(&tri).expect("extrusion");
        assert!(out.outline.closed);
        assert_eq!(out.outline.points.len(), 3);
        assert!(out.outline.points.iter().all(|p| p.z == 6.5));
        assert_eq!(out.outline.segment_count(), 3);
    }

    #[test]
    fn degenerate_rings_yield_no_geometry() {
        let e = extruder();
        assert_eq!(
            e.extrude(&ring(&[[0.0, 0.0], [1.0, 1.0]])),
            Err(RingError::TooFewPoints { count: 2 })
        );
        assert_eq!(
            e.extrude(&ring(&[[0.0, 0.0], [1.0, 1.0], [1.0, 1.0], [0.0, 0.0]])),
            Err(RingError::TooFewPoints { count: 2 })
        );
        assert_eq!(
            e.extrude(&ring(&[[0.0, 0.0], [1.0, 1.0], [2.0, 2.0], [3.0, 3.0]])),
            Err(RingError::ZeroArea)
        );
        assert_eq!(
            e.extrude(&ring(&[[0.0, 0.0], [1.0, f64::NAN], [2.0, 0.0]])),
            Err(RingError::NonFinite { index: 1 })
        );
        assert_eq!(e.extrude(&[]), Err(RingError::TooFewPoints { count: 0 }));
    }

    #[test]
    fn clockwise_rings_are_normalized() {
        let cw = ring(&[[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 0.0]]);
        assert!(signed_area(&cw) < 0.0);
        let out = extruder().extrude(&cw).expect("extrusion");
        assert_close(out.solid.footprint_area, 1.0, 1e-12);

        let top_z: Vec<f64> = out
            .solid
            .triangles_with_material(CAP_MATERIAL)
            .filter(|t| t[0].z == 6.0)
            .map(|t| triangle_normal(t).z)
            .collect();
        assert_eq!(top_z.len(), 2);
        assert!(top_z.iter().all(|z| *z > 0.0));

        let center = out.solid.positions.iter().fold((0.0, 0.0), |acc, p| (acc.0 + p.x, acc.1 + p.y));
        let (cx, cy) = (center.0 / 8.0, center.1 / 8.0);
        for t in out.solid.triangles_with_material(SIDE_MATERIAL) {
            let n = triangle_normal(t);
            let mid = (t[0] + t[1] + t[2]) * (1.0 / 3.0);
            assert!(n.x * (mid.x - cx) + n.y * (mid.y - cy) > 0.0, "side wall faces inward");
        }
    }

    #[test]
    fn concave_cap_covers_the_footprint() {
        let l_shape = ring(&[[0.0, 0.0], [3.0, 0.0], [3.0, 1.0], [1.0, 1.0], [1.0, 3.0], [0.0, 3.0]]);
        let out = extruder().extrude(&l_shape).expect("extrusion");
        assert_close(out.solid.footprint_area, 5.0, 1e-12);

        let top_area: f64 = out
            .solid
            .triangles_with_material(CAP_MATERIAL)
            .filter(|t| t[0].z == 6.0)
            .map(|t| triangle_normal(t).length() * 0.5)
            .sum();
        assert_close(top_area, 5.0, 1e-9);
        assert_eq!(out.solid.heights.iter().filter(|h| **h == 1.0).count(), 6);
    }
}
