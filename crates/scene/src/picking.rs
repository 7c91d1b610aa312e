use foundation::math::Vec3;
use foundation::math::precision::stable_total_cmp_f64;

use crate::camera::{PerspectiveCamera, Viewport};
use crate::components::{CAP_MATERIAL, FeatureMetadata};
use crate::entity::NodeId;
use crate::graph::SceneGraph;
use crate::highlight::{HighlightState, HighlightStyle};
use crate::spatial::{Bvh, Item as BvhItem};

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub dir: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, dir: Vec3) -> Self {
        Self { origin, dir }
    }

    pub fn at(&self, t: f64) -> Vec3 {
        self.origin + self.dir * t
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PickHit {
    /// Solid whose cap was hit.
    pub node: NodeId,
    /// Feature container owning `node`.
    pub feature: NodeId,
    pub distance: f64,
    pub point: Vec3,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PickOptions {
    pub max_distance: f64,
}

impl Default for PickOptions {
    fn default() -> Self {
        Self {
            max_distance: 1.0e30,
        }
    }
}

/// Broadphase over the pickable solids of one scene.
///
/// Built once per scene; solids hidden after the build are skipped at query
/// time, solids added or shown afterwards need a rebuild.
#[derive(Debug, Clone, Default)]
pub struct PickIndex {
    bvh: Bvh,
}

impl PickIndex {
    pub fn build(graph: &SceneGraph) -> Self {
        let items: Vec<BvhItem> = graph
            .pickable_solids()
            .into_iter()
            .filter_map(|(node, _)| {
                let b = graph.bounds(node)?;
                Some(BvhItem {
                    node,
                    bounds: b.as_aabb(),
                })
            })
            .collect();
        Self {
            bvh: Bvh::build(items),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bvh.is_empty()
    }
}

/// Deterministic ray picking against extruded region caps.
///
/// Ordering contract:
/// - The closest cap triangle along the (normalized) ray wins.
/// - If multiple solids are hit at the same distance, the lower `NodeId::index()` wins.
///
/// Notes:
/// - Only triangles drawn with the cap material slot are tested; side walls
///   and outlines never produce a hit.
/// - Hidden solids and solids without an owning feature are ignored.
/// - Triangles are two-sided.
pub fn pick_ray(
    graph: &SceneGraph,
    index: &PickIndex,
    ray: Ray,
    opts: PickOptions,
) -> Option<PickHit> {
    let dir = ray.dir.normalize()?;
    if !ray.origin.is_finite() || index.is_empty() {
        return None;
    }

    let origin = ray.origin.as_array();
    let dir_a = dir.as_array();

    let mut best: Option<(f64, NodeId, NodeId)> = None;

    for node in index.bvh.query_ray(origin, dir_a, 0.0, opts.max_distance) {
        if !graph.is_visible(node) {
            continue;
        }
        let Some(mesh) = graph.solid(node) else {
            continue;
        };
        let Some((feature, _)) = graph.owning_feature(node) else {
            continue;
        };

        let Some(t) = mesh
            .triangles_with_material(CAP_MATERIAL)
            .filter_map(|tri| ray_triangle_t(ray.origin, dir, tri))
            .filter(|t| *t <= opts.max_distance)
            .min_by(|a, b| stable_total_cmp_f64(*a, *b))
        else {
            continue;
        };

        best = match best {
            None => Some((t, node, feature)),
            Some((bt, bn, bf)) => {
                let ord = stable_total_cmp_f64(t, bt).then_with(|| node.index().cmp(&bn.index()));
                if ord.is_lt() {
                    Some((t, node, feature))
                } else {
                    Some((bt, bn, bf))
                }
            }
        };
    }

    let (t, node, feature) = best?;
    Some(PickHit {
        node,
        feature,
        distance: t,
        point: ray.origin + dir * t,
    })
}

/// Möller–Trumbore, two-sided. Returns the ray parameter of the hit.
fn ray_triangle_t(origin: Vec3, dir: Vec3, tri: [Vec3; 3]) -> Option<f64> {
    const EPS: f64 = 1e-12;
    let [a, b, c] = tri;
    let e1 = b - a;
    let e2 = c - a;
    let p = dir.cross(e2);
    let det = e1.dot(p);
    if det.abs() < EPS {
        return None;
    }
    let inv = 1.0 / det;
    let s = origin - a;
    let u = s.dot(p) * inv;
    if !(-EPS..=1.0 + EPS).contains(&u) {
        return None;
    }
    let q = s.cross(e1);
    let v = dir.dot(q) * inv;
    if v < -EPS || u + v > 1.0 + EPS {
        return None;
    }
    let t = e2.dot(q) * inv;
    (t >= 0.0).then_some(t)
}

/// Result of resolving the current pointer ray as a hover.
#[derive(Debug, Clone, PartialEq)]
pub struct Hover {
    pub feature: Option<FeatureMetadata>,
    /// The hovered feature changed. Moving between solids of one feature
    /// moves the highlight but leaves this `false`.
    pub changed: bool,
}

/// Pointer-driven hover highlighting and activation over one scene.
///
/// The controller keeps the latest pointer ray. Hover resolution moves the
/// single highlight; activation only reports what is under the pointer.
#[derive(Debug, Clone, Default)]
pub struct PickingController {
    pointer_px: Option<[f64; 2]>,
    ray: Option<Ray>,
    index: PickIndex,
    hovered: Option<NodeId>,
    highlight: HighlightState,
    style: HighlightStyle,
    opts: PickOptions,
}

impl PickingController {
    pub fn new(style: HighlightStyle) -> Self {
        Self {
            style,
            ..Self::default()
        }
    }

    pub fn style(&self) -> &HighlightStyle {
        &self.style
    }

    pub fn ray(&self) -> Option<Ray> {
        self.ray
    }

    pub fn pointer_px(&self) -> Option<[f64; 2]> {
        self.pointer_px
    }

    pub fn highlighted(&self) -> Option<NodeId> {
        self.highlight.current()
    }

    /// Feature container currently hovered.
    pub fn hovered(&self) -> Option<NodeId> {
        self.hovered
    }

    pub fn highlight_state(&self) -> &HighlightState {
        &self.highlight
    }

    /// Record a pointer position (CSS pixels) and rebuild the pointer ray.
    pub fn update_ray(
        &mut self,
        pointer_px: [f64; 2],
        camera: &PerspectiveCamera,
        viewport: &Viewport,
    ) -> Option<Ray> {
        self.pointer_px = Some(pointer_px);
        self.refresh_ray(camera, viewport)
    }

    /// Rebuild the ray for the last pointer position, e.g. after a resize.
    pub fn refresh_ray(&mut self, camera: &PerspectiveCamera, viewport: &Viewport) -> Option<Ray> {
        self.ray = self
            .pointer_px
            .and_then(|[x, y]| viewport.pointer_to_ndc(x, y))
            .and_then(|ndc| camera.ray_from_ndc(ndc));
        self.ray
    }

    pub fn set_ray(&mut self, ray: Option<Ray>) {
        self.ray = ray;
    }

    /// Pointer left the surface.
    pub fn clear_pointer(&mut self) {
        self.pointer_px = None;
        self.ray = None;
    }

    pub fn pick(&self, graph: &SceneGraph) -> Option<PickHit> {
        pick_ray(graph, &self.index, self.ray?, self.opts)
    }

    /// Move the highlight to whatever cap is under the pointer.
    ///
    /// Idempotent: hovering the same solid again performs no material writes.
    /// A miss restores the previously highlighted solid.
    pub fn resolve_hover(&mut self, graph: &mut SceneGraph) -> Hover {
        let hit = self.pick(graph);
        let next = hit.map(|h| h.node);
        if self.highlight.transition(graph, next, &self.style) {
            tracing::trace!(target: "scene::picking", ?next, "highlight moved");
        }
        let hovered = hit.map(|h| h.feature);
        let changed = hovered != self.hovered;
        self.hovered = hovered;
        let feature = hit
            .and_then(|h| graph.feature(h.feature))
            .cloned();
        Hover { feature, changed }
    }

    /// Metadata of the feature under the pointer, without touching the highlight.
    pub fn resolve_activation(&self, graph: &SceneGraph) -> Option<FeatureMetadata> {
        let hit = self.pick(graph)?;
        graph.feature(hit.feature).cloned()
    }

    /// Rebind to a freshly built scene: index its solids and forget the old
    /// highlight. Returns the feature that was hovered in the old scene.
    pub fn reset(&mut self, graph: &SceneGraph) -> Option<NodeId> {
        self.highlight.forget();
        self.index = PickIndex::build(graph);
        self.hovered.take()
    }
}
