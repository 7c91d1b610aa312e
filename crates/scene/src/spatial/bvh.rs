use foundation::bounds::Aabb3;
use foundation::math::precision::stable_total_cmp_f64;

use crate::entity::NodeId;

/// Bounding volume hierarchy over node bounds, rebuilt with each scene.
///
/// Ordering contract:
/// - queries return nodes in ascending `NodeId::index()` order, independent of
///   the order items were supplied in.
#[derive(Debug, Clone, Default)]
pub struct Bvh {
    nodes: Vec<Node>,
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        bounds: Aabb3,
        items: Vec<Item>,
    },
    Internal {
        bounds: Aabb3,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Item {
    pub node: NodeId,
    pub bounds: Aabb3,
}

const LEAF_MAX: usize = 8;

impl Bvh {
    pub fn build(mut items: Vec<Item>) -> Self {
        let mut nodes = Vec::new();
        if !items.is_empty() {
            build_node(&mut nodes, &mut items);
        }
        Self { nodes }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes whose bounds a ray hits within `[t_min, t_max]`.
    ///
    /// `dir` does not need to be normalized; `t` is measured in units of `dir`.
    pub fn query_ray(&self, origin: [f64; 3], dir: [f64; 3], t_min: f64, t_max: f64) -> Vec<NodeId> {
        let mut hits = Vec::new();
        if self.nodes.is_empty() {
            return hits;
        }

        let mut stack = vec![0usize];
        while let Some(idx) = stack.pop() {
            match &self.nodes[idx] {
                Node::Leaf { bounds, items } => {
                    if ray_aabb_entry(origin, dir, bounds, t_min, t_max).is_none() {
                        continue;
                    }
                    hits.extend(
                        items
                            .iter()
                            .filter(|item| {
                                ray_aabb_entry(origin, dir, &item.bounds, t_min, t_max).is_some()
                            })
                            .map(|item| item.node),
                    );
                }
                Node::Internal { bounds, left, right } => {
                    if ray_aabb_entry(origin, dir, bounds, t_min, t_max).is_none() {
                        continue;
                    }
                    stack.push(*right);
                    stack.push(*left);
                }
            }
        }

        hits.sort_by_key(|n| n.index());
        hits.dedup();
        hits
    }
}

fn build_node(nodes: &mut Vec<Node>, items: &mut [Item]) -> usize {
    let bounds = bounds_for_items(items);
    if items.len() <= LEAF_MAX {
        let idx = nodes.len();
        nodes.push(Node::Leaf {
            bounds,
            items: items.to_vec(),
        });
        return idx;
    }

    let axis = split_axis(&bounds);
    items.sort_by(|a, b| {
        let ca = centroid_axis(&a.bounds, axis);
        let cb = centroid_axis(&b.bounds, axis);
        stable_total_cmp_f64(ca, cb).then_with(|| a.node.index().cmp(&b.node.index()))
    });

    let mid = items.len() / 2;
    let (left_items, right_items) = items.split_at_mut(mid);

    let idx = nodes.len();
    // Patched once both children exist.
    nodes.push(Node::Leaf {
        bounds,
        items: Vec::new(),
    });
    let left = build_node(nodes, left_items);
    let right = build_node(nodes, right_items);
    nodes[idx] = Node::Internal { bounds, left, right };
    idx
}

fn centroid_axis(aabb: &Aabb3, axis: usize) -> f64 {
    (aabb.min[axis] + aabb.max[axis]) * 0.5
}

fn split_axis(bounds: &Aabb3) -> usize {
    let ex = bounds.max[0] - bounds.min[0];
    let ey = bounds.max[1] - bounds.min[1];
    let ez = bounds.max[2] - bounds.min[2];
    // Prefer X, then Y, then Z on ties.
    if ex >= ey && ex >= ez {
        0
    } else if ey >= ez {
        1
    } else {
        2
    }
}

fn bounds_for_items(items: &[Item]) -> Aabb3 {
    items[1..]
        .iter()
        .fold(items[0].bounds, |acc, item| acc.union(&item.bounds))
}

/// Slab test; returns the entry parameter clamped to `t_min`.
pub fn ray_aabb_entry(
    origin: [f64; 3],
    dir: [f64; 3],
    aabb: &Aabb3,
    mut t_min: f64,
    mut t_max: f64,
) -> Option<f64> {
    for axis in 0..3 {
        let o = origin[axis];
        let d = dir[axis];
        let min = aabb.min[axis];
        let max = aabb.max[axis];

        if d.abs() < 1e-12 {
            if o < min || o > max {
                return None;
            }
            continue;
        }

        let inv = 1.0 / d;
        let mut t1 = (min - o) * inv;
        let mut t2 = (max - o) * inv;
        if t1 > t2 {
            std::mem::swap(&mut t1, &mut t2);
        }

        t_min = t_min.max(t1);
        t_max = t_max.min(t2);
        if t_max < t_min {
            return None;
        }
    }
    Some(t_min)
}

#[cfg(test)]
mod tests {
    use super::{Bvh, Item, ray_aabb_entry};
    use crate::entity::NodeId;
    use foundation::bounds::Aabb3;
    use foundation::handles::Handle;

    fn n(idx: u32) -> NodeId {
        NodeId(Handle::new(idx, 0))
    }

    fn column(idx: u32, x: f64) -> Item {
        Item {
            node: n(idx),
            bounds: Aabb3::new([x, 0.0, 0.0], [x + 1.0, 1.0, 6.0]),
        }
    }

    #[test]
    fn vertical_ray_finds_only_the_column_below() {
        let items: Vec<Item> = (0..20).map(|i| column(i, i as f64 * 2.0)).collect();
        let bvh = Bvh::build(items);
        let hits = bvh.query_ray([10.5, 0.5, 100.0], [0.0, 0.0, -1.0], 0.0, f64::INFINITY);
        assert_eq!(hits, vec![n(5)]);
    }

    #[test]
    fn results_do_not_depend_on_input_order() {
        let a: Vec<Item> = (0..12).map(|i| column(i, 0.0)).collect();
        let mut b = a.clone();
        b.reverse();
        let ray = ([0.5, 0.5, 50.0], [0.0, 0.0, -1.0]);
        let ha = Bvh::build(a).query_ray(ray.0, ray.1, 0.0, f64::INFINITY);
        let hb = Bvh::build(b).query_ray(ray.0, ray.1, 0.0, f64::INFINITY);
        assert_eq!(ha, hb);
        assert_eq!(ha.len(), 12);
        assert_eq!(ha[0], n(0));
    }

    #[test]
    fn slab_entry_distance() {
        let b = Aabb3::new([4.0, -1.0, -1.0], [6.0, 1.0, 1.0]);
        assert_eq!(ray_aabb_entry([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], &b, 0.0, 100.0), Some(4.0));
        assert_eq!(ray_aabb_entry([0.0, 5.0, 0.0], [1.0, 0.0, 0.0], &b, 0.0, 100.0), None);
        assert!(Bvh::build(Vec::new()).is_empty());
    }
}
