use crate::components::{
    CAP_MATERIAL, ComponentBounds, FeatureMetadata, Material, Polyline, SolidMesh, Visibility,
};
use crate::entity::NodeId;
use foundation::handles::Handle;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Plain container (the scene root).
    Group,
    /// Per-region container; owns the region's metadata in the side table.
    Feature,
    /// Extruded ring with cap + side materials.
    Solid,
    /// Edge outline above a solid's top face.
    Outline,
}

/// Scene graph stored as per-node component vectors indexed by `NodeId::index()`.
///
/// Feature metadata lives in a side table keyed by the feature container's
/// id; solids and outlines record only their owning container, so resolving a
/// picked node to its region is two vector lookups.
#[derive(Debug, Default, Clone)]
pub struct SceneGraph {
    next_index: u32,
    kinds: Vec<Option<NodeKind>>,
    parents: Vec<Option<NodeId>>,
    children: Vec<Vec<NodeId>>,
    owners: Vec<Option<NodeId>>,
    visibility: Vec<Option<Visibility>>,
    bounds: Vec<Option<ComponentBounds>>,
    solids: Vec<Option<SolidMesh>>,
    outlines: Vec<Option<Polyline>>,
    materials: Vec<Vec<Material>>,
    base_materials: Vec<Option<Material>>,
    features: Vec<Option<FeatureMetadata>>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(Handle::new(self.next_index, 0));
        self.next_index += 1;
        let idx = id.index() as usize;
        self.ensure_capacity(idx);
        self.kinds[idx] = Some(kind);
        id
    }

    pub fn len(&self) -> usize {
        self.next_index as usize
    }

    pub fn is_empty(&self) -> bool {
        self.next_index == 0
    }

    pub fn contains(&self, node: NodeId) -> bool {
        node.index() < self.next_index && node.0.generation() == 0
    }

    pub fn kind(&self, node: NodeId) -> Option<NodeKind> {
        self.kinds.get(node.index() as usize).and_then(|k| *k)
    }

    /// Attach `child` under `parent`. A child of a feature container (directly
    /// or through intermediate groups) is owned by that container.
    pub fn attach(&mut self, parent: NodeId, child: NodeId) {
        if !self.contains(parent) || !self.contains(child) {
            return;
        }
        let owner = match self.kind(parent) {
            Some(NodeKind::Feature) => Some(parent),
            _ => self.owner(parent),
        };
        let ci = child.index() as usize;
        self.parents[ci] = Some(parent);
        self.owners[ci] = owner;
        self.children[parent.index() as usize].push(child);
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.parents.get(node.index() as usize).and_then(|p| *p)
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.children
            .get(node.index() as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn owner(&self, node: NodeId) -> Option<NodeId> {
        self.owners.get(node.index() as usize).and_then(|o| *o)
    }

    pub fn set_feature(&mut self, node: NodeId, meta: FeatureMetadata) {
        self.ensure_capacity(node.index() as usize);
        self.features[node.index() as usize] = Some(meta);
    }

    pub fn feature(&self, node: NodeId) -> Option<&FeatureMetadata> {
        self.features.get(node.index() as usize)?.as_ref()
    }

    /// Metadata of the region `node` belongs to (a container resolves to itself).
    pub fn owning_feature(&self, node: NodeId) -> Option<(NodeId, &FeatureMetadata)> {
        let container = match self.kind(node)? {
            NodeKind::Feature => node,
            _ => self.owner(node)?,
        };
        self.feature(container).map(|meta| (container, meta))
    }

    /// Feature containers in creation order.
    pub fn feature_nodes(&self) -> Vec<NodeId> {
        self.kinds
            .iter()
            .enumerate()
            .filter(|(_, k)| **k == Some(NodeKind::Feature))
            .map(|(idx, _)| NodeId(Handle::new(idx as u32, 0)))
            .collect()
    }

    pub fn set_solid(&mut self, node: NodeId, mesh: SolidMesh, materials: Vec<Material>) {
        let idx = node.index() as usize;
        self.ensure_capacity(idx);
        self.bounds[idx] = mesh.bounds().map(ComponentBounds::from);
        self.base_materials[idx] = materials.get(CAP_MATERIAL).copied();
        self.materials[idx] = materials;
        self.solids[idx] = Some(mesh);
    }

    pub fn solid(&self, node: NodeId) -> Option<&SolidMesh> {
        self.solids.get(node.index() as usize)?.as_ref()
    }

    pub fn set_outline(&mut self, node: NodeId, line: Polyline, material: Material) {
        let idx = node.index() as usize;
        self.ensure_capacity(idx);
        self.materials[idx] = vec![material];
        self.outlines[idx] = Some(line);
    }

    pub fn outline(&self, node: NodeId) -> Option<&Polyline> {
        self.outlines.get(node.index() as usize)?.as_ref()
    }

    pub fn materials(&self, node: NodeId) -> &[Material] {
        self.materials
            .get(node.index() as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn material(&self, node: NodeId, slot: usize) -> Option<&Material> {
        self.materials.get(node.index() as usize)?.get(slot)
    }

    pub fn material_mut(&mut self, node: NodeId, slot: usize) -> Option<&mut Material> {
        self.materials.get_mut(node.index() as usize)?.get_mut(slot)
    }

    /// Put back the cap material recorded when the solid was built.
    ///
    /// Returns `true` if a material was written.
    pub fn restore_base_material(&mut self, node: NodeId) -> bool {
        let idx = node.index() as usize;
        let Some(base) = self.base_materials.get(idx).copied().flatten() else {
            return false;
        };
        match self.materials.get_mut(idx).and_then(|m| m.get_mut(CAP_MATERIAL)) {
            Some(slot) => {
                *slot = base;
                true
            }
            None => false,
        }
    }

    pub fn set_visibility(&mut self, node: NodeId, visibility: Visibility) {
        self.ensure_capacity(node.index() as usize);
        self.visibility[node.index() as usize] = Some(visibility);
    }

    /// A node is visible when it and every ancestor are visible.
    pub fn is_visible(&self, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(n) = cursor {
            let visible = self
                .visibility
                .get(n.index() as usize)
                .and_then(|v| *v)
                .map(|v| v.visible)
                .unwrap_or(true);
            if !visible {
                return false;
            }
            cursor = self.parent(n);
        }
        true
    }

    pub fn bounds(&self, node: NodeId) -> Option<ComponentBounds> {
        self.bounds.get(node.index() as usize).and_then(|b| *b)
    }

    /// Visible solids whose cap material is pickable, in creation order.
    pub fn pickable_solids(&self) -> Vec<(NodeId, &SolidMesh)> {
        self.solids_by_node()
            .filter(|(node, _)| {
                self.material(*node, CAP_MATERIAL)
                    .is_some_and(|m| m.pickable)
            })
            .collect()
    }

    /// Visible solids in creation order.
    pub fn solids_by_node(&self) -> impl Iterator<Item = (NodeId, &SolidMesh)> + '_ {
        self.solids.iter().enumerate().filter_map(|(idx, s)| {
            let mesh = s.as_ref()?;
            let node = NodeId(Handle::new(idx as u32, 0));
            self.is_visible(node).then_some((node, mesh))
        })
    }

    /// Visible outlines in creation order.
    pub fn outlines_by_node(&self) -> impl Iterator<Item = (NodeId, &Polyline)> + '_ {
        self.outlines.iter().enumerate().filter_map(|(idx, l)| {
            let line = l.as_ref()?;
            let node = NodeId(Handle::new(idx as u32, 0));
            self.is_visible(node).then_some((node, line))
        })
    }

    /// Number of nodes whose cap material is currently in the highlighted state.
    pub fn highlighted_count(&self) -> usize {
        self.materials
            .iter()
            .filter(|m| m.get(CAP_MATERIAL).is_some_and(|m| m.highlighted))
            .count()
    }

    fn ensure_capacity(&mut self, idx: usize) {
        if self.kinds.len() <= idx {
            let new_len = idx + 1;
            self.kinds.resize(new_len, None);
            self.parents.resize(new_len, None);
            self.children.resize_with(new_len, Vec::new);
            self.owners.resize(new_len, None);
            self.visibility.resize(new_len, None);
            self.bounds.resize(new_len, None);
            self.solids.resize_with(new_len, || None);
            self.outlines.resize_with(new_len, || None);
            self.materials.resize_with(new_len, Vec::new);
            self.base_materials.resize(new_len, None);
            self.features.resize_with(new_len, || None);
        }
    }
}
