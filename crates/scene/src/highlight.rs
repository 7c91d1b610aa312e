use foundation::color::Rgba;

use crate::components::CAP_MATERIAL;
use crate::entity::NodeId;
use crate::graph::SceneGraph;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct HighlightStyle {
    pub color: Rgba,
    pub opacity: f32,
}

impl Default for HighlightStyle {
    fn default() -> Self {
        Self {
            color: Rgba::new(0.251, 0.620, 0.976, 1.0),
            opacity: 1.0,
        }
    }
}

/// The single currently highlighted pickable node.
///
/// Invariant: at most one cap material carries the highlighted state; the
/// previous node is restored before the next one is painted.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HighlightState {
    current: Option<NodeId>,
    restores: u64,
    applies: u64,
}

impl HighlightState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<NodeId> {
        self.current
    }

    /// Material restores performed so far.
    pub fn restores(&self) -> u64 {
        self.restores
    }

    /// Highlight applications performed so far.
    pub fn applies(&self) -> u64 {
        self.applies
    }

    /// Move the highlight to `next` (or clear it). Returns `true` if the
    /// highlighted node changed; an unchanged target touches no material.
    pub fn transition(
        &mut self,
        graph: &mut SceneGraph,
        next: Option<NodeId>,
        style: &HighlightStyle,
    ) -> bool {
        if self.current == next {
            return false;
        }

        if let Some(prev) = self.current.take()
            && graph.restore_base_material(prev)
        {
            self.restores += 1;
        }

        if let Some(node) = next
            && let Some(cap) = graph.material_mut(node, CAP_MATERIAL)
        {
            cap.color = style.color;
            cap.opacity = style.opacity;
            cap.highlighted = true;
            self.current = Some(node);
            self.applies += 1;
        }
        true
    }

    /// Drop the pointer without touching materials; used when the scene it
    /// referred to has been discarded.
    pub fn forget(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::{HighlightState, HighlightStyle};
    use crate::components::CAP_MATERIAL;
    use crate::graph::tests::add_region;
    use crate::graph::{NodeKind, SceneGraph};

    #[test]
    fn restore_happens_before_apply() {
        let mut graph = SceneGraph::new();
        let root = graph.spawn(NodeKind::Group);
        let (_, a) = add_region(&mut graph, root, 1, [0.0, 0.0, 1.0, 1.0]);
        let (_, b) = add_region(&mut graph, root, 2, [2.0, 0.0, 3.0, 1.0]);
        let style = HighlightStyle::default();
        let mut state = HighlightState::new();

        assert!(state.transition(&mut graph, Some(a), &style));
        assert_eq!(graph.material(a, CAP_MATERIAL).unwrap().color, style.color);
        assert!(state.transition(&mut graph, Some(b), &style));
        assert!(!graph.material(a, CAP_MATERIAL).unwrap().highlighted);
        assert!(graph.material(b, CAP_MATERIAL).unwrap().highlighted);
        assert_eq!(graph.highlighted_count(), 1);
        assert_eq!(state.restores(), 1);

        assert!(state.transition(&mut graph, None, &style));
        assert_eq!(graph.highlighted_count(), 0);
        assert_eq!(state.current(), None);
    }

    #[test]
    fn same_target_is_a_no_op() {
        let mut graph = SceneGraph::new();
        let root = graph.spawn(NodeKind::Group);
        let (_, a) = add_region(&mut graph, root, 1, [0.0, 0.0, 1.0, 1.0]);
        let style = HighlightStyle::default();
        let mut state = HighlightState::new();

        state.transition(&mut graph, Some(a), &style);
        assert!(!state.transition(&mut graph, Some(a), &style));
        assert_eq!(state.applies(), 1);
        assert_eq!(state.restores(), 0);
    }
}
