use formats::GeoFeature;
use foundation::math::{MercatorProjection, ProjectionParams, Vec2};
use scene::entity::NodeId;
use scene::{NodeKind, SceneGraph};

use crate::extrude::{PolygonExtruder, RingError};
use crate::labels::LabelAnchor;
use crate::symbology::MapStyle;

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRing {
    pub code: u32,
    pub ring_index: usize,
    pub error: RingError,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AssemblyReport {
    pub features: usize,
    pub solids: usize,
    pub skipped: Vec<SkippedRing>,
    /// Features whose centroid was absent or did not project.
    pub unlabeled: usize,
}

/// Scene built for one scope; replaced wholesale on the next transition.
#[derive(Debug, Clone)]
pub struct AssembledScene {
    pub graph: SceneGraph,
    pub root: NodeId,
    /// Feature containers, in input order.
    pub features: Vec<NodeId>,
    /// One anchor per feature with a usable centroid, in input order.
    pub labels: Vec<LabelAnchor>,
    pub projection: MercatorProjection,
    pub report: AssemblyReport,
}

/// Projects, extrudes and groups a feature collection into a scene graph.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SceneAssembler {
    style: MapStyle,
    extruder: PolygonExtruder,
}

impl SceneAssembler {
    pub fn new(style: MapStyle) -> Self {
        Self {
            style,
            extruder: PolygonExtruder::new(style.depth, style.outline_z_offset),
        }
    }

    pub fn style(&self) -> &MapStyle {
        &self.style
    }

    pub fn assemble(&self, features: &[GeoFeature], params: ProjectionParams) -> AssembledScene {
        let projection = MercatorProjection::new(params);
        let mut graph = SceneGraph::new();
        let root = graph.spawn(NodeKind::Group);
        let mut containers = Vec::with_capacity(features.len());
        let mut labels = Vec::new();
        let mut report = AssemblyReport {
            features: features.len(),
            ..AssemblyReport::default()
        };

        for feature in features {
            let meta = &feature.meta;
            let container = graph.spawn(NodeKind::Feature);
            graph.attach(root, container);
            graph.set_feature(container, meta.clone());
            containers.push(container);

            match meta.centroid.and_then(|c| projection.project_finite(c)) {
                Some(p) => labels.push(LabelAnchor {
                    feature: container,
                    code: meta.code,
                    name: meta.name.clone(),
                    position: p.extend(self.style.label_z()),
                }),
                None => report.unlabeled += 1,
            }

            for (ring_index, ring) in feature.geometry.rings().enumerate() {
                let extruded = project_ring(&projection, ring).and_then(|pts| self.extruder.extrude(&pts));
                match extruded {
                    Ok(out) => {
                        let solid = graph.spawn(NodeKind::Solid);
                        graph.attach(container, solid);
                        graph.set_solid(solid, out.solid, self.style.region_materials());

                        let outline = graph.spawn(NodeKind::Outline);
                        graph.attach(container, outline);
                        graph.set_outline(outline, out.outline, self.style.outline_material());
                        report.solids += 1;
                    }
                    Err(error) => {
                        tracing::warn!(
                            target: "layers::assemble",
                            code = meta.code,
                            ring_index,
                            %error,
                            "ring skipped"
                        );
                        report.skipped.push(SkippedRing {
                            code: meta.code,
                            ring_index,
                            error,
                        });
                    }
                }
            }
        }

        tracing::debug!(
            target: "layers::assemble",
            features = report.features,
            solids = report.solids,
            skipped = report.skipped.len(),
            labels = labels.len(),
            "scene assembled"
        );

        AssembledScene {
            graph,
            root,
            features: containers,
            labels,
            projection,
            report,
        }
    }
}

fn project_ring(
    projection: &MercatorProjection,
    ring: &[foundation::math::LonLat],
) -> Result<Vec<Vec2>, RingError> {
    ring.iter()
        .enumerate()
        .map(|(index, p)| projection.project_finite(*p).ok_or(RingError::NonFinite { index }))
        .collect()
}
