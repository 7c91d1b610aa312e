use foundation::color::Rgba;
use foundation::math::Vec3;
use runtime::frame::Frame;
use scene::SceneGraph;
use scene::camera::{PerspectiveCamera, Viewport};
use scene::components::{CAP_MATERIAL, Material, MaterialKind, SIDE_MATERIAL};
use scene::entity::NodeId;

#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand {
    /// Extruded region solid: cap slot plus gradient side slot.
    Solid {
        node: NodeId,
        triangles: usize,
        cap: Material,
        side: Material,
        /// Side-wall color per vertex, sampled from `side` at the vertex height.
        side_colors: Vec<Rgba>,
    },
    /// Screen-space line; `width_px` is converted with the frame's line resolution.
    Line {
        points: Vec<Vec3>,
        closed: bool,
        color: Rgba,
        width_px: f32,
    },
    Disc {
        center: Vec3,
        radius: f64,
        color: Rgba,
        opacity: f32,
    },
    Ring {
        center: Vec3,
        inner: f64,
        outer: f64,
        color: Rgba,
        opacity: f32,
    },
    Radar {
        center: Vec3,
        radius: f64,
        angle: f64,
        sweep_width: f64,
        color: Rgba,
        opacity: f32,
    },
    Label {
        text: String,
        screen_px: [f32; 2],
    },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderFrame {
    pub frame_index: u64,
    pub commands: Vec<RenderCommand>,
    /// Drawing-buffer size used to keep line widths constant in pixels.
    pub line_resolution: [u32; 2],
}

impl RenderFrame {
    pub fn push(&mut self, command: RenderCommand) {
        self.commands.push(command);
    }

    pub fn count(&self, pred: impl Fn(&RenderCommand) -> bool) -> usize {
        self.commands.iter().filter(|c| pred(c)).count()
    }
}

/// Whatever actually puts pixels on a surface.
pub trait RenderBackend {
    fn resize(&mut self, physical_size: [u32; 2]);
    fn submit(&mut self, camera: &PerspectiveCamera, frame: &RenderFrame);
}

/// Backend that keeps the submitted frames; used headless and in tests.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    pub size: [u32; 2],
    pub resizes: u64,
    pub frames: Vec<RenderFrame>,
    /// Frames kept; older ones are dropped. Zero keeps everything.
    pub keep: usize,
}

impl RecordingBackend {
    pub fn keeping(keep: usize) -> Self {
        Self {
            keep,
            ..Self::default()
        }
    }

    pub fn last(&self) -> Option<&RenderFrame> {
        self.frames.last()
    }
}

impl RenderBackend for RecordingBackend {
    fn resize(&mut self, physical_size: [u32; 2]) {
        self.size = physical_size;
        self.resizes += 1;
    }

    fn submit(&mut self, _camera: &PerspectiveCamera, frame: &RenderFrame) {
        self.frames.push(frame.clone());
        if self.keep > 0 && self.frames.len() > self.keep {
            let excess = self.frames.len() - self.keep;
            self.frames.drain(..excess);
        }
    }
}

pub struct Renderer<B: RenderBackend> {
    backend: B,
    camera: PerspectiveCamera,
    viewport: Viewport,
}

impl<B: RenderBackend> Renderer<B> {
    pub fn new(mut backend: B, mut camera: PerspectiveCamera, viewport: Viewport) -> Self {
        camera.set_aspect(viewport.aspect());
        backend.resize(viewport.physical_size());
        Self {
            backend,
            camera,
            viewport,
        }
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn line_resolution(&self) -> [u32; 2] {
        self.viewport.physical_size()
    }

    /// Re-derive camera aspect, output size and line resolution.
    ///
    /// Returns `false` (and does nothing) when the viewport is unchanged.
    pub fn resize(&mut self, viewport: Viewport) -> bool {
        if viewport == self.viewport {
            return false;
        }
        self.viewport = viewport;
        self.camera.set_aspect(viewport.aspect());
        self.backend.resize(viewport.physical_size());
        tracing::debug!(
            target: "gpu::renderer",
            width = viewport.width_px,
            height = viewport.height_px,
            pixel_ratio = viewport.pixel_ratio,
            "viewport resized"
        );
        true
    }

    pub fn begin_frame(&self, frame: &Frame) -> RenderFrame {
        RenderFrame {
            frame_index: frame.index,
            commands: Vec::new(),
            line_resolution: self.line_resolution(),
        }
    }

    pub fn submit(&mut self, frame: &RenderFrame) {
        self.backend.submit(&self.camera, frame);
    }
}

/// Emit draw commands for every visible solid and outline, in node order.
pub fn collect_scene(graph: &SceneGraph, out: &mut RenderFrame) {
    for (node, mesh) in graph.solids_by_node() {
        let (Some(cap), Some(side)) = (
            graph.material(node, CAP_MATERIAL),
            graph.material(node, SIDE_MATERIAL),
        ) else {
            continue;
        };
        out.push(RenderCommand::Solid {
            node,
            triangles: mesh.triangles.len(),
            cap: *cap,
            side: *side,
            side_colors: mesh.heights.iter().map(|h| side.color_at(*h)).collect(),
        });
    }
    for (node, line) in graph.outlines_by_node() {
        let Some(material) = graph.material(node, 0) else {
            continue;
        };
        let width_px = match material.kind {
            MaterialKind::Line { width_px } => width_px,
            _ => 1.0,
        };
        out.push(RenderCommand::Line {
            points: line.points.clone(),
            closed: line.closed,
            color: material.color,
            width_px,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::{RecordingBackend, RenderCommand, RenderFrame, Renderer, collect_scene};
    use foundation::color::Rgba;
    use foundation::math::Vec3;
    use runtime::frame::Frame;
    use scene::camera::{PerspectiveCamera, Viewport};
    use scene::components::{Material, MeshGroup, Polyline, SolidMesh};
    use scene::{NodeKind, SceneGraph};

    fn camera() -> PerspectiveCamera {
        PerspectiveCamera::look_at(
            Vec3::new(-10.0, -90.0, 130.0),
            Vec3::ZERO,
            Vec3::new(0.0, 0.0, 1.0),
            30.0,
            0.1,
            1000.0,
        )
    }

    #[test]
    fn resize_is_idempotent() {
        let mut renderer = Renderer::new(RecordingBackend::default(), camera(), Viewport::new(800.0, 600.0, 1.0));
        assert_eq!(renderer.backend().resizes, 1);

        let wide = Viewport::new(1600.0, 600.0, 2.0);
        assert!(renderer.resize(wide));
        assert!(!renderer.resize(wide));
        assert_eq!(renderer.backend().resizes, 2);
        assert_eq!(renderer.backend().size, [3200, 1200]);
        assert_eq!(renderer.line_resolution(), [3200, 1200]);
        assert!((renderer.camera().aspect - 1600.0 / 600.0).abs() < 1e-12);
    }

    #[test]
    fn collects_solids_and_outlines() {
        let mut graph = SceneGraph::new();
        let root = graph.spawn(NodeKind::Group);
        let solid = graph.spawn(NodeKind::Solid);
        graph.attach(root, solid);
        graph.set_solid(
            solid,
            SolidMesh {
                positions: vec![Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0)],
                heights: vec![0.0; 3],
                triangles: vec![[0, 1, 2]],
                groups: vec![MeshGroup { start: 0, count: 1, material: 0 }],
                footprint_area: 0.5,
                depth: 0.0,
            },
            vec![
                Material::cap(Rgba::WHITE, 1.0),
                Material::side_gradient(Rgba::WHITE, Rgba::WHITE),
            ],
        );
        let outline = graph.spawn(NodeKind::Outline);
        graph.attach(root, outline);
        graph.set_outline(
            outline,
            Polyline { points: vec![Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0)], closed: true },
            Material::line(Rgba::WHITE, 3.0),
        );

        let mut renderer = Renderer::new(RecordingBackend::default(), camera(), Viewport::default());
        let mut frame = renderer.begin_frame(&Frame::first(1.0 / 60.0));
        collect_scene(&graph, &mut frame);
        assert_eq!(frame.count(|c| matches!(c, RenderCommand::Solid { triangles: 1, .. })), 1);
        assert_eq!(frame.count(|c| matches!(c, RenderCommand::Line { width_px, .. } if *width_px == 3.0)), 1);
        renderer.submit(&frame);
        assert_eq!(renderer.backend().last(), Some(&frame));
    }

    #[test]
    fn side_wall_gradient_follows_vertex_height() {
        let bottom = Rgba::from_hex("#3F9FF3").unwrap();
        let top = Rgba::from_hex("#266BF0").unwrap();
        let mut graph = SceneGraph::new();
        let solid = graph.spawn(NodeKind::Solid);
        graph.set_solid(
            solid,
            SolidMesh {
                positions: vec![
                    Vec3::ZERO,
                    Vec3::new(1.0, 0.0, 0.0),
                    Vec3::new(1.0, 0.0, 6.0),
                    Vec3::new(0.0, 0.0, 6.0),
                ],
                heights: vec![0.0, 0.0, 1.0, 1.0],
                triangles: vec![[0, 1, 2], [0, 2, 3]],
                groups: vec![MeshGroup { start: 0, count: 2, material: 1 }],
                footprint_area: 0.0,
                depth: 6.0,
            },
            vec![Material::cap(Rgba::WHITE, 0.9), Material::side_gradient(bottom, top)],
        );

        let mut frame = RenderFrame::default();
        collect_scene(&graph, &mut frame);
        let Some(RenderCommand::Solid { side_colors, .. }) = frame.commands.first() else {
            panic!("expected a solid, got {:?}", frame.commands);
        };
        assert_eq!(side_colors, &vec![bottom, bottom, top, top]);
    }
}
