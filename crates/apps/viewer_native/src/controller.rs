//! Single-threaded map controller.
//!
//! Input handlers only record state (pointer ray, pending transitions);
//! [`MapController::tick`] runs the update step (hover resolution, decoration
//! advance) and then the render step. Fetch responses come back through
//! [`MapController::deliver`] and replace the scene in one step.

use formats::{ConfigError, MapConfig, RegionCollection};
use foundation::math::{LonLat, Vec3};
use gpu::{RenderBackend, RenderCommand, Renderer, collect_scene};
use layers::decor::{FlightLayer, RadarLayer, SpotLayer};
use layers::labels::{CameraProjector, LabelLayoutConfig, LabelStyle, layout_labels_2d};
use layers::{AssembledScene, Layer, MapStyle, SceneAssembler};
use runtime::{Event, EventBus, Frame, Metrics};
use scene::camera::{PerspectiveCamera, Viewport};
use scene::components::FeatureMetadata;
use scene::highlight::HighlightStyle;
use scene::picking::PickingController;
use streaming::{
    DrillDown, NavigationScope, NavigationStateMachine, NoDetailReason, Request, ScaleTable,
    Transition, TransitionOutcome,
};

use crate::source::FetchError;

const RADAR_LAYER: u64 = 1;
const SPOT_LAYER: u64 = 2;
const FLIGHT_LAYER: u64 = 3;

/// What the UI shell (tooltip, status line) gets to see.
#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    HoverChanged(Option<FeatureMetadata>),
    Activated(FeatureMetadata),
    TransitionRequested {
        request: Request,
        code: u32,
    },
    ScopeChanged {
        code: u32,
        features: usize,
        solids: usize,
        skipped: usize,
        digest: String,
    },
    NoFurtherDetail {
        code: u32,
        reason: NoDetailReason,
    },
    StaleDiscarded {
        request: Request,
    },
    FetchFailed {
        request: Request,
        code: u32,
        message: String,
    },
}

pub struct MapController<B: RenderBackend> {
    config: MapConfig,
    assembler: SceneAssembler,
    scene: Option<AssembledScene>,
    picking: PickingController,
    navigation: NavigationStateMachine,
    renderer: Renderer<B>,
    radar: RadarLayer,
    spots: SpotLayer,
    flights: FlightLayer,
    label_style: LabelStyle,
    frame: Frame,
    events: EventBus<MapEvent>,
    metrics: Metrics,
}

impl<B: RenderBackend> MapController<B> {
    pub fn new(config: MapConfig, backend: B, viewport: Viewport) -> Result<Self, ConfigError> {
        config.validate()?;
        let root = NavigationScope::root(config.root_code, config.projection_params()?);
        let scales = ScaleTable::from_entries(config.scale_entries()?);
        let style = MapStyle::from_config(&config);

        let cam = &config.camera;
        let camera = PerspectiveCamera::look_at(
            vec3(cam.position),
            vec3(cam.target),
            vec3(cam.up),
            cam.fov_y_deg,
            cam.near,
            cam.far,
        );

        Ok(Self {
            assembler: SceneAssembler::new(style),
            scene: None,
            picking: PickingController::new(style.highlight()),
            navigation: NavigationStateMachine::new(root, scales),
            renderer: Renderer::new(backend, camera, viewport),
            radar: RadarLayer::new(RADAR_LAYER, config.radars.clone()),
            spots: SpotLayer::new(SPOT_LAYER, config.spot.clone(), Vec::new()),
            flights: FlightLayer::new(FLIGHT_LAYER, Vec::new(), config.spot.ring_color.rgba()),
            label_style: LabelStyle::default(),
            frame: Frame::first(0.0),
            events: EventBus::new(),
            metrics: Metrics::new(),
            config,
        })
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn style(&self) -> &MapStyle {
        self.assembler.style()
    }

    pub fn highlight_style(&self) -> &HighlightStyle {
        self.picking.style()
    }

    /// Most recently attached scene; `None` until the first fetch lands.
    pub fn scene(&self) -> Option<&AssembledScene> {
        self.scene.as_ref()
    }

    pub fn picking(&self) -> &PickingController {
        &self.picking
    }

    pub fn navigation(&self) -> &NavigationStateMachine {
        &self.navigation
    }

    pub fn renderer(&self) -> &Renderer<B> {
        &self.renderer
    }

    pub fn spots(&self) -> &SpotLayer {
        &self.spots
    }

    pub fn flights(&self) -> &FlightLayer {
        &self.flights
    }

    pub fn radar(&self) -> &RadarLayer {
        &self.radar
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn frame(&self) -> Frame {
        self.frame
    }

    pub fn events(&self) -> &[Event<MapEvent>] {
        self.events.events()
    }

    pub fn drain_events(&mut self) -> Vec<Event<MapEvent>> {
        self.events.drain()
    }

    /// Request the root scope. The caller fetches it and hands the result to
    /// [`MapController::deliver`].
    pub fn start(&mut self) -> Transition {
        let root = self.navigation.root().clone();
        self.request(root)
    }

    /// Request an arbitrary scope, superseding whatever is pending.
    pub fn request(&mut self, scope: NavigationScope) -> Transition {
        let transition = self.navigation.request_scope(scope);
        self.emit_requested(&transition);
        transition
    }

    pub fn pointer_moved(&mut self, x_px: f64, y_px: f64) {
        self.picking
            .update_ray([x_px, y_px], self.renderer.camera(), self.renderer.viewport());
    }

    pub fn pointer_left(&mut self) {
        self.picking.clear_pointer();
    }

    /// Resolve the feature under the pointer and start a drill-down into it.
    ///
    /// Returns the transition to fetch, or `None` on a miss or a leaf.
    pub fn double_clicked(&mut self, x_px: f64, y_px: f64) -> Option<Transition> {
        self.pointer_moved(x_px, y_px);
        let meta = self
            .scene
            .as_ref()
            .and_then(|scene| self.picking.resolve_activation(&scene.graph))?;
        self.events.emit(self.frame, MapEvent::Activated(meta.clone()));

        match self.navigation.request_drill_down(&meta) {
            DrillDown::Requested(transition) => {
                self.emit_requested(&transition);
                Some(transition)
            }
            DrillDown::NoFurtherDetail { code, reason } => {
                self.metrics.inc_counter("navigation.no_detail", 1);
                self.events
                    .emit(self.frame, MapEvent::NoFurtherDetail { code, reason });
                None
            }
        }
    }

    /// Re-derive camera aspect, output size and line resolution, then the
    /// pointer ray. Returns `false` for an unchanged viewport.
    pub fn resized(&mut self, viewport: Viewport) -> bool {
        if !self.renderer.resize(viewport) {
            return false;
        }
        self.picking
            .refresh_ray(self.renderer.camera(), self.renderer.viewport());
        true
    }

    /// Hand back the outcome of a fetch started for `request`.
    ///
    /// Returns `true` when the response replaced the scene.
    pub fn deliver(&mut self, request: Request, result: Result<RegionCollection, FetchError>) -> bool {
        let doc = match result {
            Ok(doc) => doc,
            Err(err) => {
                let code = self.navigation.pending().map(|t| t.scope.code);
                match code {
                    Some(code) if self.navigation.fail(request) => {
                        tracing::warn!(
                            target: "viewer_native::controller",
                            request = request.0,
                            code,
                            error = %err,
                            "scope fetch failed"
                        );
                        self.metrics.inc_counter("fetch.failed", 1);
                        self.events.emit(
                            self.frame,
                            MapEvent::FetchFailed {
                                request,
                                code,
                                message: err.to_string(),
                            },
                        );
                    }
                    _ => self.discard_stale(request),
                }
                return false;
            }
        };

        match self.navigation.accept(request) {
            TransitionOutcome::Stale => {
                self.discard_stale(request);
                false
            }
            TransitionOutcome::Accepted(scope) => {
                let assembled = self.assembler.assemble(&doc.features, scope.params);
                self.attach(scope, assembled, doc.digest);
                true
            }
        }
    }

    /// One display refresh: update step, then render step.
    pub fn tick(&mut self, dt_s: f64) {
        self.frame = self.frame.next(dt_s);
        self.update();
        self.render();
    }

    /// Pixel under which `code`'s centroid sits on the top face.
    pub fn feature_screen_px(&self, code: u32) -> Option<[f64; 2]> {
        let scene = self.scene.as_ref()?;
        let centroid = scene
            .graph
            .feature_nodes()
            .into_iter()
            .filter_map(|node| scene.graph.feature(node))
            .find(|meta| meta.code == code)?
            .centroid?;
        let planar = scene.projection.project_finite(centroid)?;
        self.renderer.camera().project_to_screen(
            planar.extend(self.style().depth),
            self.renderer.viewport(),
        )
    }

    fn update(&mut self) {
        self.picking
            .refresh_ray(self.renderer.camera(), self.renderer.viewport());
        if let Some(scene) = self.scene.as_mut() {
            let hover = self.picking.resolve_hover(&mut scene.graph);
            if hover.changed {
                self.metrics.inc_counter("hover.changes", 1);
                self.events
                    .emit(self.frame, MapEvent::HoverChanged(hover.feature));
            }
        }
        let frame = self.frame;
        for layer in self.decor_mut() {
            layer.update(&frame);
        }
    }

    fn render(&mut self) {
        let mut out = self.renderer.begin_frame(&self.frame);
        if let Some(scene) = &self.scene {
            collect_scene(&scene.graph, &mut out);

            let viewport = self.renderer.viewport();
            let projector = CameraProjector {
                camera: self.renderer.camera(),
                viewport,
            };
            let layout = LabelLayoutConfig {
                viewport_px: [viewport.width_px as f32, viewport.height_px as f32],
                max_labels: self.config.max_labels,
                ..LabelLayoutConfig::default()
            };
            for label in layout_labels_2d(&scene.labels, &projector, &self.label_style, layout) {
                out.push(RenderCommand::Label {
                    text: label.text,
                    screen_px: label.screen_pos_px,
                });
            }
        }
        let decor: [&dyn Layer; 3] = [&self.radar, &self.spots, &self.flights];
        for layer in decor {
            layer.render(&mut out);
        }
        self.metrics
            .set_gauge("render.commands", out.commands.len() as i64);
        self.renderer.submit(&out);
    }

    fn decor_mut(&mut self) -> [&mut dyn Layer; 3] {
        [&mut self.radar, &mut self.spots, &mut self.flights]
    }

    fn attach(&mut self, scope: NavigationScope, assembled: AssembledScene, digest: String) {
        let style = *self.assembler.style();
        let projection = assembled.projection;

        if self.picking.reset(&assembled.graph).is_some() {
            self.metrics.inc_counter("hover.changes", 1);
            self.events.emit(self.frame, MapEvent::HoverChanged(None));
        }
        self.spots = SpotLayer::from_anchors(
            SPOT_LAYER,
            self.config.spot.clone(),
            &assembled.labels,
            style.spot_z(),
        );
        self.flights = FlightLayer::from_config(
            FLIGHT_LAYER,
            &self.config.flights,
            style.spot_z(),
            self.config.spot.ring_color.rgba(),
            |p| projection.project_finite(LonLat::from(p)),
        );

        let report = &assembled.report;
        self.metrics.inc_counter("scene.replaced", 1);
        self.metrics
            .inc_counter("rings.skipped", report.skipped.len() as u64);
        self.metrics
            .set_gauge("scene.features", report.features as i64);
        self.metrics.set_gauge("scene.solids", report.solids as i64);
        tracing::info!(
            target: "viewer_native::controller",
            code = scope.code,
            features = report.features,
            solids = report.solids,
            skipped = report.skipped.len(),
            %digest,
            "scene replaced"
        );
        let event = MapEvent::ScopeChanged {
            code: scope.code,
            features: report.features,
            solids: report.solids,
            skipped: report.skipped.len(),
            digest,
        };
        self.scene = Some(assembled);
        self.events.emit(self.frame, event);
    }

    fn discard_stale(&mut self, request: Request) {
        self.metrics.inc_counter("fetch.stale", 1);
        self.events
            .emit(self.frame, MapEvent::StaleDiscarded { request });
    }

    fn emit_requested(&mut self, transition: &Transition) {
        self.events.emit(
            self.frame,
            MapEvent::TransitionRequested {
                request: transition.request,
                code: transition.scope.code,
            },
        );
    }
}

fn vec3(v: [f64; 3]) -> Vec3 {
    Vec3::new(v[0], v[1], v[2])
}

#[cfg(test)]
mod tests {
    use super::{MapController, MapEvent};
    use crate::source::FetchError;
    use formats::{MapConfig, RegionCollection};
    use foundation::math::{LonLat, ProjectionParams};
    use gpu::{RecordingBackend, RenderCommand};
    use pretty_assertions::assert_eq;
    use scene::camera::Viewport;
    use scene::components::{AdminLevel, CAP_MATERIAL};
    use streaming::{NavigationScope, NoDetailReason, Request};

    fn region(code: u32, name: &str, level: &str, centroid: [f64; 2], extra: &str, ring: &[[f64; 2]]) -> String {
        let coords: Vec<String> = ring.iter().map(|p| format!("[{}, {}]", p[0], p[1])).collect();
        format!(
            r#"{{"type": "Feature",
                "properties": {{"adcode": {code}, "name": "{name}", "level": "{level}", "centroid": [{}, {}]{extra}}},
                "geometry": {{"type": "Polygon", "coordinates": [[{}]]}}}}"#,
            centroid[0],
            centroid[1],
            coords.join(", ")
        )
    }

    fn collection(features: &[String]) -> RegionCollection {
        let doc = format!(r#"{{"type": "FeatureCollection", "features": [{}]}}"#, features.join(", "));
        RegionCollection::from_geojson_str(&doc).unwrap()
    }

    fn beijing() -> String {
        region(
            110000,
            "Beijing",
            "province",
            [116.41, 40.19],
            "",
            &[[115.0, 39.0], [118.0, 39.0], [118.0, 41.5], [115.0, 41.5]],
        )
    }

    fn xinjiang() -> String {
        region(
            650000,
            "Xinjiang",
            "province",
            [85.29, 41.37],
            "",
            &[[80.0, 38.0], [90.0, 38.0], [90.0, 45.0], [80.0, 45.0]],
        )
    }

    fn controller() -> MapController<RecordingBackend> {
        let config = MapConfig {
            radars: Vec::new(),
            ..MapConfig::default()
        };
        MapController::new(config, RecordingBackend::keeping(4), Viewport::new(1280.0, 720.0, 1.0)).unwrap()
    }

    fn loaded(features: &[String]) -> MapController<RecordingBackend> {
        let mut c = controller();
        let root = c.start();
        assert!(c.deliver(root.request, Ok(collection(features))));
        c.drain_events();
        c
    }

    fn payloads(c: &mut MapController<RecordingBackend>) -> Vec<MapEvent> {
        c.drain_events().into_iter().map(|e| e.payload).collect()
    }

    #[test]
    fn beijing_end_to_end() {
        let mut c = loaded(&[beijing()]);
        let scene = c.scene().unwrap();
        assert_eq!(scene.features.len(), 1);
        assert_eq!(scene.graph.feature(scene.features[0]).map(|m| m.code), Some(110000));
        assert_eq!(scene.labels.len(), 1);
        assert_eq!(scene.labels[0].name, "Beijing");
        assert_eq!(
            c.navigation().current().params,
            ProjectionParams::new(LonLat::new(104.0, 37.5), 80.0).unwrap()
        );

        let [x, y] = c.feature_screen_px(110000).expect("centroid on screen");
        c.pointer_moved(x, y);
        c.tick(1.0 / 60.0);

        let events = payloads(&mut c);
        let hovered = events.iter().find_map(|e| match e {
            MapEvent::HoverChanged(Some(meta)) => Some(meta.code),
            _ => None,
        });
        assert_eq!(hovered, Some(110000));
        let graph = &c.scene().unwrap().graph;
        assert_eq!(graph.highlighted_count(), 1);
        let solid = c.picking().highlighted().unwrap();
        assert_eq!(graph.material(solid, CAP_MATERIAL).unwrap().color, c.highlight_style().color);
    }

    #[test]
    fn stationary_pointer_emits_hover_once() {
        let mut c = loaded(&[beijing()]);
        let [x, y] = c.feature_screen_px(110000).unwrap();
        c.pointer_moved(x, y);
        c.tick(0.016);
        c.tick(0.016);
        c.tick(0.016);
        let hovers = payloads(&mut c)
            .into_iter()
            .filter(|e| matches!(e, MapEvent::HoverChanged(_)))
            .count();
        assert_eq!(hovers, 1);
        assert_eq!(c.picking().highlight_state().applies(), 1);
        assert_eq!(c.picking().highlight_state().restores(), 0);
    }

    #[test]
    fn leaving_the_surface_restores_the_cap() {
        let mut c = loaded(&[beijing()]);
        let [x, y] = c.feature_screen_px(110000).unwrap();
        c.pointer_moved(x, y);
        c.tick(0.016);
        c.pointer_left();
        c.tick(0.016);

        let events = payloads(&mut c);
        assert_eq!(events.last(), Some(&MapEvent::HoverChanged(None)));
        let graph = &c.scene().unwrap().graph;
        assert_eq!(graph.highlighted_count(), 0);
    }

    #[test]
    fn double_click_drills_into_the_feature() {
        let mut c = loaded(&[beijing()]);
        let [x, y] = c.feature_screen_px(110000).unwrap();
        let t = c.double_clicked(x, y).expect("transition");

        assert_eq!(t.scope.code, 110000);
        assert_eq!(
            t.scope.params,
            ProjectionParams::new(LonLat::new(116.41, 40.19), 200.0).unwrap()
        );
        let events = payloads(&mut c);
        assert!(matches!(&events[0], MapEvent::Activated(meta) if meta.level == AdminLevel::Province));
        assert_eq!(
            events[1],
            MapEvent::TransitionRequested {
                request: t.request,
                code: 110000
            }
        );
        // Activation alone never highlights.
        assert_eq!(c.scene().unwrap().graph.highlighted_count(), 0);
    }

    #[test]
    fn double_click_on_a_leaf_reports_no_detail() {
        let leaf = region(
            110101,
            "Dongcheng",
            "district",
            [116.41, 40.19],
            r#", "childrenNum": 0"#,
            &[[115.0, 39.0], [118.0, 39.0], [118.0, 41.5], [115.0, 41.5]],
        );
        let mut c = loaded(&[leaf]);
        let [x, y] = c.feature_screen_px(110101).unwrap();
        assert!(c.double_clicked(x, y).is_none());
        assert!(c.navigation().pending().is_none());
        let events = payloads(&mut c);
        assert_eq!(
            events.last(),
            Some(&MapEvent::NoFurtherDetail {
                code: 110101,
                reason: NoDetailReason::NoChildren
            })
        );
    }

    #[test]
    fn double_click_on_empty_space_does_nothing() {
        let mut c = loaded(&[beijing()]);
        assert!(c.double_clicked(2.0, 2.0).is_none());
        assert!(payloads(&mut c).is_empty());
    }

    #[test]
    fn later_request_wins_regardless_of_arrival_order() {
        let mut c = loaded(&[beijing(), xinjiang()]);
        let [ax, ay] = c.feature_screen_px(110000).unwrap();
        let [bx, by] = c.feature_screen_px(650000).unwrap();
        let a = c.double_clicked(ax, ay).unwrap();
        let b = c.double_clicked(bx, by).unwrap();
        c.drain_events();

        let beijing_districts = collection(&[region(
            110101,
            "Dongcheng",
            "district",
            [116.41, 39.93],
            "",
            &[[116.3, 39.8], [116.5, 39.8], [116.5, 40.0], [116.3, 40.0]],
        )]);
        let xinjiang_cities = collection(&[region(
            650100,
            "Urumqi",
            "city",
            [87.6, 43.8],
            "",
            &[[86.0, 42.5], [89.0, 42.5], [89.0, 45.0], [86.0, 45.0]],
        )]);

        assert!(c.deliver(b.request, Ok(xinjiang_cities)));
        assert!(!c.deliver(a.request, Ok(beijing_districts)));

        assert_eq!(c.navigation().current().code, 650000);
        let scene = c.scene().unwrap();
        assert_eq!(scene.graph.feature(scene.features[0]).map(|m| m.code), Some(650100));
        let events = payloads(&mut c);
        assert!(matches!(events[0], MapEvent::ScopeChanged { code: 650000, .. }));
        assert_eq!(events[1], MapEvent::StaleDiscarded { request: a.request });
        assert_eq!(c.metrics().counter("fetch.stale"), 1);
    }

    #[test]
    fn superseded_response_is_discarded_even_when_it_arrives_first() {
        let mut c = loaded(&[beijing()]);
        let params = ProjectionParams::new(LonLat::new(116.41, 40.19), 200.0).unwrap();
        let a = c.request(NavigationScope::root(110000, params));
        let b = c.request(NavigationScope::root(120000, params));

        assert!(!c.deliver(a.request, Ok(collection(&[xinjiang()]))));
        assert_eq!(c.navigation().current().code, 100000);
        assert!(c.deliver(b.request, Ok(collection(&[beijing()]))));
        assert_eq!(c.navigation().current().code, 120000);
    }

    #[test]
    fn fetch_failure_keeps_the_current_scene() {
        let mut c = loaded(&[beijing()]);
        let [x, y] = c.feature_screen_px(110000).unwrap();
        let t = c.double_clicked(x, y).unwrap();
        c.drain_events();

        assert!(!c.deliver(t.request, Err(FetchError::NotFound { code: 110000 })));
        assert!(c.navigation().pending().is_none());
        assert_eq!(c.navigation().current().code, 100000);
        assert_eq!(c.scene().unwrap().labels[0].name, "Beijing");
        let events = payloads(&mut c);
        assert!(matches!(&events[0], MapEvent::FetchFailed { code: 110000, .. }));

        // A second answer for the same ticket is stale.
        assert!(!c.deliver(t.request, Err(FetchError::NotFound { code: 110000 })));
        assert_eq!(payloads(&mut c), vec![MapEvent::StaleDiscarded { request: t.request }]);
    }

    #[test]
    fn scene_replacement_clears_the_highlight() {
        let mut c = loaded(&[beijing()]);
        let [x, y] = c.feature_screen_px(110000).unwrap();
        c.pointer_moved(x, y);
        c.tick(0.016);
        assert!(c.picking().highlighted().is_some());

        let params = c.navigation().current().params;
        let t = c.request(NavigationScope::root(100000, params));
        assert!(c.deliver(t.request, Ok(collection(&[xinjiang()]))));
        assert!(c.picking().highlighted().is_none());
        assert_eq!(c.scene().unwrap().graph.highlighted_count(), 0);
    }

    #[test]
    fn scene_replacement_under_a_resting_pointer_clears_the_hover() {
        let mut c = loaded(&[beijing()]);
        let [x, y] = c.feature_screen_px(110000).unwrap();
        c.pointer_moved(x, y);
        c.tick(0.016);
        let hovers = |events: Vec<MapEvent>| -> Vec<Option<u32>> {
            events
                .into_iter()
                .filter_map(|e| match e {
                    MapEvent::HoverChanged(meta) => Some(meta.map(|m| m.code)),
                    _ => None,
                })
                .collect()
        };
        assert_eq!(hovers(payloads(&mut c)), vec![Some(110000)]);

        let t = c.start();
        assert!(c.deliver(t.request, Ok(collection(&[xinjiang()]))));
        c.tick(0.016);
        c.tick(0.016);
        let events = payloads(&mut c);
        assert_eq!(events[1], MapEvent::HoverChanged(None));
        assert!(matches!(events[2], MapEvent::ScopeChanged { code: 100000, .. }));
        assert_eq!(hovers(events), vec![None]);
        assert_eq!(c.metrics().counter("hover.changes"), 2);
    }

    #[test]
    fn restart_after_a_drill_down_requests_the_configured_root_view() {
        let mut c = loaded(&[beijing()]);
        let [x, y] = c.feature_screen_px(110000).unwrap();
        let t = c.double_clicked(x, y).unwrap();
        assert!(c.deliver(t.request, Ok(collection(&[beijing()]))));
        assert_eq!(c.navigation().current().params.scale(), 200.0);

        let root = c.start();
        assert_eq!(root.scope.code, 100000);
        assert_eq!(
            root.scope.params,
            ProjectionParams::new(LonLat::new(104.0, 37.5), 80.0).unwrap()
        );
    }

    #[test]
    fn render_step_emits_regions_labels_and_spots() {
        let mut c = loaded(&[beijing(), xinjiang()]);
        c.tick(0.5);
        let frame = c.renderer().backend().last().unwrap();

        assert_eq!(frame.frame_index, 1);
        assert_eq!(frame.count(|cmd| matches!(cmd, RenderCommand::Solid { .. })), 2);
        assert_eq!(frame.count(|cmd| matches!(cmd, RenderCommand::Line { .. })), 2);
        assert_eq!(frame.count(|cmd| matches!(cmd, RenderCommand::Label { .. })), 2);
        assert_eq!(frame.count(|cmd| matches!(cmd, RenderCommand::Disc { .. })), 2);
        assert_eq!(frame.line_resolution, [1280, 720]);
        assert_eq!(c.spots().len(), 2);
    }

    #[test]
    fn resize_is_idempotent_and_updates_line_resolution() {
        let mut c = loaded(&[beijing()]);
        let vp = Viewport::new(800.0, 600.0, 2.0);
        assert!(c.resized(vp));
        assert!(!c.resized(vp));
        assert_eq!(c.renderer().backend().resizes, 2);

        c.tick(0.016);
        assert_eq!(c.renderer().backend().last().unwrap().line_resolution, [1600, 1200]);
    }

    #[test]
    fn hover_follows_the_feature_after_a_resize() {
        let mut c = loaded(&[beijing()]);
        c.resized(Viewport::new(800.0, 600.0, 1.0));
        let [x, y] = c.feature_screen_px(110000).unwrap();
        c.pointer_moved(x, y);
        c.tick(0.016);
        assert!(c.picking().highlighted().is_some());
    }

    #[test]
    fn events_are_stamped_with_the_current_frame() {
        let mut c = loaded(&[beijing()]);
        c.tick(0.016);
        c.tick(0.016);
        let [x, y] = c.feature_screen_px(110000).unwrap();
        c.pointer_moved(x, y);
        c.tick(0.016);
        let events = c.drain_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].frame_index, 3);
    }

    #[test]
    fn first_delivery_replaces_the_empty_scene() {
        let mut c = controller();
        assert!(c.scene().is_none());
        c.tick(0.016);
        assert_eq!(c.renderer().backend().last().unwrap().commands.len(), 0);

        let root = c.start();
        assert_eq!(root.scope.code, 100000);
        assert_eq!(root.request, Request(1));
        assert!(c.deliver(root.request, Ok(collection(&[beijing()]))));
        assert_eq!(c.metrics().gauge("scene.features"), Some(1));
    }
}
