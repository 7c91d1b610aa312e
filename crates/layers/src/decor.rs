//! Cosmetic layers: pulsing spot markers, flight arcs and radar sweeps.
//!
//! Each layer is a pure function of frame time; none of them is pickable.

use std::f64::consts::TAU;

use foundation::color::Rgba;
use foundation::math::{Vec2, Vec3};
use formats::{FlightConfig, RadarConfig, SpotConfig};
use gpu::{RenderCommand, RenderFrame};
use runtime::frame::Frame;

use crate::labels::LabelAnchor;
use crate::layer::{Layer, LayerId};

/// Position in `[0, 1)` within a repeating period.
pub fn cycle_phase(t_s: f64, period_s: f64) -> f64 {
    if !(period_s.is_finite() && period_s > 0.0) || !t_s.is_finite() {
        return 0.0;
    }
    (t_s / period_s).rem_euclid(1.0)
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpotLayer {
    id: LayerId,
    config: SpotConfig,
    centers: Vec<Vec3>,
    phase: f64,
}

impl SpotLayer {
    pub fn new(id: u64, config: SpotConfig, centers: Vec<Vec3>) -> Self {
        Self {
            id: LayerId(id),
            config,
            centers,
            phase: 0.0,
        }
    }

    /// One spot under every label anchor, dropped to `spot_z`.
    pub fn from_anchors(id: u64, config: SpotConfig, anchors: &[LabelAnchor], spot_z: f64) -> Self {
        let centers = anchors
            .iter()
            .map(|a| Vec3::new(a.position.x, a.position.y, spot_z))
            .collect();
        Self::new(id, config, centers)
    }

    pub fn len(&self) -> usize {
        self.centers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centers.is_empty()
    }

    /// Current ring scale (1 at the start of a pulse).
    pub fn ring_scale(&self) -> f64 {
        1.0 + (self.config.pulse_max_scale - 1.0) * self.phase
    }

    /// Ring opacity fades out over a pulse.
    pub fn ring_opacity(&self) -> f32 {
        (1.0 - self.phase) as f32
    }
}

impl Layer for SpotLayer {
    fn id(&self) -> LayerId {
        self.id
    }

    fn update(&mut self, frame: &Frame) {
        self.phase = cycle_phase(frame.time.seconds(), self.config.pulse_period_s);
    }

    fn render(&self, out: &mut RenderFrame) {
        let scale = self.ring_scale();
        for center in &self.centers {
            out.push(RenderCommand::Disc {
                center: *center,
                radius: self.config.radius,
                color: self.config.color.rgba(),
                opacity: 1.0,
            });
            out.push(RenderCommand::Ring {
                center: *center,
                inner: self.config.ring_inner * scale,
                outer: self.config.ring_outer * scale,
                color: self.config.ring_color.rgba(),
                opacity: self.ring_opacity(),
            });
        }
    }
}

/// Apex height as a fraction of the horizontal distance.
const APEX_RATIO: f64 = 0.25;
/// Fraction of the arc covered by the moving head.
const HEAD_FRACTION: f64 = 0.2;

/// Quadratic arc between two planar points, raised above `base_z`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FlightArc {
    pub from: Vec2,
    pub to: Vec2,
    pub base_z: f64,
    pub period_s: f64,
}

impl FlightArc {
    pub fn apex_height(&self) -> f64 {
        (self.to - self.from).length() * APEX_RATIO
    }

    /// Point at parameter `s` in `[0, 1]`.
    pub fn point_at(&self, s: f64) -> Vec3 {
        let s = s.clamp(0.0, 1.0);
        let p0 = self.from.extend(self.base_z);
        let p2 = self.to.extend(self.base_z);
        // Control point twice the apex height so the curve peaks at the apex.
        let mid = self.from.lerp(self.to, 0.5);
        let p1 = mid.extend(self.base_z + 2.0 * self.apex_height());
        let u = 1.0 - s;
        p0 * (u * u) + p1 * (2.0 * u * s) + p2 * (s * s)
    }

    pub fn sample(&self, from_s: f64, to_s: f64, segments: usize) -> Vec<Vec3> {
        let segments = segments.max(1);
        (0..=segments)
            .map(|i| self.point_at(from_s + (to_s - from_s) * i as f64 / segments as f64))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlightLayer {
    id: LayerId,
    arcs: Vec<FlightArc>,
    color: Rgba,
    progress: Vec<f64>,
}

impl FlightLayer {
    pub fn new(id: u64, arcs: Vec<FlightArc>, color: Rgba) -> Self {
        let progress = vec![0.0; arcs.len()];
        Self {
            id: LayerId(id),
            arcs,
            color,
            progress,
        }
    }

    /// Arcs from geographic endpoints already projected by `project`.
    pub fn from_config<F>(id: u64, flights: &[FlightConfig], base_z: f64, color: Rgba, project: F) -> Self
    where
        F: Fn([f64; 2]) -> Option<Vec2>,
    {
        let arcs = flights
            .iter()
            .filter_map(|f| {
                Some(FlightArc {
                    from: project(f.from)?,
                    to: project(f.to)?,
                    base_z,
                    period_s: f.period_s,
                })
            })
            .collect();
        Self::new(id, arcs, color)
    }

    pub fn arcs(&self) -> &[FlightArc] {
        &self.arcs
    }

    /// Head progress of each arc, in `[0, 1)`.
    pub fn progress(&self) -> &[f64] {
        &self.progress
    }
}

impl Layer for FlightLayer {
    fn id(&self) -> LayerId {
        self.id
    }

    fn update(&mut self, frame: &Frame) {
        let t = frame.time.seconds();
        for (p, arc) in self.progress.iter_mut().zip(&self.arcs) {
            *p = cycle_phase(t, arc.period_s);
        }
    }

    fn render(&self, out: &mut RenderFrame) {
        for (arc, p) in self.arcs.iter().zip(&self.progress) {
            out.push(RenderCommand::Line {
                points: arc.sample(0.0, 1.0, 32),
                closed: false,
                color: self.color.with_alpha(0.3),
                width_px: 1.0,
            });
            out.push(RenderCommand::Line {
                points: arc.sample((p - HEAD_FRACTION).max(0.0), *p, 8),
                closed: false,
                color: self.color,
                width_px: 2.0,
            });
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RadarLayer {
    id: LayerId,
    radars: Vec<RadarConfig>,
    angles: Vec<f64>,
}

impl RadarLayer {
    pub fn new(id: u64, radars: Vec<RadarConfig>) -> Self {
        let angles = vec![0.0; radars.len()];
        Self {
            id: LayerId(id),
            radars,
            angles,
        }
    }

    /// Current sweep angle of each radar, in `[0, 2π)`.
    pub fn angles(&self) -> &[f64] {
        &self.angles
    }
}

impl Layer for RadarLayer {
    fn id(&self) -> LayerId {
        self.id
    }

    fn update(&mut self, frame: &Frame) {
        let t = frame.time.seconds();
        for (angle, radar) in self.angles.iter_mut().zip(&self.radars) {
            *angle = (radar.speed * t).rem_euclid(TAU);
        }
    }

    fn render(&self, out: &mut RenderFrame) {
        for (radar, angle) in self.radars.iter().zip(&self.angles) {
            out.push(RenderCommand::Radar {
                center: Vec3::new(radar.center[0], radar.center[1], radar.center[2]),
                radius: radar.radius,
                angle: *angle,
                sweep_width: radar.sweep_width,
                color: radar.color.rgba(),
                opacity: radar.opacity,
            });
        }
    }
}
