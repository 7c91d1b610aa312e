use foundation::color::Rgba;

/// Slot of the cap (top + bottom faces) material on an extruded solid.
pub const CAP_MATERIAL: usize = 0;
/// Slot of the side-wall gradient material on an extruded solid.
pub const SIDE_MATERIAL: usize = 1;

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum MaterialKind {
    /// Flat color; the only kind that can be picked and highlighted.
    Flat,
    /// Vertical gradient interpolated by normalized height (`0` = bottom).
    Gradient { bottom: Rgba, top: Rgba },
    /// Screen-space line whose width is given in pixels.
    Line { width_px: f32 },
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Material {
    pub kind: MaterialKind,
    pub color: Rgba,
    pub opacity: f32,
    pub transparent: bool,
    pub pickable: bool,
    pub highlighted: bool,
}

impl Material {
    pub fn cap(color: Rgba, opacity: f32) -> Self {
        Self {
            kind: MaterialKind::Flat,
            color,
            opacity,
            transparent: opacity < 1.0,
            pickable: true,
            highlighted: false,
        }
    }

    pub fn side_gradient(bottom: Rgba, top: Rgba) -> Self {
        Self {
            kind: MaterialKind::Gradient { bottom, top },
            color: bottom,
            opacity: 1.0,
            transparent: false,
            pickable: false,
            highlighted: false,
        }
    }

    pub fn line(color: Rgba, width_px: f32) -> Self {
        Self {
            kind: MaterialKind::Line { width_px },
            color,
            opacity: 1.0,
            transparent: false,
            pickable: false,
            highlighted: false,
        }
    }

    /// Color at normalized height `t`; flat and line materials ignore `t`.
    pub fn color_at(&self, t: f32) -> Rgba {
        match self.kind {
            MaterialKind::Gradient { bottom, top } => bottom.lerp(top, t),
            _ => self.color,
        }
    }
}
