use foundation::math::Vec3;
use scene::camera::{PerspectiveCamera, Viewport};
use scene::entity::NodeId;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq)]
pub struct LabelStyle {
    pub font_size_px: f32,
    pub color: [f32; 4],
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            font_size_px: 14.0,
            color: [1.0, 1.0, 1.0, 1.0],
        }
    }
}

/// Region name pinned at its projected centroid, lifted to the label height.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelAnchor {
    pub feature: NodeId,
    pub code: u32,
    pub name: String,
    pub position: Vec3,
}

pub trait LabelProjector {
    fn project(&self, world: Vec3) -> Option<[f32; 2]>;
}

/// Projects through a perspective camera into viewport pixels.
#[derive(Debug, Copy, Clone)]
pub struct CameraProjector<'a> {
    pub camera: &'a PerspectiveCamera,
    pub viewport: &'a Viewport,
}

impl LabelProjector for CameraProjector<'_> {
    fn project(&self, world: Vec3) -> Option<[f32; 2]> {
        let [x, y] = self.camera.project_to_screen(world, self.viewport)?;
        Some([x as f32, y as f32])
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LabelLayoutConfig {
    pub viewport_px: [f32; 2],
    pub cell_px: f32,
    pub padding_px: f32,
    pub max_labels: usize,
}

impl Default for LabelLayoutConfig {
    fn default() -> Self {
        Self {
            viewport_px: [1.0, 1.0],
            cell_px: 32.0,
            padding_px: 4.0,
            max_labels: 400,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLabel2D {
    pub code: u32,
    pub text: String,
    pub screen_pos_px: [f32; 2],
    pub size_px: [f32; 2],
}

/// Greedy placement in input order; a label is dropped when it leaves the
/// viewport or overlaps a grid cell already taken by an earlier label.
pub fn layout_labels_2d<P: LabelProjector>(
    labels: &[LabelAnchor],
    projector: &P,
    style: &LabelStyle,
    config: LabelLayoutConfig,
) -> Vec<PlacedLabel2D> {
    let mut out = Vec::new();
    let mut occupied: HashSet<u64> = HashSet::new();

    for label in labels {
        if out.len() >= config.max_labels {
            break;
        }
        let text = label.name.trim();
        if text.is_empty() {
            continue;
        }

        let Some(screen) = projector.project(label.position) else {
            continue;
        };
        if !screen[0].is_finite() || !screen[1].is_finite() {
            continue;
        }

        let size = estimate_text_size(text, style);
        let half_w = size[0] * 0.5 + config.padding_px;
        let half_h = size[1] * 0.5 + config.padding_px;

        if screen[0] + half_w < 0.0
            || screen[1] + half_h < 0.0
            || screen[0] - half_w > config.viewport_px[0]
            || screen[1] - half_h > config.viewport_px[1]
        {
            continue;
        }

        if !try_place_label(&mut occupied, screen, [half_w, half_h], config.cell_px) {
            continue;
        }

        out.push(PlacedLabel2D {
            code: label.code,
            text: text.to_string(),
            screen_pos_px: screen,
            size_px: size,
        });
    }

    out
}

fn estimate_text_size(text: &str, style: &LabelStyle) -> [f32; 2] {
    let count = text.chars().count().max(1) as f32;
    let width = style.font_size_px * 0.6 * count;
    [width, style.font_size_px]
}

fn try_place_label(
    occupied: &mut HashSet<u64>,
    screen: [f32; 2],
    half_size: [f32; 2],
    cell_px: f32,
) -> bool {
    let min_x = ((screen[0] - half_size[0]) / cell_px).floor() as i32;
    let max_x = ((screen[0] + half_size[0]) / cell_px).floor() as i32;
    let min_y = ((screen[1] - half_size[1]) / cell_px).floor() as i32;
    let max_y = ((screen[1] + half_size[1]) / cell_px).floor() as i32;

    for cy in min_y..=max_y {
        for cx in min_x..=max_x {
            if occupied.contains(&cell_key(cx, cy)) {
                return false;
            }
        }
    }

    for cy in min_y..=max_y {
        for cx in min_x..=max_x {
            occupied.insert(cell_key(cx, cy));
        }
    }

    true
}

fn cell_key(cx: i32, cy: i32) -> u64 {
    ((cx as u64) << 32) ^ (cy as u32 as u64)
}
