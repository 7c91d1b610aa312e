use foundation::color::Rgba;
use formats::MapConfig;
use scene::components::Material;
use scene::highlight::HighlightStyle;

/// Resolved colors and offsets shared by the region and decoration layers.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MapStyle {
    pub depth: f64,
    pub cap_color: Rgba,
    pub cap_opacity: f32,
    pub hover_color: Rgba,
    pub hover_opacity: f32,
    pub side_bottom: Rgba,
    pub side_top: Rgba,
    pub outline_color: Rgba,
    pub outline_width_px: f32,
    pub outline_z_offset: f64,
    pub label_z_offset: f64,
    pub spot_z_offset: f64,
}

impl MapStyle {
    pub fn from_config(config: &MapConfig) -> Self {
        Self {
            depth: config.depth,
            cap_color: config.cap_color.rgba(),
            cap_opacity: config.cap_opacity,
            hover_color: config.hover_color.rgba(),
            hover_opacity: config.hover_opacity,
            side_bottom: config.side_colors[0].rgba(),
            side_top: config.side_colors[1].rgba(),
            outline_color: config.outline_color.rgba(),
            outline_width_px: config.outline_width_px,
            outline_z_offset: config.outline_z_offset,
            label_z_offset: config.label_z_offset,
            spot_z_offset: config.spot_z_offset,
        }
    }

    /// Cap + side materials, in slot order.
    pub fn region_materials(&self) -> Vec<Material> {
        vec![
            Material::cap(self.cap_color, self.cap_opacity),
            Material::side_gradient(self.side_bottom, self.side_top),
        ]
    }

    pub fn outline_material(&self) -> Material {
        Material::line(self.outline_color, self.outline_width_px)
    }

    pub fn highlight(&self) -> HighlightStyle {
        HighlightStyle {
            color: self.hover_color,
            opacity: self.hover_opacity,
        }
    }

    pub fn label_z(&self) -> f64 {
        self.depth + self.label_z_offset
    }

    pub fn spot_z(&self) -> f64 {
        self.depth + self.spot_z_offset
    }
}

impl Default for MapStyle {
    fn default() -> Self {
        Self::from_config(&MapConfig::default())
    }
}
