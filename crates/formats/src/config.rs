use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use foundation::color::Rgba;
use foundation::math::{LonLat, ProjectionError, ProjectionParams};
use scene::components::AdminLevel;
use serde::{Deserialize, Serialize};

/// Color written as `#RRGGBB` / `#RRGGBBAA` in configuration files.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor(pub Rgba);

impl HexColor {
    fn from_static(s: &str) -> Self {
        Self(Rgba::from_hex(s).unwrap_or(Rgba::WHITE))
    }

    pub fn rgba(self) -> Rgba {
        self.0
    }
}

impl TryFrom<String> for HexColor {
    type Error = foundation::color::ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Rgba::from_hex(&value).map(Self)
    }
}

impl From<HexColor> for String {
    fn from(value: HexColor) -> Self {
        value.0.to_hex()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_y_deg: f64,
    pub near: f64,
    pub far: f64,
    pub position: [f64; 3],
    pub target: [f64; 3],
    pub up: [f64; 3],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_y_deg: 30.0,
            near: 0.1,
            far: 1000.0,
            position: [-10.0, -90.0, 130.0],
            target: [0.0, 0.0, 0.0],
            up: [0.0, 0.0, 1.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpotConfig {
    pub radius: f64,
    pub ring_inner: f64,
    pub ring_outer: f64,
    pub color: HexColor,
    pub ring_color: HexColor,
    /// Seconds for one pulse of the ring.
    pub pulse_period_s: f64,
    /// Ring scale at the end of a pulse.
    pub pulse_max_scale: f64,
}

impl Default for SpotConfig {
    fn default() -> Self {
        Self {
            radius: 0.5,
            ring_inner: 0.5,
            ring_outer: 0.7,
            color: HexColor::from_static("#3EC5FB"),
            ring_color: HexColor::from_static("#3FC5FB"),
            pulse_period_s: 2.0,
            pulse_max_scale: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadarConfig {
    pub center: [f64; 3],
    pub radius: f64,
    pub color: HexColor,
    pub opacity: f32,
    /// Angular width of the sweep in radians.
    pub sweep_width: f64,
    /// Radians per second.
    pub speed: f64,
}

impl Default for RadarConfig {
    fn default() -> Self {
        Self {
            center: [0.0, 0.0, 0.0],
            radius: 50.0,
            color: HexColor::from_static("#0A1E70"),
            opacity: 0.5,
            sweep_width: std::f64::consts::TAU,
            speed: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightConfig {
    pub from: [f64; 2],
    pub to: [f64; 2],
    #[serde(default = "default_flight_period")]
    pub period_s: f64,
}

fn default_flight_period() -> f64 {
    3.0
}

/// Every recognized option of the map pipeline. Missing keys take defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub depth: f64,
    pub cap_color: HexColor,
    pub cap_opacity: f32,
    pub hover_color: HexColor,
    pub hover_opacity: f32,
    /// Side wall gradient, bottom then top.
    pub side_colors: [HexColor; 2],
    pub outline_color: HexColor,
    pub outline_width_px: f32,
    /// Outline height above the top face.
    pub outline_z_offset: f64,
    pub label_z_offset: f64,
    pub spot_z_offset: f64,
    pub max_labels: usize,
    /// Zoom scale per administrative level name.
    pub scale_table: BTreeMap<String, f64>,
    pub root_code: u32,
    pub center: [f64; 2],
    pub scale: f64,
    pub camera: CameraConfig,
    /// URL template with a `{code}` placeholder, or a directory path.
    pub source: String,
    pub spot: SpotConfig,
    pub radars: Vec<RadarConfig>,
    pub flights: Vec<FlightConfig>,
}

impl Default for MapConfig {
    fn default() -> Self {
        let scale_table = [("province", 200.0), ("city", 400.0), ("district", 600.0)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        Self {
            depth: 6.0,
            cap_color: HexColor::from_static("#06092A"),
            cap_opacity: 0.9,
            hover_color: HexColor::from_static("#409EF9"),
            hover_opacity: 1.0,
            side_colors: [HexColor::from_static("#3F9FF3"), HexColor::from_static("#266BF0")],
            outline_color: HexColor::from_static("#41C0FB"),
            outline_width_px: 3.0,
            outline_z_offset: 0.5,
            label_z_offset: 2.0,
            spot_z_offset: 0.2,
            max_labels: 64,
            scale_table,
            root_code: 100000,
            center: [104.0, 37.5],
            scale: 80.0,
            camera: CameraConfig::default(),
            source: DEFAULT_SOURCE.to_string(),
            spot: SpotConfig::default(),
            radars: vec![
                RadarConfig::default(),
                RadarConfig {
                    radius: 30.0,
                    color: HexColor::from_static("#C2C4D6"),
                    ..RadarConfig::default()
                },
            ],
            flights: Vec::new(),
        }
    }
}

pub const DEFAULT_SOURCE: &str = "https://geo.datav.aliyun.com/areas_v3/bound/{code}_full.json";

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    UnknownLevel(String),
    Projection(ProjectionError),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "I/O error: {err}"),
            ConfigError::Parse(err) => write!(f, "config parse error: {err}"),
            ConfigError::UnknownLevel(level) => {
                write!(f, "scale table names unknown level: {level}")
            }
            ConfigError::Projection(err) => write!(f, "invalid default projection: {err}"),
            ConfigError::Invalid(reason) => write!(f, "invalid config: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ProjectionError> for ConfigError {
    fn from(err: ProjectionError) -> Self {
        ConfigError::Projection(err)
    }
}

impl MapConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let payload = fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_json_str(&payload)
    }

    pub fn from_json_str(payload: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(payload).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string_pretty(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(ConfigError::Parse)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.depth.is_finite() && self.depth > 0.0) {
            return Err(ConfigError::Invalid(format!("depth must be positive, got {}", self.depth)));
        }
        for (name, opacity) in [("cap_opacity", self.cap_opacity), ("hover_opacity", self.hover_opacity)] {
            if !(0.0..=1.0).contains(&opacity) {
                return Err(ConfigError::Invalid(format!("{name} must be in [0, 1], got {opacity}")));
            }
        }
        if !(self.outline_width_px.is_finite() && self.outline_width_px > 0.0) {
            return Err(ConfigError::Invalid("outline_width_px must be positive".to_string()));
        }
        self.scale_entries()?;
        self.projection_params()?;
        Ok(())
    }

    /// Scale table keyed by parsed level; non-positive scales are rejected.
    pub fn scale_entries(&self) -> Result<Vec<(AdminLevel, f64)>, ConfigError> {
        self.scale_table
            .iter()
            .map(|(name, scale)| {
                let level =
                    AdminLevel::parse(name).ok_or_else(|| ConfigError::UnknownLevel(name.clone()))?;
                if !(scale.is_finite() && *scale > 0.0) {
                    return Err(ConfigError::Invalid(format!("scale for {name} must be positive")));
                }
                Ok((level, *scale))
            })
            .collect()
    }

    /// Projection of the root scope.
    pub fn projection_params(&self) -> Result<ProjectionParams, ConfigError> {
        Ok(ProjectionParams::new(LonLat::from(self.center), self.scale)?)
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, MapConfig};
    use foundation::color::Rgba;
    use pretty_assertions::assert_eq;
    use scene::components::AdminLevel;
    use std::io::Write;

    #[test]
    fn defaults_match_the_map_style() {
        let config = MapConfig::default();
        assert_eq!(config.depth, 6.0);
        assert_eq!(config.cap_color.rgba(), Rgba::from_hex("#06092A").unwrap());
        assert_eq!(config.root_code, 100000);
        assert_eq!(
            config.scale_entries().unwrap(),
            vec![
                (AdminLevel::City, 400.0),
                (AdminLevel::District, 600.0),
                (AdminLevel::Province, 200.0),
            ]
        );
        assert!(config.validate().is_ok());
        assert_eq!(config.radars.len(), 2);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = MapConfig::from_json_str(
            r##"{ "depth": 4.0, "hover_color": "#FF0000", "scale_table": { "province": 150 } }"##,
        )
        .expect("config");
        assert_eq!(config.depth, 4.0);
        assert_eq!(config.hover_color.rgba(), Rgba::new(1.0, 0.0, 0.0, 1.0));
        assert_eq!(config.scale_entries().unwrap(), vec![(AdminLevel::Province, 150.0)]);
        assert_eq!(config.scale, 80.0);
        assert_eq!(config.camera.fov_y_deg, 30.0);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            MapConfig::from_json_str(r#"{ "scale_table": { "galaxy": 10 } }"#),
            Err(ConfigError::UnknownLevel(_))
        ));
        assert!(matches!(
            MapConfig::from_json_str(r#"{ "scale": 0 }"#),
            Err(ConfigError::Projection(_))
        ));
        assert!(matches!(
            MapConfig::from_json_str(r#"{ "cap_color": "blue" }"#),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            MapConfig::from_json_str(r#"{ "depth": -1 }"#),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn round_trips_through_a_file() {
        let config = MapConfig::default();
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(config.to_json_string_pretty().unwrap().as_bytes())
            .expect("write");
        let loaded = MapConfig::load(file.path()).expect("load");
        assert_eq!(loaded.root_code, config.root_code);
        assert_eq!(loaded.scale_table, config.scale_table);
        assert_eq!(loaded.cap_color.rgba().to_hex(), config.cap_color.rgba().to_hex());
    }
}
