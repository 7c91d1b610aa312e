use foundation::math::LonLat;
use scene::components::{AdminLevel, ComponentProperties, FeatureMetadata};
use serde_json::{Map, Value};

/// Closed loop of geographic points; closure is implicit.
pub type Ring = Vec<LonLat>;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GeometryKind {
    Polygon,
    MultiPolygon,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RegionGeometry {
    Polygon(Vec<Ring>),
    MultiPolygon(Vec<Vec<Ring>>),
}

impl RegionGeometry {
    pub fn kind(&self) -> GeometryKind {
        match self {
            RegionGeometry::Polygon(_) => GeometryKind::Polygon,
            RegionGeometry::MultiPolygon(_) => GeometryKind::MultiPolygon,
        }
    }

    /// Every ring in document order, ring-groups flattened.
    pub fn rings(&self) -> Box<dyn Iterator<Item = &Ring> + '_> {
        match self {
            RegionGeometry::Polygon(rings) => Box::new(rings.iter()),
            RegionGeometry::MultiPolygon(polys) => Box::new(polys.iter().flatten()),
        }
    }

    pub fn ring_count(&self) -> usize {
        self.rings().count()
    }
}

/// One administrative region as delivered by the boundary feed.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoFeature {
    pub meta: FeatureMetadata,
    pub geometry: RegionGeometry,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedFeature {
    pub index: usize,
    pub reason: String,
}

/// Parsed FeatureCollection. Features failing validation are kept out of
/// `features` and listed in `rejected` instead.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionCollection {
    pub features: Vec<GeoFeature>,
    pub rejected: Vec<RejectedFeature>,
    /// blake3 hex digest of the source payload.
    pub digest: String,
}

#[derive(Debug)]
pub enum RegionParseError {
    Json(serde_json::Error),
    NotAFeatureCollection,
    InvalidFeature { index: usize, reason: String },
}

impl std::fmt::Display for RegionParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegionParseError::Json(err) => write!(f, "JSON parse error: {err}"),
            RegionParseError::NotAFeatureCollection => {
                write!(f, "expected GeoJSON FeatureCollection")
            }
            RegionParseError::InvalidFeature { index, reason } => {
                write!(f, "invalid feature at index {index}: {reason}")
            }
        }
    }
}

impl std::error::Error for RegionParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RegionParseError::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl RegionCollection {
    pub fn from_geojson_str(payload: &str) -> Result<Self, RegionParseError> {
        Self::from_geojson_slice(payload.as_bytes())
    }

    pub fn from_geojson_slice(payload: &[u8]) -> Result<Self, RegionParseError> {
        let value: Value = serde_json::from_slice(payload).map_err(RegionParseError::Json)?;
        let digest = blake3::hash(payload).to_hex().to_string();
        Self::parse_value(&value, digest)
    }

    fn parse_value(value: &Value, digest: String) -> Result<Self, RegionParseError> {
        let obj = value
            .as_object()
            .ok_or(RegionParseError::NotAFeatureCollection)?;
        let ty = obj
            .get("type")
            .and_then(|v| v.as_str())
            .ok_or(RegionParseError::NotAFeatureCollection)?;
        if ty != "FeatureCollection" {
            return Err(RegionParseError::NotAFeatureCollection);
        }

        let features_val = obj
            .get("features")
            .and_then(|v| v.as_array())
            .ok_or(RegionParseError::NotAFeatureCollection)?;

        let mut features = Vec::with_capacity(features_val.len());
        let mut rejected = Vec::new();
        for (index, feat_val) in features_val.iter().enumerate() {
            match parse_feature(feat_val) {
                Ok(feature) => features.push(feature),
                Err(reason) => {
                    tracing::warn!(target: "formats::geojson", index, %reason, "feature rejected");
                    rejected.push(RejectedFeature { index, reason });
                }
            }
        }

        Ok(Self {
            features,
            rejected,
            digest,
        })
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Fail on the first rejected feature instead of skipping it.
    pub fn into_strict(self) -> Result<Self, RegionParseError> {
        match self.rejected.first() {
            Some(r) => Err(RegionParseError::InvalidFeature {
                index: r.index,
                reason: r.reason.clone(),
            }),
            None => Ok(self),
        }
    }

    pub fn find(&self, code: u32) -> Option<&GeoFeature> {
        self.features.iter().find(|f| f.meta.code == code)
    }
}

/// Property keys lifted into typed metadata; everything else lands in `extra`.
const TYPED_KEYS: &[&str] = &["adcode", "name", "level", "center", "centroid", "childrenNum", "parent"];

fn parse_feature(value: &Value) -> Result<GeoFeature, String> {
    let obj = value
        .as_object()
        .ok_or("feature must be an object".to_string())?;
    let ty = obj
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or("feature missing type".to_string())?;
    if ty != "Feature" {
        return Err(format!("unexpected feature type: {ty}"));
    }

    let empty = Map::new();
    let props = obj
        .get("properties")
        .and_then(|v| v.as_object())
        .unwrap_or(&empty);
    let meta = parse_metadata(props)?;

    let geometry_val = obj
        .get("geometry")
        .ok_or("feature missing geometry".to_string())?;
    let geometry = parse_geometry(geometry_val)?;

    Ok(GeoFeature { meta, geometry })
}

fn parse_metadata(props: &Map<String, Value>) -> Result<FeatureMetadata, String> {
    let code = props
        .get("adcode")
        .ok_or("missing adcode".to_string())
        .and_then(parse_code)?;
    let name = props
        .get("name")
        .and_then(|v| v.as_str())
        .ok_or("missing name".to_string())?;
    let level_str = props
        .get("level")
        .and_then(|v| v.as_str())
        .ok_or("missing level".to_string())?;
    let level = AdminLevel::parse(level_str).ok_or(format!("unknown level: {level_str}"))?;

    let mut meta = FeatureMetadata::new(code, name, level);
    meta.centroid = props.get("centroid").and_then(parse_lon_lat);
    meta.center = props.get("center").and_then(parse_lon_lat);
    meta.children_num = props
        .get("childrenNum")
        .and_then(|v| v.as_u64())
        .and_then(|n| u32::try_from(n).ok());
    meta.parent_code = props
        .get("parent")
        .and_then(|p| p.get("adcode"))
        .and_then(|v| parse_code(v).ok());

    let extra = props
        .iter()
        .filter(|(k, _)| !TYPED_KEYS.contains(&k.as_str()))
        .map(|(k, v)| {
            let text = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), text)
        })
        .collect();
    meta.extra = ComponentProperties::new(extra);
    Ok(meta)
}

/// Administrative codes arrive as numbers or numeric strings.
fn parse_code(value: &Value) -> Result<u32, String> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or(format!("adcode out of range: {n}")),
        Value::String(s) => s
            .trim()
            .parse::<u32>()
            .map_err(|_| format!("adcode is not numeric: {s:?}")),
        other => Err(format!("adcode has unexpected type: {other}")),
    }
}

fn parse_lon_lat(value: &Value) -> Option<LonLat> {
    let arr = value.as_array()?;
    if arr.len() < 2 {
        return None;
    }
    let p = LonLat::new(arr[0].as_f64()?, arr[1].as_f64()?);
    p.is_finite().then_some(p)
}

fn parse_geometry(value: &Value) -> Result<RegionGeometry, String> {
    let obj = value
        .as_object()
        .ok_or("geometry must be an object".to_string())?;
    let ty = obj
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or("geometry missing type".to_string())?;

    let coords = obj
        .get("coordinates")
        .ok_or("geometry missing coordinates".to_string())?;

    match ty {
        "Polygon" => Ok(RegionGeometry::Polygon(parse_polygon(coords)?)),
        "MultiPolygon" => Ok(RegionGeometry::MultiPolygon(parse_multi_polygon(coords)?)),
        other => Err(format!("unsupported geometry type: {other}")),
    }
}

fn parse_point(coords: &Value) -> Result<LonLat, String> {
    let arr = coords
        .as_array()
        .ok_or("position must be an array".to_string())?;
    if arr.len() < 2 {
        return Err("position must have [lon, lat]".to_string());
    }
    let lon = arr[0].as_f64().ok_or("lon must be a number".to_string())?;
    let lat = arr[1].as_f64().ok_or("lat must be a number".to_string())?;
    Ok(LonLat::new(lon, lat))
}

fn parse_ring(coords: &Value) -> Result<Ring, String> {
    let arr = coords
        .as_array()
        .ok_or("ring must be an array".to_string())?;
    arr.iter().map(parse_point).collect()
}

fn parse_polygon(coords: &Value) -> Result<Vec<Ring>, String> {
    let rings = coords
        .as_array()
        .ok_or("Polygon coordinates must be an array of rings".to_string())?;
    rings.iter().map(parse_ring).collect()
}

fn parse_multi_polygon(coords: &Value) -> Result<Vec<Vec<Ring>>, String> {
    let polys = coords
        .as_array()
        .ok_or("MultiPolygon coordinates must be an array of polygons".to_string())?;
    polys.iter().map(parse_polygon).collect()
}
