use foundation::math::LonLat;

/// Administrative level of a region, ordered from coarsest to finest.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AdminLevel {
    Nation,
    Province,
    City,
    District,
}

impl AdminLevel {
    /// Parses the `level` property of a boundary feature (`country` is accepted for the nation).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "nation" | "country" => Some(Self::Nation),
            "province" => Some(Self::Province),
            "city" => Some(Self::City),
            "district" => Some(Self::District),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Nation => "nation",
            Self::Province => "province",
            Self::City => "city",
            Self::District => "district",
        }
    }
}

impl std::fmt::Display for AdminLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Free-form key/value pairs carried alongside the typed metadata.
///
/// Values keep their JSON text so nothing is lost when a property is not
/// understood by the pipeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentProperties {
    pub pairs: Vec<(String, String)>,
}

impl ComponentProperties {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Administrative metadata of one region.
///
/// Stored once per feature container in the scene graph side table and
/// copied by value into picking results.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMetadata {
    pub code: u32,
    pub name: String,
    pub level: AdminLevel,
    pub parent_code: Option<u32>,
    pub centroid: Option<LonLat>,
    pub center: Option<LonLat>,
    pub children_num: Option<u32>,
    pub extra: ComponentProperties,
}

impl FeatureMetadata {
    pub fn new(code: u32, name: impl Into<String>, level: AdminLevel) -> Self {
        Self {
            code,
            name: name.into(),
            level,
            parent_code: None,
            centroid: None,
            center: None,
            children_num: None,
            extra: ComponentProperties::default(),
        }
    }

    pub fn with_centroid(mut self, centroid: LonLat) -> Self {
        self.centroid = Some(centroid);
        self
    }

    /// `false` only when the source explicitly reports zero children.
    pub fn may_have_children(&self) -> bool {
        self.children_num != Some(0)
    }
}
