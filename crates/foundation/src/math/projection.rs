//! Geographic to planar projection.
//!
//! The planar frame is north-up: `x` grows eastward, `y` grows northward, and
//! the configured center maps to the origin.

use core::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use super::Vec2;

/// Geographic coordinate in degrees.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct LonLat {
    pub lon_deg: f64,
    pub lat_deg: f64,
}

impl LonLat {
    pub const fn new(lon_deg: f64, lat_deg: f64) -> Self {
        Self { lon_deg, lat_deg }
    }

    pub fn is_finite(self) -> bool {
        self.lon_deg.is_finite() && self.lat_deg.is_finite()
    }

    /// Longitude wrapped into `[-180, 180]`; in-range values are returned untouched.
    pub fn wrapped_lon_deg(self) -> f64 {
        if (-180.0..=180.0).contains(&self.lon_deg) {
            self.lon_deg
        } else {
            (self.lon_deg + 180.0).rem_euclid(360.0) - 180.0
        }
    }
}

impl From<[f64; 2]> for LonLat {
    fn from(v: [f64; 2]) -> Self {
        Self::new(v[0], v[1])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProjectionError {
    NonPositiveScale(f64),
    NonFiniteCenter(LonLat),
}

impl std::fmt::Display for ProjectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProjectionError::NonPositiveScale(s) => {
                write!(f, "projection scale must be positive and finite, got {s}")
            }
            ProjectionError::NonFiniteCenter(c) => {
                write!(f, "projection center must be finite and off the poles, got [{}, {}]", c.lon_deg, c.lat_deg)
            }
        }
    }
}

impl std::error::Error for ProjectionError {}

/// Center + scale of one scene build. `scale > 0` is enforced at construction.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ProjectionParams {
    center: LonLat,
    scale: f64,
}

impl ProjectionParams {
    pub fn new(center: LonLat, scale: f64) -> Result<Self, ProjectionError> {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(ProjectionError::NonPositiveScale(scale));
        }
        if !center.is_finite() || center.lat_deg.abs() >= 90.0 {
            return Err(ProjectionError::NonFiniteCenter(center));
        }
        Ok(Self { center, scale })
    }

    pub fn center(&self) -> LonLat {
        self.center
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }
}

/// Spherical Mercator with a fixed center, uniform scale and zero translation.
///
/// Pure function of its parameters; rebuild it whenever the parameters change.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MercatorProjection {
    params: ProjectionParams,
    center_x: f64,
    center_y: f64,
}

impl MercatorProjection {
    pub fn new(params: ProjectionParams) -> Self {
        let c = params.center;
        Self {
            params,
            center_x: c.wrapped_lon_deg().to_radians(),
            center_y: mercator_y(c.lat_deg),
        }
    }

    pub fn params(&self) -> ProjectionParams {
        self.params
    }

    /// Project a geographic coordinate. The result may be non-finite near the
    /// poles; use [`MercatorProjection::project_finite`] when feeding geometry.
    pub fn project(&self, p: LonLat) -> Vec2 {
        let k = self.params.scale;
        let x = p.wrapped_lon_deg().to_radians() - self.center_x;
        let y = mercator_y(p.lat_deg) - self.center_y;
        Vec2::new(k * x, k * y)
    }

    pub fn project_finite(&self, p: LonLat) -> Option<Vec2> {
        let v = self.project(p);
        v.is_finite().then_some(v)
    }

    /// Inverse of [`MercatorProjection::project`].
    pub fn invert(&self, v: Vec2) -> LonLat {
        let k = self.params.scale;
        let lon = (v.x / k + self.center_x).to_degrees();
        let lat = (2.0 * (v.y / k + self.center_y).exp().atan() - FRAC_PI_2)
            .to_degrees();
        LonLat::new(lon, lat)
    }
}

/// Unbounded at the poles: `±inf` for `|lat| >= 90°`.
fn mercator_y(lat_deg: f64) -> f64 {
    if lat_deg.abs() >= 90.0 {
        return f64::INFINITY.copysign(lat_deg);
    }
    (FRAC_PI_4 + lat_deg.to_radians() * 0.5).tan().ln()
}

#[cfg(test)]
mod tests {
    use super::{LonLat, MercatorProjection, ProjectionError, ProjectionParams};

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    fn china() -> MercatorProjection {
        MercatorProjection::new(ProjectionParams::new(LonLat::new(104.0, 37.5), 80.0).unwrap())
    }

    #[test]
    fn center_maps_to_origin() {
        let p = china().project(LonLat::new(104.0, 37.5));
        assert_close(p.x, 0.0, 1e-12);
        assert_close(p.y, 0.0, 1e-12);
    }

    #[test]
    fn projection_is_deterministic() {
        let proj = china();
        let a = proj.project(LonLat::new(116.41, 40.19));
        let b = proj.project(LonLat::new(116.41, 40.19));
        assert_eq!(a, b);
        let again = china().project(LonLat::new(116.41, 40.19));
        assert_eq!(a, again);
    }

    #[test]
    fn north_east_is_positive() {
        let p = china().project(LonLat::new(116.41, 40.19));
        assert!(p.x > 0.0);
        assert!(p.y > 0.0);
        // 12.41 degrees of longitude at scale 80.
        assert_close(p.x, 80.0 * 12.41_f64.to_radians(), 1e-9);
    }

    #[test]
    fn poles_are_not_finite() {
        let proj = china();
        assert!(proj.project_finite(LonLat::new(0.0, 90.0)).is_none());
        assert!(proj.project_finite(LonLat::new(0.0, 89.0)).is_some());
    }

    #[test]
    fn longitudes_past_the_antimeridian_wrap() {
        let proj = china();
        let wrapped = proj.project(LonLat::new(-170.0, 10.0));
        let raw = proj.project(LonLat::new(190.0, 10.0));
        assert_close(wrapped.x, raw.x, 1e-9);
        assert_close(wrapped.y, raw.y, 1e-9);
    }

    #[test]
    fn invert_recovers_geographic_coordinate() {
        let proj = china();
        let geo = LonLat::new(87.6, 43.8);
        let back = proj.invert(proj.project(geo));
        assert_close(back.lon_deg, geo.lon_deg, 1e-9);
        assert_close(back.lat_deg, geo.lat_deg, 1e-9);
    }

    #[test]
    fn rejects_non_positive_scale() {
        assert_eq!(
            ProjectionParams::new(LonLat::new(0.0, 0.0), 0.0),
            Err(ProjectionError::NonPositiveScale(0.0))
        );
        assert!(ProjectionParams::new(LonLat::new(f64::NAN, 0.0), 1.0).is_err());
        assert!(ProjectionParams::new(LonLat::new(0.0, 90.0), 1.0).is_err());
    }
}
