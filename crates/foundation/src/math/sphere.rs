//! Placement of geographic coordinates on a render sphere.
//!
//! Convention (Y-up globe): latitude 0 / longitude 0 maps to `+Z`, longitude
//! 90°E maps to `+X` and the north pole to `+Y`. Elevation is an absolute
//! offset above `radius`, in the same units.

use super::Vec3;

/// Geographic position on the render sphere, in degrees.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SpherePoint {
    pub lat_deg: f64,
    pub lon_deg: f64,
    pub elevation: f64,
}

impl SpherePoint {
    pub fn new(lat_deg: f64, lon_deg: f64, elevation: f64) -> Self {
        Self {
            lat_deg,
            lon_deg,
            elevation,
        }
    }
}

/// Unit direction for (lat, lon) in degrees.
pub fn unit_vector(lat_deg: f64, lon_deg: f64) -> Vec3 {
    let phi = (90.0 - lat_deg).to_radians();
    let theta = (90.0 - lon_deg).to_radians();
    let sin_phi = phi.sin();
    Vec3::new(sin_phi * theta.cos(), phi.cos(), sin_phi * theta.sin())
}

pub fn lat_lon_to_vec3(lat_deg: f64, lon_deg: f64, elevation: f64, radius: f64) -> Vec3 {
    unit_vector(lat_deg, lon_deg).scale(radius + elevation)
}

/// Inverse of [`lat_lon_to_vec3`]. Longitude is returned in `[-180, 180]`.
///
/// The origin maps to `(0, 0, -radius)`.
pub fn vec3_to_lat_lon(v: Vec3, radius: f64) -> SpherePoint {
    let d = v.length();
    if d <= 0.0 {
        return SpherePoint::new(0.0, 0.0, -radius);
    }
    let phi = (v.y / d).clamp(-1.0, 1.0).acos();
    let theta = v.z.atan2(v.x);
    let lat = 90.0 - phi.to_degrees();
    let lon = wrap_lon_deg(90.0 - theta.to_degrees());
    SpherePoint::new(lat, lon, d - radius)
}

/// `(lat_deg, lon_deg)` of the direction of `v`, ignoring its length.
pub fn vec3_to_unit_lat_lon(v: Vec3) -> (f64, f64) {
    let p = vec3_to_lat_lon(v, 1.0);
    (p.lat_deg, p.lon_deg)
}

/// Wrap a longitude into `[-180, 180]`. `180` stays `180`.
pub fn wrap_lon_deg(lon: f64) -> f64 {
    if (-180.0..=180.0).contains(&lon) {
        return lon;
    }
    let wrapped = (lon + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 && lon > 0.0 {
        180.0
    } else {
        wrapped
    }
}
