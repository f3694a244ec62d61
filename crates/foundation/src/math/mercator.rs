//! Spherical Web-Mercator helpers matching the host map's projection.
//!
//! Normalized Mercator space maps the whole world to `[0, 1] x [0, 1]` with
//! `x` growing east and `y` growing south. World space is the normalized
//! space multiplied by the world size at the current zoom.

use std::f64::consts::{FRAC_PI_4, PI};

use super::Vec3;

/// Edge length of a zoom-0 tile in pixels.
pub const TILE_SIZE: f64 = 512.0;
/// Sphere radius used by Web-Mercator (meters).
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;
/// Latitude at which the Mercator square is cut off.
pub const LATITUDE_MAX: f64 = 85.051_128_779_806_6;

/// Geographic position in degrees plus altitude above the sea surface in meters.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LatLngAlt {
    pub lat_deg: f64,
    pub lng_deg: f64,
    pub altitude_m: f64,
}

impl LatLngAlt {
    pub fn new(lat_deg: f64, lng_deg: f64, altitude_m: f64) -> Self {
        Self {
            lat_deg,
            lng_deg,
            altitude_m,
        }
    }
}

pub fn mercator_x_from_lng(lng_deg: f64) -> f64 {
    (180.0 + lng_deg) / 360.0
}

pub fn mercator_y_from_lat(lat_deg: f64) -> f64 {
    (180.0 - (180.0 / PI * (FRAC_PI_4 + lat_deg * PI / 360.0).tan().ln())) / 360.0
}

pub fn clamp_latitude(lat_deg: f64) -> f64 {
    lat_deg.clamp(-LATITUDE_MAX, LATITUDE_MAX)
}

/// World size in pixels for a given scale factor (`2^zoom`).
pub fn world_size(scale: f64) -> f64 {
    scale * TILE_SIZE
}

pub fn world_size_at_zoom(zoom: f64) -> f64 {
    world_size(zoom.exp2())
}

/// Ground resolution at `lat_deg` for the given zoom level.
pub fn meters_per_pixel_at_latitude(lat_deg: f64, zoom: f64) -> f64 {
    let lat = clamp_latitude(lat_deg);
    (lat * PI / 180.0).cos() * 2.0 * PI * EARTH_RADIUS_M / world_size_at_zoom(zoom)
}

/// Point in normalized Mercator space.
///
/// `z` uses the same unit as `x`/`y`, so scaling all three by the world
/// size keeps the altitude proportional to the ground.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MercatorCoordinate {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl MercatorCoordinate {
    pub fn from_lat_lng(location: LatLngAlt, zoom: f64) -> Self {
        let meters_per_pixel = meters_per_pixel_at_latitude(location.lat_deg, zoom);
        let world_size = world_size_at_zoom(zoom);
        Self {
            x: mercator_x_from_lng(location.lng_deg),
            y: mercator_y_from_lat(location.lat_deg),
            z: location.altitude_m / meters_per_pixel / world_size,
        }
    }

    pub fn to_world(self, world_size: f64) -> Vec3 {
        Vec3::new(self.x, self.y, self.z).scale(world_size)
    }
}
