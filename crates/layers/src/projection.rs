//! Geographic placement to world space, and the clip-space visibility test.

use formats::ModelPlacement;
use foundation::math::{
    Mat4, MercatorCoordinate, Vec3, meters_per_pixel_at_latitude, world_size_at_zoom,
};

/// A placement resolved against one zoom level.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ProjectedPlacement {
    /// Center in world units (`normalized mercator * world size`).
    pub world: Vec3,
    /// Model-to-world transform: meters scaled to world units, translated to `world`.
    pub model_matrix: Mat4,
}

/// Projects placements for a single frame.
///
/// Only the placement's center is tested against the clip window; a model
/// whose center is off screen is culled even if part of it would be visible.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameProjector {
    projection: Mat4,
    zoom: f64,
    world_size: f64,
    cull_extent: f64,
}

impl FrameProjector {
    pub fn new(projection: Mat4, zoom: f64, cull_extent: f64) -> Self {
        Self {
            projection,
            zoom,
            world_size: world_size_at_zoom(zoom),
            cull_extent,
        }
    }

    pub fn world_size(&self) -> f64 {
        self.world_size
    }

    pub fn project(&self, placement: &ModelPlacement) -> ProjectedPlacement {
        let location = placement.position;
        let world = MercatorCoordinate::from_lat_lng(location, self.zoom).to_world(self.world_size);
        let meters_per_pixel = meters_per_pixel_at_latitude(location.lat_deg, self.zoom);
        let scale = Vec3::from_array(placement.scale).scale(1.0 / meters_per_pixel);
        ProjectedPlacement {
            world,
            model_matrix: Mat4::from_scale_translation(scale, world),
        }
    }

    /// Clip-space position of a world point after the perspective divide.
    pub fn clip_position(&self, world: Vec3) -> Option<Vec3> {
        self.projection.project_point(world)
    }

    pub fn is_visible(&self, world: Vec3) -> bool {
        self.clip_position(world)
            .is_some_and(|clip| within_extent(clip, self.cull_extent))
    }
}

/// Top-down orthographic view of `half_extent` world units around `center`.
pub fn orthographic_around(center: Vec3, half_extent: f64) -> Mat4 {
    Mat4::orthographic(
        center.x - half_extent,
        center.x + half_extent,
        center.y + half_extent,
        center.y - half_extent,
        -1.0e6,
        1.0e6,
    )
}

/// `true` when both `x` and `y` lie strictly inside `(-extent, extent)`.
pub fn within_extent(clip: Vec3, extent: f64) -> bool {
    clip.x.abs() < extent && clip.y.abs() < extent
}
