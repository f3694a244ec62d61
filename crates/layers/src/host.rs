//! The callback surface a host map renderer drives a custom layer through.
//!
//! The host calls these sequentially on the thread that owns the GL context;
//! none of them may be invoked concurrently with another.

use foundation::math::Mat4;
use gpu::{GlApi, SessionError};

use crate::layer::Layer;

/// Read-only per-frame input from the host.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RenderParameters {
    /// Column-major world-to-clip matrix.
    pub projection_matrix: Mat4,
    pub zoom: f64,
}

impl RenderParameters {
    pub fn new(projection_matrix: Mat4, zoom: f64) -> Self {
        Self {
            projection_matrix,
            zoom,
        }
    }

    /// Parameters from the host's raw 16-double matrix.
    pub fn from_cols_array(projection_matrix: [f64; 16], zoom: f64) -> Self {
        Self::new(Mat4::from_cols_array(projection_matrix), zoom)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LayerError {
    #[error("layer is unavailable: {0}")]
    Unavailable(#[source] SessionError),
    #[error("zoom must be finite, got {0}")]
    InvalidZoom(f64),
}

pub trait CustomLayerHost<G: GlApi>: Layer {
    /// Output of a successful frame.
    type Frame;

    fn initialize(&mut self, gl: &G) -> Result<(), LayerError>;
    fn render(&mut self, gl: &G, params: &RenderParameters) -> Result<Self::Frame, LayerError>;
    fn context_lost(&mut self);
    fn deinitialize(&mut self, gl: &G);
}
