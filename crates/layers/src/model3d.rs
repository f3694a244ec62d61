//! Georeferenced 3D models drawn from inside the host's custom-layer callbacks.

use formats::{DEFAULT_CULL_EXTENT, Model3dLayerConfig, ModelPlacement};
use gpu::{GlApi, RenderSession, SessionPhase};
use serde::Serialize;
use streaming::{FailurePolicy, ModelCache, ResourceLoader};

use crate::host::{CustomLayerHost, LayerError, RenderParameters};
use crate::layer::{Layer, LayerId};
use crate::projection::FrameProjector;

/// What happened to the layer's placements in one frame.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct FrameReport {
    pub drawn: usize,
    /// Center fell outside the clip window.
    pub culled: usize,
    /// Visible, but the model could not be loaded or had nothing to draw.
    pub skipped: usize,
}

/// The placements are fixed at construction. Models are loaded lazily by the
/// first frame that needs them and kept for the layer's lifetime.
#[derive(Debug)]
pub struct Model3dLayer<G: GlApi, L> {
    id: LayerId,
    placements: Vec<ModelPlacement>,
    cull_extent: f64,
    cache: ModelCache<L>,
    session: RenderSession<G>,
}

impl<G: GlApi, L: ResourceLoader> Model3dLayer<G, L> {
    pub fn new(id: LayerId, placements: Vec<ModelPlacement>, loader: L) -> Self {
        Self {
            id,
            placements,
            cull_extent: DEFAULT_CULL_EXTENT,
            cache: ModelCache::new(loader),
            session: RenderSession::new(),
        }
    }

    pub fn from_config(id: LayerId, config: Model3dLayerConfig, loader: L) -> Self {
        let policy = if config.options.cache_failures {
            FailurePolicy::Remember
        } else {
            FailurePolicy::Retry
        };
        let mut layer = Self::new(id, config.placements, loader);
        layer.cull_extent = config.options.cull_extent;
        layer.cache = layer.cache.with_failure_policy(policy);
        layer
    }

    pub fn placements(&self) -> &[ModelPlacement] {
        &self.placements
    }

    pub fn cull_extent(&self) -> f64 {
        self.cull_extent
    }

    pub fn cache(&self) -> &ModelCache<L> {
        &self.cache
    }

    pub fn phase(&self) -> SessionPhase {
        self.session.phase()
    }
}

impl<G: GlApi, L> Layer for Model3dLayer<G, L> {
    fn id(&self) -> LayerId {
        self.id
    }
}

impl<G: GlApi, L: ResourceLoader> CustomLayerHost<G> for Model3dLayer<G, L> {
    type Frame = FrameReport;

    fn initialize(&mut self, gl: &G) -> Result<(), LayerError> {
        self.session
            .initialize(gl)
            .map_err(LayerError::Unavailable)?;
        tracing::info!(
            layer = %self.id,
            placements = self.placements.len(),
            "model layer initialized"
        );
        Ok(())
    }

    /// Draw every visible placement. A placement whose model fails to load is
    /// skipped; it never aborts the frame.
    fn render(&mut self, gl: &G, params: &RenderParameters) -> Result<FrameReport, LayerError> {
        if !params.zoom.is_finite() {
            return Err(LayerError::InvalidZoom(params.zoom));
        }

        let projector = FrameProjector::new(params.projection_matrix, params.zoom, self.cull_extent);
        let mut frame = self
            .session
            .begin_frame(gl, &params.projection_matrix)
            .map_err(LayerError::Unavailable)?;

        let mut report = FrameReport::default();
        for placement in &self.placements {
            let projected = projector.project(placement);
            if !projector.is_visible(projected.world) {
                tracing::trace!(id = %placement.id, "placement culled");
                report.culled += 1;
                continue;
            }

            let model = match self.cache.get(&placement.url) {
                Ok(model) => model,
                Err(err) => {
                    tracing::debug!(id = %placement.id, "placement skipped: {err}");
                    report.skipped += 1;
                    continue;
                }
            };

            if frame.draw(&projected.model_matrix, &model) {
                report.drawn += 1;
            } else {
                report.skipped += 1;
            }
        }

        tracing::debug!(
            layer = %self.id,
            drawn = report.drawn,
            culled = report.culled,
            skipped = report.skipped,
            "model frame"
        );
        Ok(report)
    }

    fn context_lost(&mut self) {
        self.session.context_lost();
    }

    fn deinitialize(&mut self, gl: &G) {
        self.session.deinitialize(gl);
    }
}

#[cfg(test)]
mod tests {
    use super::{FrameReport, Model3dLayer};
    use crate::host::{CustomLayerHost, LayerError, RenderParameters};
    use crate::layer::{Layer, LayerId};
    use crate::projection::{FrameProjector, orthographic_around};
    use formats::{Model3dLayerConfig, ModelPlacement};
    use foundation::math::{LatLngAlt, Mat4, Vec3};
    use gpu::SessionError;
    use gpu::SessionPhase;
    use gpu::headless::HeadlessGl;
    use pretty_assertions::assert_eq;
    use std::fs;
    use streaming::{FileLoader, ResourceError};

    const ZOOM: f64 = 15.0;
    const CUBE: &str = include_str!("../assets/cube.json");
    const LAYER: &str = include_str!("../assets/model3d_layer.json");

    fn fixture_layer(
        dir: &tempfile::TempDir,
        layer_json: &str,
    ) -> Model3dLayer<HeadlessGl, FileLoader> {
        fs::write(dir.path().join("cube.json"), CUBE).expect("write cube");
        let config = Model3dLayerConfig::from_json_str(layer_json).expect("config");
        Model3dLayer::from_config(LayerId(7), config, FileLoader::with_root(dir.path()))
    }

    /// View centered on the first placement, wide enough to see both fixtures.
    fn view_on_first(layer: &Model3dLayer<HeadlessGl, FileLoader>) -> RenderParameters {
        let projector = FrameProjector::new(Mat4::IDENTITY, ZOOM, 2.0);
        let center = projector.project(&layer.placements()[0]).world;
        RenderParameters::new(orthographic_around(center, 512.0), ZOOM)
    }

    #[test]
    fn file_placement_is_cached_and_http_placement_is_skipped_every_frame() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut layer = fixture_layer(&dir, LAYER);
        let gl = HeadlessGl::new();
        layer.initialize(&gl).expect("initialize");
        let params = view_on_first(&layer);

        for _ in 0..3 {
            let report = layer.render(&gl, &params).expect("render");
            assert_eq!(
                report,
                FrameReport {
                    drawn: 1,
                    culled: 0,
                    skipped: 1
                }
            );
        }

        assert_eq!(layer.cache().len(), 1);
        assert!(layer.cache().contains("file://cube.json"));
        assert!(!layer.cache().contains("https://example.com/cube.json"));
        // one decode for the file, one failed attempt per frame for https
        assert_eq!(layer.cache().stats().loads, 4);
        assert_eq!(gl.draw_calls(), vec![(36, 0); 3]);
    }

    #[test]
    fn failing_placements_ahead_of_a_good_one_do_not_abort_the_frame() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("cube.json"), CUBE).expect("write cube");
        fs::write(
            dir.path().join("broken.json"),
            r#"{
                "name": "broken",
                "dataArrays": { "position": [0,0,0, 1,0,0, 0,1,0], "normal": [0,0,1, 0,0,1] },
                "meshes": [ { "indices": [0, 1, 2] } ]
            }"#,
        )
        .expect("write broken");

        let here = LatLngAlt::new(37.8, -122.5, 0.0);
        let placements = vec![
            ModelPlacement::new("broken", here, [10.0, 10.0, 10.0], "file://broken.json"),
            ModelPlacement::new("remote", here, [10.0, 10.0, 10.0], "http://example.com/cube.json"),
            ModelPlacement::new("cube", here, [10.0, 10.0, 10.0], "file://cube.json"),
        ];
        let mut layer: Model3dLayer<HeadlessGl, _> =
            Model3dLayer::new(LayerId(2), placements, FileLoader::with_root(dir.path()));
        let gl = HeadlessGl::new();
        layer.initialize(&gl).expect("initialize");
        let params = view_on_first(&layer);

        let report = layer.render(&gl, &params).expect("render");
        assert_eq!(
            report,
            FrameReport {
                drawn: 1,
                culled: 0,
                skipped: 2
            }
        );
        assert_eq!(gl.draw_calls(), vec![(36, 0)]);
        assert_eq!(layer.cache().len(), 1);
        assert!(layer.cache().contains("file://cube.json"));
    }

    #[test]
    fn remembered_failures_are_not_retried() {
        let dir = tempfile::tempdir().expect("tempdir");
        let json = LAYER.replacen("\"cullExtent\": 2.0,", "\"cullExtent\": 2.0, \"cacheFailures\": true,", 1);
        let mut layer = fixture_layer(&dir, &json);
        let gl = HeadlessGl::new();
        layer.initialize(&gl).expect("initialize");
        let params = view_on_first(&layer);

        for _ in 0..3 {
            let report = layer.render(&gl, &params).expect("render");
            assert_eq!(report.skipped, 1);
        }
        assert_eq!(layer.cache().stats().loads, 2);
        assert!(layer.cache().has_failed("https://example.com/cube.json"));
    }

    #[test]
    fn culled_placements_never_touch_the_cache() {
        let reads = std::cell::Cell::new(0);
        let loader = |_url: &str| {
            reads.set(reads.get() + 1);
            Ok::<_, ResourceError>(CUBE.as_bytes().to_vec())
        };
        let placement = ModelPlacement::new(
            "far",
            LatLngAlt::new(-33.9, 151.2, 0.0),
            [10.0, 10.0, 10.0],
            "file://cube.json",
        );
        let mut layer: Model3dLayer<HeadlessGl, _> =
            Model3dLayer::new(LayerId(1), vec![placement], loader);
        let gl = HeadlessGl::new();
        layer.initialize(&gl).expect("initialize");

        let params = RenderParameters::new(orthographic_around(Vec3::ZERO, 512.0), ZOOM);
        let report = layer.render(&gl, &params).expect("render");
        assert_eq!(report.culled, 1);
        assert_eq!(report.drawn, 0);
        assert_eq!(reads.get(), 0);
        assert!(gl.draw_calls().is_empty());
    }

    #[test]
    fn render_before_initialize_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut layer = fixture_layer(&dir, LAYER);
        let gl = HeadlessGl::new();
        let params = view_on_first(&layer);

        assert!(matches!(
            layer.render(&gl, &params),
            Err(LayerError::Unavailable(SessionError::NotReady(
                SessionPhase::Uninitialized
            )))
        ));
        assert_eq!(gl.call_count(), 0);
    }

    #[test]
    fn non_finite_zoom_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut layer = fixture_layer(&dir, LAYER);
        let gl = HeadlessGl::new();
        layer.initialize(&gl).expect("initialize");

        let params = RenderParameters::new(Mat4::IDENTITY, f64::NAN);
        assert!(matches!(
            layer.render(&gl, &params),
            Err(LayerError::InvalidZoom(_))
        ));
    }

    #[test]
    fn gpu_init_failure_surfaces_to_the_host() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut layer = fixture_layer(&dir, LAYER);
        let gl = HeadlessGl::failing_link();

        assert!(matches!(
            layer.initialize(&gl),
            Err(LayerError::Unavailable(SessionError::Init(_)))
        ));
        assert_eq!(gl.live_objects(), 0);
        let params = view_on_first(&layer);
        assert!(layer.render(&gl, &params).is_err());
    }

    #[test]
    fn context_loss_then_reinitialize_keeps_the_cache() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut layer = fixture_layer(&dir, LAYER);
        let gl = HeadlessGl::new();
        layer.initialize(&gl).expect("initialize");
        let params = view_on_first(&layer);
        layer.render(&gl, &params).expect("first frame");

        gl.lose_context();
        layer.context_lost();
        assert_eq!(layer.phase(), SessionPhase::Lost);
        assert!(layer.render(&gl, &params).is_err());

        layer.initialize(&gl).expect("reinitialize");
        let report = layer.render(&gl, &params).expect("frame after restore");
        assert_eq!(report.drawn, 1);
        assert_eq!(layer.cache().stats().hits, 1);
    }

    #[test]
    fn deinitialize_twice_releases_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut layer = fixture_layer(&dir, LAYER);
        let gl = HeadlessGl::new();
        layer.initialize(&gl).expect("initialize");
        assert_eq!(layer.id(), LayerId(7));

        layer.deinitialize(&gl);
        layer.deinitialize(&gl);
        assert_eq!(layer.phase(), SessionPhase::Deinitialized);
        assert_eq!(gl.live_objects(), 0);
        assert_eq!(gl.invalid_deletes(), 0);
    }

    #[test]
    fn report_serializes_for_the_host() {
        let report = FrameReport {
            drawn: 2,
            culled: 1,
            skipped: 0,
        };
        assert_eq!(
            serde_json::to_value(report).expect("json"),
            serde_json::json!({ "drawn": 2, "culled": 1, "skipped": 0 })
        );
    }
}
