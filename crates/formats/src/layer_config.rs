use std::path::PathBuf;

use serde::Deserialize;
use serde_json::Value;

use crate::placement::{ModelPlacement, parse_placements};

/// `customLayer` value selecting the model layer.
pub const MODEL3D_LAYER_TYPE: &str = "model3d";

/// Default clip-space half extent used for the center-point visibility test.
pub const DEFAULT_CULL_EXTENT: f64 = 2.0;

#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("unknown custom layer: {0:?}")]
    UnknownCustomLayer(String),
    #[error("there are no models")]
    MissingModels,
    #[error("'models' should be an array")]
    ModelsNotArray,
    #[error("there should be at least one model")]
    EmptyModels,
    #[error("none of the model entries could be used")]
    NoUsableModels,
    #[error("model {index}: {reason}")]
    InvalidEntry { index: usize, reason: String },
    #[error("invalid layer options: {0}")]
    Options(#[source] serde_json::Error),
    #[error("cullExtent must be a positive number, got {0}")]
    CullExtent(f64),
    #[error("layer config is not valid JSON: {0}")]
    Json(#[source] serde_json::Error),
}

/// Tunables read from the layer object next to `models`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Model3dOptions {
    /// Placements whose projected center falls at or beyond this clip-space
    /// coordinate on x or y are culled.
    pub cull_extent: f64,
    /// Remember failed loads instead of retrying them every frame.
    pub cache_failures: bool,
    /// Base directory for relative `file://` urls. `None` uses the working directory.
    pub asset_root: Option<PathBuf>,
}

impl Default for Model3dOptions {
    fn default() -> Self {
        Self {
            cull_extent: DEFAULT_CULL_EXTENT,
            cache_failures: false,
            asset_root: None,
        }
    }
}

/// A parsed `{"customLayer": "model3d", "models": [...]}` layer object.
#[derive(Debug, Clone, PartialEq)]
pub struct Model3dLayerConfig {
    pub placements: Vec<ModelPlacement>,
    pub options: Model3dOptions,
}

impl Model3dLayerConfig {
    pub fn from_json_str(payload: &str) -> Result<Self, ConfigurationError> {
        let value: Value = serde_json::from_str(payload).map_err(ConfigurationError::Json)?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self, ConfigurationError> {
        let layer_type = value
            .get("customLayer")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if layer_type != MODEL3D_LAYER_TYPE {
            return Err(ConfigurationError::UnknownCustomLayer(layer_type.to_string()));
        }

        let models = value.get("models").ok_or(ConfigurationError::MissingModels)?;
        let placements = parse_placements(models)?;
        if placements.is_empty() {
            return Err(ConfigurationError::NoUsableModels);
        }

        let options = Model3dOptions::deserialize(value).map_err(ConfigurationError::Options)?;
        if !(options.cull_extent.is_finite() && options.cull_extent > 0.0) {
            return Err(ConfigurationError::CullExtent(options.cull_extent));
        }

        Ok(Self {
            placements,
            options,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigurationError, DEFAULT_CULL_EXTENT, Model3dLayerConfig, Model3dOptions};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::path::PathBuf;

    #[test]
    fn parses_layer_with_defaults() {
        let value = json!({
            "customLayer": "model3d",
            "models": [
                { "id": "a", "position": [1, 2, 3], "scale": [1, 1, 1], "url": "file://a.json" }
            ]
        });
        let config = Model3dLayerConfig::from_value(&value).expect("config");
        assert_eq!(config.placements.len(), 1);
        assert_eq!(config.options, Model3dOptions::default());
        assert_eq!(config.options.cull_extent, DEFAULT_CULL_EXTENT);
    }

    #[test]
    fn reads_options_next_to_models() {
        let value = json!({
            "customLayer": "model3d",
            "cullExtent": 1.5,
            "cacheFailures": true,
            "assetRoot": "/srv/models",
            "models": [
                { "id": "a", "position": [1, 2, 3], "scale": [1, 1, 1], "url": "file://a.json" }
            ]
        });
        let config = Model3dLayerConfig::from_value(&value).expect("config");
        assert_eq!(
            config.options,
            Model3dOptions {
                cull_extent: 1.5,
                cache_failures: true,
                asset_root: Some(PathBuf::from("/srv/models")),
            }
        );
    }

    #[test]
    fn parses_fixture_layer() {
        let config =
            Model3dLayerConfig::from_json_str(include_str!("../../layers/assets/model3d_layer.json"))
                .expect("config");
        let urls: Vec<&str> = config.placements.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(urls, vec!["file://cube.json", "https://example.com/cube.json"]);
    }

    #[test]
    fn rejects_other_layer_types() {
        let value = json!({ "customLayer": "heatmap", "models": [] });
        assert!(matches!(
            Model3dLayerConfig::from_value(&value),
            Err(ConfigurationError::UnknownCustomLayer(name)) if name == "heatmap"
        ));
    }

    #[test]
    fn rejects_missing_or_unusable_models() {
        let missing = json!({ "customLayer": "model3d" });
        assert!(matches!(
            Model3dLayerConfig::from_value(&missing),
            Err(ConfigurationError::MissingModels)
        ));

        let unusable = json!({ "customLayer": "model3d", "models": [1, 2] });
        assert!(matches!(
            Model3dLayerConfig::from_value(&unusable),
            Err(ConfigurationError::NoUsableModels)
        ));
    }

    #[test]
    fn rejects_bad_options() {
        let value = json!({
            "customLayer": "model3d",
            "cullExtent": -1.0,
            "models": [
                { "id": "a", "position": [1, 2, 3], "scale": [1, 1, 1], "url": "file://a.json" }
            ]
        });
        assert!(matches!(
            Model3dLayerConfig::from_value(&value),
            Err(ConfigurationError::CullExtent(_))
        ));

        let wrong_type = json!({
            "customLayer": "model3d",
            "cacheFailures": "yes",
            "models": [
                { "id": "a", "position": [1, 2, 3], "scale": [1, 1, 1], "url": "file://a.json" }
            ]
        });
        assert!(matches!(
            Model3dLayerConfig::from_value(&wrong_type),
            Err(ConfigurationError::Options(_))
        ));
    }
}
