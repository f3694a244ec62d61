use formats::{ConfigurationError, Model3dLayerConfig};
use gpu::GlApi;
use serde_json::Value;
use streaming::FileLoader;

use crate::layer::LayerId;
use crate::model3d::Model3dLayer;

/// Build the custom layer described by a style-layer JSON object.
///
/// Only `"customLayer": "model3d"` is known. Relative `file://` urls resolve
/// against `assetRoot` when the layer sets one.
pub fn create_custom_layer<G: GlApi>(
    id: LayerId,
    value: &Value,
) -> Result<Model3dLayer<G, FileLoader>, ConfigurationError> {
    let config = Model3dLayerConfig::from_value(value)?;
    let loader = match &config.options.asset_root {
        Some(root) => FileLoader::with_root(root.clone()),
        None => FileLoader::new(),
    };
    tracing::debug!(
        layer = %id,
        placements = config.placements.len(),
        root = ?loader.root(),
        "creating model layer"
    );
    Ok(Model3dLayer::from_config(id, config, loader))
}
