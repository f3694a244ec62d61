use foundation::math::LatLngAlt;
use serde_json::Value;

use crate::layer_config::ConfigurationError;

/// One model instance on the map.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelPlacement {
    pub id: String,
    pub position: LatLngAlt,
    /// Meters per model unit along each model axis.
    pub scale: [f64; 3],
    /// Asset location; only `file://` urls resolve.
    pub url: String,
}

impl ModelPlacement {
    pub fn new(id: impl Into<String>, position: LatLngAlt, scale: [f64; 3], url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            position,
            scale,
            url: url.into(),
        }
    }
}

/// Parse the `models` array of a model layer.
///
/// Malformed entries are skipped with a warning; only a non-array or an
/// empty array fails as a whole.
pub fn parse_placements(value: &Value) -> Result<Vec<ModelPlacement>, ConfigurationError> {
    let entries = value.as_array().ok_or(ConfigurationError::ModelsNotArray)?;
    if entries.is_empty() {
        return Err(ConfigurationError::EmptyModels);
    }

    let mut placements = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        match parse_placement(index, entry) {
            Ok(p) => placements.push(p),
            Err(err) => tracing::warn!(index, "skipping model entry: {err}"),
        }
    }
    Ok(placements)
}

pub fn parse_placement(index: usize, value: &Value) -> Result<ModelPlacement, ConfigurationError> {
    let invalid = |reason: String| ConfigurationError::InvalidEntry { index, reason };

    let obj = value
        .as_object()
        .ok_or_else(|| invalid("model should be an object".to_string()))?;

    let id = obj
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let [lat, lng, alt] = vec3_member(obj, "position").map_err(invalid)?;
    let scale = vec3_member(obj, "scale").map_err(invalid)?;
    let url = obj
        .get("url")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| invalid("missing url".to_string()))?
        .to_string();

    Ok(ModelPlacement {
        id,
        position: LatLngAlt::new(lat, lng, alt),
        scale,
        url,
    })
}

fn vec3_member(obj: &serde_json::Map<String, Value>, member: &str) -> Result<[f64; 3], String> {
    let arr = obj
        .get(member)
        .ok_or_else(|| format!("missing {member}"))?
        .as_array()
        .ok_or_else(|| format!("{member} should be an array"))?;
    if arr.len() != 3 {
        return Err(format!("{member} should have 3 elements, got {}", arr.len()));
    }

    let mut out = [0.0; 3];
    for (slot, v) in out.iter_mut().zip(arr) {
        *slot = v
            .as_f64()
            .filter(|f| f.is_finite())
            .ok_or_else(|| format!("{member} should only contain numbers"))?;
    }
    Ok(out)
}
