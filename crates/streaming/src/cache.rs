use std::collections::BTreeMap;
use std::sync::Arc;

use formats::{DecodeError, DecodedModel, decode_model_bytes};

use crate::io::{ResourceError, ResourceLoader};

#[derive(Debug, thiserror::Error)]
pub enum ModelLoadError {
    #[error(transparent)]
    Resource(#[from] ResourceError),
    #[error("failed to decode {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: DecodeError,
    },
    #[error("{url} failed to load earlier: {reason}")]
    PreviouslyFailed { url: String, reason: String },
}

/// What to do with a url whose load failed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Nothing is recorded; the next `get` tries again.
    #[default]
    Retry,
    /// The failure is recorded and returned without touching the loader again.
    Remember,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub loads: u64,
    pub failures: u64,
}

/// Decoded models keyed by url, decoded at most once per url.
///
/// Entries are never evicted; the set of urls is fixed by the layer's
/// placements. The cache is mutated through `&mut self` only and is meant
/// to be driven from the single render thread. Hosts that render from
/// several threads must put the owning layer behind their own lock.
#[derive(Debug)]
pub struct ModelCache<L> {
    loader: L,
    policy: FailurePolicy,
    models: BTreeMap<String, Arc<DecodedModel>>,
    failures: BTreeMap<String, String>,
    stats: CacheStats,
}

impl<L: ResourceLoader> ModelCache<L> {
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            policy: FailurePolicy::default(),
            models: BTreeMap::new(),
            failures: BTreeMap::new(),
            stats: CacheStats::default(),
        }
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.models.contains_key(url)
    }

    /// Cached model without triggering a load.
    pub fn peek(&self, url: &str) -> Option<&Arc<DecodedModel>> {
        self.models.get(url)
    }

    pub fn has_failed(&self, url: &str) -> bool {
        self.failures.contains_key(url)
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Return the model for `url`, reading and decoding it on first use.
    pub fn get(&mut self, url: &str) -> Result<Arc<DecodedModel>, ModelLoadError> {
        if let Some(model) = self.models.get(url) {
            self.stats.hits += 1;
            return Ok(Arc::clone(model));
        }
        if let Some(reason) = self.failures.get(url) {
            return Err(ModelLoadError::PreviouslyFailed {
                url: url.to_string(),
                reason: reason.clone(),
            });
        }

        self.stats.loads += 1;
        match self.load(url) {
            Ok(model) => {
                tracing::debug!(
                    url,
                    name = model.name(),
                    vertices = model.vertex_count(),
                    indices = model.index_count(),
                    "decoded model"
                );
                let model = Arc::new(model);
                self.models.insert(url.to_string(), Arc::clone(&model));
                Ok(model)
            }
            Err(err) => {
                self.stats.failures += 1;
                tracing::warn!(url, "model load failed: {err}");
                if self.policy == FailurePolicy::Remember {
                    self.failures.insert(url.to_string(), err.to_string());
                }
                Err(err)
            }
        }
    }

    fn load(&self, url: &str) -> Result<DecodedModel, ModelLoadError> {
        let payload = self.loader.load(url)?;
        decode_model_bytes(&payload).map_err(|source| ModelLoadError::Decode {
            url: url.to_string(),
            source,
        })
    }
}
