//! Per-document transforms applied during migration.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;

use crate::error::Result;
use crate::scroll::Hit;

/// Rewrites one document before it is written to the destination.
///
/// Implementations must keep `hit.id` unless they mean to migrate the
/// document under another identifier.
#[async_trait]
pub trait DocumentTransform: Send + Sync {
    /// Transforms a single hit.
    async fn transform(&self, hit: Hit) -> Result<Hit>;
}

/// Passes documents through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

#[async_trait]
impl DocumentTransform for Identity {
    async fn transform(&self, hit: Hit) -> Result<Hit> {
        Ok(hit)
    }
}

/// Adapts an async closure into a [`DocumentTransform`].
pub struct FnTransform<F>(F);

/// Wraps `f` as a transform.
pub fn from_fn<F, Fut>(f: F) -> FnTransform<F>
where
    F: Fn(Hit) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Hit>> + Send + 'static,
{
    FnTransform(f)
}

#[async_trait]
impl<F, Fut> DocumentTransform for FnTransform<F>
where
    F: Fn(Hit) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Hit>> + Send + 'static,
{
    async fn transform(&self, hit: Hit) -> Result<Hit> {
        (self.0)(hit).await
    }
}

/// Renames top-level payload fields.
#[derive(Debug, Clone, Default)]
pub struct FieldMapper {
    mappings: HashMap<String, String>,
}

impl FieldMapper {
    /// Creates a mapper from `source_field -> dest_field` pairs.
    #[must_use]
    pub fn new(mappings: HashMap<String, String>) -> Self {
        Self { mappings }
    }

    /// Whether the mapper changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Applies the renames to a payload.
    #[must_use]
    pub fn apply(&self, source: Value) -> Value {
        match source {
            Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(key, val)| match self.mappings.get(&key) {
                        Some(dest) => (dest.clone(), val),
                        None => (key, val),
                    })
                    .collect(),
            ),
            other => other,
        }
    }
}

#[async_trait]
impl DocumentTransform for FieldMapper {
    async fn transform(&self, mut hit: Hit) -> Result<Hit> {
        if !self.is_empty() {
            hit.source = self.apply(std::mem::take(&mut hit.source));
        }
        Ok(hit)
    }
}
