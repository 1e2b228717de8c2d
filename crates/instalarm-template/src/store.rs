//! Template store — cache-or-fetch access to template text.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use instalarm_core::{AlarmResult, BoxFuture};

/// Where template text comes from. Fails if the key does not exist.
pub trait TemplateSource: Send + Sync {
    fn fetch<'a>(&'a self, alarm_key: &'a str) -> BoxFuture<'a, AlarmResult<String>>;
}

/// Write-once-per-key template cache.
///
/// Concurrent misses on the same key may both fetch; the first insert
/// wins and every caller sees that text afterwards.
pub struct TemplateCache {
    source: Arc<dyn TemplateSource>,
    entries: RwLock<HashMap<String, Arc<str>>>,
}

impl TemplateCache {
    pub fn new(source: Arc<dyn TemplateSource>) -> Self {
        Self {
            source,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Return the template for `alarm_key`, fetching it on first use.
    pub async fn get(&self, alarm_key: &str) -> AlarmResult<Arc<str>> {
        if let Some(text) = self.entries.read().await.get(alarm_key) {
            debug!(%alarm_key, "template cache hit");
            return Ok(text.clone());
        }

        debug!(%alarm_key, "fetching template");
        let fetched: Arc<str> = self.source.fetch(alarm_key).await?.into();

        let mut entries = self.entries.write().await;
        let text = entries
            .entry(alarm_key.to_string())
            .or_insert(fetched)
            .clone();
        Ok(text)
    }

    /// Number of cached templates.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
