//! A shared cache of parsed templates keyed by source text.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use stencil_parser::{ParseError, ParseOptions, Template};
use tracing::trace;

/// Default number of distinct templates kept.
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

/// Default bound on the total source bytes held by the cache.
pub const DEFAULT_CACHE_MAX_BYTES: usize = 8 * 1024 * 1024;

/// Insert-once cache of parsed templates.
///
/// Entries are never replaced or evicted. A source is stored only while
/// fewer than `capacity` entries exist and its length fits in what remains
/// of the byte budget; otherwise it is still parsed but not stored. Sources
/// that fail to parse are never stored.
#[derive(Debug)]
pub struct TemplateCache {
    entries: RwLock<Entries>,
    capacity: usize,
    max_bytes: usize,
}

#[derive(Debug, Default)]
struct Entries {
    map: HashMap<String, Arc<Template>>,
    /// Sum of the stored source lengths.
    bytes: usize,
}

impl TemplateCache {
    pub fn new(capacity: usize) -> Self {
        Self::with_budget(capacity, DEFAULT_CACHE_MAX_BYTES)
    }

    /// A cache bounded by both entry count and total source bytes.
    pub fn with_budget(capacity: usize, max_bytes: usize) -> Self {
        Self {
            entries: RwLock::new(Entries::default()),
            capacity,
            max_bytes,
        }
    }

    /// Returns the cached tree for `source`, parsing and storing it on a miss.
    pub fn get_or_parse(&self, source: &str, options: &ParseOptions) -> Result<Arc<Template>, ParseError> {
        if let Some(template) = self.get(source) {
            trace!(len = source.len(), "template cache hit");
            return Ok(template);
        }

        let template = Arc::new(Template::parse_with(source, options)?);

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = entries.map.get(source) {
            return Ok(Arc::clone(existing));
        }
        let fits = entries.map.len() < self.capacity
            && entries.bytes.saturating_add(source.len()) <= self.max_bytes;
        if fits {
            entries.bytes += source.len();
            entries.map.insert(source.to_string(), Arc::clone(&template));
        } else {
            trace!(len = source.len(), "template cache full, not storing");
        }
        Ok(template)
    }

    pub fn get(&self, source: &str) -> Option<Arc<Template>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.map.get(source).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).map.len()
    }

    /// Total length of the stored sources.
    pub fn bytes(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).bytes
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }
}

impl Default for TemplateCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}
