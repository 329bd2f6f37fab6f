//! Sample Store
//!
//! Maps caller-assigned buffer identifiers to decoded audio. Reads vastly
//! outnumber writes, so the map sits behind a read-write lock and buffers are
//! handed out as `Arc`s; a clip lookup never copies sample data.

use std::collections::HashMap;
use std::sync::Arc;

use log::debug;
use parking_lot::RwLock;

use super::buffer::AudioBuffer;

/// Shared store of decoded buffers
///
/// Cloning a `SampleStore` yields another handle to the same map.
#[derive(Debug, Clone, Default)]
pub struct SampleStore {
    buffers: Arc<RwLock<HashMap<String, Arc<AudioBuffer>>>>,
}

impl SampleStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store or replace a buffer (last writer wins)
    pub fn put(&self, id: impl Into<String>, buffer: AudioBuffer) -> Arc<AudioBuffer> {
        let id = id.into();
        let buffer = Arc::new(buffer);
        debug!(
            "storing buffer '{}' ({} ch, {:.3}s)",
            id,
            buffer.channels(),
            buffer.duration_secs()
        );
        self.buffers.write().insert(id, Arc::clone(&buffer));
        buffer
    }

    /// Look up a buffer; `None` means the referencing clip should be skipped
    pub fn get(&self, id: &str) -> Option<Arc<AudioBuffer>> {
        self.buffers.read().get(id).cloned()
    }

    /// Remove a buffer, returning it if present
    pub fn remove(&self, id: &str) -> Option<Arc<AudioBuffer>> {
        self.buffers.write().remove(id)
    }

    /// Check whether an identifier is present
    pub fn contains(&self, id: &str) -> bool {
        self.buffers.read().contains_key(id)
    }

    /// Number of stored buffers
    pub fn len(&self) -> usize {
        self.buffers.read().len()
    }

    /// True if no buffers are stored
    pub fn is_empty(&self) -> bool {
        self.buffers.read().is_empty()
    }

    /// Sorted list of stored identifiers
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.buffers.read().keys().cloned().collect();
        ids.sort();
        ids
    }
}
