//! Freshness tracking for streamed entry content.
//!
//! Entries whose content arrives as a stream (container logs) write it into
//! a [`StreamBuffer`]. Directory attributes scan the per-kind
//! [`FreshnessMap`] to report the most recent update among their children.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use dashmap::DashMap;
use parking_lot::Mutex;
use strata_core::Timestamp;

/// Buffered content of one streamed entry.
#[derive(Debug, Default)]
pub struct StreamBuffer {
    data: Mutex<BytesMut>,
    last_update: AtomicI64,
}

impl StreamBuffer {
    /// Creates an empty buffer that has never been updated.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk and marks the buffer updated.
    pub fn write(&self, chunk: &[u8]) {
        self.data.lock().extend_from_slice(chunk);
        self.touch();
    }

    /// Replaces the whole content and marks the buffer updated.
    pub fn replace(&self, content: &[u8]) {
        {
            let mut data = self.data.lock();
            data.clear();
            data.extend_from_slice(content);
        }
        self.touch();
    }

    /// Returns a copy of the buffered content.
    pub fn contents(&self) -> Bytes {
        self.data.lock().clone().freeze()
    }

    /// Returns the buffered length.
    pub fn len(&self) -> usize {
        self.data.lock().len()
    }

    /// Returns true if nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns when content last arrived, or the epoch if never.
    pub fn last_update(&self) -> Timestamp {
        Timestamp::new(self.last_update.load(Ordering::Acquire))
    }

    fn touch(&self) {
        self.last_update
            .fetch_max(Timestamp::now().as_millis(), Ordering::AcqRel);
    }
}

/// Concurrent map of stream buffers keyed by entry name.
///
/// Insertion and iteration never take a global lock, so attribute scans
/// run alongside readers registering new buffers.
#[derive(Debug, Default)]
pub struct FreshnessMap {
    buffers: DashMap<String, Arc<StreamBuffer>>,
}

impl FreshnessMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the buffer for `key`, registering an empty one if absent.
    pub fn get_or_insert(&self, key: &str) -> Arc<StreamBuffer> {
        if let Some(existing) = self.buffers.get(key) {
            return existing.value().clone();
        }
        self.buffers
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(StreamBuffer::new()))
            .value()
            .clone()
    }

    /// Returns the buffer for `key`, if registered.
    pub fn get(&self, key: &str) -> Option<Arc<StreamBuffer>> {
        self.buffers.get(key).map(|entry| entry.value().clone())
    }

    /// Unregisters the buffer for `key`.
    pub fn remove(&self, key: &str) -> Option<Arc<StreamBuffer>> {
        self.buffers.remove(key).map(|(_, buffer)| buffer)
    }

    /// Returns the number of registered buffers.
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    /// Returns true if no buffer is registered.
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Returns a point-in-time copy of every buffer's last update.
    pub fn snapshot(&self) -> Vec<(String, Timestamp)> {
        self.buffers
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().last_update()))
            .collect()
    }

    /// Returns the most recent update across all buffers.
    pub fn latest_update(&self) -> Option<Timestamp> {
        self.snapshot().into_iter().map(|(_, updated)| updated).max()
    }
}
