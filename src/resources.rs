use crate::error::EncodeError;
use crate::filter::{Filter, apply_filters};
use crate::graph::ObjectGraph;
use crate::object::{Dictionary, ObjectRef, Stream};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;

/// SHA-256 of a resource's canonical payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey([u8; 32]);

impl ResourceKey {
    pub fn of(canonical: &[u8]) -> Self {
        Self(Sha256::digest(canonical).into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Per-document content-addressed index over embedded resources (fonts, images).
/// The graph is the arena; this only maps keys to the ids already stored there.
#[derive(Debug, Clone, Default)]
pub struct ResourceDeduplicator {
    index: HashMap<ResourceKey, ObjectRef>,
    hits: u64,
    misses: u64,
}

impl ResourceDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the existing reference for `canonical`, or stores it as a stream
    /// carrying `dict` as its metadata.
    pub fn intern(&mut self, graph: &mut ObjectGraph, canonical: &[u8], dict: Dictionary) -> ObjectRef {
        let key = ResourceKey::of(canonical);
        if let Some(existing) = self.hit(&key) {
            return existing;
        }
        let reference = graph.register(Stream::new(dict, canonical.to_vec()));
        self.insert(key, reference)
    }

    /// Like [`ResourceDeduplicator::intern`], but the stored body is encoded with
    /// `filters`. The key is computed over the canonical bytes only.
    pub fn intern_encoded(
        &mut self,
        graph: &mut ObjectGraph,
        canonical: &[u8],
        dict: Dictionary,
        filters: &[Filter],
    ) -> Result<ObjectRef, EncodeError> {
        let key = ResourceKey::of(canonical);
        if let Some(existing) = self.hit(&key) {
            return Ok(existing);
        }
        let encoded = apply_filters(canonical, filters)?;
        let reference = graph.register(Stream::with_filters(dict, encoded, filters.to_vec()));
        Ok(self.insert(key, reference))
    }

    pub fn get(&self, key: &ResourceKey) -> Option<ObjectRef> {
        self.index.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    fn hit(&mut self, key: &ResourceKey) -> Option<ObjectRef> {
        let existing = self.index.get(key).copied()?;
        self.hits += 1;
        tracing::trace!(%key, id = existing.id(), "resource reused");
        Some(existing)
    }

    fn insert(&mut self, key: ResourceKey, reference: ObjectRef) -> ObjectRef {
        self.misses += 1;
        self.index.insert(key, reference);
        reference
    }
}
