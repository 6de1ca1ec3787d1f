//! Object envelope shared by every admitted entity.
//!
//! Each entity carries a unique name, an optional namespace, and a
//! generation counter that is bumped whenever its spec content changes.
//! The status sub-record sits next to the spec so the whole object
//! round-trips through an external store unchanged.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Identity and bookkeeping for a stored entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Monotonically increasing; bumped on every spec change.
    #[serde(default)]
    pub generation: u64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl ObjectMeta {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            generation: 1,
            ..Default::default()
        }
    }

    pub fn namespaced(namespace: &str, name: &str) -> Self {
        Self {
            namespace: Some(namespace.to_string()),
            ..Self::named(name)
        }
    }

    /// Composite store key: `{namespace}/{name}`, or `{name}` when cluster-scoped.
    pub fn key(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{ns}/{}", self.name),
            None => self.name.clone(),
        }
    }
}

/// A stored entity: metadata, desired spec, and observed status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Object<Spec, Status> {
    pub metadata: ObjectMeta,
    pub spec: Spec,
    #[serde(default)]
    pub status: Status,
}

impl<Spec, Status> Object<Spec, Status>
where
    Spec: Serialize + DeserializeOwned + PartialEq,
    Status: Default,
{
    pub fn new(metadata: ObjectMeta, spec: Spec) -> Self {
        Self {
            metadata,
            spec,
            status: Status::default(),
        }
    }

    /// Replace the spec, bumping the generation iff its content changed.
    ///
    /// Returns `true` when the generation was bumped.
    pub fn update_spec(&mut self, spec: Spec) -> bool {
        if spec_fingerprint(&self.spec) == spec_fingerprint(&spec) {
            return false;
        }
        self.spec = spec;
        self.metadata.generation = self.metadata.generation.saturating_add(1);
        true
    }
}

/// Hex SHA-256 over the canonical JSON encoding of a value.
///
/// Field order in JSON output follows declaration order and maps are
/// `BTreeMap`s, so equal specs always hash equally.
///
/// # Panics
///
/// Panics if `spec` cannot be encoded as JSON, e.g. a map with non-string
/// keys. Every spec record in this crate encodes cleanly.
pub fn spec_fingerprint<T: Serialize>(spec: &T) -> String {
    let bytes = serde_json::to_vec(spec).expect("spec records serialize to JSON");
    hex::encode(Sha256::digest(&bytes))
}
