//! In-memory collaborator implementations for integration tests.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{Result, bail};
use async_trait::async_trait;
use bytes::Bytes;
use pictor_core::{CacheMetadata, ObjectStore, TransformEngine, TransformSpec};

/// One object recorded by the in-memory store.
#[derive(Debug, Clone)]
pub struct StoredObject {
    /// Content type the object was written with.
    pub content_type: String,
    /// Object payload.
    pub body: Bytes,
    /// Cache metadata the object was written with.
    pub metadata: CacheMetadata,
}

/// Object store that keeps everything in a process-local map.
#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: Mutex<HashMap<String, StoredObject>>,
    fail_probes: bool,
}

impl InMemoryObjectStore {
    /// Construct an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct a store whose every probe fails, for error-path tests.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            fail_probes: true,
        }
    }

    /// Seed an object, builder style.
    #[must_use]
    pub fn with_object(self, key: &str, body: &[u8]) -> Self {
        self.objects.lock().expect("store mutex poisoned").insert(
            key.to_string(),
            StoredObject {
                content_type: "application/octet-stream".to_string(),
                body: Bytes::copy_from_slice(body),
                metadata: CacheMetadata::derived_variant(),
            },
        );
        self
    }

    /// Snapshot of one stored object.
    #[must_use]
    pub fn stored(&self, key: &str) -> Option<StoredObject> {
        self.objects
            .lock()
            .expect("store mutex poisoned")
            .get(key)
            .cloned()
    }

    /// Keys currently present, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .lock()
            .expect("store mutex poisoned")
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn exists(&self, key: &str) -> Result<bool> {
        if self.fail_probes {
            bail!("store unavailable");
        }
        Ok(self
            .objects
            .lock()
            .expect("store mutex poisoned")
            .contains_key(key))
    }

    async fn get(&self, key: &str) -> Result<Bytes> {
        let objects = self.objects.lock().expect("store mutex poisoned");
        match objects.get(key) {
            Some(object) => Ok(object.body.clone()),
            None => bail!("object {key} missing"),
        }
    }

    async fn put(
        &self,
        key: &str,
        content_type: &str,
        body: Bytes,
        metadata: &CacheMetadata,
    ) -> Result<()> {
        self.objects.lock().expect("store mutex poisoned").insert(
            key.to_string(),
            StoredObject {
                content_type: content_type.to_string(),
                body,
                metadata: metadata.clone(),
            },
        );
        Ok(())
    }
}

/// Transform engine that returns fixed bytes and records received specs.
pub struct StubTransformEngine {
    output: Bytes,
    fail: bool,
    specs: Mutex<Vec<TransformSpec>>,
}

impl StubTransformEngine {
    /// Engine that answers every call with `output`.
    #[must_use]
    pub fn returning(output: &[u8]) -> Self {
        Self {
            output: Bytes::copy_from_slice(output),
            fail: false,
            specs: Mutex::new(Vec::new()),
        }
    }

    /// Engine whose every call fails, for error-path tests.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            output: Bytes::new(),
            fail: true,
            specs: Mutex::new(Vec::new()),
        }
    }

    /// Specs received so far, in call order.
    #[must_use]
    pub fn specs(&self) -> Vec<TransformSpec> {
        self.specs.lock().expect("spec mutex poisoned").clone()
    }
}

#[async_trait]
impl TransformEngine for StubTransformEngine {
    async fn transform(&self, _source: Bytes, spec: &TransformSpec) -> Result<Bytes> {
        self.specs
            .lock()
            .expect("spec mutex poisoned")
            .push(spec.clone());
        if self.fail {
            bail!("codec failure");
        }
        Ok(self.output.clone())
    }
}
