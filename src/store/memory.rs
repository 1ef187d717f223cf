use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use futures::future::{BoxFuture, FutureExt};
use url::{ParseError, Url};

use crate::errors::StoreError;
use crate::store::{Store, StoredObject};
use crate::urls;

/// An object kept by [`MemoryStore`].
#[derive(Clone, Debug, PartialEq)]
pub struct MemoryObject {
    pub content_type: String,
    pub raw: Vec<u8>,
}

/// A store that keeps objects in memory. Used in tests and for running
/// without an object store.
pub struct MemoryStore {
    objects: RwLock<HashMap<String, MemoryObject>>,
    bucket: String,
    base_url: Url,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new(bucket: impl Into<String>, base_url: Url) -> Self {
        MemoryStore {
            objects: RwLock::new(HashMap::new()),
            bucket: bucket.into(),
            base_url: urls::with_trailing_slash(base_url),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Makes every following call fail (or succeed again).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn object(&self, object_name: &str) -> Option<MemoryObject> {
        self.objects
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(object_name)
            .cloned()
    }

    pub fn object_names(&self) -> Vec<String> {
        self.objects
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable {
                reason: "memory store switched off".to_owned(),
            })
        } else {
            Ok(())
        }
    }
}

impl Store for MemoryStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn delete(&self, object_name: &str) -> BoxFuture<Result<(), StoreError>> {
        let object_name = object_name.to_owned();

        async move {
            self.check_available()?;

            self.objects
                .write()
                .unwrap_or_else(|e| e.into_inner())
                .remove(&object_name);

            Ok(())
        }
        .boxed()
    }

    fn get_url(&self, object_name: &str) -> Result<Url, ParseError> {
        urls::object_url(&self.base_url, &self.bucket, object_name)
    }

    fn save(
        &self,
        object_name: &str,
        content_type: &str,
        raw: Vec<u8>,
    ) -> BoxFuture<Result<StoredObject, StoreError>> {
        let object_name = object_name.to_owned();
        let content_type = content_type.to_owned();

        async move {
            self.check_available()?;

            let size = raw.len() as u64;

            self.objects
                .write()
                .unwrap_or_else(|e| e.into_inner())
                .insert(object_name.clone(), MemoryObject { content_type, raw });

            Ok(StoredObject {
                bucket: self.bucket.clone(),
                key: object_name,
                size,
                checksum: None,
            })
        }
        .boxed()
    }
}
