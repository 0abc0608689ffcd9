//! 对象存储模块：缓存所依赖的对象存储能力接口及其实现。
//!
//! # Object Store Module
//!
//! The cache addresses its backing storage through the narrow
//! [`ObjectStore`] capability: containers (buckets) holding byte objects
//! under hierarchical keys.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`ObjectStore`] | Capability trait consumed by the cache |
//! | [`MemoryStore`] | In-process store, useful for tests and ephemeral caches |
//! | [`FsStore`] | Directory-backed store, one directory per container |
//!
//! `get_object` must fail with [`Error::NotFound`](crate::Error::NotFound)
//! when the object is absent; the cache relies on that to tell a miss from a
//! failure.

mod fs;
mod memory;

pub use fs::FsStore;
pub use memory::MemoryStore;

use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A container (bucket) known to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl ContainerDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: None,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn list_containers(&self) -> Result<Vec<ContainerDescriptor>>;
    async fn create_container(&self, name: &str, location: Option<&str>) -> Result<()>;
    async fn get_object(&self, container: &str, key: &str) -> Result<Vec<u8>>;
    async fn put_object(&self, container: &str, key: &str, body: Vec<u8>) -> Result<()>;
    /// Deleting an absent object succeeds.
    async fn delete_object(&self, container: &str, key: &str) -> Result<()>;
    /// Region the client is configured for; used as the location constraint
    /// when creating containers.
    fn region(&self) -> Option<&str>;
    fn name(&self) -> &'static str;
}

/// Keys are relative `/`-separated paths that must stay inside their container.
pub(crate) fn validate_key(key: &str) -> Result<()> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key
            .split('/')
            .any(|seg| seg.is_empty() || seg == "." || seg == "..");
    if bad {
        return Err(Error::validation_with_context(
            format!("invalid object key: {:?}", key),
            ErrorContext::new().with_field_path("key").with_source("object_store"),
        ));
    }
    Ok(())
}

pub(crate) fn no_such_container(store: &str, container: &str) -> Error {
    Error::store_with_context(
        format!("no such container: {}", container),
        ErrorContext::new().with_source(store),
    )
}
