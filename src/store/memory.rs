//! In-process object store.

use super::{no_such_container, validate_key, ContainerDescriptor, ObjectStore};
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

#[derive(Default)]
struct Container {
    location: Option<String>,
    objects: HashMap<String, Vec<u8>>,
}

/// Object store held entirely in memory. Clones share the same contents.
#[derive(Clone)]
pub struct MemoryStore {
    containers: Arc<RwLock<BTreeMap<String, Container>>>,
    region: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            containers: Arc::new(RwLock::new(BTreeMap::new())),
            region: None,
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Number of objects in a container, or `None` if it does not exist.
    pub fn object_count(&self, container: &str) -> Option<usize> {
        self.containers
            .read()
            .ok()?
            .get(container)
            .map(|c| c.objects.len())
    }

    fn poisoned() -> Error {
        Error::runtime_with_context(
            "MemoryStore poisoned",
            ErrorContext::new().with_source("memory_store"),
        )
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_containers(&self) -> Result<Vec<ContainerDescriptor>> {
        let containers = self.containers.read().map_err(|_| Self::poisoned())?;
        Ok(containers
            .iter()
            .map(|(name, c)| ContainerDescriptor {
                name: name.clone(),
                location: c.location.clone(),
            })
            .collect())
    }

    async fn create_container(&self, name: &str, location: Option<&str>) -> Result<()> {
        let mut containers = self.containers.write().map_err(|_| Self::poisoned())?;
        if containers.contains_key(name) {
            return Err(Error::store_with_context(
                format!("container already exists: {}", name),
                ErrorContext::new().with_source("memory_store"),
            ));
        }
        containers.insert(
            name.to_string(),
            Container {
                location: location.map(str::to_string),
                objects: HashMap::new(),
            },
        );
        Ok(())
    }

    async fn get_object(&self, container: &str, key: &str) -> Result<Vec<u8>> {
        validate_key(key)?;
        let containers = self.containers.read().map_err(|_| Self::poisoned())?;
        let c = containers
            .get(container)
            .ok_or_else(|| no_such_container("memory_store", container))?;
        c.objects
            .get(key)
            .cloned()
            .ok_or_else(|| Error::not_found(container, key))
    }

    async fn put_object(&self, container: &str, key: &str, body: Vec<u8>) -> Result<()> {
        validate_key(key)?;
        let mut containers = self.containers.write().map_err(|_| Self::poisoned())?;
        let c = containers
            .get_mut(container)
            .ok_or_else(|| no_such_container("memory_store", container))?;
        c.objects.insert(key.to_string(), body);
        Ok(())
    }

    async fn delete_object(&self, container: &str, key: &str) -> Result<()> {
        validate_key(key)?;
        let mut containers = self.containers.write().map_err(|_| Self::poisoned())?;
        let c = containers
            .get_mut(container)
            .ok_or_else(|| no_such_container("memory_store", container))?;
        c.objects.remove(key);
        Ok(())
    }

    fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
