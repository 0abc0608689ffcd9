//! Directory-backed object store.
//!
//! Layout: `<root>/<container>/<key>`, with the container's location
//! constraint recorded in `<root>/<container>/.location`.

use super::{no_such_container, validate_key, ContainerDescriptor, ObjectStore};
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

const LOCATION_FILE: &str = ".location";

pub struct FsStore {
    root: PathBuf,
    region: Option<String>,
}

impl FsStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            region: None,
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn container_dir(&self, container: &str) -> Result<PathBuf> {
        if container.is_empty() || container.contains(['/', '\\']) || container.starts_with('.') {
            return Err(Error::validation_with_context(
                format!("invalid container name: {:?}", container),
                ErrorContext::new().with_source("fs_store"),
            ));
        }
        Ok(self.root.join(container))
    }

    async fn existing_container_dir(&self, container: &str) -> Result<PathBuf> {
        let dir = self.container_dir(container)?;
        match tokio::fs::metadata(&dir).await {
            Ok(meta) if meta.is_dir() => Ok(dir),
            Ok(_) => Err(no_such_container("fs_store", container)),
            Err(e) if e.kind() == IoErrorKind::NotFound => {
                Err(no_such_container("fs_store", container))
            }
            Err(e) => Err(io_error(e, container)),
        }
    }

    fn object_path(dir: &Path, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(key.split('/').fold(dir.to_path_buf(), |p, seg| p.join(seg)))
    }
}

fn io_error(e: std::io::Error, target: &str) -> Error {
    Error::store_with_context(
        format!("{}: {}", target, e),
        ErrorContext::new().with_source("fs_store"),
    )
}

#[async_trait]
impl ObjectStore for FsStore {
    async fn list_containers(&self) -> Result<Vec<ContainerDescriptor>> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(e, &self.root.display().to_string())),
        };
        let mut containers = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| io_error(e, &self.root.display().to_string()))?
        {
            let name = entry.file_name().to_string_lossy().to_string();
            let file_type = entry.file_type().await.map_err(|e| io_error(e, &name))?;
            if !file_type.is_dir() || name.starts_with('.') {
                continue;
            }
            let location = match tokio::fs::read_to_string(entry.path().join(LOCATION_FILE)).await
            {
                Ok(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
                Err(e) if e.kind() == IoErrorKind::NotFound => None,
                Err(e) => return Err(io_error(e, &name)),
            };
            containers.push(ContainerDescriptor { name, location });
        }
        containers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(containers)
    }

    async fn create_container(&self, name: &str, location: Option<&str>) -> Result<()> {
        let dir = self.container_dir(name)?;
        if tokio::fs::metadata(&dir).await.is_ok() {
            return Err(Error::store_with_context(
                format!("container already exists: {}", name),
                ErrorContext::new().with_source("fs_store"),
            ));
        }
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| io_error(e, name))?;
        if let Some(location) = location {
            tokio::fs::write(dir.join(LOCATION_FILE), location)
                .await
                .map_err(|e| io_error(e, name))?;
        }
        Ok(())
    }

    async fn get_object(&self, container: &str, key: &str) -> Result<Vec<u8>> {
        let dir = self.existing_container_dir(container).await?;
        let path = Self::object_path(&dir, key)?;
        match tokio::fs::read(&path).await {
            Ok(body) => Ok(body),
            Err(e) if e.kind() == IoErrorKind::NotFound => Err(Error::not_found(container, key)),
            Err(e) => Err(io_error(e, key)),
        }
    }

    async fn put_object(&self, container: &str, key: &str, body: Vec<u8>) -> Result<()> {
        let dir = self.existing_container_dir(container).await?;
        let path = Self::object_path(&dir, key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(e, key))?;
        }
        // Readers never see a partially written object.
        let tmp = path.with_extension(format!("{}.tmp", uuid::Uuid::new_v4().simple()));
        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| io_error(e, key))?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(io_error(e, key));
        }
        Ok(())
    }

    async fn delete_object(&self, container: &str, key: &str) -> Result<()> {
        let dir = self.existing_container_dir(container).await?;
        let path = Self::object_path(&dir, key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(e, key)),
        }
    }

    fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    fn name(&self) -> &'static str {
        "fs"
    }
}
