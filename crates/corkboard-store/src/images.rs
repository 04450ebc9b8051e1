//! Uploaded image files.
//!
//! Images live as plain files under one directory. All file access goes
//! through a readers-writer lock, independent of the board lock, so an
//! upload being written can never be read back half-finished and slow
//! disk I/O never holds up broadcasts.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::StoreError;

/// Extensions accepted for uploads (jpeg, png, tiff, bmp).
const SUPPORTED_EXTENSIONS: &[&str] =
    &["jpg", "jpeg", "png", "tif", "tiff", "bmp"];

/// The directory of uploaded images.
pub struct ImageStore {
    root: PathBuf,
    link_prefix: String,
    lock: RwLock<()>,
}

impl ImageStore {
    /// Opens (creating if needed) the image directory at `root`.
    ///
    /// `link_prefix` is what cards link to, e.g. `/images` gives
    /// `/images/cat.png`.
    pub async fn open(
        root: impl Into<PathBuf>,
        link_prefix: impl Into<String>,
    ) -> Result<Self, StoreError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        let link_prefix = link_prefix.into().trim_end_matches('/').to_string();
        tracing::info!(root = %root.display(), %link_prefix, "image store ready");
        Ok(Self {
            root,
            link_prefix,
            lock: RwLock::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The access link for a stored image name.
    pub fn link_for(&self, name: &str) -> String {
        format!("{}/{}", self.link_prefix, name)
    }

    /// Stores `data` as an image and returns the name actually used.
    ///
    /// Only the last path component of `requested` is kept. If another
    /// image already has the same stem, a numeric suffix is added:
    /// `cat.png` becomes `cat.1.png`, then `cat.2.png`, and so on. The file
    /// is synced to disk before this returns.
    ///
    /// # Errors
    /// - [`StoreError::InvalidFilename`] if no usable file name remains
    /// - [`StoreError::UnsupportedImage`] for extensions outside
    ///   jpeg/png/tiff/bmp
    /// - [`StoreError::Image`] if the file cannot be written
    pub async fn add(
        &self,
        requested: &str,
        data: &[u8],
    ) -> Result<String, StoreError> {
        let name = sanitize(requested)?;
        let (stem, ext) = split_name(&name)?;

        let _write = self.lock.write().await;

        let stems = self.stems().await?;
        let mut stored = name.clone();
        if stems.contains(&stem) {
            let mut suffix = 1u32;
            while stems.contains(&format!("{stem}.{suffix}")) {
                suffix += 1;
            }
            stored = format!("{stem}.{suffix}.{ext}");
        }

        let path = self.root.join(&stored);
        let io_err = |source| StoreError::Image {
            name: stored.clone(),
            source,
        };
        let mut file = tokio::fs::File::create(&path).await.map_err(io_err)?;
        file.write_all(data).await.map_err(io_err)?;
        file.sync_all().await.map_err(io_err)?;

        tracing::info!(requested, %stored, bytes = data.len(), "image stored");
        Ok(stored)
    }

    /// Reads a stored image back.
    pub async fn read(&self, name: &str) -> Result<Vec<u8>, StoreError> {
        let name = sanitize(name)?;
        let _read = self.lock.read().await;
        match tokio::fs::read(self.root.join(&name)).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::ImageNotFound(name))
            }
            Err(source) => Err(StoreError::Image { name, source }),
        }
    }

    /// `true` if an image with exactly this name is stored.
    pub async fn contains(&self, name: &str) -> Result<bool, StoreError> {
        let name = sanitize(name)?;
        let _read = self.lock.read().await;
        tokio::fs::try_exists(self.root.join(&name))
            .await
            .map_err(|source| StoreError::Image { name, source })
    }

    /// Returns the stored name a client-supplied `name` refers to.
    ///
    /// # Errors
    /// [`StoreError::ImageNotFound`] if no such image has been stored.
    pub async fn resolve(&self, name: &str) -> Result<String, StoreError> {
        let name = sanitize(name)?;
        if self.contains(&name).await? {
            Ok(name)
        } else {
            Err(StoreError::ImageNotFound(name))
        }
    }

    /// The stems of every file in the directory. Caller holds the lock.
    async fn stems(&self) -> Result<HashSet<String>, StoreError> {
        let mut stems = HashSet::new();
        let mut dir = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = dir.next_entry().await? {
            if let Some(stem) = Path::new(&entry.file_name())
                .file_stem()
                .and_then(|s| s.to_str())
            {
                stems.insert(stem.to_string());
            }
        }
        Ok(stems)
    }
}

/// Keeps only the final path component of a client-supplied name.
fn sanitize(requested: &str) -> Result<String, StoreError> {
    // Treat both separators as separators whatever the host platform.
    let last = requested.rsplit(['/', '\\']).next().unwrap_or("");
    if last.is_empty() || last == "." || last == ".." {
        return Err(StoreError::InvalidFilename(requested.to_string()));
    }
    Ok(last.to_string())
}

/// Splits a sanitized name into stem and a supported extension.
fn split_name(name: &str) -> Result<(String, String), StoreError> {
    let path = Path::new(name);
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| StoreError::UnsupportedImage(name.to_string()))?;
    if !SUPPORTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) {
        return Err(StoreError::UnsupportedImage(name.to_string()));
    }
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| StoreError::InvalidFilename(name.to_string()))?;
    Ok((stem.to_string(), ext.to_string()))
}
