//! Remote cache store
//!
//! Moves whole-image archives between the local engine and object
//! storage: export → gzip → digest → upload on save, download → gunzip →
//! import on load. Per-tag failures are collected, never propagated, so
//! one bad transfer cannot sink the rest of a batch.

pub mod store;

pub use store::{DirStore, ObjectStore, S3CliStore};

use crate::engine::ContainerEngine;
use crate::error::{StrataError, StrataResult};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use futures_util::future::join_all;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// A successfully uploaded cache archive
#[derive(Debug, Clone, serde::Serialize)]
pub struct SavedArchive {
    pub tag: String,
    pub key: String,
    /// sha256 of the compressed archive
    pub digest: String,
    pub bytes: u64,
}

/// Result of saving a batch of tags
#[derive(Debug, Default)]
pub struct SaveReport {
    pub saved: Vec<SavedArchive>,
    /// (tag, reason) per failed upload
    pub failed: Vec<(String, String)>,
}

/// Result of loading a batch of tags
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Tags actually primed into local engine state
    pub loaded: Vec<String>,
    /// Tags with no remote archive (not an error)
    pub missed: Vec<String>,
    /// (tag, reason) per failed transfer
    pub failed: Vec<(String, String)>,
}

impl LoadReport {
    pub fn is_loaded(&self, tag: &str) -> bool {
        self.loaded.iter().any(|t| t == tag)
    }
}

/// Derive the object key for a tag's archive.
///
/// Tag separators are flattened so the key is a single path component.
pub fn archive_key(tag: &str) -> String {
    let flat: String = tag
        .chars()
        .map(|c| if matches!(c, '/' | ':') { '_' } else { c })
        .collect();
    format!("{flat}.tar.gz")
}

/// Remote cache over explicit engine and store handles
pub struct RemoteCache {
    engine: Arc<dyn ContainerEngine>,
    store: Arc<dyn ObjectStore>,
}

impl RemoteCache {
    pub fn new(engine: Arc<dyn ContainerEngine>, store: Arc<dyn ObjectStore>) -> Self {
        Self { engine, store }
    }

    /// Save each tag's image to the store.
    ///
    /// Archives are overwritten wholesale; a failure for one tag does not
    /// abort the others.
    pub async fn save(&self, tags: &[String]) -> SaveReport {
        let results = join_all(tags.iter().map(|tag| self.save_one(tag.clone()))).await;

        let mut report = SaveReport::default();
        for (tag, result) in tags.iter().zip(results) {
            match result {
                Ok(archive) => report.saved.push(archive),
                Err(e) => {
                    warn!("Saving {} failed: {}", tag, e);
                    report.failed.push((tag.clone(), e.to_string()));
                }
            }
        }
        report
    }

    /// Load each tag's archive into local engine state.
    ///
    /// Absent archives are misses, not errors: a never-before-built
    /// platform simply has no cache yet.
    pub async fn load(&self, tags: &[String]) -> LoadReport {
        let results = join_all(tags.iter().map(|tag| self.load_one(tag.clone()))).await;

        let mut report = LoadReport::default();
        for (tag, result) in tags.iter().zip(results) {
            match result {
                Ok(true) => report.loaded.push(tag.clone()),
                Ok(false) => {
                    info!("No remote cache for {}", tag);
                    report.missed.push(tag.clone());
                }
                Err(e) => {
                    warn!("Loading {} failed: {}", tag, e);
                    report.failed.push((tag.clone(), e.to_string()));
                }
            }
        }
        report
    }

    async fn save_one(&self, tag: String) -> StrataResult<SavedArchive> {
        let key = archive_key(&tag);
        let workspace = TempWorkspace::create().await?;

        let raw = workspace.path().join("image.tar");
        let compressed = workspace.path().join(&key);

        self.engine.export_image(&tag, &raw).await?;

        let (bytes, digest) = {
            let raw = raw.clone();
            let compressed = compressed.clone();
            tokio::task::spawn_blocking(move || -> StrataResult<(u64, String)> {
                let bytes = gzip_file(&raw, &compressed)
                    .map_err(|e| StrataError::io("compressing archive", e))?;
                let digest =
                    sha256_file(&compressed).map_err(|e| StrataError::io("hashing archive", e))?;
                Ok((bytes, digest))
            })
            .await
            .map_err(|e| StrataError::Internal(format!("compression task panicked: {e}")))??
        };

        debug!("Uploading {} ({} bytes, sha256:{})", key, bytes, digest);
        self.store.put(&key, &compressed).await?;

        Ok(SavedArchive {
            tag,
            key,
            digest,
            bytes,
        })
    }

    async fn load_one(&self, tag: String) -> StrataResult<bool> {
        let key = archive_key(&tag);
        let workspace = TempWorkspace::create().await?;

        let compressed = workspace.path().join(&key);
        if !self.store.get(&key, &compressed).await? {
            return Ok(false);
        }

        let raw = workspace.path().join("image.tar");
        {
            let compressed = compressed.clone();
            let raw = raw.clone();
            let key = key.clone();
            tokio::task::spawn_blocking(move || -> StrataResult<()> {
                gunzip_file(&compressed, &raw)
                    .map_err(|e| StrataError::ArchiveCorrupt {
                        key,
                        reason: e.to_string(),
                    })
                    .map(|_| ())
            })
            .await
            .map_err(|e| StrataError::Internal(format!("decompression task panicked: {e}")))??;
        }

        self.engine.import_image(&raw).await?;
        Ok(true)
    }
}

/// Temp directory that cleans up after the transfer
struct TempWorkspace {
    root: PathBuf,
}

impl TempWorkspace {
    async fn create() -> StrataResult<Self> {
        let root = std::env::temp_dir().join(format!("strata-{}", Uuid::new_v4()));
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| StrataError::io(format!("creating {}", root.display()), e))?;
        Ok(Self { root })
    }

    fn path(&self) -> &Path {
        &self.root
    }
}

impl Drop for TempWorkspace {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.root);
    }
}

fn gzip_file(src: &Path, dest: &Path) -> io::Result<u64> {
    let mut input = File::open(src)?;
    let output = File::create(dest)?;
    let mut encoder = GzEncoder::new(output, Compression::default());
    io::copy(&mut input, &mut encoder)?;
    let output = encoder.finish()?;
    output.sync_all()?;
    Ok(output.metadata()?.len())
}

fn gunzip_file(src: &Path, dest: &Path) -> io::Result<u64> {
    let input = File::open(src)?;
    let mut decoder = GzDecoder::new(input);
    let mut output = File::create(dest)?;
    io::copy(&mut decoder, &mut output)
}

fn sha256_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}
