//! Object storage backends for cache archives
//!
//! The remote store is a flat key/blob namespace. `S3CliStore` shells out
//! to the aws CLI so CI hosts need no SDK credentials plumbing beyond what
//! they already have for `aws s3`; `DirStore` backs tests and local runs.

use crate::error::{StrataError, StrataResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Flat key/blob storage for cache archives
///
/// Keys are disjoint per tag, so concurrent operations on distinct keys
/// need no coordination.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload a file under the key, overwriting any existing object
    async fn put(&self, key: &str, file: &Path) -> StrataResult<()>;

    /// Download the object under the key into `dest`.
    ///
    /// Returns false when the key does not exist; other failures are
    /// transfer errors.
    async fn get(&self, key: &str, dest: &Path) -> StrataResult<bool>;

    /// Human-readable location for logs and reports
    fn location(&self) -> String;
}

/// S3-backed store driven through the aws CLI
pub struct S3CliStore {
    bucket: String,
}

impl S3CliStore {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
        }
    }

    fn url(&self, key: &str) -> String {
        format!("s3://{}/{}", self.bucket, key)
    }

    async fn run_cp(&self, from: &str, to: &str) -> StrataResult<std::process::Output> {
        debug!("Executing: aws s3 cp {} {}", from, to);

        Command::new("aws")
            .args(["s3", "cp", from, to])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    StrataError::AwsCliNotFound
                } else {
                    StrataError::command_failed("aws s3 cp", e)
                }
            })
    }

    /// Whether a failed `aws s3 cp` stderr indicates a missing key rather
    /// than a transfer problem.
    fn is_not_found(stderr: &str) -> bool {
        stderr.contains("404")
            || stderr.contains("Not Found")
            || stderr.contains("NoSuchKey")
            || stderr.contains("does not exist")
    }
}

#[async_trait]
impl ObjectStore for S3CliStore {
    async fn put(&self, key: &str, file: &Path) -> StrataResult<()> {
        let url = self.url(key);
        let output = self.run_cp(&file.to_string_lossy(), &url).await?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(StrataError::transfer(key, stderr.trim().to_string()))
        }
    }

    async fn get(&self, key: &str, dest: &Path) -> StrataResult<bool> {
        let url = self.url(key);
        let output = self.run_cp(&url, &dest.to_string_lossy()).await?;

        if output.status.success() {
            return Ok(true);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if Self::is_not_found(&stderr) {
            debug!("Cache miss for {}", key);
            Ok(false)
        } else {
            Err(StrataError::transfer(key, stderr.trim().to_string()))
        }
    }

    fn location(&self) -> String {
        format!("s3://{}", self.bucket)
    }
}

/// Filesystem-backed store for tests and local-only runs
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ObjectStore for DirStore {
    async fn put(&self, key: &str, file: &Path) -> StrataResult<()> {
        let dest = self.root.join(key);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StrataError::io(format!("creating {}", parent.display()), e))?;
        }
        tokio::fs::copy(file, &dest)
            .await
            .map_err(|e| StrataError::transfer(key, e.to_string()))?;
        Ok(())
    }

    async fn get(&self, key: &str, dest: &Path) -> StrataResult<bool> {
        let src = self.root.join(key);
        if !src.is_file() {
            return Ok(false);
        }
        tokio::fs::copy(&src, dest)
            .await
            .map_err(|e| StrataError::transfer(key, e.to_string()))?;
        Ok(true)
    }

    fn location(&self) -> String {
        self.root.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn s3_url_shape() {
        let store = S3CliStore::new("ci-cache");
        assert_eq!(store.url("strata_build.armv7.tar.gz"), "s3://ci-cache/strata_build.armv7.tar.gz");
        assert_eq!(store.location(), "s3://ci-cache");
    }

    #[test]
    fn s3_not_found_detection() {
        assert!(S3CliStore::is_not_found(
            "fatal error: An error occurred (404) when calling the HeadObject operation: Not Found"
        ));
        assert!(S3CliStore::is_not_found("An error occurred (NoSuchKey)"));
        assert!(!S3CliStore::is_not_found(
            "fatal error: An error occurred (AccessDenied) when calling the GetObject operation"
        ));
    }

    #[tokio::test]
    async fn dir_store_roundtrip() {
        let remote = TempDir::new().unwrap();
        let local = TempDir::new().unwrap();
        let store = DirStore::new(remote.path());

        let src = local.path().join("archive.tar.gz");
        tokio::fs::write(&src, b"blob").await.unwrap();

        store.put("a/b.tar.gz", &src).await.unwrap();

        let dest = local.path().join("restored.tar.gz");
        assert!(store.get("a/b.tar.gz", &dest).await.unwrap());
        assert_eq!(tokio::fs::read(&dest).await.unwrap(), b"blob");
    }

    #[tokio::test]
    async fn dir_store_miss() {
        let remote = TempDir::new().unwrap();
        let local = TempDir::new().unwrap();
        let store = DirStore::new(remote.path());

        let dest = local.path().join("nothing.tar.gz");
        assert!(!store.get("missing.tar.gz", &dest).await.unwrap());
        assert!(!dest.exists());
    }
}
