//! In-memory engine for tests
//!
//! Simulates per-instruction layer caching keyed by instruction-chain
//! prefixes: an instruction is served from cache while the chain up to and
//! including it matches a previously built prefix, which is exactly the
//! sharing behavior of the real layer store. Emits the classic builder's
//! output markers so the observer contract is exercised end to end.

use crate::engine::runtime::ContainerEngine;
use crate::error::{StrataError, StrataResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Default)]
struct FakeState {
    /// tag -> instruction chain it was built from
    images: HashMap<String, Vec<String>>,
    /// cached instruction-chain prefixes
    layers: HashSet<String>,
}

/// Archive blob format for export/import round trips
#[derive(Serialize, Deserialize)]
struct FakeArchive {
    tag: String,
    instructions: Vec<String>,
}

pub struct FakeEngine {
    state: Mutex<FakeState>,
    build_delay: Option<Duration>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState::default()),
            build_delay: None,
        }
    }

    /// Engine whose builds sleep first, for timeout tests
    pub fn with_build_delay(delay: Duration) -> Self {
        Self {
            state: Mutex::new(FakeState::default()),
            build_delay: Some(delay),
        }
    }

    /// Parse cacheable instructions from Dockerfile content.
    ///
    /// FROM pulls a base image rather than executing in an intermediate
    /// container, so it never produces a fresh/cached marker.
    fn instructions(content: &str) -> Vec<String> {
        content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#') && !l.starts_with("FROM "))
            .map(str::to_string)
            .collect()
    }

    fn prefix_key(chain: &[String]) -> String {
        chain.join("\n")
    }

    fn all_prefixes(chain: &[String]) -> Vec<String> {
        (1..=chain.len())
            .map(|n| Self::prefix_key(&chain[..n]))
            .collect()
    }
}

impl Default for FakeEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContainerEngine for FakeEngine {
    async fn is_available(&self) -> bool {
        true
    }

    async fn build(
        &self,
        dockerfile: &Path,
        _context: &Path,
        tag: &str,
        on_output: &(dyn for<'a> Fn(&'a str) + Send + Sync),
    ) -> StrataResult<()> {
        if let Some(delay) = self.build_delay {
            tokio::time::sleep(delay).await;
        }

        let content = tokio::fs::read_to_string(dockerfile)
            .await
            .map_err(|e| StrataError::io(format!("reading {}", dockerfile.display()), e))?;

        let instructions = Self::instructions(&content);
        let mut state = self.state.lock().expect("fake engine state");

        on_output(&format!("Step 1/{} : FROM busybox", instructions.len() + 1));

        for (idx, instruction) in instructions.iter().enumerate() {
            on_output(&format!(
                "Step {}/{} : {}",
                idx + 2,
                instructions.len() + 1,
                instruction
            ));

            let key = Self::prefix_key(&instructions[..=idx]);
            if state.layers.contains(&key) {
                on_output(" ---> Using cache");
            } else {
                // A failing instruction does not leave a cached layer,
                // but the successful layers before it do.
                if instruction.contains("RUN false") {
                    on_output(&format!(" ---> Running in fake{idx:08x}"));
                    on_output("The command '/bin/sh -c false' returned a non-zero code: 1");
                    return Err(StrataError::BuildFailure {
                        platform: tag.to_string(),
                        detail: format!("instruction failed: {instruction}"),
                    });
                }
                on_output(&format!(" ---> Running in fake{idx:08x}"));
                state.layers.insert(key);
            }
            on_output(&format!(" ---> layer{idx:08x}"));
        }

        on_output(&format!("Successfully tagged {tag}"));
        state.images.insert(tag.to_string(), instructions);
        Ok(())
    }

    async fn image_exists(&self, tag: &str) -> StrataResult<bool> {
        Ok(self
            .state
            .lock()
            .expect("fake engine state")
            .images
            .contains_key(tag))
    }

    async fn remove_image(&self, tag: &str) -> StrataResult<()> {
        let mut state = self.state.lock().expect("fake engine state");
        if let Some(chain) = state.images.remove(tag) {
            // Keep layers still referenced by another image's prefix chain.
            let referenced: HashSet<String> = state
                .images
                .values()
                .flat_map(|c| Self::all_prefixes(c))
                .collect();
            for prefix in Self::all_prefixes(&chain) {
                if !referenced.contains(&prefix) {
                    state.layers.remove(&prefix);
                }
            }
        }
        Ok(())
    }

    async fn export_image(&self, tag: &str, dest: &Path) -> StrataResult<()> {
        let instructions = {
            let state = self.state.lock().expect("fake engine state");
            state
                .images
                .get(tag)
                .cloned()
                .ok_or_else(|| StrataError::command_exec("fake save", "no such image"))?
        };

        let archive = FakeArchive {
            tag: tag.to_string(),
            instructions,
        };
        let blob = serde_json::to_vec(&archive)?;
        tokio::fs::write(dest, blob)
            .await
            .map_err(|e| StrataError::io(format!("writing {}", dest.display()), e))
    }

    async fn import_image(&self, src: &Path) -> StrataResult<()> {
        let blob = tokio::fs::read(src)
            .await
            .map_err(|e| StrataError::io(format!("reading {}", src.display()), e))?;
        let archive: FakeArchive = serde_json::from_slice(&blob)?;

        let mut state = self.state.lock().expect("fake engine state");
        for prefix in Self::all_prefixes(&archive.instructions) {
            state.layers.insert(prefix);
        }
        state.images.insert(archive.tag, archive.instructions);
        Ok(())
    }

    async fn version(&self) -> StrataResult<String> {
        Ok("24.0.7".to_string())
    }

    fn engine_name(&self) -> &'static str {
        "Fake"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::observer::{BuildStats, ClassicBuilderClassifier, LineClassifier};
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    const DOCKERFILE: &str = "FROM busybox\nRUN touch ~/file1\nRUN touch ~/file2\nRUN touch ~/file3\nRUN touch ~/file4\n";

    async fn build_stats(engine: &FakeEngine, dockerfile: &Path, tag: &str) -> BuildStats {
        let classifier = ClassicBuilderClassifier;
        let stats = Arc::new(Mutex::new(BuildStats::default()));
        let sink_stats = Arc::clone(&stats);
        engine
            .build(dockerfile, dockerfile.parent().unwrap(), tag, &move |line| {
                sink_stats
                    .lock()
                    .unwrap()
                    .record(classifier.classify(line));
            })
            .await
            .unwrap();
        let stats = stats.lock().unwrap();
        *stats
    }

    #[tokio::test]
    async fn cold_build_all_fresh() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Dockerfile.build.t");
        fs::write(&path, DOCKERFILE).unwrap();

        let engine = FakeEngine::new();
        let stats = build_stats(&engine, &path, "strata/build.t").await;
        assert_eq!(stats.fresh, 4);
        assert_eq!(stats.cached, 0);
    }

    #[tokio::test]
    async fn rebuild_fully_cached() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Dockerfile.build.t");
        fs::write(&path, DOCKERFILE).unwrap();

        let engine = FakeEngine::new();
        build_stats(&engine, &path, "strata/build.t").await;
        let stats = build_stats(&engine, &path, "strata/build.t").await;
        assert_eq!(stats.fresh, 0);
        assert_eq!(stats.cached, 4);
    }

    #[tokio::test]
    async fn export_import_restores_cache() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Dockerfile.build.t");
        fs::write(&path, DOCKERFILE).unwrap();
        let archive = dir.path().join("image.tar");

        let engine = FakeEngine::new();
        build_stats(&engine, &path, "strata/build.t").await;
        engine.export_image("strata/build.t", &archive).await.unwrap();
        engine.remove_image("strata/build.t").await.unwrap();
        engine.import_image(&archive).await.unwrap();

        let stats = build_stats(&engine, &path, "strata/build.t").await;
        assert_eq!(stats.fresh, 0);
        assert_eq!(stats.cached, 4);
    }

    #[tokio::test]
    async fn remove_absent_tag_is_noop() {
        let engine = FakeEngine::new();
        engine.remove_image("strata/build.ghost").await.unwrap();
        assert!(!engine.image_exists("strata/build.ghost").await.unwrap());
    }

    #[tokio::test]
    async fn shared_prefix_partially_cached() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("Dockerfile.build.a");
        fs::write(&base, "FROM busybox\nRUN step1\nRUN step2\nRUN step3\n").unwrap();
        let variant = dir.path().join("Dockerfile.build.b");
        fs::write(&variant, "FROM busybox\nRUN step1\nRUN step2\nRUN other\n").unwrap();

        let engine = FakeEngine::new();
        build_stats(&engine, &base, "strata/build.a").await;
        let stats = build_stats(&engine, &variant, "strata/build.b").await;

        // Shared leading instructions reuse cache, divergent suffix rebuilds.
        assert_eq!(stats.cached, 2);
        assert_eq!(stats.fresh, 1);
    }

    #[tokio::test]
    async fn failing_instruction_fails_build() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Dockerfile.build.bad");
        fs::write(&path, "FROM busybox\nRUN touch ~/ok\nRUN false\n").unwrap();

        let engine = FakeEngine::new();
        let err = engine
            .build(&path, dir.path(), "strata/build.bad", &|_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, StrataError::BuildFailure { .. }));
        assert!(!engine.image_exists("strata/build.bad").await.unwrap());
    }
}
