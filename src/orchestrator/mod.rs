//! Cache orchestration
//!
//! Top-level entry point for a CI run: prime local engine state from the
//! remote store, build every platform through a bounded worker pool, and
//! push updated archives back. Per-platform failures are collected and
//! reduced at the end; the batch never unwinds on the first bad platform.

use crate::engine::observer::{BuildStats, ClassicBuilderClassifier, LineClassifier};
use crate::engine::ContainerEngine;
use crate::error::{StrataError, StrataResult};
use crate::platform::Platform;
use crate::remote::{ObjectStore, RemoteCache, SavedArchive};
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{watch, Semaphore};
use tracing::{debug, info, warn};

/// Inputs for one orchestration run
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// Platform names to build
    pub platforms: Vec<String>,
    /// Directory holding `Dockerfile.build.<platform>` files
    pub docker_dir: PathBuf,
    /// Tag namespace
    pub namespace: String,
    /// Prime local state from the remote store before building
    pub load_cache: bool,
    /// Worker pool size; 0 means available parallelism
    pub jobs: usize,
    /// Per-build wall clock bound; expiry fails that platform only
    pub build_timeout: Option<Duration>,
    /// Echo raw build output lines to stdout, prefixed by platform
    pub echo_output: bool,
}

impl BuildRequest {
    pub fn new(platforms: Vec<String>, docker_dir: impl Into<PathBuf>) -> Self {
        Self {
            platforms,
            docker_dir: docker_dir.into(),
            namespace: crate::platform::DEFAULT_NAMESPACE.to_string(),
            load_cache: false,
            jobs: 0,
            build_timeout: None,
            echo_output: false,
        }
    }
}

/// Terminal state of one platform in a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformState {
    /// Built, not uploaded (no destination configured or upload failed)
    Built,
    /// Built and archive uploaded
    Saved,
    /// Build failed or timed out
    Failed,
    /// Never started: the batch was cancelled first
    Skipped,
}

impl PlatformState {
    pub fn is_success(self) -> bool {
        matches!(self, Self::Built | Self::Saved)
    }
}

impl fmt::Display for PlatformState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Built => write!(f, "built"),
            Self::Saved => write!(f, "saved"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

/// Per-platform result of a run
#[derive(Debug, Clone, Serialize)]
pub struct PlatformOutcome {
    pub platform: String,
    pub tag: String,
    pub state: PlatformState,
    /// Whether the remote cache primed this tag before the build
    pub cache_loaded: bool,
    /// Fresh/cached instruction counts from the build output
    pub stats: Option<BuildStats>,
    /// Failure detail, or upload-failure note on an otherwise built platform
    pub detail: Option<String>,
}

/// Reduced result of a whole run
#[derive(Debug, Serialize)]
pub struct BatchReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<PlatformOutcome>,
    pub archives: Vec<SavedArchive>,
}

impl BatchReport {
    /// Logical AND of per-platform successes
    pub fn succeeded(&self) -> bool {
        self.outcomes.iter().all(|o| o.state.is_success())
    }

    pub fn failed_platforms(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| !o.state.is_success())
            .map(|o| o.platform.as_str())
            .collect()
    }
}

/// Orchestrates load → build → save over explicit handles.
///
/// The store handle is optional: with no destination configured, load
/// reports every tag as a miss and save is skipped without error.
pub struct Orchestrator {
    engine: Arc<dyn ContainerEngine>,
    store: Option<Arc<dyn ObjectStore>>,
    classifier: Arc<dyn LineClassifier>,
}

impl Orchestrator {
    pub fn new(engine: Arc<dyn ContainerEngine>, store: Option<Arc<dyn ObjectStore>>) -> Self {
        Self {
            engine,
            store,
            classifier: Arc::new(ClassicBuilderClassifier),
        }
    }

    /// Swap the output classifier for a different engine dialect
    pub fn with_classifier(mut self, classifier: Arc<dyn LineClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Build all requested platforms, optionally priming from and saving
    /// to the remote store.
    ///
    /// Configuration problems (bad name, missing Dockerfile) fail the
    /// whole request before any build attempt. After that point no
    /// per-platform failure escalates; the report carries them all.
    pub async fn build_save_containers(
        &self,
        request: &BuildRequest,
        cancel: Option<watch::Receiver<bool>>,
    ) -> StrataResult<BatchReport> {
        let started_at = Utc::now();

        // Validate everything up front; duplicates collapse so one task
        // owns each tag for the whole run.
        let platforms = self.resolve_platforms(request)?;
        let tags: Vec<String> = platforms.iter().map(|p| p.tag(&request.namespace)).collect();

        let cache = self
            .store
            .as_ref()
            .map(|store| RemoteCache::new(Arc::clone(&self.engine), Arc::clone(store)));

        // Phase 1: prime local state before any build.
        let loaded_tags = if request.load_cache {
            match &cache {
                Some(cache) => {
                    info!("Loading {} tag(s) from remote cache", tags.len());
                    let report = cache.load(&tags).await;
                    for (tag, reason) in &report.failed {
                        warn!("Cache load failed for {}: {}", tag, reason);
                    }
                    report.loaded
                }
                None => {
                    debug!("No cache destination configured, skipping load");
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        // Phase 2: bounded parallel builds, no short-circuit.
        let mut outcomes = self
            .build_all(request, &platforms, &tags, &loaded_tags, cancel)
            .await;

        // Phase 3: upload what built. Upload failures annotate the
        // outcome; they never fail the batch.
        let archives = match &cache {
            Some(cache) => {
                let built: Vec<String> = outcomes
                    .iter()
                    .filter(|o| o.state == PlatformState::Built)
                    .map(|o| o.tag.clone())
                    .collect();

                if built.is_empty() {
                    Vec::new()
                } else {
                    info!("Saving {} tag(s) to remote cache", built.len());
                    let report = cache.save(&built).await;
                    for outcome in &mut outcomes {
                        if report.saved.iter().any(|a| a.tag == outcome.tag) {
                            outcome.state = PlatformState::Saved;
                        } else if let Some((_, reason)) =
                            report.failed.iter().find(|(t, _)| *t == outcome.tag)
                        {
                            outcome.detail = Some(format!("upload failed: {reason}"));
                        }
                    }
                    report.saved
                }
            }
            None => {
                debug!("No cache destination configured, skipping save");
                Vec::new()
            }
        };

        Ok(BatchReport {
            started_at,
            finished_at: Utc::now(),
            outcomes,
            archives,
        })
    }

    fn resolve_platforms(&self, request: &BuildRequest) -> StrataResult<Vec<Platform>> {
        let mut seen = std::collections::HashSet::new();
        let mut platforms = Vec::new();

        for name in &request.platforms {
            if !seen.insert(name.clone()) {
                warn!("Duplicate platform {} collapsed", name);
                continue;
            }
            platforms.push(Platform::locate(&request.docker_dir, name)?);
        }

        Ok(platforms)
    }

    async fn build_all(
        &self,
        request: &BuildRequest,
        platforms: &[Platform],
        tags: &[String],
        loaded_tags: &[String],
        cancel: Option<watch::Receiver<bool>>,
    ) -> Vec<PlatformOutcome> {
        let jobs = if request.jobs == 0 {
            std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(4)
        } else {
            request.jobs
        };
        debug!("Building {} platform(s) with {} worker(s)", platforms.len(), jobs);

        let pool = Arc::new(Semaphore::new(jobs));

        let futures = platforms.iter().zip(tags).map(|(platform, tag)| {
            let pool = Arc::clone(&pool);
            let cancel = cancel.clone();
            let cache_loaded = loaded_tags.contains(tag);
            async move {
                let cancelled = || cancel.as_ref().is_some_and(|rx| *rx.borrow());

                if cancelled() {
                    return self.skipped_outcome(platform, tag, cache_loaded);
                }

                let _permit = pool.acquire().await.expect("pool never closed");

                // Re-check after waiting for a worker slot; in-flight
                // builds are never interrupted, only unstarted ones.
                if cancelled() {
                    return self.skipped_outcome(platform, tag, cache_loaded);
                }

                self.build_one(request, platform, tag, cache_loaded).await
            }
        });

        join_all(futures).await
    }

    fn skipped_outcome(
        &self,
        platform: &Platform,
        tag: &str,
        cache_loaded: bool,
    ) -> PlatformOutcome {
        info!("Skipping {} (batch cancelled)", platform);
        PlatformOutcome {
            platform: platform.name.clone(),
            tag: tag.to_string(),
            state: PlatformState::Skipped,
            cache_loaded,
            stats: None,
            detail: Some("batch cancelled".to_string()),
        }
    }

    async fn build_one(
        &self,
        request: &BuildRequest,
        platform: &Platform,
        tag: &str,
        cache_loaded: bool,
    ) -> PlatformOutcome {
        let stats = Arc::new(Mutex::new(BuildStats::default()));
        let sink = {
            let stats = Arc::clone(&stats);
            let classifier = Arc::clone(&self.classifier);
            let name = platform.name.clone();
            let echo = request.echo_output;
            move |line: &str| {
                if echo {
                    println!("[{name}] {line}");
                }
                stats.lock().expect("stats lock").record(classifier.classify(line));
            }
        };

        let build = self
            .engine
            .build(&platform.dockerfile, &platform.context, tag, &sink);

        let result = match request.build_timeout {
            Some(limit) => match tokio::time::timeout(limit, build).await {
                Ok(result) => result,
                Err(_) => Err(StrataError::BuildTimeout {
                    platform: platform.name.clone(),
                    seconds: limit.as_secs(),
                }),
            },
            None => build.await,
        };

        let stats = *stats.lock().expect("stats lock");

        match result {
            Ok(()) => {
                info!("Built {} ({})", platform, stats);
                PlatformOutcome {
                    platform: platform.name.clone(),
                    tag: tag.to_string(),
                    state: PlatformState::Built,
                    cache_loaded,
                    stats: Some(stats),
                    detail: None,
                }
            }
            Err(e) => {
                warn!("Build failed for {}: {}", platform, e);
                PlatformOutcome {
                    platform: platform.name.clone(),
                    tag: tag.to_string(),
                    state: PlatformState::Failed,
                    cache_loaded,
                    stats: Some(stats),
                    detail: Some(e.to_string()),
                }
            }
        }
    }
}
