//! One cleanup run over a converted document.
//!
//! ```text
//! Start → Enumerated → Fingerprinted → Clustered → Rewritten → Persisted → Pruned → Done
//!   └──────────────┴──────────────┴─────────┴───────────┴───────────┴────────┴──→ Failed
//! ```
//!
//! [`Orchestrator::plan`] runs everything up to `Rewritten` without touching
//! the disk. [`Orchestrator::apply`] persists the rewritten text and only then
//! deletes files, so the document never references an image that is already
//! gone. Any failure before persistence leaves the document byte-identical.

use crate::config::{CleanupConfig, DocumentPaths};
use crate::core::cluster::{self, Cluster, ImageArtifact};
use crate::core::fingerprint::{FingerprintComputer, Fingerprinter};
use crate::core::prune::{self, PruneFailure, PruneReport};
use crate::core::rewrite;
use crate::core::scanner;
use crate::error::{CleanupError, Result};
use crate::report::Reporter;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Start,
    Enumerated,
    Fingerprinted,
    Clustered,
    Rewritten,
    Persisted,
    Pruned,
    Done,
    Failed,
}

/// Files to delete and the basenames whose links must go.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RemovalSet {
    pub paths: Vec<PathBuf>,
    pub basenames: BTreeSet<String>,
}

impl RemovalSet {
    /// Every member of every repeated cluster, representatives included.
    pub fn from_clusters(clusters: &[Cluster]) -> Self {
        let mut set = RemovalSet::default();
        for member in clusters
            .iter()
            .filter(|c| c.is_repeated())
            .flat_map(|c| c.members())
        {
            set.paths.push(member.path().to_path_buf());
            set.basenames.insert(member.basename());
        }
        set
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    fn basename_lookup(&self) -> HashSet<String> {
        self.basenames.iter().cloned().collect()
    }
}

/// Everything a run has decided before it touches the disk.
#[derive(Debug, Clone)]
pub struct CleanupPlan {
    pub paths: DocumentPaths,
    pub started_at: DateTime<Utc>,
    pub clusters: Vec<Cluster>,
    pub removal: RemovalSet,
    pub rewritten: String,
    pub links_removed: usize,
    text_changed: bool,
}

impl CleanupPlan {
    pub fn artifact_count(&self) -> usize {
        self.clusters.iter().map(Cluster::len).sum()
    }

    pub fn repeated(&self) -> impl Iterator<Item = &Cluster> {
        self.clusters.iter().filter(|c| c.is_repeated())
    }

    pub fn has_changes(&self) -> bool {
        self.text_changed || !self.removal.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CleanupSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub document: PathBuf,
    pub artifacts_dir: PathBuf,
    pub artifact_count: usize,
    pub cluster_count: usize,
    pub repeated_groups: Vec<Vec<PathBuf>>,
    pub removed_basenames: Vec<String>,
    pub links_removed: usize,
    pub deleted: Vec<PathBuf>,
    pub failures: Vec<PruneFailure>,
    pub dry_run: bool,
}

impl CleanupSummary {
    fn new(plan: &CleanupPlan, pruned: PruneReport, dry_run: bool) -> Self {
        Self {
            started_at: plan.started_at,
            finished_at: Utc::now(),
            document: plan.paths.document.clone(),
            artifacts_dir: plan.paths.artifacts.clone(),
            artifact_count: plan.artifact_count(),
            cluster_count: plan.clusters.len(),
            repeated_groups: plan
                .repeated()
                .map(|c| c.members().iter().map(|m| m.path().to_path_buf()).collect())
                .collect(),
            removed_basenames: plan.removal.basenames.iter().cloned().collect(),
            links_removed: plan.links_removed,
            deleted: pruned.deleted,
            failures: pruned.failed,
            dry_run,
        }
    }
}

pub struct Orchestrator<F: Fingerprinter = FingerprintComputer> {
    config: CleanupConfig,
    fingerprinter: F,
    reporter: Arc<dyn Reporter>,
    state: RunState,
}

impl Orchestrator<FingerprintComputer> {
    pub fn new(config: CleanupConfig, reporter: Arc<dyn Reporter>) -> Self {
        let fingerprinter = FingerprintComputer::new(config.algorithm);
        Self::with_fingerprinter(config, fingerprinter, reporter)
    }
}

impl<F: Fingerprinter> Orchestrator<F> {
    pub fn with_fingerprinter(
        config: CleanupConfig,
        fingerprinter: F,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            config,
            fingerprinter,
            reporter,
            state: RunState::Start,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Plan and, unless this is a dry run, apply.
    pub fn run(&mut self, paths: &DocumentPaths) -> Result<CleanupSummary> {
        let plan = self.plan(paths)?;
        if self.config.dry_run {
            self.reporter
                .info("Dry run: document and artifacts left untouched");
            self.transition(RunState::Done);
            return Ok(CleanupSummary::new(&plan, PruneReport::default(), true));
        }
        self.apply(plan)
    }

    /// Enumerate, fingerprint and cluster only. Nothing is read besides the
    /// artifacts and nothing is written.
    pub fn scan(&mut self, artifacts_dir: &Path) -> Result<Vec<Cluster>> {
        self.state = RunState::Start;
        self.guard(|this| this.cluster_artifacts(artifacts_dir))
    }

    /// Steps up to `Rewritten`. The disk is not modified.
    pub fn plan(&mut self, paths: &DocumentPaths) -> Result<CleanupPlan> {
        self.state = RunState::Start;
        let started_at = Utc::now();
        self.guard(|this| {
            let clusters = this.cluster_artifacts(&paths.artifacts)?;
            let removal = RemovalSet::from_clusters(&clusters);
            for group in clusters.iter().filter(|c| c.is_repeated()) {
                this.reporter.info(&format!(
                    "Repeated group of {} (representative {})",
                    group.len(),
                    group.representative().path().display()
                ));
            }

            let original = fs::read_to_string(&paths.document)
                .map_err(|e| CleanupError::io(&paths.document, e))?;
            let (rewritten, links_removed) = if removal.is_empty() {
                (original.clone(), 0)
            } else {
                rewrite::rewrite_counted(&original, &removal.basename_lookup())
            };
            let text_changed = rewritten != original;
            this.transition(RunState::Rewritten);
            this.reporter.info(&format!(
                "Removed {} image link(s) for {} file(s)",
                links_removed,
                removal.paths.len()
            ));

            Ok(CleanupPlan {
                paths: paths.clone(),
                started_at,
                clusters,
                removal,
                rewritten,
                links_removed,
                text_changed,
            })
        })
    }

    /// Persist the rewritten text, then delete the removal set.
    pub fn apply(&mut self, plan: CleanupPlan) -> Result<CleanupSummary> {
        self.guard(|this| {
            if plan.text_changed {
                fs::write(&plan.paths.document, &plan.rewritten)
                    .map_err(|e| CleanupError::io(&plan.paths.document, e))?;
                this.reporter
                    .info(&format!("Updated {}", plan.paths.document.display()));
            }
            this.transition(RunState::Persisted);

            let pruned = prune::prune(
                &plan.removal.paths,
                this.config.failure_policy(),
                this.reporter.as_ref(),
            )?;
            this.transition(RunState::Pruned);
            if !pruned.failed.is_empty() {
                this.reporter.warn(&format!(
                    "{} file(s) could not be deleted",
                    pruned.failed.len()
                ));
            }

            this.transition(RunState::Done);
            Ok(CleanupSummary::new(&plan, pruned, false))
        })
    }

    fn cluster_artifacts(&mut self, artifacts_dir: &Path) -> Result<Vec<Cluster>> {
        let images = scanner::enumerate_artifacts(artifacts_dir)?;
        self.transition(RunState::Enumerated);
        self.reporter.info(&format!(
            "Found {} image(s) in {}",
            images.len(),
            artifacts_dir.display()
        ));

        let artifacts = timed(self.reporter.as_ref(), "fingerprinting", || {
            self.fingerprint_all(&images)
        })?;
        self.transition(RunState::Fingerprinted);

        let clusters = cluster::cluster(artifacts, self.config.threshold);
        self.transition(RunState::Clustered);
        Ok(clusters)
    }

    fn fingerprint_all(&self, images: &[PathBuf]) -> Result<Vec<ImageArtifact>> {
        let fingerprint_one = |path: &PathBuf| -> Result<ImageArtifact> {
            let fingerprint = self.fingerprinter.fingerprint_file(path)?;
            self.reporter.progress_advance();
            Ok(ImageArtifact::new(path.clone(), fingerprint))
        };

        self.reporter.progress_start("Fingerprinting", images.len());
        // Indexed parallel collect keeps input order.
        let artifacts = if self.config.parallel {
            images.par_iter().map(fingerprint_one).collect::<Result<Vec<_>>>()
        } else {
            images.iter().map(fingerprint_one).collect::<Result<Vec<_>>>()
        };
        self.reporter.progress_finish();
        artifacts
    }

    fn transition(&mut self, next: RunState) {
        self.reporter
            .debug(&format!("{:?} -> {:?}", self.state, next));
        self.state = next;
    }

    fn guard<T>(&mut self, step: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let result = step(self);
        if let Err(err) = &result {
            self.reporter
                .error(&format!("Cleanup failed in state {:?}: {}", self.state, err));
            self.transition(RunState::Failed);
        }
        result
    }
}

/// Run `f()`, report how long it took under `label`.
fn timed<T>(reporter: &dyn Reporter, label: &str, f: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    let result = f();
    reporter.info(&format!("⏱ {} took {:.2?}", label, start.elapsed()));
    result
}
