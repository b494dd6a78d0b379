//! Greedy first-fit similarity clustering.
//!
//! Artifacts are visited in the order given. Each one is compared only
//! against the representative (first member) of every existing cluster, in
//! cluster creation order, and joins the first cluster whose distance is
//! strictly below the threshold. Otherwise it founds a new cluster. The result
//! depends on input order, so callers feed artifacts sorted by path.

use crate::core::fingerprint::Fingerprint;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Hamming distance below which two 64-bit fingerprints are "the same picture".
pub const DEFAULT_THRESHOLD: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageArtifact {
    path: PathBuf,
    fingerprint: Fingerprint,
}

impl ImageArtifact {
    pub fn new(path: impl Into<PathBuf>, fingerprint: Fingerprint) -> Self {
        Self {
            path: path.into(),
            fingerprint,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    /// Final path segment, as referenced from the document text.
    pub fn basename(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Non-empty group of artifacts. The first member is the representative and
/// never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cluster {
    members: Vec<ImageArtifact>,
}

impl Cluster {
    fn found(representative: ImageArtifact) -> Self {
        Self {
            members: vec![representative],
        }
    }

    pub fn representative(&self) -> &ImageArtifact {
        &self.members[0]
    }

    pub fn members(&self) -> &[ImageArtifact] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Two or more members. Every member of a repeated cluster is removed,
    /// the representative included.
    pub fn is_repeated(&self) -> bool {
        self.members.len() > 1
    }

    fn accepts(&self, candidate: &ImageArtifact, threshold: u32) -> bool {
        self.representative()
            .fingerprint
            .distance(&candidate.fingerprint)
            < threshold
    }
}

/// Partition `artifacts` into clusters, preserving input order inside each
/// cluster and ordering clusters by creation.
pub fn cluster(artifacts: Vec<ImageArtifact>, threshold: u32) -> Vec<Cluster> {
    let mut clusters: Vec<Cluster> = Vec::new();

    for artifact in artifacts {
        match clusters.iter_mut().find(|c| c.accepts(&artifact, threshold)) {
            Some(existing) => existing.members.push(artifact),
            None => clusters.push(Cluster::found(artifact)),
        }
    }

    clusters
}
