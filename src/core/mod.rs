pub mod cluster;
pub mod fingerprint;
pub mod prune;
pub mod rewrite;
pub mod scanner;

pub use cluster::{Cluster, ImageArtifact, DEFAULT_THRESHOLD};
pub use fingerprint::{Fingerprint, FingerprintAlgorithm, FingerprintComputer, Fingerprinter};
pub use prune::{FailurePolicy, PruneReport};
