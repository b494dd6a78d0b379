use crate::error::{CleanupError, Result};
use crate::report::Reporter;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// What to do when a single deletion fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Stop at the first failure and return it.
    #[default]
    Abort,
    /// Report the failure and keep deleting the rest.
    Isolate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PruneFailure {
    pub path: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PruneReport {
    pub deleted: Vec<PathBuf>,
    pub failed: Vec<PruneFailure>,
}

/// Delete every file in `paths`, in order.
pub fn prune(
    paths: &[PathBuf],
    policy: FailurePolicy,
    reporter: &dyn Reporter,
) -> Result<PruneReport> {
    let mut report = PruneReport::default();

    for path in paths {
        match fs::remove_file(path) {
            Ok(()) => {
                reporter.info(&format!("Deleted {}", path.display()));
                report.deleted.push(path.clone());
            }
            Err(err) => match policy {
                FailurePolicy::Abort => {
                    return Err(CleanupError::FileSystem {
                        path: path.clone(),
                        source: err,
                    });
                }
                FailurePolicy::Isolate => {
                    reporter.warn(&format!("Failed to delete {}: {}", path.display(), err));
                    report.failed.push(PruneFailure {
                        path: path.clone(),
                        error: err.to_string(),
                    });
                }
            },
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::MemoryReporter;
    use log::Level;
    use tempfile::TempDir;

    fn touch(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, b"x").unwrap();
        path
    }

    #[test]
    fn test_deletes_all_files() {
        let temp_dir = TempDir::new().unwrap();
        let paths = vec![touch(&temp_dir, "a.png"), touch(&temp_dir, "b.png")];

        let report = prune(&paths, FailurePolicy::Abort, &MemoryReporter::new()).unwrap();

        assert_eq!(report.deleted, paths);
        assert!(report.failed.is_empty());
        assert!(paths.iter().all(|p| !p.exists()));
    }

    #[test]
    fn test_abort_stops_at_first_failure() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("gone.png");
        let survivor = touch(&temp_dir, "b.png");

        let err = prune(
            &[missing.clone(), survivor.clone()],
            FailurePolicy::Abort,
            &MemoryReporter::new(),
        )
        .unwrap_err();

        assert!(matches!(err, CleanupError::FileSystem { path, .. } if path == missing));
        assert!(survivor.exists());
    }

    #[test]
    fn test_isolate_continues_past_failures() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("gone.png");
        let other = touch(&temp_dir, "b.png");
        let reporter = MemoryReporter::new();

        let report = prune(
            &[missing.clone(), other.clone()],
            FailurePolicy::Isolate,
            &reporter,
        )
        .unwrap();

        assert_eq!(report.deleted, vec![other.clone()]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].path, missing);
        assert!(!other.exists());
        assert_eq!(reporter.messages(Level::Warn).len(), 1);
    }
}
