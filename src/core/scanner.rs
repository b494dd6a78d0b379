use crate::error::{CleanupError, Result};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Only files with exactly this extension are artifacts. Matching is
/// case-sensitive.
pub const ARTIFACT_EXTENSION: &str = "png";

/// Recursively walk `dir`, returning every artifact path sorted component by
/// component (`a/x.png` before `a-b/y.png`).
pub fn enumerate_artifacts(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(CleanupError::NotFound {
            path: dir.to_path_buf(),
        });
    }

    let mut images = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry?;
        if entry.file_type().is_file() && is_artifact(entry.path()) {
            images.push(entry.into_path());
        }
    }
    images.sort();
    Ok(images)
}

pub fn is_artifact(path: &Path) -> bool {
    path.extension() == Some(OsStr::new(ARTIFACT_EXTENSION))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_dir_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("doc_artifacts");

        let err = enumerate_artifacts(&missing).unwrap_err();
        assert!(matches!(err, CleanupError::NotFound { path } if path == missing));
    }

    #[test]
    fn test_file_instead_of_dir_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("doc_artifacts");
        fs::write(&file, b"").unwrap();

        assert!(matches!(
            enumerate_artifacts(&file),
            Err(CleanupError::NotFound { .. })
        ));
    }

    #[test]
    fn test_recursive_sorted_png_only() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("b/nested")).unwrap();
        fs::create_dir_all(root.join("a")).unwrap();

        for name in [
            "z.png",
            "a/m.png",
            "b/nested/c.png",
            "b/a.png",
            "upper.PNG",
            "photo.jpg",
            "notes.txt",
            "png",
        ] {
            fs::write(root.join(name), b"").unwrap();
        }

        let found = enumerate_artifacts(root).unwrap();
        let relative: Vec<PathBuf> = found
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_path_buf())
            .collect();

        assert_eq!(
            relative,
            vec![
                PathBuf::from("a/m.png"),
                PathBuf::from("b/a.png"),
                PathBuf::from("b/nested/c.png"),
                PathBuf::from("z.png"),
            ]
        );
    }

    #[test]
    fn test_sort_compares_path_components() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("a")).unwrap();
        fs::create_dir_all(root.join("a-b")).unwrap();
        fs::write(root.join("a-b/y.png"), b"").unwrap();
        fs::write(root.join("a/x.png"), b"").unwrap();

        let found = enumerate_artifacts(root).unwrap();

        // As plain strings "a-b/y.png" < "a/x.png", since '-' < '/'.
        assert_eq!(
            found,
            vec![root.join("a/x.png"), root.join("a-b/y.png")]
        );
    }

    #[test]
    fn test_empty_dir() {
        let temp_dir = TempDir::new().unwrap();
        assert!(enumerate_artifacts(temp_dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_is_artifact() {
        assert!(is_artifact(Path::new("x/figure.png")));
        assert!(!is_artifact(Path::new("x/figure.PNG")));
        assert!(!is_artifact(Path::new("x/figure.jpeg")));
        assert!(!is_artifact(Path::new("x/png")));
    }
}
