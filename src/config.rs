//! Run configuration.
//!
//! Values come from three layers: built-in defaults, an optional JSON file,
//! and CLI flags applied by the binary on top.

use crate::core::cluster::DEFAULT_THRESHOLD;
use crate::core::fingerprint::FingerprintAlgorithm;
use crate::core::prune::FailurePolicy;
use crate::error::{CleanupError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "DOCPRUNE_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupConfig {
    pub threshold: u32,
    pub algorithm: FingerprintAlgorithm,
    /// Fingerprint artifacts on the rayon pool.
    pub parallel: bool,
    pub isolate_delete_failures: bool,
    #[serde(skip)]
    pub dry_run: bool,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            algorithm: FingerprintAlgorithm::default(),
            parallel: true,
            isolate_delete_failures: false,
            dry_run: false,
        }
    }
}

impl CleanupConfig {
    pub fn failure_policy(&self) -> FailurePolicy {
        if self.isolate_delete_failures {
            FailurePolicy::Isolate
        } else {
            FailurePolicy::Abort
        }
    }
}

/// Options handed to the external conversion engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionOptions {
    pub images_scale: f32,
    pub generate_page_images: bool,
    pub generate_picture_images: bool,
    pub do_picture_description: bool,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            images_scale: 2.0,
            generate_page_images: false,
            generate_picture_images: true,
            do_picture_description: false,
        }
    }
}

/// 1-based, inclusive page range. `end: None` means "to the last page".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRange {
    pub start: u32,
    pub end: Option<u32>,
}

impl Default for PageRange {
    fn default() -> Self {
        Self {
            start: 1,
            end: None,
        }
    }
}

/// External converter program and its argument template.
///
/// Placeholders substituted in each argument: `{input}`, `{output}`,
/// `{start}`, `{end}`, `{scale}`, `{page_images}`, `{picture_images}`,
/// `{describe}`. An argument that becomes empty after
/// substitution is dropped. The default `docling` template carries only
/// `{input}` and `{output}`; a page range it cannot carry is rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            program: "docling".to_string(),
            args: [
                "--to",
                "md",
                "--image-export-mode",
                "referenced",
                "--output",
                "{output}",
                "{input}",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl ConverterConfig {
    /// Whether any argument mentions `placeholder`, e.g. `"{start}"`.
    pub fn carries(&self, placeholder: &str) -> bool {
        self.args.iter().any(|arg| arg.contains(placeholder))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub cleanup: CleanupConfig,
    pub converter: ConverterConfig,
    pub conversion: ConversionOptions,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| CleanupError::io(path, e))?;
        serde_json::from_str(&content).map_err(|source| CleanupError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load from `$DOCPRUNE_CONFIG` or the per-user config directory.
    /// A missing file yields defaults; a malformed one is an error.
    pub fn load_default() -> Result<Self> {
        match default_config_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|dir| dir.join("docprune").join("config.json"))
}

/// Where the conversion engine puts its two outputs for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentPaths {
    pub document: PathBuf,
    pub artifacts: PathBuf,
}

impl DocumentPaths {
    /// `<output_dir>/<stem>.md` and `<output_dir>/<stem>_artifacts/`.
    pub fn for_stem(output_dir: &Path, stem: &str) -> Self {
        Self {
            document: output_dir.join(format!("{stem}.md")),
            artifacts: output_dir.join(format!("{stem}_artifacts")),
        }
    }

    /// Derive the paths from the input document's file stem. When `input`
    /// is not an existing file it is taken to be the stem itself, dots and
    /// all.
    pub fn for_input(output_dir: &Path, input: &Path) -> Option<Self> {
        let stem = if input.is_file() {
            input.file_stem()?
        } else {
            input.file_name()?
        };
        Some(Self::for_stem(output_dir, stem.to_str()?))
    }
}
