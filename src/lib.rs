//! Near-duplicate image cleanup for converted documents.
//!
//! A conversion engine leaves behind `<stem>.md` and a `<stem>_artifacts/`
//! folder of extracted pictures. Pictures that show up more than once
//! (logos, headers, decorations) are found by perceptual hashing; every copy
//! is deleted and its inline `![..](..)` link is cut out of the text.

pub mod config;
pub mod convert;
pub mod core;
pub mod error;
pub mod pipeline;
pub mod report;

pub use config::{CleanupConfig, DocumentPaths, FileConfig};
pub use error::{CleanupError, Result};
pub use pipeline::{CleanupPlan, CleanupSummary, Orchestrator, RunState};
pub use report::{LogReporter, Reporter};
