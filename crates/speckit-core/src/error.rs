//! Classified failures of the acquisition and materialization pipeline

use crate::pipeline::steps;
use std::error::Error as StdError;
use std::path::PathBuf;
use thiserror::Error;

/// Boxed underlying error for stages that can fail on either the network or the filesystem
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Every way a pipeline stage can fail
#[derive(Debug, Error)]
pub enum ScaffoldError {
    /// Release feed unreachable, non-2xx, or malformed
    #[error("failed to fetch release metadata from {url}")]
    FetchFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// No asset in the latest release matches the requested variant
    #[error(
        "no template asset for '{variant}' in release {release} (available assets: {})",
        list_or_none(.available)
    )]
    AssetNotFound {
        variant: String,
        release: String,
        available: Vec<String>,
    },

    /// Transport or write error while streaming the asset
    #[error("failed to download {filename}")]
    DownloadFailed {
        filename: String,
        #[source]
        source: BoxError,
    },

    /// Archive unreadable or corrupt
    #[error("failed to read archive {}{}", .archive.display(), processed(.entries_processed))]
    ExtractFailed {
        archive: PathBuf,
        entries_processed: Option<usize>,
        #[source]
        source: BoxError,
    },

    /// Filesystem error while placing files at the target
    #[error(
        "failed to place {}{}{}",
        .path.display(),
        processed(.entries_processed),
        merge_note(.partial_merge)
    )]
    MaterializeFailed {
        path: PathBuf,
        entries_processed: Option<usize>,
        partial_merge: bool,
        #[source]
        source: std::io::Error,
    },

    /// Archive or staging directory could not be removed (non-fatal)
    #[error("failed to remove {}", .path.display())]
    CleanupFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ScaffoldError {
    /// Tracker step this failure is recorded against
    pub fn step(&self) -> &'static str {
        match self {
            ScaffoldError::FetchFailed { .. } | ScaffoldError::AssetNotFound { .. } => steps::FETCH,
            ScaffoldError::DownloadFailed { .. } => steps::DOWNLOAD,
            ScaffoldError::ExtractFailed { .. } | ScaffoldError::MaterializeFailed { .. } => {
                steps::EXTRACT
            }
            ScaffoldError::CleanupFailed { .. } => steps::CLEANUP,
        }
    }

    /// One-line message including every underlying cause
    pub fn detail(&self) -> String {
        let mut detail = self.to_string();
        let mut source = self.source();
        while let Some(cause) = source {
            detail.push_str(": ");
            detail.push_str(&cause.to_string());
            source = cause.source();
        }
        detail
    }
}

fn list_or_none(names: &[String]) -> String {
    if names.is_empty() {
        "none".to_string()
    } else {
        names.join(", ")
    }
}

fn merge_note(partial_merge: &bool) -> &'static str {
    if *partial_merge {
        "; merge is incomplete and the target directory was left partially updated"
    } else {
        ""
    }
}

fn processed(entries: &Option<usize>) -> String {
    match entries {
        Some(count) => format!(" after {} entries", count),
        None => String::new(),
    }
}
