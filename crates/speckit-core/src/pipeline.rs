//! Pipeline orchestration: resolve, download, materialize, clean up
//!
//! The [`Pipeline`] drives the three stages strictly in order and threads a
//! [`Tracker`] through them. Cleanup of the downloaded archive always runs.
//! On failure the failing step is marked `error`, a freshly created target is
//! rolled back, and the classified error is returned to the caller.

use crate::error::ScaffoldError;
use crate::product::ProductConfig;
use crate::templates::{
    materialize, AssetDownloader, MaterializedProject, PlacementMode, ReleaseResolver,
};
use crate::tracker::Tracker;
use anyhow::Result;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use thiserror::Error;
use tokio::fs;

/// Timeout for establishing a connection to the feed or asset host
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for each read from an open connection
const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Tracker step keys used by the pipeline, in display order
pub mod steps {
    pub const FETCH: &str = "fetch";
    pub const DOWNLOAD: &str = "download";
    pub const ZIP_LIST: &str = "zip-list";
    pub const EXTRACT: &str = "extract";
    pub const FLATTEN: &str = "flatten";
    pub const CLEANUP: &str = "cleanup";

    /// Keys with their labels
    pub const ALL: &[(&str, &str)] = &[
        (FETCH, "Fetch latest release"),
        (DOWNLOAD, "Download template"),
        (ZIP_LIST, "Archive contents"),
        (EXTRACT, "Extract template"),
        (FLATTEN, "Flatten nested directory"),
        (CLEANUP, "Remove temporary archive"),
    ];
}

/// What happened to the target directory after a failed run
#[derive(Debug)]
pub enum Rollback {
    /// The run never created the target, so there was nothing to undo
    NotNeeded,
    /// The freshly created target was deleted, along with any parents created
    /// for it; holds the outermost removed directory
    Removed(PathBuf),
    /// Merge mode: the pre-existing target was deliberately left in place
    Preserved(PathBuf),
    /// Deleting the freshly created target failed
    Failed { path: PathBuf, error: io::Error },
}

impl fmt::Display for Rollback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rollback::NotNeeded => Ok(()),
            Rollback::Removed(path) => {
                write!(f, "; removed partially created {}", path.display())
            }
            Rollback::Preserved(path) => write!(
                f,
                "; no rollback attempted, existing directory {} was left as is",
                path.display()
            ),
            Rollback::Failed { path, error } => write!(
                f,
                "; failed to remove partially created {}: {}",
                path.display(),
                error
            ),
        }
    }
}

/// A failed run: the primary error plus what was done about it
#[derive(Debug, Error)]
#[error("{source}{rollback}")]
pub struct PipelineError {
    #[source]
    pub source: ScaffoldError,
    pub rollback: Rollback,
    /// Non-fatal cleanup failures; never replace `source`
    pub cleanup_errors: Vec<ScaffoldError>,
}

/// Per-run transient state, released by the cleanup phase
#[derive(Default)]
struct RunState {
    download_dir: Option<TempDir>,
    archive: Option<PathBuf>,
    /// Directories this run created for the target, outermost first, target last
    created_dirs: Vec<PathBuf>,
}

/// Build the HTTP client shared by the resolver and the downloader
pub fn http_client(user_agent: &str) -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .connect_timeout(CONNECT_TIMEOUT)
        .read_timeout(READ_TIMEOUT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Resolve → download → materialize, with cleanup and rollback
#[derive(Debug, Clone)]
pub struct Pipeline {
    resolver: ReleaseResolver,
    downloader: AssetDownloader,
    /// Where archives are downloaded; a per-run temporary directory when unset
    download_dir: Option<PathBuf>,
}

impl Pipeline {
    pub fn new(resolver: ReleaseResolver, downloader: AssetDownloader) -> Self {
        Self {
            resolver,
            downloader,
            download_dir: None,
        }
    }

    /// Create a pipeline from a product config
    pub fn from_config<C: ProductConfig>(config: &C) -> Result<Self> {
        let client = http_client(config.user_agent());
        let resolver = ReleaseResolver::from_config(config, client.clone())?;
        Ok(Self::new(resolver, AssetDownloader::new(client)))
    }

    /// Download archives into `dir` instead of a temporary directory
    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = Some(dir.into());
        self
    }

    pub fn resolver(&self) -> &ReleaseResolver {
        &self.resolver
    }

    /// Register every pipeline step as pending, in display order
    pub fn register_steps(tracker: &mut Tracker) {
        for (key, label) in steps::ALL {
            tracker.add(key, label);
        }
    }

    /// Materialize the latest template for `variant` at `target`.
    ///
    /// In [`PlacementMode::NewDirectory`] the target must not exist yet; it is
    /// created here and removed again if any later stage fails.
    pub async fn run(
        &self,
        variant: &str,
        target: &Path,
        mode: PlacementMode,
        tracker: &mut Tracker,
    ) -> Result<MaterializedProject, PipelineError> {
        let target = std::path::absolute(target).unwrap_or_else(|_| target.to_path_buf());
        let mut state = RunState::default();

        match self.execute(variant, &target, mode, tracker, &mut state).await {
            Ok(mut project) => {
                let staged = std::mem::take(&mut project.cleanup_errors);
                project.cleanup_errors = self.cleanup(state, tracker, true, staged).await;
                tracing::debug!(path = %project.path.display(), "project materialized");
                Ok(project)
            }
            Err(source) => {
                tracker.error(source.step(), Some(&source.detail()));
                let created_dirs = std::mem::take(&mut state.created_dirs);
                let cleanup_errors = self.cleanup(state, tracker, false, Vec::new()).await;
                let rollback = roll_back(&target, mode, &created_dirs).await;
                tracing::debug!(error = %source, rollback = %rollback, "pipeline failed");
                Err(PipelineError {
                    source,
                    rollback,
                    cleanup_errors,
                })
            }
        }
    }

    async fn execute(
        &self,
        variant: &str,
        target: &Path,
        mode: PlacementMode,
        tracker: &mut Tracker,
        state: &mut RunState,
    ) -> Result<MaterializedProject, ScaffoldError> {
        tracker.start(steps::FETCH, Some("contacting release feed"));
        let asset = self.resolver.resolve(variant).await?;
        tracker.complete(
            steps::FETCH,
            Some(&format!(
                "release {} ({} bytes)",
                asset.release_tag,
                format_thousands(asset.size_bytes)
            )),
        );

        let download_dir = match &self.download_dir {
            Some(dir) => dir.clone(),
            None => {
                let dir = tempfile::Builder::new()
                    .prefix("specify-download-")
                    .tempdir()
                    .map_err(|e| ScaffoldError::DownloadFailed {
                        filename: asset.filename.clone(),
                        source: e.into(),
                    })?;
                let path = dir.path().to_path_buf();
                state.download_dir = Some(dir);
                path
            }
        };

        let archive = self
            .downloader
            .download(&asset, &download_dir, tracker)
            .await?;
        state.archive = Some(archive.clone());
        tracker.complete(steps::DOWNLOAD, Some(&asset.filename));

        tracker.start(steps::EXTRACT, None);
        if mode == PlacementMode::NewDirectory {
            state.created_dirs = create_target(target)?;
        }
        let project = materialize(&archive, target, mode, tracker)?;
        tracker.complete(steps::EXTRACT, None);

        Ok(project)
    }

    /// Remove the archive and the temporary download directory.
    ///
    /// `earlier` holds cleanup failures already hit while materializing; they
    /// count towards the step outcome like our own. A failed run records the
    /// step as skipped so the failing step stays the only error in the tree.
    async fn cleanup(
        &self,
        state: RunState,
        tracker: &mut Tracker,
        succeeded: bool,
        earlier: Vec<ScaffoldError>,
    ) -> Vec<ScaffoldError> {
        let mut errors = earlier;
        let reported = errors.len();
        let mut removed = None;

        if let Some(archive) = &state.archive {
            match fs::remove_file(archive).await {
                Ok(()) => {
                    removed = archive
                        .file_name()
                        .map(|name| name.to_string_lossy().to_string());
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(source) => errors.push(ScaffoldError::CleanupFailed {
                    path: archive.clone(),
                    source,
                }),
            }
        }

        if let Some(dir) = state.download_dir {
            let path = dir.path().to_path_buf();
            if let Err(source) = dir.close() {
                errors.push(ScaffoldError::CleanupFailed { path, source });
            }
        }

        for err in &errors[reported..] {
            tracing::warn!(error = %err.detail(), "cleanup failed");
        }

        let detail = match (&removed, errors.as_slice()) {
            (_, [only]) => only.detail(),
            (_, [first, rest @ ..]) => format!("{} (and {} more)", first.detail(), rest.len()),
            (Some(name), []) => format!("removed {}", name),
            (None, []) => "nothing to remove".to_string(),
        };
        match (succeeded, errors.is_empty()) {
            (true, true) => tracker.complete(steps::CLEANUP, Some(&detail)),
            (true, false) => tracker.error(steps::CLEANUP, Some(&detail)),
            (false, _) => tracker.skip(steps::CLEANUP, Some(&detail)),
        }

        errors
    }
}

/// Create the target for a new project; the target itself must not exist yet.
///
/// Returns every directory created on the way, outermost first, so a rollback
/// can remove missing parents as well as the target.
fn create_target(target: &Path) -> Result<Vec<PathBuf>, ScaffoldError> {
    let failed = |path: &Path, source| ScaffoldError::MaterializeFailed {
        path: path.to_path_buf(),
        entries_processed: None,
        partial_merge: false,
        source,
    };

    let mut created: Vec<PathBuf> = target
        .ancestors()
        .skip(1)
        .take_while(|dir| !dir.as_os_str().is_empty() && !dir.exists())
        .map(Path::to_path_buf)
        .collect();
    created.reverse();

    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent).map_err(|e| failed(parent, e))?;
    }
    if let Err(e) = std::fs::create_dir(target) {
        remove_empty_dirs(&created);
        return Err(failed(target, e));
    }
    created.push(target.to_path_buf());
    Ok(created)
}

/// Remove directories innermost first, stopping at the first one that is not empty.
/// Returns the outermost directory removed.
fn remove_empty_dirs(dirs: &[PathBuf]) -> Option<&Path> {
    let mut removed = None;
    for dir in dirs.iter().rev() {
        if let Err(e) = std::fs::remove_dir(dir) {
            tracing::debug!(dir = %dir.display(), error = %e, "left created directory in place");
            break;
        }
        removed = Some(dir.as_path());
    }
    removed
}

async fn roll_back(target: &Path, mode: PlacementMode, created_dirs: &[PathBuf]) -> Rollback {
    if mode == PlacementMode::MergeIntoExisting {
        return Rollback::Preserved(target.to_path_buf());
    }
    let Some((_, parents)) = created_dirs.split_last() else {
        return Rollback::NotNeeded;
    };

    if let Err(error) = fs::remove_dir_all(target).await {
        return Rollback::Failed {
            path: target.to_path_buf(),
            error,
        };
    }
    let outermost = remove_empty_dirs(parents).unwrap_or(target);
    Rollback::Removed(outermost.to_path_buf())
}

/// Format an integer with comma thousands separators
pub fn format_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::StepStatus;

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1000), "1,000");
        assert_eq!(format_thousands(1234567), "1,234,567");
    }

    #[test]
    fn test_register_steps_in_order() {
        let mut tracker = Tracker::new("t");
        Pipeline::register_steps(&mut tracker);
        Pipeline::register_steps(&mut tracker);
        let keys: Vec<_> = tracker.steps().iter().map(|s| s.key.as_str()).collect();
        assert_eq!(
            keys,
            vec!["fetch", "download", "zip-list", "extract", "flatten", "cleanup"]
        );
    }

    #[test]
    fn test_merge_rollback_message_is_explicit() {
        let rollback = Rollback::Preserved(PathBuf::from("/work/here"));
        assert!(rollback
            .to_string()
            .contains("no rollback attempted, existing directory /work/here"));
        assert_eq!(Rollback::NotNeeded.to_string(), "");
    }

    #[tokio::test]
    async fn test_roll_back_removes_created_target_only() {
        let work = tempfile::tempdir().unwrap();
        let target = work.path().join("project");
        std::fs::create_dir(&target).unwrap();

        let rollback = roll_back(&target, PlacementMode::NewDirectory, &[]).await;
        assert!(matches!(rollback, Rollback::NotNeeded));
        assert!(target.exists());

        let created = vec![target.clone()];
        let rollback = roll_back(&target, PlacementMode::MergeIntoExisting, &created).await;
        assert!(matches!(rollback, Rollback::Preserved(_)));
        assert!(target.exists());

        let rollback = roll_back(&target, PlacementMode::NewDirectory, &created).await;
        assert!(matches!(rollback, Rollback::Removed(ref path) if path == &target));
        assert!(!target.exists());
        assert!(work.path().exists());
    }

    #[tokio::test]
    async fn test_roll_back_removes_parents_created_for_target() {
        let work = tempfile::tempdir().unwrap();
        let target = work.path().join("a").join("b").join("project");

        let created = create_target(&target).unwrap();
        assert_eq!(
            created,
            vec![
                work.path().join("a"),
                work.path().join("a").join("b"),
                target.clone()
            ]
        );
        std::fs::write(target.join("partial.md"), "x").unwrap();

        let rollback = roll_back(&target, PlacementMode::NewDirectory, &created).await;
        assert!(matches!(rollback, Rollback::Removed(ref path) if path == &work.path().join("a")));
        assert!(!work.path().join("a").exists());
        assert!(work.path().exists());
    }

    #[tokio::test]
    async fn test_roll_back_keeps_parents_that_gained_other_content() {
        let work = tempfile::tempdir().unwrap();
        let target = work.path().join("a").join("project");

        let created = create_target(&target).unwrap();
        std::fs::write(work.path().join("a").join("other.md"), "x").unwrap();

        let rollback = roll_back(&target, PlacementMode::NewDirectory, &created).await;
        assert!(matches!(rollback, Rollback::Removed(ref path) if path == &target));
        assert!(!target.exists());
        assert!(work.path().join("a").join("other.md").exists());
    }

    #[test]
    fn test_create_target_refuses_existing_directory() {
        let work = tempfile::tempdir().unwrap();
        let err = create_target(work.path()).unwrap_err();
        assert!(matches!(err, ScaffoldError::MaterializeFailed { .. }));

        let nested = work.path().join("a").join("b");
        let created = create_target(&nested).unwrap();
        assert!(nested.is_dir());
        assert_eq!(created.last(), Some(&nested));
    }

    fn offline_pipeline() -> Pipeline {
        let client = reqwest::Client::new();
        let feed = url::Url::parse("http://127.0.0.1:9/releases/latest").unwrap();
        Pipeline::new(
            ReleaseResolver::new(client.clone(), feed, "tmpl-", ".zip"),
            AssetDownloader::new(client),
        )
    }

    #[tokio::test]
    async fn test_cleanup_reports_failures_from_materializing() {
        let work = tempfile::tempdir().unwrap();
        let archive = work.path().join("tmpl-a.zip");
        std::fs::write(&archive, "zip").unwrap();
        let state = RunState {
            archive: Some(archive.clone()),
            ..RunState::default()
        };
        let staging_error = ScaffoldError::CleanupFailed {
            path: PathBuf::from("/tmp/.specify-staging-x"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        let mut tracker = Tracker::new("t");

        let errors = offline_pipeline()
            .cleanup(state, &mut tracker, true, vec![staging_error])
            .await;

        assert_eq!(errors.len(), 1);
        assert!(!archive.exists());
        let step = tracker.get(steps::CLEANUP).unwrap();
        assert_eq!(step.status, StepStatus::Error);
        assert!(step.detail.contains(".specify-staging-x"));
    }

    #[tokio::test]
    async fn test_cleanup_after_success_without_failures_is_done() {
        let work = tempfile::tempdir().unwrap();
        let archive = work.path().join("tmpl-a.zip");
        std::fs::write(&archive, "zip").unwrap();
        let state = RunState {
            archive: Some(archive),
            ..RunState::default()
        };
        let mut tracker = Tracker::new("t");

        let errors = offline_pipeline()
            .cleanup(state, &mut tracker, true, Vec::new())
            .await;

        assert!(errors.is_empty());
        let step = tracker.get(steps::CLEANUP).unwrap();
        assert_eq!(step.status, StepStatus::Done);
        assert_eq!(step.detail, "removed tmpl-a.zip");
    }
}
