//! Template acquisition and placement
//!
//! This module provides:
//! - Release feed resolution (latest release, variant asset selection)
//! - Streaming asset download with byte-level progress
//! - Archive materialization into a new or existing directory

pub mod download;
pub mod extract;
pub mod release;

pub use download::{format_size, AssetDownloader, DownloadProgress};
pub use extract::{materialize, MaterializedProject, PlacementMode};
pub use release::{FeedAsset, Release, ReleaseAsset, ReleaseResolver};
