//! Spec Kit Core - Shared library for project bootstrapping CLIs
//!
//! This library materializes a project directory from the latest released
//! template archive. It is driven by a [`ProductConfig`] so a binary only has
//! to describe where templates are published and which variants exist.
//!
//! # Architecture
//!
//! The library is organized into layers:
//!
//! - **Layer 1: Core Operations** - Release resolution, streaming download, archive materialization
//! - **Layer 2: Workflow Orchestration** - [`Pipeline`] with cleanup and rollback, reporting to a [`Tracker`]
//! - **Layer 3: CLI/TUI Interface** - Optional cliclack-based prompts (feature-gated)
//!
//! # Feature Flags
//!
//! - `tui` (default): Enables the cliclack-based `init` and `check` flows
//!
//! # Example Usage (without TUI)
//!
//! ```ignore
//! use speckit_core::{Pipeline, PlacementMode, Tracker};
//!
//! let pipeline = Pipeline::from_config(&MyConfig)?;
//! let mut tracker = Tracker::new("Initialize project");
//! Pipeline::register_steps(&mut tracker);
//!
//! let project = pipeline
//!     .run("claude", Path::new("my-project"), PlacementMode::NewDirectory, &mut tracker)
//!     .await?;
//! println!("{}", tracker.render());
//! ```

pub mod error;
pub mod locale;
pub mod pipeline;
pub mod product;
pub mod runtime;
pub mod templates;
pub mod tracker;

#[cfg(feature = "tui")]
pub mod tui;

// Re-export main types for convenience
pub use error::ScaffoldError;
pub use locale::Locale;
pub use pipeline::{Pipeline, PipelineError, Rollback};
pub use product::{ProductConfig, Variant};
pub use runtime::{ToolConfig, ToolManager};
pub use templates::{
    materialize, AssetDownloader, MaterializedProject, PlacementMode, ReleaseAsset,
    ReleaseResolver,
};
pub use tracker::{StepStatus, Tracker};

#[cfg(feature = "tui")]
pub use tui::{run_check, run_init, InitArgs};
