//! Local environment checks
//!
//! This module provides:
//! - Companion tool detection for variants that need a CLI on PATH
//! - Git repository detection and initialization

pub mod git;
pub mod tool;

pub use git::{init_repo, is_git_repo};
pub use tool::{git_tool, ToolConfig, ToolManager};
