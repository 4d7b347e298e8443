//! Product configuration trait for CLI binaries
//!
//! This trait defines the interface that each product must implement to
//! configure where templates are released, which variants exist, and what
//! the user is told once a project has been materialized.

use crate::locale::Locale;
use crate::runtime::tool::ToolConfig;
use std::path::Path;

/// A packaged template flavor that can be requested by key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Variant {
    /// Identifier used on the command line and in asset names (e.g., "claude")
    pub key: &'static str,
    /// Human-readable name shown in menus
    pub display_name: &'static str,
    /// Companion tool the variant is pre-configured for, if it needs one on PATH
    pub tool: Option<ToolConfig>,
}

/// Configuration trait for different CLI products
///
/// Each product implements this trait to define:
/// - Product identity (name, display name)
/// - Release feed location and asset naming
/// - The known variant set
/// - Post-setup instructions
pub trait ProductConfig: Clone + Send + Sync + 'static {
    /// Internal product name (used for CLI command, env vars)
    fn name(&self) -> &'static str;

    /// Human-readable display name
    fn display_name(&self) -> &'static str;

    /// Default URL of the "latest release" feed
    fn default_release_url(&self) -> &'static str;

    /// Environment variable name for overriding the release feed URL
    fn release_url_env(&self) -> &'static str;

    /// Prefix shared by every template asset; the variant key is appended to it
    fn asset_prefix(&self) -> &'static str;

    /// Extension every template asset ends with
    fn archive_extension(&self) -> &'static str {
        ".zip"
    }

    /// All variants a user may request
    fn variants(&self) -> &'static [Variant];

    /// Variant preselected in interactive menus and used with `--yes`
    fn default_variant(&self) -> &'static str;

    /// Message for the initial commit when a repository is initialized
    fn commit_message(&self) -> &'static str;

    /// Environment variable that selects the display language
    fn locale_env(&self) -> &'static str;

    /// Display language from the override variable or the system locale
    fn locale(&self) -> Locale {
        Locale::from_env(self.locale_env())
    }

    /// Generate the "next steps" instructions after project creation
    fn next_steps(
        &self,
        dir: &Path,
        variant: &Variant,
        here: bool,
        locale: Locale,
    ) -> Vec<String>;

    /// CLI description shown in help text
    fn cli_description(&self) -> &'static str;

    /// User agent string for HTTP requests
    fn user_agent(&self) -> &'static str {
        self.name()
    }

    /// Look up a variant by key
    fn find_variant(&self, key: &str) -> Option<&'static Variant> {
        self.variants().iter().find(|v| v.key == key)
    }

    /// Comma-separated variant keys, for error messages
    fn variant_keys(&self) -> String {
        self.variants()
            .iter()
            .map(|v| v.key)
            .collect::<Vec<_>>()
            .join(", ")
    }
}
