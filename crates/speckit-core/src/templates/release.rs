//! Release feed lookup: find the template asset for a variant in the latest release

use crate::error::ScaffoldError;
use crate::product::ProductConfig;
use anyhow::{Context, Result};
use serde::Deserialize;
use url::Url;

/// Latest release as described by the feed; unknown fields are ignored
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub assets: Vec<FeedAsset>,
}

/// One downloadable file attached to a release
#[derive(Debug, Clone, Deserialize)]
pub struct FeedAsset {
    pub name: String,
    #[serde(default)]
    pub size: u64,
    pub browser_download_url: String,
}

/// Resolved download target for one pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseAsset {
    pub filename: String,
    pub size_bytes: u64,
    pub release_tag: String,
    pub download_url: String,
}

/// Queries the release feed and picks the asset for a variant
#[derive(Debug, Clone)]
pub struct ReleaseResolver {
    client: reqwest::Client,
    feed_url: Url,
    asset_prefix: String,
    extension: String,
}

impl ReleaseResolver {
    pub fn new(
        client: reqwest::Client,
        feed_url: Url,
        asset_prefix: impl Into<String>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            client,
            feed_url,
            asset_prefix: asset_prefix.into(),
            extension: extension.into(),
        }
    }

    /// Create a resolver from a product config, honoring the feed URL override variable
    pub fn from_config<C: ProductConfig>(config: &C, client: reqwest::Client) -> Result<Self> {
        let feed_url = feed_url_from_config(config)?;
        Ok(Self::new(
            client,
            feed_url,
            config.asset_prefix(),
            config.archive_extension(),
        ))
    }

    pub fn feed_url(&self) -> &Url {
        &self.feed_url
    }

    /// Fetch the latest release and select the asset for `variant`
    pub async fn resolve(&self, variant: &str) -> Result<ReleaseAsset, ScaffoldError> {
        let release = self.fetch_latest().await?;
        tracing::debug!(
            release = %release.tag_name,
            assets = release.assets.len(),
            "fetched latest release"
        );
        self.select_asset(&release, variant)
    }

    async fn fetch_latest(&self) -> Result<Release, ScaffoldError> {
        let fetch_failed = |source| ScaffoldError::FetchFailed {
            url: self.feed_url.to_string(),
            source,
        };

        let response = self
            .client
            .get(self.feed_url.clone())
            .send()
            .await
            .map_err(fetch_failed)?
            .error_for_status()
            .map_err(fetch_failed)?;

        response.json::<Release>().await.map_err(fetch_failed)
    }

    /// Name pattern every asset of `variant` contains
    pub fn pattern(&self, variant: &str) -> String {
        format!("{}{}", self.asset_prefix, variant)
    }

    /// First asset in listed order whose name contains the variant pattern and
    /// ends with the archive extension
    pub fn select_asset(
        &self,
        release: &Release,
        variant: &str,
    ) -> Result<ReleaseAsset, ScaffoldError> {
        let pattern = self.pattern(variant);
        release
            .assets
            .iter()
            .find(|asset| asset.name.contains(&pattern) && asset.name.ends_with(&self.extension))
            .map(|asset| ReleaseAsset {
                filename: asset.name.clone(),
                size_bytes: asset.size,
                release_tag: release.tag_name.clone(),
                download_url: asset.browser_download_url.clone(),
            })
            .ok_or_else(|| ScaffoldError::AssetNotFound {
                variant: variant.to_string(),
                release: release.tag_name.clone(),
                available: release.assets.iter().map(|a| a.name.clone()).collect(),
            })
    }
}

/// Feed URL from the override variable, falling back to the product default
pub fn feed_url_from_config<C: ProductConfig>(config: &C) -> Result<Url> {
    let url_str = std::env::var(config.release_url_env())
        .unwrap_or_else(|_| config.default_release_url().to_string());
    Url::parse(&url_str).with_context(|| format!("Invalid release feed URL: {}", url_str))
}
