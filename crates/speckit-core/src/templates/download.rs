//! Streaming download of a resolved release asset

use super::release::ReleaseAsset;
use crate::error::{BoxError, ScaffoldError};
use crate::pipeline::steps;
use crate::tracker::Tracker;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Report cadence when the response does not declare its length
const UNKNOWN_SIZE_REPORT_INTERVAL: u64 = 256 * 1024;

/// Streams asset bytes to local storage
#[derive(Debug, Clone)]
pub struct AssetDownloader {
    client: reqwest::Client,
}

impl AssetDownloader {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Download `asset` into `destination_dir`, returning the archive path.
    ///
    /// Progress is reported on the `download` step. A partially written file
    /// is removed before the error is returned.
    pub async fn download(
        &self,
        asset: &ReleaseAsset,
        destination_dir: &Path,
        tracker: &mut Tracker,
    ) -> Result<PathBuf, ScaffoldError> {
        let download_failed = |source: BoxError| ScaffoldError::DownloadFailed {
            filename: asset.filename.clone(),
            source,
        };

        // Asset names come from the feed; never let one escape the destination
        let filename = Path::new(&asset.filename)
            .file_name()
            .filter(|name| *name == asset.filename.as_str())
            .ok_or_else(|| download_failed("asset name is not a plain file name".into()))?;
        let archive_path = destination_dir.join(filename);

        tracker.start(steps::DOWNLOAD, Some(&asset.filename));

        match self.stream_to_file(asset, &archive_path, tracker).await {
            Ok(bytes) => {
                tracing::debug!(
                    file = %archive_path.display(),
                    bytes,
                    "downloaded release asset"
                );
                Ok(archive_path)
            }
            Err(source) => {
                if let Err(err) = fs::remove_file(&archive_path).await {
                    if err.kind() != std::io::ErrorKind::NotFound {
                        tracing::warn!(
                            file = %archive_path.display(),
                            error = %err,
                            "failed to remove partial download"
                        );
                    }
                }
                Err(download_failed(source))
            }
        }
    }

    async fn stream_to_file(
        &self,
        asset: &ReleaseAsset,
        archive_path: &Path,
        tracker: &mut Tracker,
    ) -> Result<u64, BoxError> {
        let mut response = self
            .client
            .get(&asset.download_url)
            .send()
            .await?
            .error_for_status()?;

        let mut progress = DownloadProgress::new(response.content_length());
        let mut file = fs::File::create(archive_path).await?;

        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            if let Some(detail) = progress.advance(chunk.len() as u64) {
                tracker.start(steps::DOWNLOAD, Some(&detail));
            }
        }
        file.flush().await?;

        Ok(progress.transferred())
    }
}

/// Byte counter that decides when a new progress line is worth reporting
#[derive(Debug, Clone)]
pub struct DownloadProgress {
    total: Option<u64>,
    transferred: u64,
    last_percent: Option<u64>,
    last_reported: u64,
}

impl DownloadProgress {
    /// A zero or missing total means the size is unknown
    pub fn new(total: Option<u64>) -> Self {
        Self {
            total: total.filter(|t| *t > 0),
            transferred: 0,
            last_percent: None,
            last_reported: 0,
        }
    }

    pub fn transferred(&self) -> u64 {
        self.transferred
    }

    /// Completed fraction, only when the total is known
    pub fn ratio(&self) -> Option<f64> {
        self.total
            .map(|total| (self.transferred as f64 / total as f64).min(1.0))
    }

    /// Count `bytes` more; returns a detail line when the visible progress changed
    pub fn advance(&mut self, bytes: u64) -> Option<String> {
        self.transferred += bytes;
        match self.total {
            Some(total) => {
                let percent = (self.transferred.min(total) * 100) / total;
                if self.last_percent == Some(percent) {
                    return None;
                }
                self.last_percent = Some(percent);
                Some(format!(
                    "{} / {} ({}%)",
                    format_size(self.transferred),
                    format_size(total),
                    percent
                ))
            }
            None => {
                if self.transferred - self.last_reported < UNKNOWN_SIZE_REPORT_INTERVAL
                    && self.last_reported != 0
                {
                    return None;
                }
                self.last_reported = self.transferred;
                Some(format!("{} downloaded", format_size(self.transferred)))
            }
        }
    }
}

/// Human-readable byte count (binary units)
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::StepStatus;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn asset(url: String, filename: &str) -> ReleaseAsset {
        ReleaseAsset {
            filename: filename.to_string(),
            size_bytes: 0,
            release_tag: "v1".to_string(),
            download_url: url,
        }
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KiB");
        assert_eq!(format_size(5 * 1024 * 1024 + 512 * 1024), "5.5 MiB");
    }

    #[test]
    fn test_progress_with_known_total_reports_percentage_changes() {
        let mut progress = DownloadProgress::new(Some(1000));
        assert_eq!(
            progress.advance(100).as_deref(),
            Some("100 B / 1000 B (10%)")
        );
        assert_eq!(progress.advance(1), None); // still 10%
        assert!(progress.advance(899).unwrap().ends_with("(100%)"));
        assert_eq!(progress.ratio(), Some(1.0));
        assert_eq!(progress.transferred(), 1000);
    }

    #[test]
    fn test_progress_without_total_has_no_ratio() {
        let mut progress = DownloadProgress::new(None);
        assert_eq!(progress.advance(10).as_deref(), Some("10 B downloaded"));
        assert_eq!(progress.advance(10), None);
        assert!(progress.advance(UNKNOWN_SIZE_REPORT_INTERVAL).is_some());
        assert_eq!(progress.ratio(), None);
    }

    #[test]
    fn test_zero_length_counts_as_unknown() {
        let progress = DownloadProgress::new(Some(0));
        assert_eq!(progress.ratio(), None);
    }

    #[tokio::test]
    async fn test_download_writes_archive() {
        let mock_server = MockServer::start().await;
        let body = vec![7u8; 300 * 1024];
        Mock::given(method("GET"))
            .and(path("/assets/tmpl-a.zip"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
            .mount(&mock_server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let mut tracker = Tracker::new("t");
        let downloader = AssetDownloader::new(reqwest::Client::new());
        let asset = asset(
            format!("{}/assets/tmpl-a.zip", mock_server.uri()),
            "tmpl-a.zip",
        );

        let archive = downloader
            .download(&asset, dir.path(), &mut tracker)
            .await
            .unwrap();

        assert_eq!(archive, dir.path().join("tmpl-a.zip"));
        assert_eq!(std::fs::read(&archive).unwrap(), body);
        let step = tracker.get(steps::DOWNLOAD).unwrap();
        assert_eq!(step.status, StepStatus::Running);
        assert!(step.detail.ends_with("(100%)"));
    }

    #[tokio::test]
    async fn test_failed_download_leaves_no_file() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/assets/tmpl-a.zip"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let mut tracker = Tracker::new("t");
        let downloader = AssetDownloader::new(reqwest::Client::new());
        let asset = asset(
            format!("{}/assets/tmpl-a.zip", mock_server.uri()),
            "tmpl-a.zip",
        );

        let err = downloader
            .download(&asset, dir.path(), &mut tracker)
            .await
            .unwrap_err();

        assert!(matches!(err, ScaffoldError::DownloadFailed { .. }));
        assert!(!dir.path().join("tmpl-a.zip").exists());
    }

    /// Serve one response that declares `declared` bytes, send `sent`, then hang up
    fn truncated_server(declared: usize, sent: usize) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/zip\r\nContent-Length: {}\r\n\r\n",
                declared
            );
            stream.write_all(head.as_bytes()).unwrap();
            stream.write_all(&vec![1u8; sent]).unwrap();
            stream.flush().unwrap();
        });
        format!("http://{}/assets/x.zip", addr)
    }

    #[tokio::test]
    async fn test_interrupted_stream_removes_partial_file() {
        let url = truncated_server(1_000_000, 64 * 1024);
        let dir = tempfile::tempdir().unwrap();
        let mut tracker = Tracker::new("t");
        let downloader = AssetDownloader::new(reqwest::Client::new());

        let err = downloader
            .download(&asset(url, "x.zip"), dir.path(), &mut tracker)
            .await
            .unwrap_err();

        assert!(matches!(err, ScaffoldError::DownloadFailed { .. }));
        assert!(!dir.path().join("x.zip").exists());
        let detail = &tracker.get(steps::DOWNLOAD).unwrap().detail;
        assert!(detail.ends_with("%)"), "unexpected detail {:?}", detail);
        assert!(!detail.ends_with("(100%)"));
    }

    #[tokio::test]
    async fn test_rejects_asset_names_with_paths() {
        let dir = tempfile::tempdir().unwrap();
        let mut tracker = Tracker::new("t");
        let downloader = AssetDownloader::new(reqwest::Client::new());
        let asset = asset("http://127.0.0.1:9/x".to_string(), "../escape.zip");

        let err = downloader
            .download(&asset, dir.path(), &mut tracker)
            .await
            .unwrap_err();
        assert!(matches!(err, ScaffoldError::DownloadFailed { .. }));
    }
}
