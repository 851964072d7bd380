//! Collaborators that move files in and out of the renderer: input
//! downloads, WMS tiles and frame uploads.

use std::path::{Path, PathBuf};
use std::time::Duration;

use frame_common::metadata::safe_filename;
use frame_common::{FrameError, FrameResult};
use reqwest::blocking::Client;
use tiny_skia::Pixmap;
use tracing::{debug, info};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Copies an input file from its URI to a local path.
pub trait InputFetcher {
    /// # Arguments
    /// * `uri` - Where the input lives (`file://`, plain path or `http(s)://`)
    /// * `destination` - Local file to create; its directory already exists
    fn fetch(&self, uri: &str, destination: &Path) -> FrameResult<()>;
}

/// Fetches a decoded image tile, e.g. a WMS GetMap response.
pub trait TileFetcher {
    fn fetch_tile(&self, url: &str) -> FrameResult<Pixmap>;
}

/// Publishes a rendered frame file.
pub trait FrameUploader {
    /// # Arguments
    /// * `file` - The rendered frame on disk
    /// * `key` - Destination key, relative to the uploader root
    fn upload(&self, file: &Path, key: &str) -> FrameResult<()>;
}

fn download_error(uri: &str, message: impl ToString) -> FrameError {
    FrameError::Download {
        uri: uri.to_string(),
        message: message.to_string(),
    }
}

fn is_http(uri: &str) -> bool {
    uri.starts_with("http://") || uri.starts_with("https://")
}

/// Local path behind a `file://` URI or a plain path.
pub fn local_path(uri: &str) -> PathBuf {
    PathBuf::from(uri.strip_prefix("file://").unwrap_or(uri))
}

/// Reads `file://` URIs and plain paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFetcher;

impl InputFetcher for LocalFetcher {
    fn fetch(&self, uri: &str, destination: &Path) -> FrameResult<()> {
        let source = local_path(uri);
        std::fs::copy(&source, destination).map_err(|e| download_error(uri, e))?;
        debug!(source = %source.display(), destination = %destination.display(), "Copied input");
        Ok(())
    }
}

impl TileFetcher for LocalFetcher {
    fn fetch_tile(&self, url: &str) -> FrameResult<Pixmap> {
        let bytes = std::fs::read(local_path(url)).map_err(|e| download_error(url, e))?;
        decode_tile(url, &bytes)
    }
}

/// Blocking HTTP client for inputs and tiles.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> FrameResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| FrameError::Config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    fn get(&self, url: &str) -> FrameResult<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| download_error(url, e))?;
        let bytes = response.bytes().map_err(|e| download_error(url, e))?;
        Ok(bytes.to_vec())
    }
}

impl InputFetcher for HttpFetcher {
    fn fetch(&self, uri: &str, destination: &Path) -> FrameResult<()> {
        let bytes = self.get(uri)?;

        // A failed write never leaves a truncated input at `destination`.
        let partial = destination.with_extension("partial");
        std::fs::write(&partial, &bytes).map_err(|e| download_error(uri, e))?;
        std::fs::rename(&partial, destination).map_err(|e| download_error(uri, e))?;

        info!(uri = %uri, bytes = bytes.len(), "Downloaded input");
        Ok(())
    }
}

impl TileFetcher for HttpFetcher {
    fn fetch_tile(&self, url: &str) -> FrameResult<Pixmap> {
        let bytes = self.get(url)?;
        decode_tile(url, &bytes)
    }
}

fn decode_tile(url: &str, bytes: &[u8]) -> FrameResult<Pixmap> {
    let image = image::load_from_memory(bytes).map_err(|e| download_error(url, e))?;
    renderer::text::rgba_to_pixmap(&image.to_rgba8())
        .ok_or_else(|| download_error(url, "empty image"))
}

/// Dispatches on the URI scheme: HTTP(S) goes over the network, anything
/// else is read from disk.
#[derive(Debug, Clone)]
pub struct SchemeFetcher {
    http: HttpFetcher,
}

impl SchemeFetcher {
    pub fn new() -> FrameResult<Self> {
        Ok(Self {
            http: HttpFetcher::new()?,
        })
    }
}

impl InputFetcher for SchemeFetcher {
    fn fetch(&self, uri: &str, destination: &Path) -> FrameResult<()> {
        if is_http(uri) {
            self.http.fetch(uri, destination)
        } else {
            LocalFetcher.fetch(uri, destination)
        }
    }
}

/// Fetch `uri` into `directory` unless a copy is already there.
///
/// Local paths are returned as they are without copying.
pub fn fetch_to_directory(
    fetcher: &dyn InputFetcher,
    uri: &str,
    directory: &Path,
) -> FrameResult<PathBuf> {
    if !is_http(uri) {
        return Ok(local_path(uri));
    }

    let name = uri
        .rsplit('/')
        .next()
        .filter(|tail| !tail.is_empty())
        .unwrap_or(uri);
    let destination = directory.join(safe_filename(name));
    if destination.is_file() {
        return Ok(destination);
    }

    std::fs::create_dir_all(directory)?;
    fetcher.fetch(uri, &destination)?;
    Ok(destination)
}

/// Copies uploaded frames under a root directory.
#[derive(Debug, Clone)]
pub struct DirectoryUploader {
    root: PathBuf,
}

impl DirectoryUploader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl FrameUploader for DirectoryUploader {
    fn upload(&self, file: &Path, key: &str) -> FrameResult<()> {
        let destination = self.root.join(key);
        if let Some(parent) = destination.parent() {
            std::fs::create_dir_all(parent).map_err(|e| FrameError::Upload(e.to_string()))?;
        }
        std::fs::copy(file, &destination).map_err(|e| FrameError::Upload(e.to_string()))?;
        info!(key = %key, "Uploaded frame");
        Ok(())
    }
}
