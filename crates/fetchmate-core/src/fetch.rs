//! The fetch-link workflow: a URL in, metadata or a saved file out.
//!
//! One POST to the downloader endpoint yields one of three response shapes
//! (binary media, JSON metadata, error), classified by declared content
//! type. Picking a format afterwards issues a second authenticated GET that
//! streams the bytes to disk.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures_util::StreamExt;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;

use crate::api::ApiClient;
use crate::error::ApiError;

pub const FETCH_PATH: &str = "/downloader/fetch/";

/// Guidance shown when the backend reports it needs fresh site cookies.
///
/// Keyed off backend error wording ("cookies", "login") — a best-effort
/// heuristic, not a stable error-code contract.
pub const COOKIES_GUIDANCE: &str = "The server needs updated login cookies for this site. \
     Ask the operator to refresh the backend's authentication cookies, then try again.";

const GENERIC_FAILURE: &str = "Network error";
const MALFORMED_METADATA: &str = "Unexpected response from server";

/// One downloadable rendition offered by the backend.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FormatOption {
    pub url: String,
    #[serde(default)]
    pub ext: String,
    #[serde(default)]
    pub resolution: Option<String>,
}

impl FormatOption {
    /// Label in the dashboard's chip style: `EXT • resolution-or-Audio`.
    pub fn label(&self) -> String {
        let ext = if self.ext.is_empty() {
            "?".to_string()
        } else {
            self.ext.to_uppercase()
        };
        match &self.resolution {
            Some(resolution) => format!("{ext} • {resolution}"),
            None => format!("{ext} • Audio"),
        }
    }
}

/// Parsed metadata for a fetched link.
#[derive(Debug, Clone, Deserialize)]
pub struct LinkMetadata {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub format_label: Option<String>,
    // Required: a JSON body without `formats` is not metadata.
    pub formats: Vec<FormatOption>,
}

impl LinkMetadata {
    /// Default selection: the first offered format, when any.
    pub fn default_selection(&self) -> Option<&FormatOption> {
        self.formats.first()
    }

    /// The audio-only path the backend labels `AUTO`, which enables the
    /// convert-to-mp3 action.
    pub fn is_audio_auto(&self) -> bool {
        self.format_label.as_deref() == Some("AUTO")
    }
}

/// Result of one fetch request. Produced once per request, never persisted.
#[derive(Debug)]
pub enum FetchOutcome {
    /// The backend streamed the media straight back.
    BinaryFile {
        bytes: Bytes,
        mime: String,
        suggested_name: String,
    },
    /// The backend returned format metadata for the user to pick from.
    Metadata(LinkMetadata),
    /// Anything else, flattened to a displayable message.
    Failure { message: String },
}

/// Issues the fetch POST and classifies the response.
///
/// Only `AuthExpired` escapes as an error (it is handled globally); every
/// other failure is folded into [`FetchOutcome::Failure`].
pub async fn fetch_link(
    api: &ApiClient,
    url: &str,
    convert_mp3: bool,
) -> Result<FetchOutcome, ApiError> {
    let url = url.trim();
    if url.is_empty() {
        return Ok(FetchOutcome::Failure {
            message: "URL is required".to_string(),
        });
    }

    let body = serde_json::json!({ "url": url, "convert_mp3": convert_mp3 });
    let response = match api.post_json(FETCH_PATH, &body).await {
        Ok(response) => response,
        Err(ApiError::AuthExpired) => return Err(ApiError::AuthExpired),
        Err(e) => {
            tracing::debug!("fetch request failed: {e}");
            return Ok(FetchOutcome::Failure {
                message: GENERIC_FAILURE.to_string(),
            });
        }
    };

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let status = response.status();
    let bytes = match response.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!("failed to read fetch response body: {e}");
            return Ok(FetchOutcome::Failure {
                message: GENERIC_FAILURE.to_string(),
            });
        }
    };

    if !status.is_success() {
        return Ok(FetchOutcome::Failure {
            message: classify_error_body(&bytes),
        });
    }

    if content_type.starts_with("audio/") {
        return Ok(FetchOutcome::BinaryFile {
            bytes,
            mime: content_type,
            suggested_name: "audio.mp3".to_string(),
        });
    }

    if is_archive(&content_type) {
        return Ok(FetchOutcome::BinaryFile {
            bytes,
            mime: content_type,
            suggested_name: "playlist.zip".to_string(),
        });
    }

    if content_type.starts_with("application/json") {
        return Ok(match serde_json::from_slice::<LinkMetadata>(&bytes) {
            Ok(metadata) => FetchOutcome::Metadata(metadata),
            Err(e) => {
                tracing::debug!("metadata body missing required fields: {e}");
                FetchOutcome::Failure {
                    message: MALFORMED_METADATA.to_string(),
                }
            }
        });
    }

    tracing::debug!("unhandled fetch content type: {content_type:?}");
    Ok(FetchOutcome::Failure {
        message: ApiError::UnexpectedContentType(content_type).to_string(),
    })
}

/// Downloads a selected format into `dir`, naming the file from the
/// sanitized `title` plus the format's extension.
///
/// Failures here are download failures, reported separately from fetch
/// failures by the caller.
pub async fn download_format(
    api: &ApiClient,
    format: &FormatOption,
    title: &str,
    dir: &Path,
) -> Result<PathBuf, ApiError> {
    let response = api.get_url(&format.url).await?;

    let status = response.status();
    if !status.is_success() {
        return Err(ApiError::Validation {
            status,
            message: format!("Download failed (HTTP {status})"),
        });
    }

    let path = dir.join(download_file_name(title, &format.ext));
    let mut file = tokio::fs::File::create(&path)
        .await
        .map_err(|e| ApiError::Validation {
            status,
            message: format!("Cannot create {}: {e}", path.display()),
        })?;

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(ApiError::Network)?;
        file.write_all(&chunk)
            .await
            .map_err(|e| ApiError::Validation {
                status,
                message: format!("Cannot write {}: {e}", path.display()),
            })?;
    }
    file.flush().await.map_err(|e| ApiError::Validation {
        status,
        message: format!("Cannot write {}: {e}", path.display()),
    })?;

    Ok(path)
}

/// Writes a directly-returned binary payload under its suggested name.
pub async fn save_binary(dir: &Path, suggested_name: &str, bytes: &[u8]) -> anyhow::Result<PathBuf> {
    use anyhow::Context;

    let path = dir.join(suggested_name);
    tokio::fs::write(&path, bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// Builds `<sanitized title>.<ext>`, falling back when either side is empty.
fn download_file_name(title: &str, ext: &str) -> String {
    let stem = sanitize_filename(title);
    let stem = if stem.is_empty() { "download" } else { stem.as_str() };
    let ext = if ext.is_empty() { "bin" } else { ext };
    format!("{stem}.{ext}")
}

/// Strips characters illegal in filenames: `\ / * ? : " < > |`.
///
/// Same character class the backend applies server-side.
pub fn sanitize_filename(name: &str) -> String {
    const ILLEGAL: &[char] = &['\\', '/', '*', '?', ':', '"', '<', '>', '|'];
    name.chars()
        .filter(|c| !ILLEGAL.contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Flattens an error body (possibly binary) into a displayable message.
fn classify_error_body(bytes: &[u8]) -> String {
    // Error bodies may arrive as binary; decode to text first.
    let text = String::from_utf8_lossy(bytes);

    let message = serde_json::from_str::<serde_json::Value>(&text)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| text.trim().to_string());

    if message.is_empty() {
        return GENERIC_FAILURE.to_string();
    }

    let lowered = message.to_lowercase();
    if lowered.contains("cookies") || lowered.contains("login") {
        return COOKIES_GUIDANCE.to_string();
    }

    message
}

fn is_archive(content_type: &str) -> bool {
    content_type.starts_with("application/zip")
        || content_type.starts_with("application/x-zip-compressed")
}
