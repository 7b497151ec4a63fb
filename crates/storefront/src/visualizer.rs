//! Room visualizer client.
//!
//! Sends a photo of the shopper's room and a photo of a furniture item to an
//! image-composition service and returns the composited image. Images travel
//! as data URIs (`data:<mime>;base64,<data>`).
//!
//! A single request per call; failures are returned to the caller as-is.

use std::fmt;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

/// Instruction sent alongside the two photos.
pub const PROMPT_PREFIX: &str =
    "Generate an image of this room with the following furniture item placed in the room: ";

/// Errors from the visualizer and data URI helpers.
#[derive(Debug, Error)]
pub enum VisualizerError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("Visualizer returned {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// The service response could not be parsed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The service returned no image.
    #[error("Visualizer returned no image")]
    NoImage,

    /// Not a `data:<mime>;base64,<data>` URI.
    #[error("Invalid data URI: {0}")]
    InvalidDataUri(String),

    /// The file or download is not a supported image type.
    #[error("Unsupported image: {0}")]
    UnsupportedImage(String),

    /// Base64 payload is corrupt.
    #[error("Invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Reading or writing an image file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// An image encoded as a base64 data URI.
#[derive(Clone, PartialEq, Eq)]
pub struct DataUri {
    mime: String,
    data: String,
}

impl fmt::Debug for DataUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataUri")
            .field("mime", &self.mime)
            .field("len", &self.data.len())
            .finish()
    }
}

impl fmt::Display for DataUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data:{};base64,{}", self.mime, self.data)
    }
}

impl DataUri {
    /// Parse and validate a data URI.
    ///
    /// # Errors
    ///
    /// Returns `VisualizerError::InvalidDataUri` if the URI is not
    /// base64-encoded with a MIME type, or `VisualizerError::Base64` if the
    /// payload does not decode.
    pub fn parse(uri: &str) -> Result<Self, VisualizerError> {
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| VisualizerError::InvalidDataUri("missing data: prefix".to_string()))?;
        let (header, data) = rest
            .split_once(',')
            .ok_or_else(|| VisualizerError::InvalidDataUri("missing payload".to_string()))?;
        let mime = header.strip_suffix(";base64").ok_or_else(|| {
            VisualizerError::InvalidDataUri("payload must be base64 encoded".to_string())
        })?;
        if mime.is_empty() || !mime.contains('/') {
            return Err(VisualizerError::InvalidDataUri(format!(
                "missing MIME type in {header:?}"
            )));
        }
        STANDARD.decode(data)?;

        Ok(Self {
            mime: mime.to_string(),
            data: data.to_string(),
        })
    }

    /// Encode raw image bytes.
    #[must_use]
    pub fn from_bytes(mime: &str, bytes: &[u8]) -> Self {
        Self {
            mime: mime.to_string(),
            data: STANDARD.encode(bytes),
        }
    }

    /// Read an image file. The MIME type comes from the extension.
    ///
    /// # Errors
    ///
    /// Returns `VisualizerError::UnsupportedImage` for unknown extensions and
    /// `VisualizerError::Io` if the file cannot be read.
    pub async fn from_file(path: &Path) -> Result<Self, VisualizerError> {
        let mime = mime_for_path(path.to_string_lossy().as_ref())
            .ok_or_else(|| VisualizerError::UnsupportedImage(path.display().to_string()))?;
        let bytes = tokio::fs::read(path).await?;
        Ok(Self::from_bytes(mime, &bytes))
    }

    /// Download an image.
    ///
    /// The MIME type comes from the `Content-Type` header, falling back to
    /// the URL's extension.
    ///
    /// # Errors
    ///
    /// Returns `VisualizerError::Http` or `VisualizerError::Status` if the
    /// download fails and `VisualizerError::UnsupportedImage` if the response
    /// is not an image.
    #[instrument(skip(client), fields(url = %url))]
    pub async fn fetch(client: &reqwest::Client, url: &Url) -> Result<Self, VisualizerError> {
        let response = client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(VisualizerError::Status {
                status: status.as_u16(),
            });
        }

        let header_mime = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(|v| v.trim().to_ascii_lowercase())
            .filter(|v| v.starts_with("image/"));
        let mime = header_mime
            .or_else(|| mime_for_path(url.path()).map(str::to_string))
            .ok_or_else(|| VisualizerError::UnsupportedImage(url.to_string()))?;

        let bytes = response.bytes().await?;
        debug!(mime = %mime, bytes = bytes.len(), "Downloaded image");
        Ok(Self::from_bytes(&mime, &bytes))
    }

    #[must_use]
    pub fn mime(&self) -> &str {
        &self.mime
    }

    /// Decode the payload.
    ///
    /// # Errors
    ///
    /// Returns `VisualizerError::Base64` if the payload is corrupt.
    pub fn decode(&self) -> Result<Vec<u8>, VisualizerError> {
        Ok(STANDARD.decode(&self.data)?)
    }

    /// Suggested file extension for the MIME type.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self.mime.as_str() {
            "image/jpeg" => "jpg",
            "image/webp" => "webp",
            "image/gif" => "gif",
            _ => "png",
        }
    }
}

fn mime_for_path(path: &str) -> Option<&'static str> {
    let (_, extension) = path.rsplit_once('.')?;
    match extension.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}

/// What to visualize.
#[derive(Debug, Clone)]
pub struct VisualizationRequest {
    pub room_photo: DataUri,
    pub furniture_photo: DataUri,
    /// Furniture description, usually the product description.
    pub description: String,
}

impl VisualizationRequest {
    /// Full instruction text for the service.
    #[must_use]
    pub fn prompt(&self) -> String {
        format!("{PROMPT_PREFIX}{}", self.description)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestBody<'a> {
    room_photo_data_uri: String,
    furniture_photo_data_uri: String,
    description: &'a str,
    prompt: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseBody {
    visualized_room: Option<String>,
}

/// Client for the image-composition service.
#[derive(Clone)]
pub struct RoomVisualizer {
    client: reqwest::Client,
    endpoint: Url,
    api_key: SecretString,
}

impl fmt::Debug for RoomVisualizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoomVisualizer")
            .field("endpoint", &self.endpoint.as_str())
            .field("api_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl RoomVisualizer {
    #[must_use]
    pub fn new(endpoint: Url, api_key: SecretString) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key,
        }
    }

    /// HTTP client shared with [`DataUri::fetch`].
    #[must_use]
    pub const fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Composite the furniture into the room photo.
    ///
    /// # Errors
    ///
    /// Returns `VisualizerError::Http`/`Status`/`Parse` if the call fails,
    /// `VisualizerError::NoImage` if the service produced nothing, and
    /// `VisualizerError::InvalidDataUri` if what it produced is malformed.
    #[instrument(skip(self, request), fields(endpoint = %self.endpoint))]
    pub async fn visualize(
        &self,
        request: &VisualizationRequest,
    ) -> Result<DataUri, VisualizerError> {
        let body = RequestBody {
            room_photo_data_uri: request.room_photo.to_string(),
            furniture_photo_data_uri: request.furniture_photo.to_string(),
            description: &request.description,
            prompt: request.prompt(),
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %text.chars().take(500).collect::<String>(),
                "Visualizer returned non-success status"
            );
            return Err(VisualizerError::Status {
                status: status.as_u16(),
            });
        }

        let parsed: ResponseBody = serde_json::from_str(&text)?;
        let image = parsed
            .visualized_room
            .filter(|uri| !uri.is_empty())
            .ok_or(VisualizerError::NoImage)?;

        DataUri::parse(&image)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_data_uri_parse() {
        let uri = DataUri::parse("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(uri.mime(), "image/png");
        assert_eq!(uri.decode().unwrap(), b"hello");
        assert_eq!(uri.to_string(), "data:image/png;base64,aGVsbG8=");
    }

    #[test]
    fn test_data_uri_rejects_malformed() {
        for bad in [
            "image/png;base64,aGVsbG8=",
            "data:image/png,aGVsbG8=",
            "data:;base64,aGVsbG8=",
            "data:image/png;base64",
        ] {
            assert!(
                matches!(DataUri::parse(bad), Err(VisualizerError::InvalidDataUri(_))),
                "{bad}"
            );
        }
        assert!(matches!(
            DataUri::parse("data:image/png;base64,!!!"),
            Err(VisualizerError::Base64(_))
        ));
    }

    #[test]
    fn test_mime_from_extension() {
        assert_eq!(mime_for_path("room.JPG"), Some("image/jpeg"));
        assert_eq!(mime_for_path("/img/sofa.webp"), Some("image/webp"));
        assert_eq!(mime_for_path("notes.txt"), None);
        assert_eq!(mime_for_path("no-extension"), None);
    }

    #[tokio::test]
    async fn test_from_file() {
        let path = std::env::temp_dir().join(format!("ff-visualizer-{}.png", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, b"png bytes").await.unwrap();

        let uri = DataUri::from_file(&path).await.unwrap();
        assert_eq!(uri.mime(), "image/png");
        assert_eq!(uri.decode().unwrap(), b"png bytes");

        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[test]
    fn test_prompt() {
        let request = VisualizationRequest {
            room_photo: DataUri::from_bytes("image/png", b"room"),
            furniture_photo: DataUri::from_bytes("image/jpeg", b"sofa"),
            description: "A plush velvet sofa".to_string(),
        };
        assert_eq!(
            request.prompt(),
            "Generate an image of this room with the following furniture item placed in the room: A plush velvet sofa"
        );
    }

    #[test]
    fn test_debug_redacts_key() {
        let visualizer = RoomVisualizer::new(
            Url::parse("https://visualizer.example.com/v1/compose").unwrap(),
            SecretString::from("sk-live-abcdef"),
        );
        assert!(!format!("{visualizer:?}").contains("sk-live"));
    }
}
