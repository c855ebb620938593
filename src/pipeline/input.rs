//! Image acquisition: resolve an opaque input string to a [`NormalizedImage`].
//!
//! Three loaders are tried in a fixed priority order:
//!
//! 1. **Embedded base64**: `data:image/...` URIs, or bare base64 text that
//!    starts with a well-known image signature (PNG, JPEG, GIF).
//! 2. **Remote URL**: anything starting with `http://` or `https://`.
//! 3. **Local path**: everything else.
//!
//! The order matters: a data URI is always embedded data, even when it could
//! also be read as a path. Each loader maps its own failures to its own error
//! kind; decoding runs on the blocking pool and a failure of that task itself
//! is reported as [`VectorizeError::UrlRead`], the acquisition catch-all.
//! Every successful decode goes through [`normalize`], whatever the source.

use super::normalize::{detect_mode, normalize, NormalizedImage};
use crate::config::ServiceConfig;
use crate::error::VectorizeError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Prefix of a data URI carrying an image.
pub const DATA_IMAGE_PREFIX: &str = "data:image/";

/// Leading base64 characters of common image signatures (PNG, JPEG, GIF).
pub const BASE64_MAGIC_PREFIXES: [&str; 3] = ["iVBORw0KGgo", "/9j/", "R0lGOD"];

/// Which loader an input string is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource {
    Base64,
    Url,
    Path,
}

/// Classify an input string. Order of the checks is significant.
pub fn detect_source(input: &str) -> InputSource {
    if input.starts_with(DATA_IMAGE_PREFIX)
        || BASE64_MAGIC_PREFIXES.iter().any(|p| input.starts_with(p))
    {
        InputSource::Base64
    } else if is_url(input) {
        InputSource::Url
    } else {
        InputSource::Path
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Loads and normalizes images from any supported source.
///
/// Holds the process-wide HTTP client; cheap to clone.
#[derive(Debug, Clone)]
pub struct ImageAcquirer {
    client: reqwest::Client,
    user_agent: String,
    download_timeout: Duration,
}

impl ImageAcquirer {
    pub fn new(client: reqwest::Client, config: &ServiceConfig) -> Self {
        Self {
            client,
            user_agent: config.user_agent.clone(),
            download_timeout: Duration::from_secs(config.download_timeout_secs),
        }
    }

    /// Resolve `input` to a normalized image.
    ///
    /// # Errors
    /// - [`VectorizeError::Base64Read`]: embedded payload undecodable
    /// - [`VectorizeError::UrlRead`]: fetch failed, body undecodable, or the
    ///   decode task itself failed
    /// - [`VectorizeError::PathRead`]: file unreadable or undecodable
    /// - [`VectorizeError::ImageFormat`]: colour mode has no mapping
    pub async fn acquire(&self, input: &str) -> Result<NormalizedImage, VectorizeError> {
        let source = detect_source(input);
        debug!("Acquiring image via {:?} loader", source);
        match source {
            InputSource::Base64 => read_base64(input).await,
            InputSource::Url => self.read_url(input).await,
            InputSource::Path => read_path(input).await,
        }
    }

    async fn read_url(&self, url: &str) -> Result<NormalizedImage, VectorizeError> {
        info!("Downloading image from: {}", url);
        let url_err = |detail: String| VectorizeError::UrlRead {
            url: url.to_string(),
            detail,
        };

        let mut request = self
            .client
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, "image/*");
        if self.download_timeout > Duration::ZERO {
            request = request.timeout(self.download_timeout);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                url_err(format!(
                    "timed out after {}s",
                    self.download_timeout.as_secs()
                ))
            } else {
                url_err(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            return Err(url_err(format!("HTTP {}", response.status())));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();
        if !content_type.starts_with("image/") {
            warn!(
                "Response content type '{}' is not an image; attempting to decode anyway",
                content_type
            );
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| url_err(e.to_string()))?;
        debug!("Downloaded {} bytes", bytes.len());

        decode(bytes.to_vec(), url, url_err).await
    }
}

/// Decode an embedded base64 image.
async fn read_base64(input: &str) -> Result<NormalizedImage, VectorizeError> {
    let bytes = decode_base64_payload(input).map_err(|e| VectorizeError::Base64Read {
        detail: e.to_string(),
    })?;
    debug!("Decoded {} bytes of embedded image data", bytes.len());
    decode(bytes, "<embedded image>", |detail| VectorizeError::Base64Read {
        detail,
    })
    .await
}

/// Read and decode a local image file.
async fn read_path(path: &str) -> Result<NormalizedImage, VectorizeError> {
    let path_err = |detail: String| VectorizeError::PathRead {
        path: path.to_string(),
        detail,
    };
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| path_err(e.to_string()))?;
    debug!("Read {} bytes from {}", bytes.len(), path);
    decode(bytes, path, path_err).await
}

/// Strip any data-URI preamble and decode the base64 text.
fn decode_base64_payload(input: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let payload = match input.split_once(',') {
        Some((_, data)) => data,
        None => input,
    };
    let cleaned: String = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    STANDARD.decode(cleaned)
}

enum DecodeFailure {
    Decode(image::ImageError),
    Format(VectorizeError),
}

/// Decode and normalize on the blocking pool.
///
/// `on_decode_error` maps an undecodable payload to the loader's own error
/// kind; unsupported colour modes keep their [`VectorizeError::ImageFormat`]
/// classification whatever the loader. `origin` only labels the catch-all.
async fn decode<F>(
    bytes: Vec<u8>,
    origin: &str,
    on_decode_error: F,
) -> Result<NormalizedImage, VectorizeError>
where
    F: FnOnce(String) -> VectorizeError,
{
    let joined = tokio::task::spawn_blocking(move || decode_blocking(&bytes)).await;

    match joined {
        Ok(Ok(image)) => Ok(image),
        Ok(Err(DecodeFailure::Decode(e))) => Err(on_decode_error(e.to_string())),
        Ok(Err(DecodeFailure::Format(e))) => Err(e),
        Err(e) => Err(VectorizeError::UrlRead {
            url: origin.to_string(),
            detail: format!("decode task failed: {}", e),
        }),
    }
}

fn decode_blocking(bytes: &[u8]) -> Result<NormalizedImage, DecodeFailure> {
    let decoded = image::load_from_memory(bytes).map_err(DecodeFailure::Decode)?;
    let mode = detect_mode(bytes, &decoded);
    debug!(
        "Decoded {}x{} image, mode {}",
        decoded.width(),
        decoded.height(),
        mode
    );
    normalize(decoded, mode).map_err(DecodeFailure::Format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::pipeline::normalize::ColorMode;
    use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgb, RgbImage};
    use std::io::{Cursor, Write};

    fn png_bytes(img: &DynamicImage) -> Vec<u8> {
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    fn acquirer() -> ImageAcquirer {
        let config = ServiceConfig::builder()
            .storage(crate::config::StorageConfig::new("test"))
            .download_timeout_secs(5)
            .build()
            .unwrap();
        ImageAcquirer::new(reqwest::Client::new(), &config)
    }

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/img.png"));
        assert!(is_url("http://example.com/img.png"));
        assert!(!is_url("/tmp/img.png"));
        assert!(!is_url("img.png"));
        assert!(!is_url(""));
    }

    #[test]
    fn detection_priority() {
        assert_eq!(detect_source("data:image/png;base64,AAAA"), InputSource::Base64);
        assert_eq!(detect_source("iVBORw0KGgoAAAANS"), InputSource::Base64);
        assert_eq!(detect_source("/9j/4AAQSkZJRg"), InputSource::Base64);
        assert_eq!(detect_source("R0lGODlhAQABAA"), InputSource::Base64);
        assert_eq!(detect_source("https://example.com/a.png"), InputSource::Url);
        assert_eq!(detect_source("./images/a.png"), InputSource::Path);
    }

    #[test]
    fn data_uri_wins_over_url_and_path() {
        // Contains a URL and looks path-like, still embedded data.
        let tricky = "data:image/png;base64,https://example.com/a.png";
        assert_eq!(detect_source(tricky), InputSource::Base64);
    }

    #[test]
    fn base64_payload_strips_preamble_and_whitespace() {
        let encoded = STANDARD.encode(b"hello image");
        let uri = format!("data:image/png;base64,{}\n", encoded);
        assert_eq!(decode_base64_payload(&uri).unwrap(), b"hello image");
        assert_eq!(decode_base64_payload(&encoded).unwrap(), b"hello image");
        assert!(decode_base64_payload("data:image/png;base64,***").is_err());
    }

    #[tokio::test]
    async fn acquires_data_uri() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 3, Rgb([1, 2, 3])));
        let uri = format!(
            "data:image/png;base64,{}",
            STANDARD.encode(png_bytes(&img))
        );
        let out = acquirer().acquire(&uri).await.unwrap();
        assert_eq!((out.width(), out.height()), (4, 3));
        assert_eq!(out.mode(), ColorMode::Rgb);
    }

    #[tokio::test]
    async fn acquires_bare_base64_png() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(2, 2, Luma([7])));
        let bare = STANDARD.encode(png_bytes(&img));
        assert!(bare.starts_with("iVBORw0KGgo"));
        let out = acquirer().acquire(&bare).await.unwrap();
        assert_eq!(out.mode(), ColorMode::Rgb);
    }

    #[tokio::test]
    async fn undecodable_base64_is_base64_error() {
        let err = acquirer()
            .acquire("data:image/png;base64,bm90IGFuIGltYWdl")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Base64Read);

        let err = acquirer().acquire("data:image/png;base64,%%%").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Base64Read);
    }

    #[tokio::test]
    async fn acquires_local_path() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(5, 6, Rgb([200, 0, 0])));
        let mut file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        file.write_all(&png_bytes(&img)).unwrap();

        let out = acquirer()
            .acquire(file.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!((out.width(), out.height()), (5, 6));
    }

    #[tokio::test]
    async fn missing_path_is_path_error() {
        let err = acquirer()
            .acquire("definitely/not/here.png")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PathRead);
    }

    #[tokio::test]
    async fn non_image_file_is_path_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"plain text, not pixels").unwrap();
        let err = acquirer()
            .acquire(file.path().to_str().unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PathRead);
    }

    #[tokio::test]
    async fn unsupported_mode_keeps_format_classification() {
        let img = DynamicImage::ImageLumaA8(image::GrayAlphaImage::from_pixel(
            2,
            2,
            image::LumaA([1, 2]),
        ));
        let uri = format!(
            "data:image/png;base64,{}",
            STANDARD.encode(png_bytes(&img))
        );
        let err = acquirer().acquire(&uri).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ImageFormat);
    }

    #[tokio::test]
    async fn url_fetch_sends_identifying_headers() {
        let mut server = mockito::Server::new_async().await;
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(3, 3, Rgb([0, 0, 0])));
        let mock = server
            .mock("GET", "/img.png")
            .match_header("accept", "image/*")
            .match_header("user-agent", mockito::Matcher::Regex("^Vectorizing/".into()))
            .with_status(200)
            .with_header("content-type", "image/png")
            .with_body(png_bytes(&img))
            .create_async()
            .await;

        let out = acquirer()
            .acquire(&format!("{}/img.png", server.url()))
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(out.width(), 3);
    }

    #[tokio::test]
    async fn url_with_wrong_content_type_is_still_decoded() {
        let mut server = mockito::Server::new_async().await;
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, Rgb([0, 0, 0])));
        let _mock = server
            .mock("GET", "/download")
            .with_status(200)
            .with_header("content-type", "application/octet-stream")
            .with_body(png_bytes(&img))
            .create_async()
            .await;

        let out = acquirer()
            .acquire(&format!("{}/download", server.url()))
            .await
            .unwrap();
        assert_eq!(out.height(), 2);
    }

    #[tokio::test]
    async fn url_error_status_is_url_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/missing.png")
            .with_status(404)
            .create_async()
            .await;

        let err = acquirer()
            .acquire(&format!("{}/missing.png", server.url()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UrlRead);
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn url_undecodable_body_is_url_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/page")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body("<html></html>")
            .create_async()
            .await;

        let err = acquirer()
            .acquire(&format!("{}/page", server.url()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UrlRead);
    }

    #[tokio::test]
    async fn unreachable_url_is_url_error() {
        // Port 9 (discard) on localhost is closed in test environments.
        let err = acquirer()
            .acquire("http://127.0.0.1:9/img.png")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UrlRead);
    }

    #[tokio::test]
    async fn stalled_download_times_out_as_url_error() {
        // Accepts the connection and never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let holder = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let config = ServiceConfig::builder()
            .storage(crate::config::StorageConfig::new("test"))
            .download_timeout_secs(1)
            .build()
            .unwrap();
        let acquirer = ImageAcquirer::new(reqwest::Client::new(), &config);

        let started = std::time::Instant::now();
        let err = acquirer
            .acquire(&format!("http://{addr}/slow.png"))
            .await
            .unwrap_err();
        holder.abort();

        assert_eq!(err.kind(), ErrorKind::UrlRead);
        assert!(err.to_string().contains("timed out"), "{err}");
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    fn one_pixel_png(color: png::ColorType, depth: png::BitDepth, data: &[u8], trns: Option<&[u8]>) -> String {
        let mut out = Vec::new();
        {
            let mut enc = png::Encoder::new(&mut out, 1, 1);
            enc.set_color(color);
            enc.set_depth(depth);
            if let Some(t) = trns {
                enc.set_trns(t.to_vec());
            }
            let mut writer = enc.write_header().unwrap();
            writer.write_image_data(data).unwrap();
        }
        format!("data:image/png;base64,{}", STANDARD.encode(out))
    }

    #[tokio::test]
    async fn acquires_sixteen_bit_and_keyed_gray_pngs() {
        let cases = [
            (
                one_pixel_png(png::ColorType::Rgb, png::BitDepth::Sixteen, &[0xff; 6], None),
                ColorMode::Rgb,
            ),
            (
                one_pixel_png(png::ColorType::Rgba, png::BitDepth::Sixteen, &[0xff; 8], None),
                ColorMode::Rgba,
            ),
            (
                one_pixel_png(png::ColorType::Grayscale, png::BitDepth::Eight, &[40], Some(&[0, 0])),
                ColorMode::Rgb,
            ),
        ];
        for (uri, expected) in cases {
            let out = acquirer().acquire(&uri).await.unwrap();
            assert_eq!(out.mode(), expected);
            assert_eq!((out.width(), out.height()), (1, 1));
        }
    }
}
