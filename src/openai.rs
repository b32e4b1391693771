use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use base64::Engine;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, trace, warn};
use url::Url;

use crate::config::ImageModel;
use crate::image_processing;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

// Anything shorter cannot be a real key; not a validation.
const MIN_API_KEY_LEN: usize = 10;

#[derive(Debug, Error)]
pub enum ImageGenError {
    #[error("OPENAI_API_KEY not defined or invalid")]
    Configuration,
    #[error("image API returned HTTP {status}{}", api_message_suffix(.message))]
    HttpStatus { status: u16, message: Option<String> },
    #[error("image API request failed: {0}")]
    Transport(String),
    #[error("unexpected response from image API: {0}")]
    MalformedResponse(String),
    #[error("failed to fetch image from URL: {0}")]
    FetchFailure(String),
}

fn api_message_suffix(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|message| format!(": {message}"))
        .unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub const SQUARE: ImageSize = ImageSize::new(1024, 1024);
    pub const LANDSCAPE: ImageSize = ImageSize::new(1536, 1024);
    pub const PORTRAIT: ImageSize = ImageSize::new(1024, 1536);

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for ImageSize {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let (width, height) = trimmed
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("invalid size: {trimmed}"))?;
        let width = width
            .trim()
            .parse::<u32>()
            .map_err(|_| format!("invalid size: {trimmed}"))?;
        let height = height
            .trim()
            .parse::<u32>()
            .map_err(|_| format!("invalid size: {trimmed}"))?;
        if width == 0 || height == 0 {
            return Err(format!("invalid size: {trimmed}"));
        }
        Ok(Self::new(width, height))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Background {
    #[default]
    Transparent,
    Opaque,
}

impl Background {
    pub fn as_str(self) -> &'static str {
        match self {
            Background::Transparent => "transparent",
            Background::Opaque => "opaque",
        }
    }
}

impl FromStr for Background {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "transparent" => Ok(Background::Transparent),
            "opaque" => Ok(Background::Opaque),
            other => Err(format!("invalid background: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub size: ImageSize,
    /// `None` when the model does not accept a background parameter.
    pub background: Option<Background>,
}

/// PNG bytes produced for a single invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImage {
    pub bytes: Vec<u8>,
    /// Size requested from the API, if known.
    pub size: Option<ImageSize>,
}

impl RawImage {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes, size: None }
    }

    pub fn with_size(mut self, size: ImageSize) -> Self {
        self.size = Some(size);
        self
    }
}

/// Source of generated bitmaps.
#[async_trait]
pub trait ImageBackend: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<RawImage, ImageGenError>;
}

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: ImageModel,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>, model: ImageModel) -> Self {
        Self {
            api_key: Some(api_key.into()),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn api_key(&self) -> Result<&str, ImageGenError> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if key.len() >= MIN_API_KEY_LEN => Ok(key),
            _ => Err(ImageGenError::Configuration),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    data: Option<Vec<ImageData>>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    #[serde(default)]
    b64_json: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: Option<String>,
}

/// Client for the OpenAI `images/generations` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiImageBackend {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiImageBackend {
    pub fn new(config: OpenAiConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.config.base_url.trim_end_matches('/'))
    }

    async fn fetch_image_url(&self, raw_url: &str) -> Result<Vec<u8>, ImageGenError> {
        let url = validate_http_url(raw_url)?;
        debug!(%url, "fetching generated image");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| ImageGenError::FetchFailure(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ImageGenError::FetchFailure(format!(
                "HTTP {}",
                status.as_u16()
            )));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|err| ImageGenError::FetchFailure(err.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl ImageBackend for OpenAiImageBackend {
    async fn generate(&self, request: &GenerationRequest) -> Result<RawImage, ImageGenError> {
        let api_key = self.config.api_key()?;
        let body = build_request_body(self.config.model, request);
        debug!(
            model = self.config.model.id(),
            size = %request.size,
            "requesting image generation"
        );
        trace!(prompt = %request.prompt, "image prompt");

        let response = self
            .client
            .post(self.endpoint("images/generations"))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| ImageGenError::Transport(err.to_string()))?;
        debug!(status = %response.status(), "image generation responded");

        let response = assert_ok_response(response).await?;
        let text = response
            .text()
            .await
            .map_err(|err| ImageGenError::Transport(err.to_string()))?;
        let payload: ImagesResponse = serde_json::from_str(&text)
            .map_err(|err| ImageGenError::MalformedResponse(err.to_string()))?;
        let item = payload
            .data
            .and_then(|items| items.into_iter().next())
            .ok_or_else(|| ImageGenError::MalformedResponse("missing data array".to_string()))?;

        let bytes = if let Some(b64) = item.b64_json.as_deref() {
            base64::engine::general_purpose::STANDARD
                .decode(b64.trim())
                .map_err(|err| {
                    ImageGenError::MalformedResponse(format!("invalid b64_json: {err}"))
                })?
        } else if let Some(url) = item.url.as_deref() {
            self.fetch_image_url(url).await?
        } else {
            return Err(ImageGenError::MalformedResponse(
                "no image data found in response".to_string(),
            ));
        };

        if !image_processing::is_png(&bytes) {
            warn!(len = bytes.len(), "image payload is not a PNG");
            return Err(ImageGenError::MalformedResponse(
                "image payload is not a PNG".to_string(),
            ));
        }
        Ok(RawImage::new(bytes).with_size(request.size))
    }
}

fn build_request_body(model: ImageModel, request: &GenerationRequest) -> Value {
    let mut body = json!({
        "model": model.id(),
        "prompt": request.prompt,
        "n": 1,
        "size": request.size.to_string(),
    });
    match model {
        ImageModel::GptImage1 => {
            body["quality"] = json!("low");
            body["moderation"] = json!("low");
            if let Some(background) = request.background {
                body["background"] = json!(background.as_str());
            }
        }
        ImageModel::DallE3 => {
            body["response_format"] = json!("b64_json");
        }
    }
    body
}

async fn assert_ok_response(response: Response) -> Result<Response, ImageGenError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorEnvelope>(&text)
        .ok()
        .and_then(|envelope| envelope.error)
        .and_then(|error| error.message)
        .filter(|message| !message.trim().is_empty());
    warn!(status = status.as_u16(), ?message, "image generation failed");
    Err(ImageGenError::HttpStatus {
        status: status.as_u16(),
        message,
    })
}

fn validate_http_url(raw: &str) -> Result<Url, ImageGenError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ImageGenError::FetchFailure("empty image URL".to_string()));
    }
    let parsed = Url::parse(trimmed)
        .map_err(|err| ImageGenError::FetchFailure(format!("invalid image URL: {err}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(ImageGenError::FetchFailure(format!(
            "unsupported URL scheme: {scheme}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use httpmock::Method::{GET, POST};
    use httpmock::MockServer;

    use super::*;
    use crate::image_processing::tests::sample_png;

    const TEST_KEY: &str = "sk-test-0123456789";

    fn should_skip_httpmock() -> bool {
        match std::net::TcpListener::bind(("127.0.0.1", 0)) {
            Ok(_) => false,
            Err(err) if err.kind() == std::io::ErrorKind::PermissionDenied => {
                eprintln!("skipping httpmock test: sandbox forbids binding to localhost");
                true
            }
            Err(err) => panic!("failed to bind localhost for httpmock tests: {err}"),
        }
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            prompt: "minimalist rocket icon".to_string(),
            size: ImageSize::LANDSCAPE,
            background: Some(Background::Opaque),
        }
    }

    fn backend(server: &MockServer, model: ImageModel) -> OpenAiImageBackend {
        OpenAiImageBackend::new(OpenAiConfig::new(TEST_KEY, model).with_base_url(server.url("/v1")))
    }

    #[test]
    fn parses_sizes() {
        assert_eq!("1536x1024".parse::<ImageSize>(), Ok(ImageSize::LANDSCAPE));
        assert_eq!(ImageSize::PORTRAIT.to_string(), "1024x1536");
        assert!("1024".parse::<ImageSize>().is_err());
        assert!("0x10".parse::<ImageSize>().is_err());
    }

    #[test]
    fn gpt_image_1_body_uses_cheapest_settings() {
        let body = build_request_body(ImageModel::GptImage1, &request());
        assert_eq!(body["model"], "gpt-image-1");
        assert_eq!(body["n"], 1);
        assert_eq!(body["size"], "1536x1024");
        assert_eq!(body["quality"], "low");
        assert_eq!(body["moderation"], "low");
        assert_eq!(body["background"], "opaque");
        assert!(body.get("response_format").is_none());
    }

    #[test]
    fn dall_e_3_body_requests_b64_without_background() {
        let body = build_request_body(ImageModel::DallE3, &request());
        assert_eq!(body["model"], "dall-e-3");
        assert_eq!(body["response_format"], "b64_json");
        assert!(body.get("background").is_none());
        assert!(body.get("quality").is_none());
    }

    #[tokio::test]
    async fn missing_or_short_key_fails_before_any_request() {
        let unreachable = "http://127.0.0.1:1/v1";
        for api_key in [None, Some(String::new()), Some("short".to_string())] {
            let backend = OpenAiImageBackend::new(OpenAiConfig {
                api_key,
                base_url: unreachable.to_string(),
                model: ImageModel::GptImage1,
            });
            let err = backend.generate(&request()).await.unwrap_err();
            assert!(matches!(err, ImageGenError::Configuration), "got {err:?}");
        }
    }

    #[tokio::test]
    async fn decodes_inline_base64_image() {
        if should_skip_httpmock() {
            return;
        }
        let png = sample_png(8, 8);
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/images/generations")
                    .header("authorization", format!("Bearer {TEST_KEY}"))
                    .body_includes("\"quality\":\"low\"")
                    .body_includes("\"background\":\"opaque\"");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(
                        json!({
                            "data": [{
                                "b64_json": base64::engine::general_purpose::STANDARD.encode(&png)
                            }]
                        })
                        .to_string(),
                    );
            })
            .await;

        let image = backend(&server, ImageModel::GptImage1)
            .generate(&request())
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(image.bytes, png);
        assert_eq!(image.size, Some(ImageSize::LANDSCAPE));
    }

    #[tokio::test]
    async fn resolves_url_shaped_results() {
        if should_skip_httpmock() {
            return;
        }
        let png = sample_png(4, 4);
        let server = MockServer::start_async().await;
        let image_url = server.url("/files/generated.png");
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/images/generations")
                    .body_includes("\"response_format\":\"b64_json\"");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(json!({ "data": [{ "url": image_url }] }).to_string());
            })
            .await;
        let fetch = server
            .mock_async(|when, then| {
                when.method(GET).path("/files/generated.png");
                then.status(200).header("content-type", "image/png").body(png.clone());
            })
            .await;

        let image = backend(&server, ImageModel::DallE3)
            .generate(&request())
            .await
            .unwrap();
        fetch.assert_async().await;
        assert_eq!(image.bytes, png);
    }

    #[tokio::test]
    async fn failed_url_fetch_is_a_fetch_failure() {
        if should_skip_httpmock() {
            return;
        }
        let server = MockServer::start_async().await;
        let image_url = server.url("/files/missing.png");
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/images/generations");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(json!({ "data": [{ "url": image_url }] }).to_string());
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/files/missing.png");
                then.status(404);
            })
            .await;

        let err = backend(&server, ImageModel::GptImage1)
            .generate(&request())
            .await
            .unwrap_err();
        assert!(matches!(err, ImageGenError::FetchFailure(_)), "got {err:?}");
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn api_error_message_is_included() {
        if should_skip_httpmock() {
            return;
        }
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/images/generations");
                then.status(400)
                    .header("content-type", "application/json")
                    .body(
                        json!({ "error": { "message": "Your request was rejected" } }).to_string(),
                    );
            })
            .await;

        let err = backend(&server, ImageModel::GptImage1)
            .generate(&request())
            .await
            .unwrap_err();
        match &err {
            ImageGenError::HttpStatus { status, message } => {
                assert_eq!(*status, 400);
                assert_eq!(message.as_deref(), Some("Your request was rejected"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(
            err.to_string(),
            "image API returned HTTP 400: Your request was rejected"
        );
    }

    #[tokio::test]
    async fn unstructured_error_body_yields_bare_status() {
        if should_skip_httpmock() {
            return;
        }
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/images/generations");
                then.status(502).body("bad gateway");
            })
            .await;

        let err = backend(&server, ImageModel::GptImage1)
            .generate(&request())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "image API returned HTTP 502");
    }

    #[tokio::test]
    async fn missing_data_array_is_malformed() {
        if should_skip_httpmock() {
            return;
        }
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/images/generations");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(json!({ "created": 1 }).to_string());
            })
            .await;

        let err = backend(&server, ImageModel::GptImage1)
            .generate(&request())
            .await
            .unwrap_err();
        assert!(matches!(err, ImageGenError::MalformedResponse(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn item_without_image_is_malformed() {
        if should_skip_httpmock() {
            return;
        }
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/images/generations");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(json!({ "data": [{ "revised_prompt": "a rocket" }] }).to_string());
            })
            .await;

        let err = backend(&server, ImageModel::GptImage1)
            .generate(&request())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no image data"));
    }

    #[test]
    fn rejects_non_http_image_urls() {
        assert!(validate_http_url("https://example.com/a.png").is_ok());
        assert!(matches!(
            validate_http_url("file:///etc/passwd"),
            Err(ImageGenError::FetchFailure(_))
        ));
        assert!(validate_http_url("   ").is_err());
    }
}
