pub mod arguments;
pub mod generate_favicon;
pub mod generate_image;
pub mod generate_svg;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use base64::Engine;
use rmcp::model::{AnnotateAble, CallToolResult, Content, Meta, RawContent, RawTextContent};
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    config::{ServerProfile, ToolKind},
    image_processing::{ConvertError, EncodedArtifact, FormatConverter},
    openai::{ImageBackend, ImageGenError},
    storage::LocalFileStorage,
};

pub use arguments::{DEFAULT_DIRECTORY, ResolvedArguments, ToolArguments};
pub use generate_favicon::{GenerateFaviconRequest, generate_favicon};
pub use generate_image::{GenerateImageRequest, generate_image};
pub use generate_svg::{GenerateSvgRequest, generate_svg};

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Generation(#[from] ImageGenError),
    #[error(transparent)]
    Conversion(#[from] ConvertError),
    #[error("failed to write {}: {source}", .path.display())]
    Filesystem { path: PathBuf, source: io::Error },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentBlock {
    Image { data: String, media_type: String },
    Text { text: String, media_type: Option<String> },
}

impl ContentBlock {
    /// SVG goes out as text, everything else as a base64 image.
    pub fn from_artifact(artifact: &EncodedArtifact) -> Self {
        if artifact.is_textual() {
            ContentBlock::Text {
                text: String::from_utf8_lossy(&artifact.bytes).into_owned(),
                media_type: Some(artifact.media_type.to_string()),
            }
        } else {
            ContentBlock::Image {
                data: base64::engine::general_purpose::STANDARD.encode(&artifact.bytes),
                media_type: artifact.media_type.to_string(),
            }
        }
    }

    fn into_content(self) -> Content {
        match self {
            ContentBlock::Image { data, media_type } => Content::image(data, media_type),
            ContentBlock::Text { text, media_type } => {
                // text blocks have no mimeType field, so it travels in _meta
                let meta = media_type.map(|media_type| {
                    let mut meta = Meta::new();
                    meta.insert("mimeType".to_string(), media_type.into());
                    meta
                });
                RawContent::Text(RawTextContent { text, meta }).no_annotation()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSuccess {
    pub content: ContentBlock,
    pub saved_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolFailure {
    pub message: String,
}

impl From<ToolSuccess> for CallToolResult {
    fn from(success: ToolSuccess) -> Self {
        CallToolResult::success(vec![success.content.into_content()])
    }
}

impl From<ToolFailure> for CallToolResult {
    fn from(failure: ToolFailure) -> Self {
        CallToolResult::error(vec![Content::text(failure.message)])
    }
}

pub fn into_call_tool_result(result: Result<ToolSuccess, ToolFailure>) -> CallToolResult {
    match result {
        Ok(success) => success.into(),
        Err(failure) => failure.into(),
    }
}

/// Runs generate → convert → persist for every image tool.
#[derive(Clone)]
pub struct ImageToolDispatcher {
    backend: Arc<dyn ImageBackend>,
    converter: FormatConverter,
    profile: Arc<ServerProfile>,
}

impl ImageToolDispatcher {
    pub fn new(backend: Arc<dyn ImageBackend>, profile: ServerProfile) -> Self {
        Self {
            backend,
            converter: FormatConverter::new(profile.icon_sizing.clone()),
            profile: Arc::new(profile),
        }
    }

    pub fn profile(&self) -> &ServerProfile {
        &self.profile
    }

    pub async fn dispatch(
        &self,
        kind: ToolKind,
        arguments: ToolArguments,
        default_file_name: &str,
    ) -> Result<ToolSuccess, ToolFailure> {
        match self.execute(arguments, default_file_name).await {
            Ok(success) => {
                info!(tool = %kind, path = %success.saved_path.display(), "image tool succeeded");
                Ok(success)
            }
            Err(err) => {
                warn!(tool = %kind, error = %err, "image tool failed");
                Err(ToolFailure {
                    message: self.failure_message(kind, &err),
                })
            }
        }
    }

    async fn execute(
        &self,
        arguments: ToolArguments,
        default_file_name: &str,
    ) -> Result<ToolSuccess, ToolError> {
        let resolved = arguments.resolve(&self.profile, default_file_name)?;
        let raw = self.backend.generate(&resolved.generation).await?;
        let artifact = self.converter.convert(&raw, resolved.format)?;

        let storage = LocalFileStorage::new(&resolved.directory).map_err(|source| {
            ToolError::Filesystem {
                path: PathBuf::from(&resolved.directory),
                source,
            }
        })?;
        let saved_path = storage
            .put(&resolved.file_name, artifact.extension, &artifact.bytes)
            .await
            .map_err(|source| ToolError::Filesystem {
                path: storage.resolve_path(&resolved.file_name, artifact.extension),
                source,
            })?;

        Ok(ToolSuccess {
            content: ContentBlock::from_artifact(&artifact),
            saved_path,
        })
    }

    fn failure_message(&self, kind: ToolKind, err: &ToolError) -> String {
        let locale = self.profile.locale;
        let detail = match err {
            ToolError::Generation(ImageGenError::Configuration) => {
                locale.missing_credential().to_string()
            }
            other => other.to_string(),
        };
        format!("{}: {detail}", locale.error_prefix(kind))
    }
}
