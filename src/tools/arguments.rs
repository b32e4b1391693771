use crate::config::ServerProfile;
use crate::image_processing::OutputFormat;
use crate::openai::{Background, GenerationRequest, ImageSize};
use crate::tools::ToolError;

pub const DEFAULT_DIRECTORY: &str = "./output";

/// Tool arguments before validation, shared by every image tool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolArguments {
    pub prompt: String,
    pub format: Option<String>,
    pub size: Option<String>,
    pub background: Option<String>,
    pub file_name: Option<String>,
    pub directory: Option<String>,
}

/// Arguments after defaults have been applied and values checked against the profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArguments {
    pub generation: GenerationRequest,
    pub format: OutputFormat,
    pub file_name: String,
    pub directory: String,
}

impl ToolArguments {
    pub fn resolve(
        self,
        profile: &ServerProfile,
        default_file_name: &str,
    ) -> Result<ResolvedArguments, ToolError> {
        if self.prompt.trim().is_empty() {
            return Err(ToolError::InvalidArgument("prompt must not be empty".to_string()));
        }
        let format = match non_blank(self.format.as_deref()) {
            Some(token) => token.parse::<OutputFormat>()?,
            None => OutputFormat::Png,
        };
        let size = resolve_size(profile, self.size.as_deref())?;
        let background = resolve_background(profile, self.background.as_deref())?;

        Ok(ResolvedArguments {
            generation: GenerationRequest {
                prompt: self.prompt,
                size,
                background,
            },
            format,
            file_name: non_blank(self.file_name.as_deref())
                .unwrap_or(default_file_name)
                .to_string(),
            directory: non_blank(self.directory.as_deref())
                .unwrap_or(DEFAULT_DIRECTORY)
                .to_string(),
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn resolve_size(profile: &ServerProfile, raw: Option<&str>) -> Result<ImageSize, ToolError> {
    let Some(raw) = non_blank(raw) else {
        return Ok(profile.default_size());
    };
    let size = raw.parse::<ImageSize>().map_err(ToolError::InvalidArgument)?;
    if !profile.supports_size(size) {
        let supported: Vec<String> = profile
            .supported_sizes
            .iter()
            .map(ToString::to_string)
            .collect();
        return Err(ToolError::InvalidArgument(format!(
            "size {size} is not supported, expected one of: {}",
            supported.join(", ")
        )));
    }
    Ok(size)
}

fn resolve_background(
    profile: &ServerProfile,
    raw: Option<&str>,
) -> Result<Option<Background>, ToolError> {
    if !profile.supports_background {
        return Ok(None);
    }
    match non_blank(raw) {
        Some(raw) => raw
            .parse::<Background>()
            .map(Some)
            .map_err(ToolError::InvalidArgument),
        None => Ok(Some(Background::Transparent)),
    }
}
