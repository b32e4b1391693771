use rmcp::{
    ErrorData as McpError,
    handler::server::wrapper::Parameters,
    model::CallToolResult,
    schemars::JsonSchema,
};
use serde::Deserialize;

use crate::{
    config::ToolKind,
    image_processing::OutputFormat,
    tools::{ImageToolDispatcher, ToolArguments, into_call_tool_result},
};

const DEFAULT_FILE_NAME: &str = "favicon";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GenerateFaviconRequest {
    #[schemars(
        description = "Textual prompt describing the desired favicon (e.g., 'yellow star favicon transparent background')"
    )]
    pub prompt: String,
    #[schemars(
        description = "Image size: 1024x1024 (square), 1536x1024 (landscape), or 1024x1536 (portrait). Default 1024x1024",
        extend("enum" = ["1024x1024", "1536x1024", "1024x1536"], "default" = "1024x1024")
    )]
    pub size: Option<String>,
    #[schemars(
        description = "Background type: 'transparent' or 'opaque'. Default transparent",
        extend("enum" = ["transparent", "opaque"], "default" = "transparent")
    )]
    pub background: Option<String>,
    #[serde(rename = "fileName")]
    #[schemars(description = "Name of the file to be saved (without extension). Default 'favicon'")]
    pub file_name: Option<String>,
    #[schemars(
        description = "Full path of the directory where the file will be saved. Default './output'"
    )]
    pub directory: Option<String>,
}

impl From<GenerateFaviconRequest> for ToolArguments {
    fn from(request: GenerateFaviconRequest) -> Self {
        ToolArguments {
            prompt: request.prompt,
            format: Some(OutputFormat::Ico.to_string()),
            size: request.size,
            background: request.background,
            file_name: request.file_name,
            directory: request.directory,
        }
    }
}

pub async fn generate_favicon(
    dispatcher: &ImageToolDispatcher,
    Parameters(request): Parameters<GenerateFaviconRequest>,
) -> Result<CallToolResult, McpError> {
    let result = dispatcher
        .dispatch(ToolKind::GenerateFavicon, request.into(), DEFAULT_FILE_NAME)
        .await;
    Ok(into_call_tool_result(result))
}
