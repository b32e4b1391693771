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

const DEFAULT_FILE_NAME: &str = "image";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GenerateSvgRequest {
    #[schemars(description = "Textual prompt describing the desired image for the SVG")]
    pub prompt: String,
    #[schemars(
        description = "Image size: 1024x1024 (square), 1536x1024 (landscape), or 1024x1536 (portrait). Also used as the SVG canvas size. Default 1024x1024",
        extend("enum" = ["1024x1024", "1536x1024", "1024x1536"], "default" = "1024x1024")
    )]
    pub size: Option<String>,
    #[schemars(
        description = "Background type: 'transparent' or 'opaque'. Default transparent",
        extend("enum" = ["transparent", "opaque"], "default" = "transparent")
    )]
    pub background: Option<String>,
    #[serde(rename = "fileName")]
    #[schemars(description = "Name of the file to be saved (without extension). Default 'image'")]
    pub file_name: Option<String>,
    #[schemars(
        description = "Full path of the directory where the file will be saved. Default './output'"
    )]
    pub directory: Option<String>,
}

impl From<GenerateSvgRequest> for ToolArguments {
    fn from(request: GenerateSvgRequest) -> Self {
        ToolArguments {
            prompt: request.prompt,
            format: Some(OutputFormat::Svg.to_string()),
            size: request.size,
            background: request.background,
            file_name: request.file_name,
            directory: request.directory,
        }
    }
}

pub async fn generate_svg(
    dispatcher: &ImageToolDispatcher,
    Parameters(request): Parameters<GenerateSvgRequest>,
) -> Result<CallToolResult, McpError> {
    let result = dispatcher
        .dispatch(ToolKind::GenerateSvg, request.into(), DEFAULT_FILE_NAME)
        .await;
    Ok(into_call_tool_result(result))
}
