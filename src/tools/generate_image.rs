use rmcp::{
    ErrorData as McpError,
    handler::server::wrapper::Parameters,
    model::CallToolResult,
    schemars::JsonSchema,
};
use serde::Deserialize;

use crate::{
    config::ToolKind,
    tools::{ImageToolDispatcher, ToolArguments, into_call_tool_result},
};

const DEFAULT_FILE_NAME: &str = "image";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GenerateImageRequest {
    #[schemars(
        description = "Textual prompt describing the desired image (e.g., 'minimalist rocket icon transparent background')"
    )]
    pub prompt: String,
    #[schemars(
        description = "Output format of the image: png, svg, or ico. Default png",
        extend("enum" = ["png", "svg", "ico"], "default" = "png")
    )]
    pub format: Option<String>,
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
    #[schemars(description = "Name of the file to be saved (without extension). Default 'image'")]
    pub file_name: Option<String>,
    #[schemars(
        description = "Full path of the directory where the file will be saved, formatted for the server's OS (e.g., 'C:\\Users\\user\\project' on Windows, '/home/user/project' on Linux). Default './output'"
    )]
    pub directory: Option<String>,
}

impl From<GenerateImageRequest> for ToolArguments {
    fn from(request: GenerateImageRequest) -> Self {
        ToolArguments {
            prompt: request.prompt,
            format: request.format,
            size: request.size,
            background: request.background,
            file_name: request.file_name,
            directory: request.directory,
        }
    }
}

pub async fn generate_image(
    dispatcher: &ImageToolDispatcher,
    Parameters(request): Parameters<GenerateImageRequest>,
) -> Result<CallToolResult, McpError> {
    let result = dispatcher
        .dispatch(ToolKind::GenerateImage, request.into(), DEFAULT_FILE_NAME)
        .await;
    Ok(into_call_tool_result(result))
}
