use std::sync::Arc;

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{router::tool::ToolRouter, tool::ToolCallContext, wrapper::Parameters},
    model::{
        CallToolRequestParams, CallToolResult, Implementation, JsonObject, ListResourcesResult,
        ListToolsResult, PaginatedRequestParams, ReadResourceRequestParams, ReadResourceResult,
        ServerCapabilities, ServerInfo, Tool,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use serde_json::{Value, json};
use tracing::debug;

use crate::config::{ServerProfile, ToolKind};
use crate::resources;
use crate::tools::{
    GenerateFaviconRequest, GenerateImageRequest, GenerateSvgRequest, ImageToolDispatcher,
};

#[derive(Clone)]
pub struct ImageGenServer {
    tool_router: ToolRouter<Self>,
    dispatcher: ImageToolDispatcher,
}

impl ImageGenServer {
    pub fn new(dispatcher: ImageToolDispatcher) -> Self {
        Self {
            tool_router: Self::tool_router(),
            dispatcher,
        }
    }

    fn is_enabled(&self, name: &str) -> bool {
        ToolKind::from_name(name).is_some_and(|kind| self.dispatcher.profile().is_enabled(kind))
    }

    /// Enabled tools, with titles and descriptions in the profile's locale.
    pub fn visible_tools(&self) -> Vec<Tool> {
        let locale = self.dispatcher.profile().locale;
        self.tool_router
            .list_all()
            .into_iter()
            .filter_map(|mut tool| {
                let kind = ToolKind::from_name(&tool.name)?;
                if !self.dispatcher.profile().is_enabled(kind) {
                    return None;
                }
                tool.title = Some(locale.tool_title(kind).into());
                tool.description = Some(locale.tool_description(kind).into());
                tool.input_schema = Arc::new(profile_schema(&tool.input_schema, self.dispatcher.profile()));
                Some(tool)
            })
            .collect()
    }
}

/// Narrows `size` to the profile's sizes and drops `background` when the model ignores it.
fn profile_schema(schema: &JsonObject, profile: &ServerProfile) -> JsonObject {
    let mut schema = schema.clone();
    let Some(Value::Object(properties)) = schema.get_mut("properties") else {
        return schema;
    };
    if let Some(Value::Object(size)) = properties.get_mut("size") {
        let sizes: Vec<String> = profile
            .supported_sizes
            .iter()
            .map(ToString::to_string)
            .collect();
        let default_size = profile.default_size().to_string();
        size.insert(
            "description".into(),
            json!(format!("Image size: {}. Default {default_size}", sizes.join(", "))),
        );
        size.insert("enum".into(), json!(sizes));
        size.insert("default".into(), json!(default_size));
    }
    if !profile.supports_background {
        properties.remove("background");
    }
    schema
}

#[tool_router]
impl ImageGenServer {
    #[tool(
        name = "generate-image",
        description = "Generates a custom image using AI and delivers it in the requested format (.png, .svg, .ico)."
    )]
    async fn generate_image(
        &self,
        Parameters(request): Parameters<GenerateImageRequest>,
    ) -> Result<CallToolResult, McpError> {
        crate::tools::generate_image(&self.dispatcher, Parameters(request)).await
    }

    #[tool(
        name = "generate-favicon",
        description = "Generates a favicon.ico from a textual prompt using AI."
    )]
    async fn generate_favicon(
        &self,
        Parameters(request): Parameters<GenerateFaviconRequest>,
    ) -> Result<CallToolResult, McpError> {
        crate::tools::generate_favicon(&self.dispatcher, Parameters(request)).await
    }

    #[tool(
        name = "generate-svg",
        description = "Generates an SVG file with the AI-generated image embedded as base64."
    )]
    async fn generate_svg(
        &self,
        Parameters(request): Parameters<GenerateSvgRequest>,
    ) -> Result<CallToolResult, McpError> {
        crate::tools::generate_svg(&self.dispatcher, Parameters(request)).await
    }
}

impl ServerHandler for ImageGenServer {
    fn get_info(&self) -> ServerInfo {
        let profile = self.dispatcher.profile();
        ServerInfo {
            protocol_version: Default::default(),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation {
                name: "image-gen-rmcp".into(),
                title: Some("Image generation MCP server".into()),
                version: env!("CARGO_PKG_VERSION").into(),
                icons: None,
                website_url: None,
            },
            instructions: Some(format!(
                "Generates images with {} and saves them as png, ico or svg. \
                 Read resource://tool-examples for sample invocations.",
                profile.model.id()
            )),
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        std::future::ready(Ok(ListToolsResult {
            tools: self.visible_tools(),
            next_cursor: None,
            meta: None,
        }))
    }

    fn call_tool(
        &self,
        request: CallToolRequestParams,
        context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        async move {
            if !self.is_enabled(&request.name) {
                debug!(tool = %request.name, "rejected call to disabled tool");
                return Err(McpError::invalid_params(
                    format!("tool not available: {}", request.name),
                    None,
                ));
            }
            let ctx = ToolCallContext::new(self, request, context);
            self.tool_router.call(ctx).await
        }
    }

    fn list_resources(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListResourcesResult, McpError>> + Send + '_ {
        std::future::ready(Ok(ListResourcesResult {
            resources: resources::list_resources(),
            next_cursor: None,
            meta: None,
        }))
    }

    fn read_resource(
        &self,
        request: ReadResourceRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ReadResourceResult, McpError>> + Send + '_ {
        std::future::ready(resources::read_resource(
            &request.uri,
            self.dispatcher.profile(),
        ))
    }
}
