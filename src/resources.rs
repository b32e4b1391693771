//! Read-only descriptive resources: usage examples and the supported format list.

use rmcp::{
    ErrorData as McpError,
    model::{AnnotateAble, Annotated, RawResource, ReadResourceResult, ResourceContents},
};
use serde_json::{Map, Value, json};

use crate::{
    config::{ServerProfile, ToolKind},
    image_processing::OutputFormat,
    openai::ImageSize,
};

pub const URI_TOOL_EXAMPLES: &str = "resource://tool-examples";
pub const URI_SUPPORTED_FORMATS: &str = "formats://supported";

const JSON_MIME: &str = "application/json";

pub fn list_resources() -> Vec<Annotated<RawResource>> {
    vec![
        RawResource {
            uri: URI_TOOL_EXAMPLES.into(),
            name: "tool-examples".into(),
            title: Some("Tool Usage Examples".into()),
            description: Some(
                "Practical examples of using the tools available in this MCP server.".into(),
            ),
            mime_type: Some(JSON_MIME.into()),
            size: None,
            icons: None,
            meta: None,
        }
        .no_annotation(),
        RawResource {
            uri: URI_SUPPORTED_FORMATS.into(),
            name: "supported-formats".into(),
            title: Some("Supported Formats".into()),
            description: Some("List of image formats supported by the server.".into()),
            mime_type: Some(JSON_MIME.into()),
            size: None,
            icons: None,
            meta: None,
        }
        .no_annotation(),
    ]
}

pub fn read_resource(uri: &str, profile: &ServerProfile) -> Result<ReadResourceResult, McpError> {
    let text = match uri {
        URI_TOOL_EXAMPLES => serde_json::to_string_pretty(&tool_examples(profile)),
        URI_SUPPORTED_FORMATS => serde_json::to_string(&supported_formats()),
        _ => {
            return Err(McpError::invalid_params(
                format!("Unknown resource URI: {uri}"),
                None,
            ));
        }
    }
    .map_err(|err| McpError::internal_error(format!("serialize resource failed: {err}"), None))?;

    Ok(ReadResourceResult {
        contents: vec![ResourceContents::TextResourceContents {
            uri: uri.into(),
            mime_type: Some(JSON_MIME.into()),
            text,
            meta: None,
        }],
    })
}

pub fn supported_formats() -> Vec<&'static str> {
    OutputFormat::ALL.iter().map(|format| format.as_str()).collect()
}

/// One entry of the examples resource.
struct Example {
    prompt: &'static str,
    format: Option<OutputFormat>,
    size: ImageSize,
    opaque: bool,
    description: &'static str,
}

fn examples_for(kind: ToolKind) -> Vec<Example> {
    match kind {
        ToolKind::GenerateImage => vec![
            Example {
                prompt: "minimalist rocket icon transparent background",
                format: Some(OutputFormat::Png),
                size: ImageSize::SQUARE,
                opaque: false,
                description: "Generates a rocket icon in PNG.",
            },
            Example {
                prompt: "golden star icon",
                format: Some(OutputFormat::Ico),
                size: ImageSize::SQUARE,
                opaque: true,
                description: "Generates a golden star icon in .ico format.",
            },
            Example {
                prompt: "blue circular logo with letter A",
                format: Some(OutputFormat::Svg),
                size: ImageSize::LANDSCAPE,
                opaque: false,
                description: "Generates a blue circular logo with letter A in SVG.",
            },
        ],
        ToolKind::GenerateFavicon => vec![Example {
            prompt: "yellow star favicon transparent background",
            format: None,
            size: ImageSize::SQUARE,
            opaque: false,
            description: "Generates a yellow star favicon.",
        }],
        ToolKind::GenerateSvg => vec![Example {
            prompt: "red heart icon",
            format: None,
            size: ImageSize::PORTRAIT,
            opaque: true,
            description: "Generates an SVG with a red heart icon.",
        }],
    }
}

fn tool_examples(profile: &ServerProfile) -> Value {
    let mut tools = Map::new();
    for kind in ToolKind::ALL {
        if !profile.is_enabled(kind) {
            continue;
        }
        let examples: Vec<Value> = examples_for(kind)
            .into_iter()
            .map(|example| {
                let mut arguments = Map::new();
                arguments.insert("prompt".into(), json!(example.prompt));
                if let Some(format) = example.format {
                    arguments.insert("format".into(), json!(format.as_str()));
                }
                if profile.supported_sizes.len() > 1 {
                    let size = if profile.supports_size(example.size) {
                        example.size
                    } else {
                        profile.default_size()
                    };
                    arguments.insert("size".into(), json!(size.to_string()));
                }
                if profile.supports_background {
                    let background = if example.opaque { "opaque" } else { "transparent" };
                    arguments.insert("background".into(), json!(background));
                }
                json!({
                    "arguments": arguments,
                    "description": example.description,
                })
            })
            .collect();
        tools.insert(kind.name().into(), Value::Array(examples));
    }
    Value::Object(tools)
}
