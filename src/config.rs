use std::fmt;
use std::str::FromStr;

use tracing::warn;

use crate::image_processing::{IconSizing, MAX_ICON_DIMENSION};
use crate::locale::Locale;
use crate::openai::{DEFAULT_OPENAI_BASE_URL, ImageSize, OpenAiConfig};

const DEFAULT_PORT: u16 = 3000;

/// The tools this server knows how to expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    GenerateImage,
    GenerateFavicon,
    GenerateSvg,
}

impl ToolKind {
    pub const ALL: [ToolKind; 3] = [
        ToolKind::GenerateImage,
        ToolKind::GenerateFavicon,
        ToolKind::GenerateSvg,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ToolKind::GenerateImage => "generate-image",
            ToolKind::GenerateFavicon => "generate-favicon",
            ToolKind::GenerateSvg => "generate-svg",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageModel {
    GptImage1,
    DallE3,
}

impl ImageModel {
    pub fn id(self) -> &'static str {
        match self {
            ImageModel::GptImage1 => "gpt-image-1",
            ImageModel::DallE3 => "dall-e-3",
        }
    }
}

impl FromStr for ImageModel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gpt-image-1" => Ok(ImageModel::GptImage1),
            "dall-e-3" => Ok(ImageModel::DallE3),
            other => Err(format!("unknown image model: {other}")),
        }
    }
}

/// Model-dependent capabilities and presentation settings.
#[derive(Debug, Clone)]
pub struct ServerProfile {
    pub model: ImageModel,
    /// First entry is the default size.
    pub supported_sizes: Vec<ImageSize>,
    pub supports_background: bool,
    pub enabled_tools: Vec<ToolKind>,
    pub locale: Locale,
    pub icon_sizing: IconSizing,
}

impl ServerProfile {
    pub fn gpt_image_1() -> Self {
        Self {
            model: ImageModel::GptImage1,
            supported_sizes: vec![
                ImageSize::SQUARE,
                ImageSize::LANDSCAPE,
                ImageSize::PORTRAIT,
            ],
            supports_background: true,
            enabled_tools: vec![ToolKind::GenerateImage, ToolKind::GenerateFavicon],
            locale: Locale::En,
            icon_sizing: IconSizing::default(),
        }
    }

    pub fn dall_e_3() -> Self {
        Self {
            model: ImageModel::DallE3,
            supported_sizes: vec![ImageSize::SQUARE],
            supports_background: false,
            enabled_tools: ToolKind::ALL.to_vec(),
            locale: Locale::PtBr,
            icon_sizing: IconSizing::default(),
        }
    }

    pub fn for_model(model: ImageModel) -> Self {
        match model {
            ImageModel::GptImage1 => Self::gpt_image_1(),
            ImageModel::DallE3 => Self::dall_e_3(),
        }
    }

    pub fn default_size(&self) -> ImageSize {
        self.supported_sizes
            .first()
            .copied()
            .unwrap_or(ImageSize::SQUARE)
    }

    pub fn supports_size(&self, size: ImageSize) -> bool {
        self.supported_sizes.contains(&size)
    }

    pub fn is_enabled(&self, kind: ToolKind) -> bool {
        self.enabled_tools.contains(&kind)
    }

    pub fn set_tool_enabled(&mut self, kind: ToolKind, enabled: bool) {
        self.enabled_tools.retain(|existing| *existing != kind);
        if enabled {
            self.enabled_tools.push(kind);
        }
    }
}

impl Default for ServerProfile {
    fn default() -> Self {
        Self::gpt_image_1()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Stdio,
    Http,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub openai: OpenAiConfig,
    pub profile: ServerProfile,
    pub transport: Transport,
    pub port: u16,
    pub secret_key: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let model = match value("IMAGE_MODEL") {
            Some(raw) => raw.parse::<ImageModel>().unwrap_or_else(|err| {
                warn!(%err, "falling back to gpt-image-1");
                ImageModel::GptImage1
            }),
            None => ImageModel::GptImage1,
        };
        let mut profile = ServerProfile::for_model(model);

        if let Some(raw) = value("MESSAGE_LOCALE") {
            match raw.parse::<Locale>() {
                Ok(locale) => profile.locale = locale,
                Err(err) => warn!(%err, "keeping profile locale"),
            }
        }
        if let Some(raw) = value("ENABLE_SVG_TOOL") {
            match parse_flag(&raw) {
                Some(enabled) => profile.set_tool_enabled(ToolKind::GenerateSvg, enabled),
                None => warn!(value = %raw, "ENABLE_SVG_TOOL is not a boolean, ignoring"),
            }
        }
        if let Some(raw) = value("ICO_SIZES") {
            match parse_icon_sizing(&raw) {
                Some(sizing) => profile.icon_sizing = sizing,
                None => warn!(value = %raw, "invalid ICO_SIZES, using default icon sizes"),
            }
        }

        let transport = match value("MCP_TRANSPORT").as_deref().map(str::trim) {
            None | Some("stdio") => Transport::Stdio,
            Some("http") => Transport::Http,
            Some(other) => {
                warn!(value = %other, "unknown MCP_TRANSPORT, using stdio");
                Transport::Stdio
            }
        };
        let port = value("MCP_PORT")
            .and_then(|raw| raw.trim().parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        let openai = OpenAiConfig {
            api_key: value("OPENAI_API_KEY").map(|key| key.trim().to_string()),
            base_url: value("OPENAI_BASE_URL")
                .map(|url| url.trim().trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            model,
        };

        Self {
            openai,
            profile,
            transport,
            port,
            secret_key: value("SECRET_KEY").map(|key| key.trim().to_string()),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }

    pub fn mcp_path(&self) -> String {
        match self.secret_key.as_deref() {
            Some(secret) => format!("/{secret}/mcp"),
            None => "/mcp".to_string(),
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_icon_sizing(raw: &str) -> Option<IconSizing> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("fit") {
        return Some(IconSizing::Fit);
    }
    let mut sizes = Vec::new();
    for part in trimmed.split(',') {
        let size = part.trim().parse::<u32>().ok()?;
        if size == 0 || size > MAX_ICON_DIMENSION {
            return None;
        }
        if !sizes.contains(&size) {
            sizes.push(size);
        }
    }
    Some(IconSizing::Square(sizes))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> AppConfig {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        AppConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_to_gpt_image_1_over_stdio() {
        let config = config_from(&[]);
        assert_eq!(config.openai.model, ImageModel::GptImage1);
        assert_eq!(config.openai.base_url, DEFAULT_OPENAI_BASE_URL);
        assert!(config.openai.api_key.is_none());
        assert_eq!(config.transport, Transport::Stdio);
        assert_eq!(config.port, 3000);
        assert_eq!(config.mcp_path(), "/mcp");
        assert!(!config.profile.is_enabled(ToolKind::GenerateSvg));
        assert_eq!(config.profile.default_size(), ImageSize::SQUARE);
    }

    #[test]
    fn dall_e_3_profile_has_single_size_and_svg_tool() {
        let config = config_from(&[("IMAGE_MODEL", "dall-e-3")]);
        let profile = &config.profile;
        assert_eq!(profile.supported_sizes, vec![ImageSize::SQUARE]);
        assert!(!profile.supports_background);
        assert!(profile.is_enabled(ToolKind::GenerateSvg));
        assert_eq!(profile.locale, Locale::PtBr);
    }

    #[test]
    fn overrides_apply_on_top_of_profile() {
        let config = config_from(&[
            ("OPENAI_API_KEY", "  sk-test-key-123  "),
            ("OPENAI_BASE_URL", "http://localhost:9000/v1/"),
            ("MESSAGE_LOCALE", "pt-BR"),
            ("ENABLE_SVG_TOOL", "true"),
            ("ICO_SIZES", "32, 64"),
            ("MCP_TRANSPORT", "http"),
            ("MCP_PORT", "8080"),
            ("SECRET_KEY", "abc"),
        ]);
        assert_eq!(config.openai.api_key.as_deref(), Some("sk-test-key-123"));
        assert_eq!(config.openai.base_url, "http://localhost:9000/v1");
        assert_eq!(config.profile.locale, Locale::PtBr);
        assert!(config.profile.is_enabled(ToolKind::GenerateSvg));
        assert_eq!(config.profile.icon_sizing, IconSizing::Square(vec![32, 64]));
        assert_eq!(config.transport, Transport::Http);
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.mcp_path(), "/abc/mcp");
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let config = config_from(&[
            ("IMAGE_MODEL", "midjourney"),
            ("ICO_SIZES", "16,512"),
            ("MCP_TRANSPORT", "carrier-pigeon"),
            ("MCP_PORT", "not-a-port"),
            ("ENABLE_SVG_TOOL", "maybe"),
        ]);
        assert_eq!(config.openai.model, ImageModel::GptImage1);
        assert_eq!(config.profile.icon_sizing, IconSizing::default());
        assert_eq!(config.transport, Transport::Stdio);
        assert_eq!(config.port, 3000);
        assert!(!config.profile.is_enabled(ToolKind::GenerateSvg));
    }

    #[test]
    fn ico_sizes_accepts_fit() {
        let config = config_from(&[("ICO_SIZES", "FIT")]);
        assert_eq!(config.profile.icon_sizing, IconSizing::Fit);
    }

    #[test]
    fn disabling_a_tool_removes_it() {
        let mut profile = ServerProfile::dall_e_3();
        profile.set_tool_enabled(ToolKind::GenerateSvg, false);
        assert!(!profile.is_enabled(ToolKind::GenerateSvg));
        assert_eq!(profile.enabled_tools.len(), 2);
    }

    #[test]
    fn tool_names_round_trip() {
        for kind in ToolKind::ALL {
            assert_eq!(ToolKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ToolKind::from_name("generate-video"), None);
    }
}
