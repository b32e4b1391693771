use std::str::FromStr;

use crate::config::ToolKind;

/// Language used for tool descriptions and error messages returned to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    En,
    PtBr,
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "en" | "en-us" => Ok(Locale::En),
            "pt" | "pt-br" => Ok(Locale::PtBr),
            other => Err(format!("unsupported locale: {other}")),
        }
    }
}

impl Locale {
    pub fn tool_title(self, kind: ToolKind) -> &'static str {
        match (self, kind) {
            (Locale::En, ToolKind::GenerateImage) => "Generate Image",
            (Locale::En, ToolKind::GenerateFavicon) => "Generate Favicon (.ico)",
            (Locale::En, ToolKind::GenerateSvg) => "Generate SVG with AI Image",
            (Locale::PtBr, ToolKind::GenerateImage) => "Gerar Imagem",
            (Locale::PtBr, ToolKind::GenerateFavicon) => "Gerar Favicon (.ico)",
            (Locale::PtBr, ToolKind::GenerateSvg) => "Gerar SVG com imagem IA",
        }
    }

    pub fn tool_description(self, kind: ToolKind) -> &'static str {
        match (self, kind) {
            (Locale::En, ToolKind::GenerateImage) => {
                "Generates a custom image using AI and delivers it in the requested format \
                 (.png, .svg, .ico). The prompt should be detailed for better results; the \
                 format defines the extension of the saved file."
            }
            (Locale::En, ToolKind::GenerateFavicon) => {
                "Generates a favicon.ico ready for websites and applications from a textual prompt."
            }
            (Locale::En, ToolKind::GenerateSvg) => {
                "Generates an SVG file with the AI-generated image embedded as base64, ready for the web."
            }
            (Locale::PtBr, ToolKind::GenerateImage) => {
                "Gera uma imagem customizada usando IA e entrega no formato solicitado \
                 (.png, .svg, .ico). O prompt deve ser detalhado para melhores resultados; o \
                 formato define a extensão do arquivo gerado."
            }
            (Locale::PtBr, ToolKind::GenerateFavicon) => {
                "Gera um favicon.ico pronto para sites e aplicações a partir de um prompt textual."
            }
            (Locale::PtBr, ToolKind::GenerateSvg) => {
                "Gera um arquivo SVG com a imagem gerada por IA embutida (base64), pronto para web."
            }
        }
    }

    pub fn error_prefix(self, kind: ToolKind) -> &'static str {
        match (self, kind) {
            (Locale::En, ToolKind::GenerateImage) => "Error generating image",
            (Locale::En, ToolKind::GenerateFavicon) => "Error generating favicon.ico",
            (Locale::En, ToolKind::GenerateSvg) => "Error generating SVG",
            (Locale::PtBr, ToolKind::GenerateImage) => "Erro ao gerar imagem",
            (Locale::PtBr, ToolKind::GenerateFavicon) => "Erro ao gerar favicon.ico",
            (Locale::PtBr, ToolKind::GenerateSvg) => "Erro ao gerar SVG",
        }
    }

    pub fn missing_credential(self) -> &'static str {
        match self {
            Locale::En => {
                "OPENAI_API_KEY not defined or invalid. Set the environment variable correctly."
            }
            Locale::PtBr => {
                "OPENAI_API_KEY não definida ou inválida. Defina a variável de ambiente corretamente."
            }
        }
    }
}
