use std::fmt;
use std::io::Cursor;
use std::str::FromStr;

use base64::Engine;
use image::codecs::ico::{IcoEncoder, IcoFrame};
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, GenericImageView, ImageFormat};
use thiserror::Error;

use crate::openai::{ImageSize, RawImage};

/// Largest edge an ICO directory entry can describe.
pub const MAX_ICON_DIMENSION: u32 = 256;
pub const DEFAULT_ICON_SIZES: [u32; 4] = [16, 32, 48, 256];
const DEFAULT_SVG_SIZE: ImageSize = ImageSize::SQUARE;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConvertError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("image encoding failed: {0}")]
    Encode(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Png,
    Ico,
    Svg,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 3] = [OutputFormat::Png, OutputFormat::Svg, OutputFormat::Ico];

    pub fn as_str(self) -> &'static str {
        self.extension()
    }

    pub fn media_type(self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Ico => "image/x-icon",
            OutputFormat::Svg => "image/svg+xml",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Ico => "ico",
            OutputFormat::Svg => "svg",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = ConvertError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(OutputFormat::Png),
            "ico" => Ok(OutputFormat::Ico),
            "svg" => Ok(OutputFormat::Svg),
            _ => Err(ConvertError::UnsupportedFormat(value.to_string())),
        }
    }
}

/// How a bitmap is normalized before it is packed into an ICO container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IconSizing {
    /// One square frame per size, stretched to `size x size`.
    Square(Vec<u32>),
    /// A single frame at native size, scaled down only when it exceeds 256px.
    Fit,
}

impl Default for IconSizing {
    fn default() -> Self {
        IconSizing::Square(DEFAULT_ICON_SIZES.to_vec())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedArtifact {
    pub bytes: Vec<u8>,
    pub media_type: &'static str,
    pub extension: &'static str,
}

impl EncodedArtifact {
    fn new(format: OutputFormat, bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            media_type: format.media_type(),
            extension: format.extension(),
        }
    }

    pub fn is_textual(&self) -> bool {
        self.media_type == OutputFormat::Svg.media_type()
    }
}

/// Re-encodes generated PNG bytes into the requested container.
#[derive(Debug, Clone, Default)]
pub struct FormatConverter {
    icon_sizing: IconSizing,
}

impl FormatConverter {
    pub fn new(icon_sizing: IconSizing) -> Self {
        Self { icon_sizing }
    }

    pub fn convert(
        &self,
        image: &RawImage,
        format: OutputFormat,
    ) -> Result<EncodedArtifact, ConvertError> {
        let bytes = match format {
            OutputFormat::Png => image.bytes.clone(),
            OutputFormat::Ico => encode_ico(&image.bytes, &self.icon_sizing)?,
            OutputFormat::Svg => build_svg(&image.bytes, image.size.unwrap_or(DEFAULT_SVG_SIZE))
                .into_bytes(),
        };
        Ok(EncodedArtifact::new(format, bytes))
    }

    pub fn convert_token(
        &self,
        image: &RawImage,
        format: &str,
    ) -> Result<EncodedArtifact, ConvertError> {
        self.convert(image, format.parse()?)
    }
}

fn encode_ico(png: &[u8], sizing: &IconSizing) -> Result<Vec<u8>, ConvertError> {
    let source = image::load_from_memory_with_format(png, ImageFormat::Png)
        .map_err(|err| ConvertError::Encode(format!("decode png failed: {err}")))?;

    let images: Vec<DynamicImage> = match sizing {
        IconSizing::Square(sizes) => sizes
            .iter()
            .map(|&size| source.resize_exact(size, size, FilterType::Lanczos3))
            .collect(),
        IconSizing::Fit => {
            let (width, height) = source.dimensions();
            if width > MAX_ICON_DIMENSION || height > MAX_ICON_DIMENSION {
                vec![source.resize(MAX_ICON_DIMENSION, MAX_ICON_DIMENSION, FilterType::Lanczos3)]
            } else {
                vec![source]
            }
        }
    };
    if images.is_empty() {
        return Err(ConvertError::Encode("no icon sizes configured".to_string()));
    }

    let mut frames = Vec::with_capacity(images.len());
    for image in &images {
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        let frame = IcoFrame::as_png(rgba.as_raw(), width, height, ExtendedColorType::Rgba8)
            .map_err(|err| ConvertError::Encode(format!("encode icon frame failed: {err}")))?;
        frames.push(frame);
    }

    let mut output = Vec::new();
    IcoEncoder::new(Cursor::new(&mut output))
        .encode_images(&frames)
        .map_err(|err| ConvertError::Encode(format!("encode ico failed: {err}")))?;
    Ok(output)
}

fn build_svg(png: &[u8], size: ImageSize) -> String {
    let b64 = base64::engine::general_purpose::STANDARD.encode(png);
    let ImageSize { width, height } = size;
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\">\
         <image href=\"data:image/png;base64,{b64}\" width=\"{width}\" height=\"{height}\"/></svg>"
    )
}

const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

pub fn is_png(bytes: &[u8]) -> bool {
    bytes.starts_with(&PNG_SIGNATURE)
}
