use crate::models::GeneratedImage;
use image::ImageFormat;
use std::fmt;

pub const MIN_DIMENSION: u32 = 50;
const ACCEPTED_FORMATS: &[ImageFormat] = &[ImageFormat::Png, ImageFormat::Jpeg];

#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    Undecodable(String),
    TooSmall { width: u32, height: u32 },
    UnsupportedFormat(ImageFormat),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Undecodable(msg) => write!(f, "cannot decode image: {}", msg),
            Rejection::TooSmall { width, height } => write!(
                f,
                "image is {}x{}, minimum is {}x{}",
                width, height, MIN_DIMENSION, MIN_DIMENSION
            ),
            Rejection::UnsupportedFormat(format) => {
                write!(f, "unsupported image format: {:?}", format)
            }
        }
    }
}

/// Decodes endpoint output and rejects anything that is not a usable PNG/JPEG.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageValidator;

impl ImageValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, bytes: &[u8]) -> bool {
        match self.inspect(bytes) {
            Ok(_) => true,
            Err(reason) => {
                log::error!("Generated image rejected: {}", reason);
                false
            }
        }
    }

    /// Decode `bytes` and report why they were rejected, if they were.
    pub fn inspect(&self, bytes: &[u8]) -> Result<GeneratedImage, Rejection> {
        let format =
            image::guess_format(bytes).map_err(|e| Rejection::Undecodable(e.to_string()))?;
        let decoded = image::load_from_memory_with_format(bytes, format)
            .map_err(|e| Rejection::Undecodable(e.to_string()))?;

        let (width, height) = (decoded.width(), decoded.height());
        if width < MIN_DIMENSION || height < MIN_DIMENSION {
            return Err(Rejection::TooSmall { width, height });
        }
        if !ACCEPTED_FORMATS.contains(&format) {
            return Err(Rejection::UnsupportedFormat(format));
        }

        Ok(GeneratedImage {
            bytes: bytes.to_vec(),
            format,
            width,
            height,
        })
    }
}
