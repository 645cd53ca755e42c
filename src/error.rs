use thiserror::Error;

#[derive(Error, Debug)]
pub enum ForensicsError {
    #[error("Image loading error: {0}")]
    ImageLoad(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Codec round trip failed: {0}")]
    Codec(String),

    #[error("OCR error: {0}")]
    Ocr(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Pixel buffer has {actual} samples, expected {expected}")]
    InvalidBuffer { expected: usize, actual: usize },

    #[error("Report serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Analysis cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, ForensicsError>;
