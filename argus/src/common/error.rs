use std::fmt;

#[derive(Debug)]
pub enum Error {
    InvalidFrame(String),
    InvalidColorFormat(String),
    UnsupportedFormat(String),
    Gpu(String),
    NoGpuContext,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidFrame(msg) => write!(f, "Invalid frame: {}", msg),
            Error::InvalidColorFormat(msg) => write!(f, "Invalid color format: {}", msg),
            Error::UnsupportedFormat(msg) => write!(f, "Unsupported format: {}", msg),
            Error::Gpu(msg) => write!(f, "GPU error: {}", msg),
            Error::NoGpuContext => write!(f, "GPU context not available"),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
