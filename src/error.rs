//! Error types and handling for postal-distance.

/// Result type alias for postal-distance operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for postal-distance operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid or missing configuration
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Network or HTTP transport failure
    #[error("Transport error: {message}")]
    Transport {
        /// Error message
        message: String,
    },

    /// A response body could not be decoded
    #[error("Decode error: {message}")]
    Decode {
        /// Error message
        message: String,
    },

    /// OCR engine failure
    #[error("OCR error: {message}")]
    Ocr {
        /// Error message
        message: String,
    },

    /// Uploaded file is not a supported image type
    #[error("Unsupported image type: {path} (expected png, jpg or jpeg)")]
    UnsupportedImage {
        /// Offending path
        path: String,
    },

    /// Uploaded image could not be decoded
    #[error("Could not decode image {path}: {message}")]
    ImageDecode {
        /// Offending path
        path: String,
        /// Decoder message
        message: String,
    },

    /// Address parser or expander failure
    #[error("Address backend error: {message}")]
    Backend {
        /// Error message
        message: String,
    },

    /// Map rendering failure
    #[error("Render error: {message}")]
    Render {
        /// Error message
        message: String,
    },

    /// I/O errors
    #[error("I/O error: {source}")]
    Io {
        /// Source error
        #[from]
        source: std::io::Error,
    },
}

impl Error {
    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a new decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create a new OCR error
    pub fn ocr(message: impl Into<String>) -> Self {
        Self::Ocr {
            message: message.into(),
        }
    }

    /// Create a new address backend error
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Create a new render error
    pub fn render(message: impl Into<String>) -> Self {
        Self::Render {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for Error {
    /// The request URL is dropped: its query string carries the API key.
    fn from(err: reqwest::Error) -> Self {
        let err = err.without_url();
        if err.is_decode() {
            Self::decode(err.to_string())
        } else {
            Self::transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            Error::config("missing api key").to_string(),
            "Configuration error: missing api key"
        );
        assert_eq!(
            Error::UnsupportedImage {
                path: "scan.gif".to_string()
            }
            .to_string(),
            "Unsupported image type: scan.gif (expected png, jpg or jpeg)"
        );
    }

    #[test]
    fn test_io_conversion() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, Error::Io { .. }));
    }
}
