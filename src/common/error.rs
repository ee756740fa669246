use rust_tokenizers::error::TokenizerError;
use tch::TchError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RustOneIeError {
    #[error("Endpoint not available error: {0}")]
    FileDownloadError(String),

    #[error("IO error: {0}")]
    IOError(String),

    #[error("Tch tensor error: {0}")]
    TchError(String),

    #[error("Tokenizer error: {0}")]
    TokenizerError(String),

    #[error("Invalid configuration error: {0}")]
    InvalidConfigurationError(String),

    #[error("Value error: {0}")]
    ValueError(String),
}

#[cfg(feature = "remote")]
impl From<cached_path::Error> for RustOneIeError {
    fn from(error: cached_path::Error) -> Self {
        RustOneIeError::FileDownloadError(error.to_string())
    }
}

impl From<std::io::Error> for RustOneIeError {
    fn from(error: std::io::Error) -> Self {
        RustOneIeError::IOError(error.to_string())
    }
}

impl From<TokenizerError> for RustOneIeError {
    fn from(error: TokenizerError) -> Self {
        RustOneIeError::TokenizerError(error.to_string())
    }
}

impl From<TchError> for RustOneIeError {
    fn from(error: TchError) -> Self {
        RustOneIeError::TchError(error.to_string())
    }
}
