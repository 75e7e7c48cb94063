use thiserror::Error;

pub type Result<T> = std::result::Result<T, TextError>;

#[derive(Error, Debug)]
pub enum TextError {
    #[error("invalid regex pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("placeholder {0} referenced in output but never issued")]
    UnknownPlaceholder(String),

    #[error("segment boundary out of range: {0}")]
    BadBoundary(String),
}

impl From<TextError> for tone_core::Error {
    fn from(e: TextError) -> Self {
        tone_core::Error::Pipeline(e.to_string())
    }
}
