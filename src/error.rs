use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParlanceError {
    #[error("I/O error: {0}")]
    Io(Box<std::io::Error>),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(Box<reqwest::Error>),

    #[error("service error: {0}")]
    Service(String),

    #[error("no phrase {phrase:?} recorded under keyword {keyword:?}")]
    NotFound { keyword: String, phrase: String },

    #[error("could not generate a phrase for {keyword:?} after {attempts} attempts")]
    GenerationExhausted { keyword: String, attempts: u32 },

    #[error("an API key is required to run parlance")]
    MissingApiKey,
}

impl From<std::io::Error> for ParlanceError {
    fn from(error: std::io::Error) -> Self {
        ParlanceError::Io(Box::new(error))
    }
}

impl From<reqwest::Error> for ParlanceError {
    fn from(error: reqwest::Error) -> Self {
        ParlanceError::Http(Box::new(error))
    }
}

pub type Result<T> = std::result::Result<T, ParlanceError>;
