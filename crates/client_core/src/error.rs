use shared::domain::ValidationError;
use thiserror::Error;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// The request never produced a usable response.
    #[error("transport error: {0}")]
    Transport(String),
    /// The API answered with a non-2xx status.
    #[error("{message}")]
    Api { status: u16, message: String },
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl ClientError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Text shown to the user: the server's own message for API errors, the
    /// validation reason for rejected input, otherwise `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Api { message, .. } => message.clone(),
            Self::Validation(err) => err.to_string(),
            Self::Transport(_) => fallback.to_string(),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(value.to_string())
    }
}
