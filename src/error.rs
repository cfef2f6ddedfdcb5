use thiserror::Error;

/// Failures talking to the homeserver.
#[derive(Debug, Error)]
pub enum MatrixError {
    #[error("{0}")]
    Http(#[from] reqwest::Error),

    /// Standard `{errcode, error}` body from a non-2xx response.
    #[error("{message}")]
    Api {
        status: u16,
        errcode: String,
        message: String,
    },

    #[error("Invalid homeserver response: {0}")]
    Decode(String),

    #[error("Invalid homeserver URL: {0}")]
    InvalidUrl(String),
}

impl MatrixError {
    /// The access token was rejected; syncing further is pointless.
    pub fn is_unauthorized(&self) -> bool {
        match self {
            MatrixError::Api {
                status, errcode, ..
            } => *status == 401 || errcode == "M_UNKNOWN_TOKEN",
            _ => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Missing credentials")]
    MissingCredentials,

    /// Message passed through from the homeserver or transport.
    #[error("{0}")]
    LoginFailed(String),

    #[error("Not logged in")]
    NotLoggedIn,

    #[error(transparent)]
    Matrix(#[from] MatrixError),
}

#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid AI response")]
    InvalidResponse,
}
