use thiserror::Error;

/// Errors raised by the remote photo service.
///
/// `ApiResponse` is the distinguished failure the per-photo layer converts
/// into a failed outcome; `is_transient()` decides whether the album loop
/// should back off before moving on.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("API response error: {reason} (code: {code})")]
    ApiResponse { reason: String, code: String },
    #[error("Album '{name}' not found. Available albums: {available:?}")]
    AlbumNotFound { name: String, available: Vec<String> },
    #[error("Connection error: {0}")]
    Connection(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ServiceError {
    pub fn api(reason: impl Into<String>, code: impl Into<String>) -> Self {
        ServiceError::ApiResponse {
            reason: reason.into(),
            code: code.into(),
        }
    }

    /// Classify a request that never got a response. Refused or
    /// unreachable hosts become [`ServiceError::Connection`].
    pub(crate) fn from_send(e: reqwest::Error) -> Self {
        if e.is_connect() {
            ServiceError::Connection(e.to_string())
        } else {
            ServiceError::Http(e)
        }
    }

    /// Whether a later attempt at the same request could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ServiceError::ApiResponse { code, .. } => {
                code == "429" || code.starts_with('5') || code == "TRY_AGAIN_LATER"
            }
            ServiceError::Connection(_) => true,
            ServiceError::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.is_body()
                    || e.status().is_some_and(|s| s.as_u16() == 429 || s.is_server_error())
            }
            ServiceError::AlbumNotFound { .. } | ServiceError::Json(_) => false,
        }
    }
}
