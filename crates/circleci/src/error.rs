use pipeline_core::PipelineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CiError {
    #[error("CircleCI resource not found: {path}")]
    NotFound { path: String },

    #[error("CircleCI request {path} failed with HTTP {status}: {body}")]
    Status {
        path: String,
        status: u16,
        body: String,
    },

    #[error("CircleCI request {path} failed: {source}")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Unexpected CircleCI response for {path}: {message}")]
    Decode { path: String, message: String },

    #[error("CircleCI token is not configured (set CIRCLE_TOKEN or circleci.token)")]
    MissingToken,
}

impl CiError {
    /// Whether another attempt may succeed. A 404 is final.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CiError::Status { .. } | CiError::Transport { .. })
    }
}

impl From<CiError> for PipelineError {
    fn from(err: CiError) -> Self {
        match err {
            CiError::NotFound { path } => PipelineError::NotFound(path),
            CiError::Status { path, status, body } => PipelineError::Remote {
                path,
                status: Some(status),
                message: body,
            },
            CiError::Transport { path, source } => PipelineError::Remote {
                path,
                status: source.status().map(|s| s.as_u16()),
                message: source.to_string(),
            },
            CiError::Decode { path, message } => PipelineError::Remote {
                path,
                status: None,
                message,
            },
            CiError::MissingToken => {
                PipelineError::Configuration(CiError::MissingToken.to_string())
            }
        }
    }
}
