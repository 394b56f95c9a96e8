use std::path::PathBuf;

use thiserror::Error;

/// Why a single command did not reach (or did not complete) its request.
/// None of these end the command loop.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("error reading file {}: {source}", .path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error reading input: {0}")]
    Input(#[from] std::io::Error),

    #[error("malformed entry JSON: {0}")]
    MalformedInput(#[from] serde_json::Error),

    #[error("missing mandatory fields (date and application) in the JSON file")]
    MissingMandatoryFields,

    #[error("both date and application must be provided")]
    MissingParameters,

    #[error("request failed: {0:#}")]
    Request(anyhow::Error),
}

/// Failures talking to the gateway control plane.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{what} not found")]
    NotFound { what: String },

    #[error("control plane answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl GatewayError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, GatewayError::NotFound { .. })
    }
}

/// Startup failures. Any of these aborts the program.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("failed to list REST APIs")]
    ListApis(#[source] GatewayError),

    #[error("no API found on the gateway")]
    NoApiFound,

    #[error("no API with id or name '{selector}' found on the gateway")]
    ApiNotFound { selector: String },

    #[error("API id '{id}' does not form a valid URL: {reason}")]
    InvalidApiId { id: String, reason: String },
}
