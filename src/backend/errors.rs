use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Backend unreachable: {message}")]
    Network { message: String },
    #[error("Backend request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("Backend rejected credentials (HTTP {status})")]
    Unauthorized { status: u16 },
    #[error("Backend answered HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Unexpected response from backend: {message}")]
    Decode { message: String },
    #[error("Invalid backend configuration: {message}")]
    Config { message: String },
}

impl BackendError {
    /// One line of operator guidance, printed by the CLI under the error
    pub fn hint(&self) -> &'static str {
        match self {
            BackendError::Network { .. } => {
                "Check that the POS API is running and api.base_url points at it"
            }
            BackendError::Timeout { .. } => {
                "The API is slow to answer; retry or raise api.timeout_seconds"
            }
            BackendError::Unauthorized { .. } => {
                "Set a valid token with POS_API_TOKEN or api.token in pos-checkout.toml"
            }
            BackendError::Status { status, .. } if *status >= 500 => {
                "The API failed internally; check the server logs before retrying"
            }
            BackendError::Status { .. } => "The API refused the request as sent; check the input",
            BackendError::Decode { .. } => {
                "The API answered in an unexpected format; check client and server versions"
            }
            BackendError::Config { .. } => "Fix the [api] section of the configuration",
        }
    }

    pub fn is_client_error(&self) -> bool {
        match self {
            BackendError::Unauthorized { .. } => true,
            BackendError::Status { status, .. } => (400..500).contains(status),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BackendError::Timeout { timeout_ms: 0 }
        } else if err.is_decode() {
            BackendError::Decode {
                message: err.to_string(),
            }
        } else if let Some(status) = err.status() {
            BackendError::Status {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            BackendError::Network {
                message: err.to_string(),
            }
        }
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        BackendError::Decode {
            message: err.to_string(),
        }
    }
}
