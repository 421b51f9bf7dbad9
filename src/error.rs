//! Error types shared by the daemon client, price source and sync loops

use thiserror::Error;

/// Errors returned by calls against the storage daemon's REST API
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Connection refused, timeout, DNS failure and friends
    #[error("daemon request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx response from the daemon
    #[error("daemon returned {status}: {message}")]
    Api { status: u16, message: String },

    /// Successful response without a JSON body where one was required
    #[error("daemon response from {endpoint} had no JSON body")]
    MissingBody { endpoint: String },

    /// Body present but not in the expected shape
    #[error("unexpected response from {endpoint}: {reason}")]
    InvalidResponse { endpoint: String, reason: String },
}

impl DaemonError {
    /// Builds an API error from the daemon's `{"message": ...}` error body
    pub fn from_body(status: u16, body: Option<&serde_json::Value>) -> Self {
        let message = body
            .and_then(|b| b.get("message"))
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| "no error message".to_string());

        Self::Api { status, message }
    }
}

/// Errors from the external exchange-rate / peer / explorer service
#[derive(Debug, Error)]
pub enum PriceSourceError {
    #[error("price source request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("price source error: {0}")]
    Api(String),

    #[error("invalid price source response: {0}")]
    InvalidResponse(String),
}

/// Errors raised while reconciling price pins with the host configuration
#[derive(Debug, Error)]
pub enum PricingError {
    #[error("unable to set pricing for {key}: {reason}")]
    Conversion { key: String, reason: String },

    #[error("host configuration has not been loaded yet")]
    MissingHostConfig,

    #[error(transparent)]
    Daemon(#[from] DaemonError),
}

impl PricingError {
    pub fn conversion(key: &str, reason: impl Into<String>) -> Self {
        Self::Conversion {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

/// Fatal errors of the refresh orchestrator
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("API credentials invalid")]
    InvalidCredentials,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_api_error_uses_daemon_message() {
        let body = json!({ "message": "wallet is locked" });
        let err = DaemonError::from_body(400, Some(&body));
        assert_eq!(err.to_string(), "daemon returned 400: wallet is locked");
    }

    #[test]
    fn test_api_error_without_body() {
        let err = DaemonError::from_body(502, None);
        assert!(matches!(err, DaemonError::Api { status: 502, .. }));
        assert!(err.to_string().contains("no error message"));
    }

    #[test]
    fn test_conversion_error_names_key() {
        let err = PricingError::conversion("collateral", "unknown currency xyz");
        let msg = err.to_string();
        assert!(msg.contains("collateral"));
        assert!(msg.contains("unknown currency xyz"));
    }
}
