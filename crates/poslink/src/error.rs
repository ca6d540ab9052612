//! CLI error types with miette diagnostics.
//!
//! Maps `poslink_api::Error` and `ConfigError` into user-facing errors with
//! actionable help text and a stable exit code.

use miette::Diagnostic;
use thiserror::Error;

use poslink_config::ConfigError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the backend: {message}")]
    #[diagnostic(
        code(poslink::connection_failed),
        help(
            "Check that the backend is running and the base URL is right.\n\
             Override it with --base-url or POSLINK_BASE_URL."
        )
    )]
    ConnectionFailed { message: String },

    #[error("Backend still failing after {attempts} attempts: {message}")]
    #[diagnostic(
        code(poslink::retries_exhausted),
        help("The backend kept answering with server errors or timing out. Try again later.")
    )]
    RetriesExhausted { attempts: u32, message: String },

    #[error("TLS error: {message}")]
    #[diagnostic(
        code(poslink::tls_error),
        help(
            "Use --insecure (-k) for self-signed development certificates,\n\
             or set api.ca_cert in the config file."
        )
    )]
    TlsError { message: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(poslink::auth_failed),
        help("Log in again with: poslink login <username>")
    )]
    AuthFailed { message: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("Not found: {message}")]
    #[diagnostic(code(poslink::not_found))]
    NotFound { message: String },

    // ── API ──────────────────────────────────────────────────────────
    #[error("Request rejected (HTTP {status}): {message}")]
    #[diagnostic(code(poslink::rejected))]
    Rejected { status: u16, message: String },

    #[error("Server error (HTTP {status}): {message}")]
    #[diagnostic(code(poslink::server_error))]
    ServerError { status: u16, message: String },

    #[error("Unexpected response: {message}")]
    #[diagnostic(code(poslink::api_error))]
    ApiError { message: String },

    #[error("Token storage failed: {message}")]
    #[diagnostic(
        code(poslink::token_store),
        help("Check [token] in the config file; backend = \"file\" works everywhere.")
    )]
    TokenStore { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(poslink::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(
        code(poslink::config),
        help("Inspect the effective settings with: poslink config show")
    )]
    Config(#[from] ConfigError),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(code(poslink::json), help("Check the JSON body and try again."))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::RetriesExhausted { .. } | Self::TlsError { .. } => {
                exit_code::CONNECTION
            }
            Self::AuthFailed { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::Config(ConfigError::Validation { .. }) => {
                exit_code::USAGE
            }
            _ => exit_code::GENERAL,
        }
    }

    pub fn validation(field: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// ── poslink_api::Error → CliError mapping ────────────────────────────

impl From<poslink_api::Error> for CliError {
    fn from(err: poslink_api::Error) -> Self {
        use poslink_api::Error as E;

        match err {
            E::ClientRequest {
                status: 401 | 403,
                message,
            } => Self::AuthFailed { message },
            E::ClientRequest {
                status: 404,
                message,
            } => Self::NotFound { message },
            E::ClientRequest { status, message } => Self::Rejected { status, message },
            E::Server { status, message } => Self::ServerError { status, message },
            E::MaxRetriesExceeded { attempts, message } => {
                Self::RetriesExhausted { attempts, message }
            }
            E::Transport(e) => Self::ConnectionFailed {
                message: e.to_string(),
            },
            E::WebSocketConnect(message) => Self::ConnectionFailed { message },
            E::Tls(message) => Self::TlsError { message },
            E::TokenStore(message) => Self::TokenStore { message },
            E::InvalidUrl(e) => Self::Validation {
                field: "url".into(),
                reason: e.to_string(),
            },
            E::Encode(e) => Self::Json(e),
            other @ (E::Deserialization { .. } | E::Protocol(_)) => Self::ApiError {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_statuses_map_to_exit_codes() {
        let cases = [
            (401, exit_code::AUTH),
            (403, exit_code::AUTH),
            (404, exit_code::NOT_FOUND),
            (409, exit_code::GENERAL),
        ];
        for (status, expected) in cases {
            let err = CliError::from(poslink_api::Error::ClientRequest {
                status,
                message: "nope".into(),
            });
            assert_eq!(err.exit_code(), expected, "status {status}");
        }
    }

    #[test]
    fn invalid_settings_are_usage_errors() {
        let err = CliError::from(ConfigError::Validation {
            field: "api.base_url".into(),
            reason: "expected http or https, got 'ftp'".into(),
        });
        assert_eq!(err.exit_code(), exit_code::USAGE);
        assert_eq!(CliError::validation("header", "bad").exit_code(), exit_code::USAGE);
    }

    #[test]
    fn exhausted_retries_are_connection_failures() {
        let err = CliError::from(poslink_api::Error::MaxRetriesExceeded {
            attempts: 3,
            message: "Request failed".into(),
        });
        assert_eq!(err.exit_code(), exit_code::CONNECTION);
        assert_eq!(
            err.to_string(),
            "Backend still failing after 3 attempts: Request failed"
        );
    }
}
