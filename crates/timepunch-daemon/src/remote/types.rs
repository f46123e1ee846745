//! Response shapes and errors for the remote swipe service.

use thiserror::Error;

/// Remote client errors. All of these are connectivity-class failures;
/// a response that decodes is never an error, even when it carries a
/// system error code or punch exception.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Remote service error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Malformed remote response: {0}")]
    Decode(String),

    #[error("Service probe failed: {0}")]
    Probe(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Decoded `RecordSwipeSummary` response.
///
/// Optional fields are modeled explicitly so a missing tag is a handled
/// case, not a runtime guard.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SwipeSummary {
    pub punch_success: bool,
    /// `"checkin"` or `"checkout"`.
    pub punch_type: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Business rejection code; looked up in the exception catalog.
    pub punch_exception: Option<i32>,
    /// Negative integer reported by the remote system for malformed or
    /// unauthorized requests. Definitive, never retried.
    pub system_error_code: Option<i32>,
    pub weekly_hours: Option<f64>,
}

/// Fixed messages for the remote system error codes.
pub const fn system_error_message(code: i32) -> &'static str {
    match code {
        -1 => "Connection not secure",
        -2 => "Input parameters not found",
        -3 => "Client not authorized",
        -4 => "Invalid input parameter format",
        -5 => "Too few input parameters",
        -6 => "Invalid date",
        _ => "Unknown system error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_documented_codes_have_messages() {
        assert_eq!(system_error_message(-1), "Connection not secure");
        assert_eq!(system_error_message(-2), "Input parameters not found");
        assert_eq!(system_error_message(-3), "Client not authorized");
        assert_eq!(system_error_message(-4), "Invalid input parameter format");
        assert_eq!(system_error_message(-5), "Too few input parameters");
        assert_eq!(system_error_message(-6), "Invalid date");
    }

    #[test]
    fn undocumented_code_gets_generic_message() {
        assert_eq!(system_error_message(-99), "Unknown system error");
    }
}
