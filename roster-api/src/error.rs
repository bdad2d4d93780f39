//! Error types for roster-api.

use thiserror::Error;

/// Failure of a single remote call.
///
/// Non-2xx statuses and `success: false` payloads both surface as
/// [`ApiError::Protocol`]; callers never need to tell them apart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The request never produced an HTTP response (DNS, TLS, timeout, …).
    #[error("network error calling {endpoint}: {message}")]
    Transport { endpoint: String, message: String },

    /// The service answered with an error status or `success: false`.
    #[error("{}", protocol_message(.status, .message))]
    Protocol {
        status: Option<u16>,
        message: Option<String>,
    },

    /// The payload did not have the expected shape.
    #[error("unexpected response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },
}

fn protocol_message(status: &Option<u16>, message: &Option<String>) -> String {
    match (message.as_deref().map(str::trim).filter(|m| !m.is_empty()), status) {
        (Some(message), _) => message.to_string(),
        (None, Some(code)) => format!("HTTP {code}"),
        (None, None) => "invalid response".to_string(),
    }
}

pub(crate) fn decode_err(endpoint: &str, message: impl Into<String>) -> ApiError {
    ApiError::Decode {
        endpoint: endpoint.to_string(),
        message: message.into(),
    }
}
