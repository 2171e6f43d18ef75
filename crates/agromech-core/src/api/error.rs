use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Any non-success response whose body carried a `{message}` from the server.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Unauthorized - token may be expired")]
    Unauthorized,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Shown when a failure carries nothing fit for display.
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// The `{message}` field of an error payload, if present and non-blank.
    fn server_message(body: &str) -> Option<String> {
        serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.message)
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let code = status.as_u16();
        match code {
            401 => return ApiError::Unauthorized,
            429 => return ApiError::RateLimited,
            _ => {}
        }
        if let Some(message) = Self::server_message(body) {
            return ApiError::Rejected {
                status: code,
                message,
            };
        }

        let truncated = Self::truncate_body(body);
        match code {
            403 => ApiError::AccessDenied(truncated),
            404 => ApiError::NotFound(truncated),
            500..=599 => ApiError::ServerError(truncated),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }

    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Rejected { message, .. } => message.clone(),
            ApiError::Unauthorized => "Your session has expired. Please sign in again.".to_string(),
            ApiError::AccessDenied(_) => "You do not have permission to do that.".to_string(),
            ApiError::RateLimited => self.to_string(),
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }
}

/// Display message for any error surfaced at an operation boundary.
///
/// Uses the server-provided message when an [`ApiError`] is somewhere in the
/// chain, otherwise the generic fallback.
pub fn display_message(err: &anyhow::Error) -> String {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<ApiError>())
        .map(ApiError::user_message)
        .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use reqwest::StatusCode;

    #[test]
    fn test_server_message_wins() {
        let err = ApiError::from_status(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"message": "Farmer already has a pending transaction"}"#,
        );
        assert!(matches!(err, ApiError::Rejected { status: 422, .. }));
        assert_eq!(err.user_message(), "Farmer already has a pending transaction");
    }

    #[test]
    fn test_status_mapping_without_message() {
        assert!(matches!(
            ApiError::from_status(StatusCode::UNAUTHORIZED, r#"{"message": "expired"}"#),
            ApiError::Unauthorized
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::NOT_FOUND, "<html>"),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::BAD_GATEWAY, ""),
            ApiError::ServerError(_)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::BAD_REQUEST, r#"{"message": "  "}"#),
            ApiError::InvalidResponse(_)
        ));
    }

    #[test]
    fn test_truncate_long_body() {
        let body = "x".repeat(2 * MAX_ERROR_BODY_LENGTH);
        let truncated = ApiError::truncate_body(&body);
        assert!(truncated.contains("truncated, 1000 total bytes"));
    }

    #[test]
    fn test_display_message_walks_context_chain() {
        let err = anyhow::Error::from(ApiError::Rejected {
            status: 400,
            message: "Equipment is not available".to_string(),
        })
        .context("Failed to create transaction");
        assert_eq!(display_message(&err), "Equipment is not available");

        let err = anyhow::anyhow!("socket closed").context("Failed to send request");
        assert_eq!(display_message(&err), GENERIC_FAILURE_MESSAGE);

        let err: anyhow::Result<()> =
            Err(ApiError::ServerError("stack trace".into())).context("Failed to fetch farmers");
        assert_eq!(display_message(&err.unwrap_err()), GENERIC_FAILURE_MESSAGE);
    }
}
