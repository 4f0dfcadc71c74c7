use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized - credential rejected: {}", ApiError::truncate_body(.0))]
    Unauthorized(String),

    #[error("Access denied: {}", ApiError::truncate_body(.0))]
    AccessDenied(String),

    #[error("Resource not found: {}", ApiError::truncate_body(.0))]
    NotFound(String),

    #[error("Request rejected: {}", ApiError::truncate_body(.0))]
    BadRequest(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {}", ApiError::truncate_body(.0))]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Shown when the server gave nothing better
const FALLBACK_MESSAGE: &str = "Something went wrong";

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

    /// Map a failed status to an error. The full body is kept so the
    /// server's `message` survives; only the `Display` text is truncated.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let body = body.to_string();
        match status.as_u16() {
            401 => ApiError::Unauthorized(body),
            403 => ApiError::AccessDenied(body),
            404 => ApiError::NotFound(body),
            400 | 409 | 422 => ApiError::BadRequest(body),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(body),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, Self::truncate_body(&body))),
        }
    }

    /// True when the server rejected the presented credential.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }

    /// Message suitable for showing next to a form.
    ///
    /// Prefers the `message` field of a JSON error body, which may be a
    /// string or a list of validation messages.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Unauthorized(body)
            | ApiError::AccessDenied(body)
            | ApiError::NotFound(body)
            | ApiError::BadRequest(body)
            | ApiError::ServerError(body) => {
                server_message(body).unwrap_or_else(|| FALLBACK_MESSAGE.to_string())
            }
            ApiError::RateLimited => "Too many requests. Please wait and try again.".to_string(),
            ApiError::NetworkError(e) if e.is_timeout() => {
                "Connection timed out. Please try again.".to_string()
            }
            ApiError::NetworkError(_) => {
                "Unable to connect to server. Check your connection.".to_string()
            }
            ApiError::InvalidResponse(_) => FALLBACK_MESSAGE.to_string(),
        }
    }
}

fn server_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("message")? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Array(items) => {
            let parts: Vec<&str> = items.iter().filter_map(|v| v.as_str()).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join("; "))
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_mapping() {
        assert!(ApiError::from_status(StatusCode::UNAUTHORIZED, "").is_unauthorized());
        assert!(matches!(
            ApiError::from_status(StatusCode::FORBIDDEN, "no"),
            ApiError::AccessDenied(_)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::NOT_FOUND, ""),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::CONFLICT, ""),
            ApiError::BadRequest(_)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::TOO_MANY_REQUESTS, ""),
            ApiError::RateLimited
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::BAD_GATEWAY, ""),
            ApiError::ServerError(_)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::IM_A_TEAPOT, ""),
            ApiError::InvalidResponse(_)
        ));
    }

    #[test]
    fn test_truncate_body() {
        let long = "x".repeat(600);
        let truncated = ApiError::truncate_body(&long);
        assert!(truncated.starts_with(&"x".repeat(500)));
        assert!(truncated.contains("600 total bytes"));
        assert_eq!(ApiError::truncate_body("short"), "short");
    }

    #[test]
    fn test_truncate_body_respects_char_boundaries() {
        let long = "é".repeat(400);
        let truncated = ApiError::truncate_body(&long);
        assert!(truncated.contains("800 total bytes"));
    }

    #[test]
    fn test_user_message_prefers_server_message() {
        let err = ApiError::from_status(
            StatusCode::UNAUTHORIZED,
            r#"{"statusCode":401,"message":"Invalid credentials"}"#,
        );
        assert_eq!(err.user_message(), "Invalid credentials");

        let err = ApiError::from_status(
            StatusCode::BAD_REQUEST,
            r#"{"message":["email must be an email","password too short"]}"#,
        );
        assert_eq!(err.user_message(), "email must be an email; password too short");
    }

    #[test]
    fn test_user_message_survives_long_body() {
        let messages: Vec<String> = (0..40)
            .map(|i| format!("field{} must be longer than 6 characters", i))
            .collect();
        let body = serde_json::json!({ "statusCode": 400, "message": messages }).to_string();
        assert!(body.len() > MAX_ERROR_BODY_LENGTH);

        let err = ApiError::from_status(StatusCode::BAD_REQUEST, &body);
        assert!(err.user_message().starts_with("field0 must be longer than 6 characters; field1"));
        assert!(err.user_message().ends_with("field39 must be longer than 6 characters"));
        assert!(err.to_string().contains("(truncated,"));
    }

    #[test]
    fn test_user_message_fallback() {
        let err = ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, "<html>oops</html>");
        assert_eq!(err.user_message(), "Something went wrong");
        let err = ApiError::InvalidResponse("bad json".to_string());
        assert_eq!(err.user_message(), "Something went wrong");
    }
}
