use std::fmt;

use serde::Deserialize;

/// Error code returned by the table API when a single-row read matches nothing.
pub const NOT_FOUND_CODE: &str = "PGRST116";

/// Error reported by the data service (or by the transport talking to it).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceError {
    status: u16,
    code: Option<String>,
    message: String,
}

impl ServiceError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    #[cfg(test)]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(406, message).with_code(NOT_FOUND_CODE)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(401, message)
    }

    pub fn transport(err: reqwest::Error) -> Self {
        Self::new(0, format!("request failed: {err}"))
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_not_found(&self) -> bool {
        self.code() == Some(NOT_FOUND_CODE) || self.status == 404
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401 || self.status == 403
    }

    /// Builds an error from a non-success response body.
    ///
    /// The table API answers `{code, message}`, the auth API
    /// `{error, error_description}` or `{msg}`, storage `{statusCode, error, message}`.
    pub fn from_response(status: u16, body: &str) -> Self {
        #[derive(Deserialize)]
        struct Payload {
            #[serde(default)]
            code: Option<serde_json::Value>,
            #[serde(default)]
            message: Option<String>,
            #[serde(default)]
            msg: Option<String>,
            #[serde(default)]
            error: Option<String>,
            #[serde(default)]
            error_description: Option<String>,
        }

        let Ok(payload) = serde_json::from_str::<Payload>(body) else {
            let preview: String = body.chars().take(200).collect();
            let message = if preview.is_empty() {
                format!("service responded with status {status}")
            } else {
                preview
            };
            return Self::new(status, message);
        };

        let message = payload
            .message
            .or(payload.error_description)
            .or(payload.msg)
            .or(payload.error.clone())
            .unwrap_or_else(|| format!("service responded with status {status}"));

        let code = match payload.code {
            Some(serde_json::Value::String(code)) => Some(code),
            Some(serde_json::Value::Number(code)) => Some(code.to_string()),
            _ => payload.error,
        };

        Self {
            status,
            code,
            message,
        }
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{} ({code})", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ServiceError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_table_api_error() {
        let err = ServiceError::from_response(
            406,
            r#"{"code":"PGRST116","details":"The result contains 0 rows","hint":null,"message":"JSON object requested, multiple (or no) rows returned"}"#,
        );
        assert!(err.is_not_found());
        assert_eq!(err.code(), Some("PGRST116"));
        assert!(err.message().starts_with("JSON object requested"));
    }

    #[test]
    fn parses_auth_error() {
        let err = ServiceError::from_response(
            400,
            r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#,
        );
        assert_eq!(err.message(), "Invalid login credentials");
        assert_eq!(err.code(), Some("invalid_grant"));
        assert!(!err.is_not_found());
    }

    #[test]
    fn falls_back_to_raw_body() {
        let err = ServiceError::from_response(502, "Bad Gateway");
        assert_eq!(err.status(), 502);
        assert_eq!(err.message(), "Bad Gateway");
        assert_eq!(err.code(), None);
    }

    #[test]
    fn display_includes_code() {
        let err = ServiceError::new(409, "duplicate key").with_code("23505");
        assert_eq!(err.to_string(), "duplicate key (23505)");
    }
}
