use thiserror::Error;

/// Failures surfaced by the backend API client.
///
/// Every fetch path ends in one of these; callers convert them into a
/// user-visible notification and keep the UI in its last-good state.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("network unreachable: {0}")]
    Transport(String),

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("malformed response: {0}")]
    Parse(String),

    #[error("{0}")]
    Validation(String),
}

impl ApiError {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            return ApiError::Parse(error.to_string());
        }
        if let Some(status) = error.status() {
            return ApiError::Status {
                status: status.as_u16(),
                message: error.to_string(),
            };
        }
        ApiError::Transport(error.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(error: serde_json::Error) -> Self {
        ApiError::Parse(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::ApiError;

    #[test]
    fn status_code_only_on_status_variant() {
        let err = ApiError::Status {
            status: 503,
            message: "service unavailable".into(),
        };
        assert_eq!(err.status_code(), Some(503));
        assert_eq!(ApiError::Transport("down".into()).status_code(), None);
    }

    #[test]
    fn json_errors_map_to_parse() {
        let err = serde_json::from_str::<u32>("not json").unwrap_err();
        assert!(matches!(ApiError::from(err), ApiError::Parse(_)));
    }
}
