use thiserror::Error;

/// Failures at the backend boundary.
///
/// Only [`ApiError::Rejected`] carries a message meant for the operator; the
/// other variants are transport or protocol problems that callers log.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("response envelope carried no data")]
    MissingData,
    #[error("{message}")]
    Rejected { message: String },
}

impl ApiError {
    /// The server-provided message for application-level failures.
    pub fn user_message(&self) -> Option<&str> {
        match self {
            Self::Rejected { message } => Some(message),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_rejections_are_user_facing() {
        let rejected = ApiError::Rejected {
            message: "conflict".to_owned(),
        };
        assert_eq!(rejected.user_message(), Some("conflict"));
        assert_eq!(rejected.to_string(), "conflict");

        let status = ApiError::Status {
            status: 502,
            body: "bad gateway".to_owned(),
        };
        assert_eq!(status.user_message(), None);
        assert_eq!(status.to_string(), "HTTP 502: bad gateway");
    }
}
