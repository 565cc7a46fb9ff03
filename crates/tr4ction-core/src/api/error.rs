use thiserror::Error;

/// Outcome of a single backend call, shared by every caller.
pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// 401 or 403: the stored session is missing, expired or has the wrong role
    #[error("not authorized (HTTP {0})")]
    Auth(u16),

    /// Any other non-2xx status
    #[error("backend error (HTTP {status})")]
    Server { status: u16, body: String },

    /// The request never completed (connection refused, DNS, reset, ...)
    #[error("network error: {0}")]
    Network(String),

    /// A body that could not be built, or a 2xx reply that did not match the expected shape
    #[error("unexpected reply: {0}")]
    Decode(String),
}

impl ApiError {
    /// Classifies a non-success status.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        match status {
            401 | 403 => Self::Auth(status),
            _ => Self::Server {
                status,
                body: body.into(),
            },
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// HTTP status, when the backend answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Auth(status) | Self::Server { status, .. } => Some(*status),
            Self::Network(_) | Self::Decode(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_statuses_are_split_out() {
        assert_eq!(ApiError::from_status(401, ""), ApiError::Auth(401));
        assert_eq!(ApiError::from_status(403, "nope"), ApiError::Auth(403));
        assert!(ApiError::from_status(403, "").is_auth());
    }

    #[test]
    fn other_statuses_keep_the_body() {
        let err = ApiError::from_status(500, "boom");
        assert_eq!(
            err,
            ApiError::Server {
                status: 500,
                body: "boom".into()
            }
        );
        assert_eq!(err.status(), Some(500));
        assert!(!err.is_auth());
        assert_eq!(ApiError::Network("refused".into()).status(), None);
    }
}
