use axum::http::StatusCode;
use thiserror::Error;

use super::token::TokenError;
use crate::store::{CategoryId, PostId, StoreError};

/// Failures surfaced by the unlock flows.
///
/// Messages never include a stored password.
#[derive(Debug, Error)]
pub enum Error {
    #[error("category {0} not found")]
    CategoryNotFound(CategoryId),
    #[error("post {0} not found")]
    PostNotFound(PostId),
    #[error("incorrect password")]
    Unauthorized,
    #[error("token signing secret is not configured")]
    MissingSecret,
    #[error("failed to issue token")]
    Token(#[from] TokenError),
    #[error("content lookup failed")]
    Store(#[from] StoreError),
}

impl Error {
    /// HTTP status a handler should answer with.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::CategoryNotFound(_) | Self::PostNotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::MissingSecret | Self::Token(_) | Self::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::CategoryNotFound(_) | Self::PostNotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(Error::CategoryNotFound(1).status(), StatusCode::NOT_FOUND);
        assert_eq!(Error::PostNotFound(1).status(), StatusCode::NOT_FOUND);
        assert_eq!(Error::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            Error::MissingSecret.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            Error::from(StoreError::Unavailable("down".to_string())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            Error::from(TokenError::Key).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn not_found_is_distinct_from_unauthorized() {
        assert!(Error::PostNotFound(3).is_not_found());
        assert!(!Error::Unauthorized.is_not_found());
    }
}
