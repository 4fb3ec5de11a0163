//! Error types for the HTTP API.
//!
//! [`ApiError`] unifies all failure modes into a single enum that can be
//! converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation. Every
//! error body is `{ "error": <message>, "status": <code> }`.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use relaynode_core::ResolveError;

/// Errors that can occur in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Node resolution failed.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Credentials were missing or wrong.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The request itself was unusable.
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl ApiError {
    /// The HTTP status this error maps to.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Resolve(ResolveError::InvalidIdentifier(_) | ResolveError::Pagination(_))
            | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Resolve(ResolveError::BatchFetch(_) | ResolveError::Store(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = axum::Json(serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        }));

        if status == StatusCode::UNAUTHORIZED {
            return (
                status,
                [(header::WWW_AUTHENTICATE, r#"Basic realm="relaynode""#)],
                body,
            )
                .into_response();
        }
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use relaynode_core::BatchFetchError;
    use relaynode_db::DbError;
    use relaynode_types::{EntityType, IdentifierError};

    use super::*;

    #[test]
    fn domain_errors_map_to_statuses() {
        let cases = [
            (
                ApiError::from(ResolveError::from(IdentifierError::Malformed(
                    String::from("posts"),
                ))),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::from(ResolveError::Pagination(String::from("x"))),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::from(ResolveError::BatchFetch(BatchFetchError::new(
                    EntityType::Post,
                    &DbError::InvalidQuery(String::from("x")),
                ))),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ApiError::BadRequest(String::from("missing body")),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::NotFound(String::from("posts:9")),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::Unauthorized(String::from("missing credentials")),
                StatusCode::UNAUTHORIZED,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.status(), status, "{err}");
        }
    }

    #[test]
    fn unauthorized_carries_challenge() {
        let response = ApiError::Unauthorized(String::from("nope")).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
    }
}
