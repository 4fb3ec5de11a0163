//! HTTP basic auth for the `/api` routes.
//!
//! The password is shared and configured; the username names the viewer,
//! whose node is `users:<username>`. Accepted requests carry a [`Viewer`]
//! extension for the handlers.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use relaynode_types::EntityType;

use crate::error::ApiError;
use crate::state::AppState;

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    /// The basic auth username.
    pub username: String,
}

impl Viewer {
    /// The viewer's global node identifier.
    pub fn node_id(&self) -> String {
        format!("{}:{}", EntityType::User.tag(), self.username)
    }
}

/// Decoded basic auth credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Username part.
    pub username: String,
    /// Password part.
    pub password: String,
}

/// Parse an `Authorization: Basic <base64(user:pass)>` header value.
///
/// # Errors
///
/// Returns [`ApiError::Unauthorized`] for any other scheme or an
/// undecodable payload.
pub fn parse_basic(value: &str) -> Result<Credentials, ApiError> {
    let encoded = value
        .strip_prefix("Basic ")
        .ok_or_else(|| ApiError::Unauthorized(String::from("expected basic credentials")))?;
    let decoded = STANDARD
        .decode(encoded.trim())
        .map_err(|e| ApiError::Unauthorized(format!("malformed credentials: {e}")))?;
    let decoded = String::from_utf8(decoded)
        .map_err(|e| ApiError::Unauthorized(format!("malformed credentials: {e}")))?;
    let (username, password) = decoded
        .split_once(':')
        .ok_or_else(|| ApiError::Unauthorized(String::from("malformed credentials")))?;
    Ok(Credentials {
        username: username.to_owned(),
        password: password.to_owned(),
    })
}

/// Middleware rejecting requests without the configured password.
pub async fn require_basic_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized(String::from("missing credentials")))?;
    let credentials = parse_basic(header)?;

    if credentials.username.is_empty() || credentials.password != *state.password {
        tracing::warn!(
            username = %credentials.username,
            path = %request.uri().path(),
            "Rejected credentials"
        );
        return Err(ApiError::Unauthorized(String::from("invalid credentials")));
    }

    request.extensions_mut().insert(Viewer {
        username: credentials.username,
    });
    Ok(next.run(request).await)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_basic_header() {
        let header = format!("Basic {}", STANDARD.encode("1:mypassword1"));
        let creds = parse_basic(&header).unwrap();
        assert_eq!(creds.username, "1");
        assert_eq!(creds.password, "mypassword1");
    }

    #[test]
    fn password_may_contain_colons() {
        let header = format!("Basic {}", STANDARD.encode("ada:a:b"));
        assert_eq!(parse_basic(&header).unwrap().password, "a:b");
    }

    #[test]
    fn rejects_other_schemes_and_garbage() {
        assert!(parse_basic("Bearer abc").is_err());
        assert!(parse_basic("Basic !!!").is_err());
        let no_colon = format!("Basic {}", STANDARD.encode("nocolon"));
        assert!(parse_basic(&no_colon).is_err());
    }

    #[test]
    fn viewer_node_id_uses_user_tag() {
        let viewer = Viewer {
            username: String::from("3"),
        };
        assert_eq!(viewer.node_id(), "users:3");
    }
}
