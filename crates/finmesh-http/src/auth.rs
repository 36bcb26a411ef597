//! API-key authentication middleware.
//!
//! Every request must carry the shared secret header; `/health` is exempt.
//! When no expected key is configured, only header presence is enforced.

use crate::error::ApiError;
use axum::{
    extract::{Request, State},
    http::HeaderName,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Auth configuration shared with the middleware.
#[derive(Debug, Clone)]
pub struct ApiKeyAuth {
    header: HeaderName,
    expected: Option<String>,
}

impl ApiKeyAuth {
    pub fn new(header_name: &str, expected: Option<String>) -> Self {
        let header = HeaderName::from_bytes(header_name.as_bytes())
            .unwrap_or_else(|_| HeaderName::from_static("x-api-key"));
        Self { header, expected }
    }

    fn check(&self, request: &Request) -> Result<(), ApiError> {
        let value = request
            .headers()
            .get(&self.header)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        if value.trim().is_empty() {
            return Err(ApiError::Unauthorized(format!(
                "missing {} header",
                self.header
            )));
        }
        if let Some(expected) = &self.expected {
            if value != expected {
                return Err(ApiError::Unauthorized("invalid API key".to_string()));
            }
        }
        Ok(())
    }
}

/// Axum middleware enforcing the API key on every non-health route.
pub async fn require_api_key(
    State(auth): State<Arc<ApiKeyAuth>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if request.uri().path() != "/health" {
        auth.check(&request)?;
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;

    fn request(path: &str, key: Option<&str>) -> Request {
        let mut builder = HttpRequest::builder().uri(path);
        if let Some(key) = key {
            builder = builder.header("X-API-Key", key);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn missing_key_is_unauthorized() {
        let auth = ApiKeyAuth::new("X-API-Key", None);
        assert!(auth.check(&request("/api/v1/agents", None)).is_err());
    }

    #[test]
    fn present_key_passes_without_expected_value() {
        let auth = ApiKeyAuth::new("X-API-Key", None);
        assert!(auth.check(&request("/api/v1/agents", Some("anything"))).is_ok());
    }

    #[test]
    fn configured_value_must_match() {
        let auth = ApiKeyAuth::new("X-API-Key", Some("secret".to_string()));
        assert!(auth.check(&request("/x", Some("secret"))).is_ok());
        assert!(auth.check(&request("/x", Some("wrong"))).is_err());
    }

    #[test]
    fn empty_header_value_is_rejected() {
        let auth = ApiKeyAuth::new("X-API-Key", None);
        assert!(auth.check(&request("/x", Some(""))).is_err());
    }
}
