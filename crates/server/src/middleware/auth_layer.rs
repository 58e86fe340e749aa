use axum::extract::{Query, Request, State};
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::middleware::Next;
use axum::response::Response;
use serde::Deserialize;
use subtle::ConstantTimeEq;

use crate::rest::AppState;

/// Browsers cannot set headers on a WebSocket upgrade, so that one route
/// also accepts the token as a query parameter.
const QUERY_TOKEN_PATH: &str = "/v1/ws";

#[derive(Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

pub async fn require_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected) = state.api_token.as_deref() else {
        return Ok(next.run(request).await);
    };

    let presented = bearer_token(request.headers())
        .map(str::to_owned)
        .or_else(|| query_token(request.uri()))
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if !bool::from(presented.as_bytes().ct_eq(expected.as_bytes())) {
        tracing::warn!(path = %request.uri().path(), "rejected request with invalid token");
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(request).await)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn query_token(uri: &Uri) -> Option<String> {
    if uri.path() != QUERY_TOKEN_PATH {
        return None;
    }
    let Query(query) = Query::<TokenQuery>::try_from_uri(uri).ok()?;
    query.token.filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn extracts_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(bearer_token(&headers), Some("abc"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn query_token_only_on_ws_route() {
        let ws: Uri = "/v1/ws?token=abc".parse().unwrap();
        assert_eq!(query_token(&ws).as_deref(), Some("abc"));
        let rules: Uri = "/v1/rules?token=abc".parse().unwrap();
        assert_eq!(query_token(&rules), None);
    }

    #[test]
    fn query_token_is_percent_decoded() {
        let ws: Uri = "/v1/ws?client=web&token=a%2Bb%2Fc%3D".parse().unwrap();
        assert_eq!(query_token(&ws).as_deref(), Some("a+b/c="));
    }

    #[test]
    fn empty_or_absent_query_token() {
        let empty: Uri = "/v1/ws?token=".parse().unwrap();
        assert_eq!(query_token(&empty), None);
        let bare: Uri = "/v1/ws".parse().unwrap();
        assert_eq!(query_token(&bare), None);
    }
}
