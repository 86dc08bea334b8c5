//! 認証ミドルウェア
//!
//! Authorizationヘッダー（Bearer）またはセッションCookieからJWTを抽出して検証する

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::SESSION_COOKIE;
use crate::AppState;

/// リクエストからセッショントークンを抽出
///
/// 優先順位:
/// 1. `Authorization: Bearer {token}`
/// 2. セッションCookie
fn extract_token(request: &Request) -> Option<String> {
    if let Some(auth_header) = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    {
        if let Some(token) = auth_header.strip_prefix("Bearer ") {
            return Some(token.to_string());
        }
    }

    request
        .headers()
        .get(header::COOKIE)
        .and_then(|h| h.to_str().ok())
        .and_then(|cookies| {
            cookies.split(';').find_map(|pair| {
                let (name, value) = pair.trim().split_once('=')?;
                (name == SESSION_COOKIE).then(|| value.to_string())
            })
        })
}

/// セッション認証ミドルウェア
///
/// 検証済みのClaimsをrequestの拡張データに格納する
///
/// # Returns
/// * `Ok(Response)` - 認証成功
/// * `Err(Response)` - 認証失敗、401 Unauthorized
pub async fn session_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, Response> {
    let token = extract_token(&request).ok_or_else(|| {
        (StatusCode::UNAUTHORIZED, "Missing session token".to_string()).into_response()
    })?;

    let claims = crate::auth::jwt::verify_jwt(&token, &state.jwt_secret).map_err(|e| {
        tracing::warn!("JWT verification failed: {}", e);
        (StatusCode::UNAUTHORIZED, "Invalid session token".to_string()).into_response()
    })?;

    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}
