//! JWT生成と検証（jsonwebtoken実装）

use crate::common::auth::{Claims, UserRole};
use crate::common::error::ConsoleError;
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

/// JWT有効期限（7日、元実装のセッション寿命に合わせる）
const JWT_EXPIRATION_DAYS: i64 = 7;

/// セッション有効期限（秒）
pub const SESSION_MAX_AGE_SECS: usize = 60 * 60 * 24 * 7;

/// JWTトークンを生成
///
/// # Arguments
/// * `user_id` - ユーザーID
/// * `username` - ユーザー名
/// * `role` - ユーザーロール
/// * `secret` - JWTシークレットキー
///
/// # Returns
/// * `Ok(String)` - JWTトークン
/// * `Err(ConsoleError)` - 生成失敗
pub fn create_jwt(
    user_id: &str,
    username: &str,
    role: UserRole,
    secret: &str,
) -> Result<String, ConsoleError> {
    let expiration = Utc::now()
        .checked_add_signed(chrono::Duration::days(JWT_EXPIRATION_DAYS))
        .ok_or_else(|| ConsoleError::Jwt("Failed to calculate expiration time".to_string()))?
        .timestamp() as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        username: username.to_string(),
        role,
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ConsoleError::Jwt(format!("Failed to create JWT: {}", e)))
}

/// JWTトークンを検証
///
/// # Returns
/// * `Ok(Claims)` - 検証済みクレーム
/// * `Err(ConsoleError)` - 検証失敗（無効なトークン、期限切れなど）
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, ConsoleError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| ConsoleError::Jwt(format!("Failed to verify JWT: {}", e)))
}
