//! エラー型定義
//!
//! 統一エラー型（thiserror使用）

use axum::http::StatusCode;
use thiserror::Error;
use uuid::Uuid;

/// コンソール統一エラー型
#[derive(Debug, Error)]
pub enum ConsoleError {
    /// ステーションが見つからない
    #[error("Station not found: {0}")]
    StationNotFound(Uuid),

    /// リソースが見つからない
    #[error("Not found: {0}")]
    NotFound(String),

    /// データベースエラー
    #[error("Database error: {0}")]
    Database(String),

    /// HTTPクライアントエラー（上流接続不能）
    #[error("HTTP client error: {0}")]
    Http(String),

    /// タイムアウトエラー
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// バリデーションエラー（不正な入力・設定）
    #[error("Validation error: {0}")]
    Validation(String),

    /// パスワードハッシュエラー
    #[error("Password hash error: {0}")]
    PasswordHash(String),

    /// JWTエラー
    #[error("JWT error: {0}")]
    Jwt(String),

    /// 認証エラー
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// 認可エラー
    #[error("Authorization error: {0}")]
    Authorization(String),

    /// 競合エラー（リソース重複など）
    #[error("Conflict: {0}")]
    Conflict(String),

    /// 機能無効化エラー（登録・ログインの停止中）
    #[error("Disabled: {0}")]
    Disabled(String),

    /// 内部エラー
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConsoleError {
    /// Returns a safe error message for external clients.
    ///
    /// Internal details (upstream URLs, SQL text, key material) stay in the
    /// server logs; HTTP responses only ever carry these generic strings.
    pub fn external_message(&self) -> &'static str {
        match self {
            Self::StationNotFound(_) => "Station not found",
            Self::NotFound(_) => "Not found",
            Self::Database(_) => "Database error",
            Self::Http(_) => "Upstream service unavailable",
            Self::Timeout(_) => "Request timeout",
            Self::Validation(_) => "Request error",
            Self::PasswordHash(_) => "Authentication error",
            Self::Jwt(_) => "Authentication error",
            Self::Authentication(_) => "Authentication failed",
            Self::Authorization(_) => "Access denied",
            Self::Conflict(_) => "Resource conflict",
            Self::Disabled(_) => "Feature disabled",
            Self::Internal(_) => "Internal server error",
        }
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::StationNotFound(_) => StatusCode::NOT_FOUND,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Http(_) => StatusCode::BAD_GATEWAY,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::PasswordHash(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Jwt(_) => StatusCode::UNAUTHORIZED,
            Self::Authentication(_) => StatusCode::UNAUTHORIZED,
            Self::Authorization(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Disabled(_) => StatusCode::FORBIDDEN,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Result型エイリアス
pub type ConsoleResult<T> = Result<T, ConsoleError>;
