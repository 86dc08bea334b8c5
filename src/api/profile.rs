//! ユーザープロフィールAPI
//!
//! 自分のユーザー名変更とパスワード変更。

use crate::common::auth::Claims;
use crate::common::error::ConsoleError;
use crate::AppState;
use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};

use super::error::AppError;

/// プロフィールレスポンス
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    /// 成功フラグ
    pub success: bool,
    /// ユーザーID
    pub id: String,
    /// ユーザー名
    pub username: String,
    /// ロール
    pub role: String,
    /// 作成日時
    pub created_at: String,
    /// 最終ログイン日時
    pub last_login: Option<String>,
}

/// プロフィール更新リクエスト
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    /// 新しいユーザー名
    #[serde(default)]
    pub username: Option<String>,
    /// 現在のパスワード（パスワード変更時に必須）
    #[serde(default)]
    pub current_password: Option<String>,
    /// 新しいパスワード
    #[serde(default)]
    pub new_password: Option<String>,
}

/// 更新レスポンス
#[derive(Debug, Serialize)]
pub struct UpdateProfileResponse {
    /// 成功フラグ
    pub success: bool,
    /// メッセージ
    pub message: String,
}

/// GET /api/user/profile - プロフィール取得
pub async fn get_profile(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
) -> Result<Json<ProfileResponse>, AppError> {
    let user_id = claims
        .user_id()
        .map_err(|e| ConsoleError::Authentication(format!("Invalid user ID: {}", e)))?;

    let user = crate::db::users::find_by_id(&state.db_pool, user_id)
        .await?
        .ok_or_else(|| ConsoleError::NotFound("User not found".to_string()))?;

    Ok(Json(ProfileResponse {
        success: true,
        id: user.id.to_string(),
        username: user.username,
        role: user.role.as_str().to_string(),
        created_at: user.created_at.to_rfc3339(),
        last_login: user.last_login.map(|dt| dt.to_rfc3339()),
    }))
}

/// PUT /api/user/profile - プロフィール更新
///
/// パスワード変更には現在のパスワードの提示が必要。
/// ユーザー名変更は重複チェックされる。
pub async fn update_profile(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<UpdateProfileResponse>, AppError> {
    let user_id = claims
        .user_id()
        .map_err(|e| ConsoleError::Authentication(format!("Invalid user ID: {}", e)))?;

    let user = crate::db::users::find_by_id(&state.db_pool, user_id)
        .await?
        .ok_or_else(|| ConsoleError::NotFound("User not found".to_string()))?;

    // パスワード変更
    let password_hash = match request.new_password.as_deref() {
        Some(new_password) if !new_password.is_empty() => {
            let current = request.current_password.as_deref().ok_or_else(|| {
                ConsoleError::Validation("Current password is required".to_string())
            })?;

            let is_valid = crate::auth::password::verify_password(current, &user.password_hash)?;
            if !is_valid {
                return Err(ConsoleError::Authentication(
                    "Current password is incorrect".to_string(),
                )
                .into());
            }

            if new_password.chars().count() < 6 {
                return Err(ConsoleError::Validation(
                    "Password must be at least 6 characters".to_string(),
                )
                .into());
            }

            Some(crate::auth::password::hash_password(new_password)?)
        }
        _ => None,
    };

    // ユーザー名変更（重複チェック）
    let username = match request.username.as_deref() {
        Some(username) if !username.is_empty() && username != user.username => {
            if crate::db::users::find_by_username(&state.db_pool, username)
                .await?
                .is_some()
            {
                return Err(
                    ConsoleError::Conflict("Username already exists".to_string()).into(),
                );
            }
            Some(username)
        }
        _ => None,
    };

    if username.is_none() && password_hash.is_none() {
        return Ok(Json(UpdateProfileResponse {
            success: true,
            message: "Nothing to update".to_string(),
        }));
    }

    crate::db::users::update(
        &state.db_pool,
        user_id,
        username,
        password_hash.as_deref(),
        None,
        None,
    )
    .await?;

    tracing::info!("User {} updated profile", user_id);

    Ok(Json(UpdateProfileResponse {
        success: true,
        message: "Profile updated".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_request_all_optional() {
        let request: UpdateProfileRequest = serde_json::from_str("{}").unwrap();
        assert!(request.username.is_none());
        assert!(request.new_password.is_none());
    }

    #[test]
    fn test_profile_response_serialize() {
        let response = ProfileResponse {
            success: true,
            id: "id-1".to_string(),
            username: "alice".to_string(),
            role: "user".to_string(),
            created_at: "2024-01-01T00:00:00Z".to_string(),
            last_login: None,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("alice"));
        assert!(json.contains("\"success\":true"));
    }
}
