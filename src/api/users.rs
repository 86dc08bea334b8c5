//! 管理者向けユーザー管理API

use crate::common::auth::{Claims, User, UserRole};
use crate::common::error::ConsoleError;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::AppError;

/// Admin権限を確認
fn ensure_admin(claims: &Claims) -> Result<(), ConsoleError> {
    if !claims.is_admin() {
        return Err(ConsoleError::Authorization(
            "Admin permission required".to_string(),
        ));
    }
    Ok(())
}

/// ユーザー一覧クエリパラメータ
#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    /// ロールでフィルタ（admin / user）
    #[serde(default)]
    pub role: Option<String>,
}

/// ユーザー概要（パスワードハッシュは含めない）
#[derive(Debug, Serialize)]
pub struct UserSummary {
    /// ユーザーID
    pub id: Uuid,
    /// ユーザー名
    pub username: String,
    /// ロール
    pub role: String,
    /// 有効フラグ
    pub is_active: bool,
    /// 作成日時
    pub created_at: String,
    /// 最終ログイン日時
    pub last_login: Option<String>,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        UserSummary {
            id: user.id,
            username: user.username,
            role: user.role.as_str().to_string(),
            is_active: user.is_active,
            created_at: user.created_at.to_rfc3339(),
            last_login: user.last_login.map(|dt| dt.to_rfc3339()),
        }
    }
}

/// ユーザー一覧レスポンス
#[derive(Debug, Serialize)]
pub struct ListUsersResponse {
    /// 成功フラグ
    pub success: bool,
    /// ユーザー一覧
    pub users: Vec<UserSummary>,
}

/// ユーザー作成リクエスト
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    /// ユーザー名
    pub username: String,
    /// パスワード
    pub password: String,
    /// 管理者として作成するか
    #[serde(default)]
    pub is_admin: bool,
}

/// ユーザー更新リクエスト
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    /// 新しいユーザー名
    #[serde(default)]
    pub username: Option<String>,
    /// 新しいパスワード（リセット）
    #[serde(default)]
    pub password: Option<String>,
    /// 管理者フラグ
    #[serde(default)]
    pub is_admin: Option<bool>,
    /// 有効フラグ
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// 書き込み操作レスポンス
#[derive(Debug, Serialize)]
pub struct UserMutationResponse {
    /// 成功フラグ
    pub success: bool,
    /// メッセージ
    pub message: String,
    /// 対象ユーザーID（作成時のみ）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
}

/// GET /api/admin/users - ユーザー一覧
pub async fn list_users(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<ListUsersResponse>, AppError> {
    ensure_admin(&claims)?;

    let role = match query.role.as_deref() {
        Some("admin") => Some(UserRole::Admin),
        Some("user") => Some(UserRole::User),
        Some(other) => {
            return Err(
                ConsoleError::Validation(format!("Unknown role filter: {}", other)).into(),
            )
        }
        None => None,
    };

    let users = crate::db::users::list(&state.db_pool, role).await?;

    Ok(Json(ListUsersResponse {
        success: true,
        users: users.into_iter().map(UserSummary::from).collect(),
    }))
}

/// POST /api/admin/users - ユーザー作成
pub async fn create_user(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    ensure_admin(&claims)?;

    if request.username.is_empty() || request.password.is_empty() {
        return Err(ConsoleError::Validation(
            "Username and password are required".to_string(),
        )
        .into());
    }

    let role = if request.is_admin {
        UserRole::Admin
    } else {
        UserRole::User
    };

    let password_hash = crate::auth::password::hash_password(&request.password)?;
    let user =
        crate::db::users::create(&state.db_pool, &request.username, &password_hash, role).await?;

    tracing::info!(
        "Admin {} created user {} (role={})",
        claims.username,
        user.username,
        role.as_str()
    );

    Ok((
        StatusCode::CREATED,
        Json(UserMutationResponse {
            success: true,
            message: "User created".to_string(),
            user_id: Some(user.id),
        }),
    ))
}

/// PUT /api/admin/users/:id - ユーザー更新
///
/// ユーザー名変更・パスワードリセット・有効/管理者フラグの切り替え。
pub async fn update_user(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<UserMutationResponse>, AppError> {
    ensure_admin(&claims)?;

    let password_hash = match request.password.as_deref() {
        Some(password) if !password.is_empty() => {
            Some(crate::auth::password::hash_password(password)?)
        }
        _ => None,
    };

    let role = request.is_admin.map(|is_admin| {
        if is_admin {
            UserRole::Admin
        } else {
            UserRole::User
        }
    });

    // 最後の管理者を降格させない
    if role == Some(UserRole::User) && crate::db::users::is_last_admin(&state.db_pool, id).await? {
        return Err(
            ConsoleError::Validation("Cannot demote the last admin user".to_string()).into(),
        );
    }

    crate::db::users::update(
        &state.db_pool,
        id,
        request.username.as_deref(),
        password_hash.as_deref(),
        role,
        request.is_active,
    )
    .await?;

    Ok(Json(UserMutationResponse {
        success: true,
        message: "User updated".to_string(),
        user_id: None,
    }))
}

/// DELETE /api/admin/users/:id - ユーザー削除
///
/// 所有ステーションとユーザー設定はカスケード削除される。
/// 最後の管理者は削除できない。
pub async fn delete_user(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserMutationResponse>, AppError> {
    ensure_admin(&claims)?;

    if crate::db::users::find_by_id(&state.db_pool, id).await?.is_none() {
        return Err(ConsoleError::NotFound("User not found".to_string()).into());
    }

    if crate::db::users::is_last_admin(&state.db_pool, id).await? {
        return Err(
            ConsoleError::Validation("Cannot delete the last admin user".to_string()).into(),
        );
    }

    crate::db::users::delete(&state.db_pool, id).await?;

    tracing::info!("Admin {} deleted user {}", claims.username, id);

    Ok(Json(UserMutationResponse {
        success: true,
        message: "User deleted".to_string(),
        user_id: None,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(role: UserRole) -> Claims {
        Claims {
            sub: Uuid::new_v4().to_string(),
            username: "tester".to_string(),
            role,
            exp: 0,
        }
    }

    #[test]
    fn test_ensure_admin() {
        assert!(ensure_admin(&claims(UserRole::Admin)).is_ok());
        assert!(matches!(
            ensure_admin(&claims(UserRole::User)),
            Err(ConsoleError::Authorization(_))
        ));
    }

    #[test]
    fn test_create_user_request_defaults() {
        let json = r#"{"username":"u","password":"p"}"#;
        let request: CreateUserRequest = serde_json::from_str(json).unwrap();
        assert!(!request.is_admin);
    }

    #[test]
    fn test_user_summary_omits_password_hash() {
        let user = User {
            id: Uuid::new_v4(),
            username: "u".to_string(),
            password_hash: "secret-hash".to_string(),
            role: UserRole::User,
            is_active: true,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
            last_login: None,
        };
        let summary = UserSummary::from(user);
        let json = serde_json::to_string(&summary).unwrap();
        assert!(!json.contains("secret-hash"));
    }
}
