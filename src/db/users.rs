//! ユーザーCRUD操作

use crate::common::auth::{User, UserRole};
use crate::common::error::ConsoleError;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

/// ユーザーを作成
///
/// # Arguments
/// * `pool` - データベース接続プール
/// * `username` - ユーザー名
/// * `password_hash` - bcryptハッシュ化されたパスワード
/// * `role` - ユーザーロール
///
/// # Returns
/// * `Ok(User)` - 作成されたユーザー
/// * `Err(ConsoleError)` - 作成失敗（ユーザー名重複など）
pub async fn create(
    pool: &SqlitePool,
    username: &str,
    password_hash: &str,
    role: UserRole,
) -> Result<User, ConsoleError> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query(
        "INSERT INTO users (id, username, password_hash, role, is_active, created_at, updated_at, last_login)
         VALUES (?, ?, ?, ?, 1, ?, ?, NULL)",
    )
    .bind(id.to_string())
    .bind(username)
    .bind(password_hash)
    .bind(role.as_str())
    .bind(now.to_rfc3339())
    .bind(now.to_rfc3339())
    .execute(pool)
    .await
    .map_err(|e| {
        if e.to_string().contains("UNIQUE constraint failed") {
            ConsoleError::Conflict(format!("Username '{}' already exists", username))
        } else {
            ConsoleError::Database(format!("Failed to create user: {}", e))
        }
    })?;

    Ok(User {
        id,
        username: username.to_string(),
        password_hash: password_hash.to_string(),
        role,
        is_active: true,
        created_at: now,
        updated_at: now,
        last_login: None,
    })
}

/// ユーザー名でユーザーを検索
pub async fn find_by_username(
    pool: &SqlitePool,
    username: &str,
) -> Result<Option<User>, ConsoleError> {
    let row = sqlx::query_as::<_, UserRow>(
        "SELECT id, username, password_hash, role, is_active, created_at, updated_at, last_login
         FROM users WHERE username = ?",
    )
    .bind(username)
    .fetch_optional(pool)
    .await
    .map_err(|e| ConsoleError::Database(format!("Failed to find user: {}", e)))?;

    Ok(row.map(|r| r.into_user()))
}

/// IDでユーザーを検索
pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<User>, ConsoleError> {
    let row = sqlx::query_as::<_, UserRow>(
        "SELECT id, username, password_hash, role, is_active, created_at, updated_at, last_login
         FROM users WHERE id = ?",
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await
    .map_err(|e| ConsoleError::Database(format!("Failed to find user: {}", e)))?;

    Ok(row.map(|r| r.into_user()))
}

/// すべてのユーザーを取得（ロールでの絞り込み可）
pub async fn list(pool: &SqlitePool, role: Option<UserRole>) -> Result<Vec<User>, ConsoleError> {
    let rows = match role {
        Some(role) => {
            sqlx::query_as::<_, UserRow>(
                "SELECT id, username, password_hash, role, is_active, created_at, updated_at, last_login
                 FROM users WHERE role = ? ORDER BY created_at DESC",
            )
            .bind(role.as_str())
            .fetch_all(pool)
            .await
        }
        None => {
            sqlx::query_as::<_, UserRow>(
                "SELECT id, username, password_hash, role, is_active, created_at, updated_at, last_login
                 FROM users ORDER BY created_at DESC",
            )
            .fetch_all(pool)
            .await
        }
    }
    .map_err(|e| ConsoleError::Database(format!("Failed to list users: {}", e)))?;

    Ok(rows.into_iter().map(|r| r.into_user()).collect())
}

/// ユーザーを更新
///
/// Noneのフィールドは変更しない。
pub async fn update(
    pool: &SqlitePool,
    id: Uuid,
    username: Option<&str>,
    password_hash: Option<&str>,
    role: Option<UserRole>,
    is_active: Option<bool>,
) -> Result<User, ConsoleError> {
    let current = find_by_id(pool, id)
        .await?
        .ok_or_else(|| ConsoleError::NotFound(format!("User not found: {}", id)))?;

    let new_username = username.unwrap_or(&current.username);
    let new_password_hash = password_hash.unwrap_or(&current.password_hash);
    let new_role = role.unwrap_or(current.role);
    let new_is_active = is_active.unwrap_or(current.is_active);
    let updated_at = Utc::now();

    sqlx::query(
        "UPDATE users SET username = ?, password_hash = ?, role = ?, is_active = ?, updated_at = ?
         WHERE id = ?",
    )
    .bind(new_username)
    .bind(new_password_hash)
    .bind(new_role.as_str())
    .bind(new_is_active as i32)
    .bind(updated_at.to_rfc3339())
    .bind(id.to_string())
    .execute(pool)
    .await
    .map_err(|e| {
        if e.to_string().contains("UNIQUE constraint failed") {
            ConsoleError::Conflict(format!("Username '{}' already exists", new_username))
        } else {
            ConsoleError::Database(format!("Failed to update user: {}", e))
        }
    })?;

    Ok(User {
        id,
        username: new_username.to_string(),
        password_hash: new_password_hash.to_string(),
        role: new_role,
        is_active: new_is_active,
        created_at: current.created_at,
        updated_at,
        last_login: current.last_login,
    })
}

/// 最終ログイン日時を更新
pub async fn update_last_login(pool: &SqlitePool, id: Uuid) -> Result<(), ConsoleError> {
    sqlx::query("UPDATE users SET last_login = ? WHERE id = ?")
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(pool)
        .await
        .map_err(|e| ConsoleError::Database(format!("Failed to update last login: {}", e)))?;

    Ok(())
}

/// ユーザーを削除
///
/// 所有ステーションとユーザー設定はFOREIGN KEYのカスケードで消える。
pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<(), ConsoleError> {
    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await
        .map_err(|e| ConsoleError::Database(format!("Failed to delete user: {}", e)))?;

    Ok(())
}

/// 初回起動チェック（ユーザーが0人かどうか）
pub async fn is_first_boot(pool: &SqlitePool) -> Result<bool, ConsoleError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await
        .map_err(|e| ConsoleError::Database(format!("Failed to check first boot: {}", e)))?;

    Ok(count == 0)
}

/// ロール別のユーザー数を取得
pub async fn count_by_role(pool: &SqlitePool, role: UserRole) -> Result<i64, ConsoleError> {
    sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = ?")
        .bind(role.as_str())
        .fetch_one(pool)
        .await
        .map_err(|e| ConsoleError::Database(format!("Failed to count users: {}", e)))
}

/// 有効な一般ユーザー数を取得
pub async fn count_active_users(pool: &SqlitePool) -> Result<i64, ConsoleError> {
    sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'user' AND is_active = 1")
        .fetch_one(pool)
        .await
        .map_err(|e| ConsoleError::Database(format!("Failed to count active users: {}", e)))
}

/// 最後の管理者チェック（削除前の検証用）
///
/// # Returns
/// * `Ok(true)` - このユーザーは最後の管理者（削除不可）
/// * `Ok(false)` - このユーザーを削除しても他に管理者がいる
pub async fn is_last_admin(pool: &SqlitePool, user_id: Uuid) -> Result<bool, ConsoleError> {
    let user = find_by_id(pool, user_id)
        .await?
        .ok_or_else(|| ConsoleError::NotFound(format!("User not found: {}", user_id)))?;

    if user.role != UserRole::Admin {
        return Ok(false);
    }

    let admin_count = count_by_role(pool, UserRole::Admin).await?;
    Ok(admin_count == 1)
}

// SQLiteからの行取得用の内部型
#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    username: String,
    password_hash: String,
    role: String,
    is_active: i32,
    created_at: String,
    updated_at: String,
    last_login: Option<String>,
}

impl UserRow {
    fn into_user(self) -> User {
        let id = Uuid::parse_str(&self.id).unwrap_or_default();
        let role = match self.role.as_str() {
            "admin" => UserRole::Admin,
            _ => UserRole::User,
        };
        let created_at = parse_rfc3339(&self.created_at);
        let updated_at = parse_rfc3339(&self.updated_at);
        let last_login = self.last_login.as_deref().and_then(|s| {
            DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        });

        User {
            id,
            username: self.username,
            password_hash: self.password_hash,
            role,
            is_active: self.is_active != 0,
            created_at,
            updated_at,
            last_login,
        }
    }
}

fn parse_rfc3339(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
