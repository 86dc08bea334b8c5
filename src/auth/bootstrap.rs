//! 初回起動時の管理者アカウント作成
//!
//! 環境変数または対話式で管理者を作成

use crate::auth::password::hash_password;
use crate::common::auth::UserRole;
use crate::common::error::ConsoleError;
use crate::config::get_env_with_fallback;
use crate::db;
use std::io::{self, Write};

/// 環境変数から管理者を作成
///
/// # Environment Variables
/// * `RELAYHUB_ADMIN_USERNAME` - 管理者ユーザー名（省略時: "admin"）
/// * `RELAYHUB_ADMIN_PASSWORD` - 管理者パスワード（必須）
///
/// # Returns
/// * `Ok(Some(username))` - 管理者作成成功（ユーザー名を返す）
/// * `Ok(None)` - RELAYHUB_ADMIN_PASSWORDが未設定（作成しない）
/// * `Err(ConsoleError)` - 作成失敗
pub async fn create_admin_from_env(pool: &sqlx::SqlitePool) -> Result<Option<String>, ConsoleError> {
    let password = match get_env_with_fallback("RELAYHUB_ADMIN_PASSWORD", "ADMIN_PASSWORD") {
        Some(p) if !p.is_empty() => p,
        _ => {
            tracing::debug!("RELAYHUB_ADMIN_PASSWORD not set, skipping admin creation from env");
            return Ok(None);
        }
    };

    let username = get_env_with_fallback("RELAYHUB_ADMIN_USERNAME", "ADMIN_USERNAME")
        .unwrap_or_else(|| "admin".to_string());

    let password_hash = hash_password(&password)?;

    match db::users::create(pool, &username, &password_hash, UserRole::Admin).await {
        Ok(user) => {
            tracing::info!("Created admin user from env: username={}", username);
            Ok(Some(user.username))
        }
        Err(ConsoleError::Conflict(_)) => {
            tracing::warn!("Admin user {} already exists, skipping creation", username);
            Ok(Some(username))
        }
        Err(e) => {
            tracing::error!("Failed to create admin user from env: {}", e);
            Err(e)
        }
    }
}

/// 対話式で管理者を作成
///
/// # Returns
/// * `Ok(username)` - 作成された管理者のユーザー名
/// * `Err(ConsoleError)` - 作成失敗
pub async fn create_admin_interactive(pool: &sqlx::SqlitePool) -> Result<String, ConsoleError> {
    println!("\n=== Initial Setup: Create Admin User ===");

    print!("Enter admin username (default: admin): ");
    let _ = io::stdout().flush(); // エラー時は無視（対話的UIで回復不能）
    let mut username = String::new();
    io::stdin()
        .read_line(&mut username)
        .map_err(|e| ConsoleError::Internal(format!("Failed to read username: {}", e)))?;
    let username = username.trim();
    let username = if username.is_empty() {
        "admin"
    } else {
        username
    };

    let password = rpassword::prompt_password("Enter admin password: ")
        .map_err(|e| ConsoleError::Internal(format!("Failed to read password: {}", e)))?;
    let password = password.trim();

    if password.is_empty() {
        return Err(ConsoleError::Validation(
            "Password cannot be empty".to_string(),
        ));
    }

    let password_hash = hash_password(password)?;

    match db::users::create(pool, username, &password_hash, UserRole::Admin).await {
        Ok(user) => {
            println!("✓ Admin user '{}' created successfully", user.username);
            tracing::info!(
                "Created admin user interactively: username={}",
                user.username
            );
            Ok(user.username)
        }
        Err(ConsoleError::Conflict(_)) => {
            println!("✓ Admin user '{}' already exists", username);
            tracing::warn!("Admin user {} already exists, skipping creation", username);
            Ok(username.to_string())
        }
        Err(e) => {
            println!("✗ Failed to create admin user: {}", e);
            tracing::error!("Failed to create admin user interactively: {}", e);
            Err(e)
        }
    }
}

/// 初回起動時の管理者作成処理
///
/// 1. データベースにユーザーが存在するかチェック
/// 2. ユーザーが存在しない場合:
///    a. 環境変数（RELAYHUB_ADMIN_PASSWORD）が設定されていれば環境変数から作成
///    b. 環境変数が未設定なら対話式で作成
/// 3. ユーザーが既に存在する場合はスキップ
pub async fn ensure_admin_exists(pool: &sqlx::SqlitePool) -> Result<(), ConsoleError> {
    let is_first_boot = db::users::is_first_boot(pool).await?;
    if !is_first_boot {
        tracing::debug!("Users already exist, skipping admin creation");
        return Ok(());
    }

    tracing::info!("First boot detected, creating admin user");

    match create_admin_from_env(pool).await? {
        Some(username) => {
            tracing::info!("Admin user created from environment: {}", username);
            Ok(())
        }
        None => {
            tracing::info!("RELAYHUB_ADMIN_PASSWORD not set, prompting for admin credentials");
            create_admin_interactive(pool).await?;
            Ok(())
        }
    }
}
