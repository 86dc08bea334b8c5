//! ダッシュボードAPIハンドラー
//!
//! ユーザー統計（全ステーション有効性集計）と管理者統計を返す。

use crate::common::auth::{Claims, UserRole};
use crate::common::error::ConsoleError;
use crate::probe::{validity, StationValidity};
use crate::AppState;
use axum::{extract::State, Extension, Json};
use serde::Serialize;

use super::error::AppError;

/// ユーザー統計
#[derive(Debug, Serialize)]
pub struct UserStats {
    /// 登録ステーション総数
    pub total_stations: usize,
    /// 有効なステーション数
    pub valid_stations: usize,
    /// 無効なステーション数
    pub invalid_stations: usize,
}

/// ユーザー統計レスポンス
#[derive(Debug, Serialize)]
pub struct UserStatsResponse {
    /// 成功フラグ
    pub success: bool,
    /// 集計値
    pub stats: UserStats,
    /// ステーション別の詳細（有効性と額度）
    pub stations: Vec<StationValidity>,
}

/// 管理者統計
#[derive(Debug, Serialize)]
pub struct AdminStats {
    /// 一般ユーザー総数
    pub total_users: i64,
    /// 管理者総数
    pub total_admins: i64,
    /// ステーション総数
    pub total_stations: i64,
    /// 有効な一般ユーザー数
    pub active_users: i64,
}

/// 管理者統計レスポンス
#[derive(Debug, Serialize)]
pub struct AdminStatsResponse {
    /// 成功フラグ
    pub success: bool,
    /// 集計値
    pub stats: AdminStats,
}

/// GET /api/stats/user - ユーザー統計
///
/// 全ステーションの有効性チェックを同時に走らせて集計する。
/// 個々のステーションの失敗は無効カウントに畳まれるだけで、
/// 集計全体は常に成功する。
pub async fn user_stats(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
) -> Result<Json<UserStatsResponse>, AppError> {
    let user_id = claims
        .user_id()
        .map_err(|e| ConsoleError::Authentication(format!("Invalid user ID: {}", e)))?;

    let stations = crate::db::stations::list_stations(&state.db_pool, user_id).await?;
    let summary = validity::check_all(&state.http_client, stations).await;

    Ok(Json(UserStatsResponse {
        success: true,
        stats: UserStats {
            total_stations: summary.total,
            valid_stations: summary.valid,
            invalid_stations: summary.invalid,
        },
        stations: summary.stations,
    }))
}

/// GET /api/stats/admin - 管理者統計
///
/// # Returns
/// * `200 OK` - 集計値
/// * `403 Forbidden` - 管理者以外
pub async fn admin_stats(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
) -> Result<Json<AdminStatsResponse>, AppError> {
    if !claims.is_admin() {
        return Err(ConsoleError::Authorization("Admin permission required".to_string()).into());
    }

    let total_users = crate::db::users::count_by_role(&state.db_pool, UserRole::User).await?;
    let total_admins = crate::db::users::count_by_role(&state.db_pool, UserRole::Admin).await?;
    let total_stations = crate::db::stations::count_all(&state.db_pool).await?;
    let active_users = crate::db::users::count_active_users(&state.db_pool).await?;

    Ok(Json(AdminStatsResponse {
        success: true,
        stats: AdminStats {
            total_users,
            total_admins,
            total_stations,
            active_users,
        },
    }))
}
