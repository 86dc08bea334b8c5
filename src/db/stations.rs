//! ステーションデータベース操作
//!
//! すべての読み書きは所有ユーザーでスコープされる。

use crate::common::error::ConsoleError;
use crate::types::station::Station;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

/// ステーションを登録
pub async fn create_station(pool: &SqlitePool, station: &Station) -> Result<(), ConsoleError> {
    sqlx::query(
        r#"
        INSERT INTO stations (
            id, user_id, name, base_url, api_key, models_path, chat_path,
            test_question, default_stream, default_timeout_secs, default_concurrency,
            is_active, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(station.id.to_string())
    .bind(station.user_id.to_string())
    .bind(&station.name)
    .bind(&station.base_url)
    .bind(&station.api_key)
    .bind(&station.models_path)
    .bind(&station.chat_path)
    .bind(&station.test_question)
    .bind(station.default_stream as i32)
    .bind(station.default_timeout_secs as i64)
    .bind(station.default_concurrency as i32)
    .bind(station.is_active as i32)
    .bind(station.created_at.to_rfc3339())
    .bind(station.updated_at.to_rfc3339())
    .execute(pool)
    .await
    .map_err(|e| ConsoleError::Database(format!("Failed to create station: {}", e)))?;

    Ok(())
}

/// 所有ユーザーのステーション一覧を取得
pub async fn list_stations(pool: &SqlitePool, user_id: Uuid) -> Result<Vec<Station>, ConsoleError> {
    let rows = sqlx::query_as::<_, StationRow>(
        r#"
        SELECT id, user_id, name, base_url, api_key, models_path, chat_path,
               test_question, default_stream, default_timeout_secs, default_concurrency,
               is_active, created_at, updated_at
        FROM stations
        WHERE user_id = ?
        ORDER BY created_at DESC
        "#,
    )
    .bind(user_id.to_string())
    .fetch_all(pool)
    .await
    .map_err(|e| ConsoleError::Database(format!("Failed to list stations: {}", e)))?;

    Ok(rows.into_iter().map(|r| r.into_station()).collect())
}

/// IDと所有ユーザーでステーションを取得
///
/// 他ユーザーのステーションはNotFound相当のNoneになる。
pub async fn get_station(
    pool: &SqlitePool,
    id: Uuid,
    user_id: Uuid,
) -> Result<Option<Station>, ConsoleError> {
    let row = sqlx::query_as::<_, StationRow>(
        r#"
        SELECT id, user_id, name, base_url, api_key, models_path, chat_path,
               test_question, default_stream, default_timeout_secs, default_concurrency,
               is_active, created_at, updated_at
        FROM stations
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(id.to_string())
    .bind(user_id.to_string())
    .fetch_optional(pool)
    .await
    .map_err(|e| ConsoleError::Database(format!("Failed to get station: {}", e)))?;

    Ok(row.map(|r| r.into_station()))
}

/// ステーションを更新（所有ユーザーでスコープ）
pub async fn update_station(pool: &SqlitePool, station: &Station) -> Result<bool, ConsoleError> {
    let result = sqlx::query(
        r#"
        UPDATE stations SET
            name = ?, base_url = ?, api_key = ?, models_path = ?, chat_path = ?,
            test_question = ?, default_stream = ?, default_timeout_secs = ?,
            default_concurrency = ?, is_active = ?, updated_at = ?
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(&station.name)
    .bind(&station.base_url)
    .bind(&station.api_key)
    .bind(&station.models_path)
    .bind(&station.chat_path)
    .bind(&station.test_question)
    .bind(station.default_stream as i32)
    .bind(station.default_timeout_secs as i64)
    .bind(station.default_concurrency as i32)
    .bind(station.is_active as i32)
    .bind(Utc::now().to_rfc3339())
    .bind(station.id.to_string())
    .bind(station.user_id.to_string())
    .execute(pool)
    .await
    .map_err(|e| ConsoleError::Database(format!("Failed to update station: {}", e)))?;

    Ok(result.rows_affected() > 0)
}

/// ステーションを削除（所有ユーザーでスコープ）
pub async fn delete_station(
    pool: &SqlitePool,
    id: Uuid,
    user_id: Uuid,
) -> Result<bool, ConsoleError> {
    let result = sqlx::query("DELETE FROM stations WHERE id = ? AND user_id = ?")
        .bind(id.to_string())
        .bind(user_id.to_string())
        .execute(pool)
        .await
        .map_err(|e| ConsoleError::Database(format!("Failed to delete station: {}", e)))?;

    Ok(result.rows_affected() > 0)
}

/// 全ステーション数を取得（管理者統計用）
pub async fn count_all(pool: &SqlitePool) -> Result<i64, ConsoleError> {
    sqlx::query_scalar("SELECT COUNT(*) FROM stations")
        .fetch_one(pool)
        .await
        .map_err(|e| ConsoleError::Database(format!("Failed to count stations: {}", e)))
}

// SQLiteからの行取得用の内部型
#[derive(sqlx::FromRow)]
struct StationRow {
    id: String,
    user_id: String,
    name: String,
    base_url: String,
    api_key: String,
    models_path: String,
    chat_path: String,
    test_question: String,
    default_stream: i32,
    default_timeout_secs: i64,
    default_concurrency: i32,
    is_active: i32,
    created_at: String,
    updated_at: String,
}

impl StationRow {
    fn into_station(self) -> Station {
        Station {
            id: Uuid::parse_str(&self.id).unwrap_or_default(),
            user_id: Uuid::parse_str(&self.user_id).unwrap_or_default(),
            name: self.name,
            base_url: self.base_url,
            api_key: self.api_key,
            models_path: self.models_path,
            chat_path: self.chat_path,
            test_question: self.test_question,
            default_stream: self.default_stream != 0,
            default_timeout_secs: self.default_timeout_secs.max(0) as u64,
            default_concurrency: self.default_concurrency.max(0) as u32,
            is_active: self.is_active != 0,
            created_at: parse_rfc3339(&self.created_at),
            updated_at: parse_rfc3339(&self.updated_at),
        }
    }
}

fn parse_rfc3339(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
