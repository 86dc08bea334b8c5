//! ユーザー設定のストレージ層
//!
//! ステーション既定値とチャットアプリテンプレートをユーザー単位で保持する。

use crate::common::error::ConsoleError;
use crate::types::chat_app::ChatAppTemplate;
use crate::types::station::{
    DEFAULT_CHAT_PATH, DEFAULT_CONCURRENCY, DEFAULT_MODELS_PATH, DEFAULT_TEST_QUESTION,
    DEFAULT_TIMEOUT_SECS,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

/// ユーザー設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSettings {
    /// 所有ユーザーID
    pub user_id: Uuid,
    /// チャットアプリテンプレート一覧
    pub chat_apps: Vec<ChatAppTemplate>,
    /// モデル一覧パスの既定値
    pub models_path: String,
    /// チャット補完パスの既定値
    pub chat_path: String,
    /// テスト質問の既定値
    pub test_question: String,
    /// ストリーミングの既定値
    pub default_stream: bool,
    /// タイムアウトの既定値（秒）
    pub default_timeout_secs: u64,
    /// 同時実行数の既定値
    pub default_concurrency: u32,
}

impl UserSettings {
    /// 既定値のユーザー設定を作成
    pub fn defaults_for(user_id: Uuid, chat_apps: Vec<ChatAppTemplate>) -> Self {
        Self {
            user_id,
            chat_apps,
            models_path: DEFAULT_MODELS_PATH.to_string(),
            chat_path: DEFAULT_CHAT_PATH.to_string(),
            test_question: DEFAULT_TEST_QUESTION.to_string(),
            default_stream: true,
            default_timeout_secs: DEFAULT_TIMEOUT_SECS,
            default_concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// ユーザー設定を取得
///
/// 行が存在しない場合は既定値（チャットアプリ空）を返す。
pub async fn get(pool: &SqlitePool, user_id: Uuid) -> Result<UserSettings, ConsoleError> {
    let row = sqlx::query_as::<_, UserSettingsRow>(
        "SELECT user_id, chat_apps, models_path, chat_path, test_question,
                default_stream, default_timeout_secs, default_concurrency
         FROM user_settings WHERE user_id = ?",
    )
    .bind(user_id.to_string())
    .fetch_optional(pool)
    .await
    .map_err(|e| ConsoleError::Database(format!("Failed to get user settings: {}", e)))?;

    Ok(match row {
        Some(row) => row.into_settings(),
        None => UserSettings::defaults_for(user_id, Vec::new()),
    })
}

/// ユーザー設定を保存（UPSERT）
pub async fn upsert(pool: &SqlitePool, settings: &UserSettings) -> Result<(), ConsoleError> {
    let chat_apps = serde_json::to_string(&settings.chat_apps)
        .map_err(|e| ConsoleError::Internal(format!("Failed to serialize chat apps: {}", e)))?;
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO user_settings (
            id, user_id, chat_apps, models_path, chat_path, test_question,
            default_stream, default_timeout_secs, default_concurrency,
            created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(user_id) DO UPDATE SET
            chat_apps = excluded.chat_apps,
            models_path = excluded.models_path,
            chat_path = excluded.chat_path,
            test_question = excluded.test_question,
            default_stream = excluded.default_stream,
            default_timeout_secs = excluded.default_timeout_secs,
            default_concurrency = excluded.default_concurrency,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(settings.user_id.to_string())
    .bind(chat_apps)
    .bind(&settings.models_path)
    .bind(&settings.chat_path)
    .bind(&settings.test_question)
    .bind(settings.default_stream as i32)
    .bind(settings.default_timeout_secs as i64)
    .bind(settings.default_concurrency as i32)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await
    .map_err(|e| ConsoleError::Database(format!("Failed to save user settings: {}", e)))?;

    Ok(())
}

// SQLiteからの行取得用の内部型
#[derive(sqlx::FromRow)]
struct UserSettingsRow {
    user_id: String,
    chat_apps: String,
    models_path: String,
    chat_path: String,
    test_question: String,
    default_stream: i32,
    default_timeout_secs: i64,
    default_concurrency: i32,
}

impl UserSettingsRow {
    fn into_settings(self) -> UserSettings {
        // 壊れたJSONは空リスト扱い（設定画面から上書き可能）
        let chat_apps = serde_json::from_str(&self.chat_apps).unwrap_or_default();

        UserSettings {
            user_id: Uuid::parse_str(&self.user_id).unwrap_or_default(),
            chat_apps,
            models_path: self.models_path,
            chat_path: self.chat_path,
            test_question: self.test_question,
            default_stream: self.default_stream != 0,
            default_timeout_secs: self.default_timeout_secs.max(0) as u64,
            default_concurrency: self.default_concurrency.max(0) as u32,
        }
    }
}
