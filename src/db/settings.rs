//! システム設定テーブルのストレージ層
//!
//! SQLiteベースのキーバリュー設定を永続化

use crate::common::error::{ConsoleError, ConsoleResult};
use sqlx::SqlitePool;

/// 登録機能の有効フラグ
pub const KEY_ENABLE_REGISTRATION: &str = "enable_registration";
/// ログイン機能の有効フラグ
pub const KEY_ENABLE_LOGIN: &str = "enable_login";
/// 登録時キャプチャの有効フラグ
pub const KEY_ENABLE_REGISTER_CAPTCHA: &str = "enable_register_captcha";
/// ログイン時キャプチャの有効フラグ
pub const KEY_ENABLE_LOGIN_CAPTCHA: &str = "enable_login_captcha";
/// システム表示名
pub const KEY_SYSTEM_NAME: &str = "system_name";
/// お知らせ文
pub const KEY_ANNOUNCEMENT: &str = "announcement";

/// 初期投入する設定キーと既定値
const DEFAULT_SETTINGS: &[(&str, &str)] = &[
    (KEY_ENABLE_REGISTRATION, "true"),
    (KEY_ENABLE_LOGIN, "true"),
    (KEY_ENABLE_REGISTER_CAPTCHA, "false"),
    (KEY_ENABLE_LOGIN_CAPTCHA, "false"),
    (KEY_SYSTEM_NAME, "Relayhub"),
    (KEY_ANNOUNCEMENT, "Welcome to Relayhub"),
];

/// システム設定ストレージ
#[derive(Clone)]
pub struct SettingsStorage {
    pool: SqlitePool,
}

impl SettingsStorage {
    /// 新しいストレージインスタンスを作成
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 設定値を取得
    pub async fn get_setting(&self, key: &str) -> ConsoleResult<Option<String>> {
        let result = sqlx::query_scalar::<_, String>("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ConsoleError::Database(format!("Failed to get setting: {}", e)))?;

        Ok(result)
    }

    /// 設定値を保存（INSERT OR REPLACE）
    pub async fn set_setting(&self, key: &str, value: &str) -> ConsoleResult<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO settings (key, value, updated_at) VALUES (?, ?, datetime('now'))",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(|e| ConsoleError::Database(format!("Failed to set setting: {}", e)))?;

        Ok(())
    }

    /// すべての設定を取得
    pub async fn list_settings(&self) -> ConsoleResult<Vec<(String, String)>> {
        let rows =
            sqlx::query_as::<_, (String, String)>("SELECT key, value FROM settings ORDER BY key")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| ConsoleError::Database(format!("Failed to list settings: {}", e)))?;

        Ok(rows)
    }

    /// 機能フラグを取得（"true"のみ有効扱い）
    pub async fn is_enabled(&self, key: &str) -> ConsoleResult<bool> {
        Ok(self.get_setting(key).await?.as_deref() == Some("true"))
    }

    /// 既定設定を未設定のキーにだけ投入する
    pub async fn seed_defaults(&self) -> ConsoleResult<()> {
        for (key, value) in DEFAULT_SETTINGS {
            sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
                .bind(key)
                .bind(value)
                .execute(&self.pool)
                .await
                .map_err(|e| ConsoleError::Database(format!("Failed to seed setting: {}", e)))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup() -> SettingsStorage {
        let pool = crate::db::test_utils::test_db_pool().await;
        SettingsStorage::new(pool)
    }

    #[tokio::test]
    async fn test_get_missing_setting_is_none() {
        let storage = setup().await;
        assert_eq!(storage.get_setting("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_and_get_setting() {
        let storage = setup().await;
        storage.set_setting("k", "v").await.unwrap();
        assert_eq!(storage.get_setting("k").await.unwrap().as_deref(), Some("v"));

        // 上書き
        storage.set_setting("k", "v2").await.unwrap();
        assert_eq!(
            storage.get_setting("k").await.unwrap().as_deref(),
            Some("v2")
        );
    }

    #[tokio::test]
    async fn test_seed_defaults_does_not_overwrite() {
        let storage = setup().await;
        storage
            .set_setting(KEY_ENABLE_REGISTRATION, "false")
            .await
            .unwrap();

        storage.seed_defaults().await.unwrap();

        // 既存値は保持され、未設定キーのみ投入される
        assert!(!storage.is_enabled(KEY_ENABLE_REGISTRATION).await.unwrap());
        assert!(storage.is_enabled(KEY_ENABLE_LOGIN).await.unwrap());
        assert_eq!(
            storage.get_setting(KEY_SYSTEM_NAME).await.unwrap().as_deref(),
            Some("Relayhub")
        );
    }

    #[tokio::test]
    async fn test_is_enabled_only_for_true() {
        let storage = setup().await;
        storage.set_setting("flag", "1").await.unwrap();
        assert!(!storage.is_enabled("flag").await.unwrap());
        storage.set_setting("flag", "true").await.unwrap();
        assert!(storage.is_enabled("flag").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_settings_after_seed() {
        let storage = setup().await;
        storage.seed_defaults().await.unwrap();
        let all = storage.list_settings().await.unwrap();
        assert!(all.len() >= 6);
    }
}
