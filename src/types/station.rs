//! 中継ステーション型定義

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// モデル一覧パスの既定値
pub const DEFAULT_MODELS_PATH: &str = "/v1/models";

/// チャット補完パスの既定値
pub const DEFAULT_CHAT_PATH: &str = "/v1/chat/completions";

/// テスト質問の既定値
pub const DEFAULT_TEST_QUESTION: &str = "who are u?";

/// プローブタイムアウトの既定値（秒）
pub const DEFAULT_TIMEOUT_SECS: u64 = 12;

/// プローブ同時実行数の既定値
pub const DEFAULT_CONCURRENCY: u32 = 3;

/// 中継ステーション
///
/// ユーザーが登録したサードパーティAI APIの中継先。
/// APIキーは平文で保存される（暗号化はスコープ外）。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Station {
    /// 一意識別子
    pub id: Uuid,
    /// 所有ユーザーID
    pub user_id: Uuid,
    /// 表示名
    pub name: String,
    /// ベースURL
    pub base_url: String,
    /// APIキー
    pub api_key: String,
    /// モデル一覧パス
    pub models_path: String,
    /// チャット補完パス
    pub chat_path: String,
    /// 既定のテスト質問
    pub test_question: String,
    /// 既定のストリーミングフラグ
    pub default_stream: bool,
    /// 既定のタイムアウト（秒）
    pub default_timeout_secs: u64,
    /// 既定の同時実行数
    pub default_concurrency: u32,
    /// 有効フラグ
    pub is_active: bool,
    /// 作成日時
    pub created_at: DateTime<Utc>,
    /// 更新日時
    pub updated_at: DateTime<Utc>,
}

impl Station {
    /// 新しいステーションを既定値つきで作成
    pub fn new(user_id: Uuid, name: String, base_url: String, api_key: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            name,
            base_url,
            api_key,
            models_path: DEFAULT_MODELS_PATH.to_string(),
            chat_path: DEFAULT_CHAT_PATH.to_string(),
            test_question: DEFAULT_TEST_QUESTION.to_string(),
            default_stream: true,
            default_timeout_secs: DEFAULT_TIMEOUT_SECS,
            default_concurrency: DEFAULT_CONCURRENCY,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// モデル一覧のURLを組み立てる
    ///
    /// base_url末尾のスラッシュは除去してから連結する。
    pub fn models_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.models_path)
    }

    /// チャット補完のURLを組み立てる
    pub fn chat_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.chat_path)
    }

    /// 額度照会のURLを組み立てる
    pub fn usage_url(&self) -> String {
        format!("{}/api/usage/token", self.base_url.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_station() -> Station {
        Station::new(
            Uuid::new_v4(),
            "Test".to_string(),
            "https://api.example.com".to_string(),
            "sk-test".to_string(),
        )
    }

    #[test]
    fn test_new_applies_defaults() {
        let station = test_station();
        assert_eq!(station.models_path, "/v1/models");
        assert_eq!(station.chat_path, "/v1/chat/completions");
        assert_eq!(station.test_question, "who are u?");
        assert!(station.default_stream);
        assert_eq!(station.default_timeout_secs, 12);
        assert_eq!(station.default_concurrency, 3);
        assert!(station.is_active);
    }

    #[test]
    fn test_models_url_joins_paths() {
        let station = test_station();
        assert_eq!(station.models_url(), "https://api.example.com/v1/models");
    }

    #[test]
    fn test_urls_strip_trailing_slash() {
        let mut station = test_station();
        station.base_url = "https://api.example.com/".to_string();
        assert_eq!(station.models_url(), "https://api.example.com/v1/models");
        assert_eq!(
            station.chat_url(),
            "https://api.example.com/v1/chat/completions"
        );
        assert_eq!(
            station.usage_url(),
            "https://api.example.com/api/usage/token"
        );
    }
}
