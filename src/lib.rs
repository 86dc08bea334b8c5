//! Relayhub Server
//!
//! AI APIの中継ステーションを管理するマルチテナントコンソール

#![warn(missing_docs)]

/// 共通型定義
pub mod common;

/// REST APIハンドラー
pub mod api;

/// 認証・認可機能
pub mod auth;

/// データベースアクセス
pub mod db;

/// モデルプロービングサブシステム
pub mod probe;

/// ロギング初期化ユーティリティ
pub mod logging;

/// 設定管理（環境変数ヘルパー）
pub mod config;

/// 型定義
pub mod types;

/// アプリケーション状態
#[derive(Clone)]
pub struct AppState {
    /// データベース接続プール
    pub db_pool: sqlx::SqlitePool,
    /// JWT秘密鍵
    pub jwt_secret: String,
    /// 共有HTTPクライアント（接続プーリング有効）
    pub http_client: reqwest::Client,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_has_shared_http_client() {
        // AppStateにhttp_clientフィールドが存在することを確認
        let _client_type: fn(&AppState) -> &reqwest::Client = |state| &state.http_client;
    }
}
