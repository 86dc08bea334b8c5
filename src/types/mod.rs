//! 型定義

/// 中継ステーション
pub mod station;

/// チャットアプリURLテンプレート
pub mod chat_app;

/// 額度スナップショット
pub mod usage;
