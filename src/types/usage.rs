//! 額度（クォータ）スナップショット型定義

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 額度スナップショット
///
/// ベンダー固有の `/api/usage/token` から取得するベストエフォートの情報。
/// 対応していない上流も多いため、常に欠落しうる。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    /// 付与済み額度
    #[serde(default)]
    pub total_granted: f64,
    /// 使用済み額度
    #[serde(default)]
    pub total_used: f64,
    /// 残額度
    #[serde(default)]
    pub total_available: f64,
    /// 無制限フラグ
    #[serde(default)]
    pub unlimited_quota: bool,
    /// モデル別の利用可否
    #[serde(default)]
    pub model_limits: HashMap<String, bool>,
    /// モデル制限が有効か
    #[serde(default)]
    pub model_limits_enabled: bool,
    /// 失効日時（Unix timestamp、0は無期限）
    #[serde(default)]
    pub expires_at: i64,
}
