//! モデルプロービングサブシステム
//!
//! ステーションのモデル一覧取得・バッチ接続テスト・額度照会・
//! 全ステーション有効性集計を提供する。

/// モデル一覧取得
pub mod lister;

/// バッチプローブエンジン
pub mod engine;

/// ストリーミング応答の集約
pub mod sse;

/// 額度照会（ベストエフォート）
pub mod usage;

/// 全ステーション有効性集計
pub mod validity;

pub use engine::{ProbeEngine, ProbeOutcome, ProbeRequest, ProbeResult};
pub use lister::ModelListing;
pub use validity::{StationValidity, ValiditySummary};
