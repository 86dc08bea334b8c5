//! ロギング初期化ユーティリティ

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// tracingサブスクライバを初期化
///
/// `RUST_LOG`が未設定の場合は`relayhub=info,tower_http=info`を使用する。
/// 二重初期化はエラーとして返す（テストでは無視してよい）。
pub fn init() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("relayhub=info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    Ok(())
}
