//! 額度照会（ベストエフォート）
//!
//! ベンダー固有の `/api/usage/token` を照会する。未対応の上流が多いため、
//! あらゆる失敗（接続・タイムアウト・非2xx・不正ボディ）は「未対応」として
//! Noneに畳み込み、呼び出し元へはエラーを伝播させない。

use crate::types::station::Station;
use crate::types::usage::UsageSnapshot;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// 額度照会のタイムアウト（秒）
const USAGE_TIMEOUT_SECS: u64 = 10;

/// `/api/usage/token` のレスポンスエンベロープ
#[derive(Debug, Deserialize)]
struct UsageEnvelope {
    #[serde(default)]
    data: Option<UsageSnapshot>,
}

/// ステーションの額度スナップショットを取得
///
/// # Returns
/// * `Some(UsageSnapshot)` - 取得成功
/// * `None` - 未対応または取得失敗（非致命）
pub async fn fetch_usage(client: &Client, station: &Station) -> Option<UsageSnapshot> {
    let url = station.usage_url();

    let result = client
        .get(&url)
        .bearer_auth(&station.api_key)
        .timeout(Duration::from_secs(USAGE_TIMEOUT_SECS))
        .send()
        .await;

    match result {
        Ok(response) if response.status().is_success() => {
            match response.json::<UsageEnvelope>().await {
                Ok(envelope) => envelope.data,
                Err(e) => {
                    tracing::debug!(station_id = %station.id, error = %e, "Failed to parse usage response");
                    None
                }
            }
        }
        Ok(response) => {
            tracing::debug!(
                station_id = %station.id,
                status = %response.status(),
                "Station does not support usage query"
            );
            None
        }
        Err(e) => {
            tracing::debug!(station_id = %station.id, error = %e, "Usage query failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_with_data() {
        let json = r#"{"data":{"total_granted":10.0,"total_used":2.0,"total_available":8.0,"unlimited_quota":false,"model_limits":{},"model_limits_enabled":false,"expires_at":0}}"#;
        let envelope: UsageEnvelope = serde_json::from_str(json).unwrap();
        let usage = envelope.data.unwrap();
        assert_eq!(usage.total_available, 8.0);
    }

    #[test]
    fn test_envelope_without_data() {
        let envelope: UsageEnvelope = serde_json::from_str("{}").unwrap();
        assert!(envelope.data.is_none());
    }
}
