//! モデル一覧取得
//!
//! ステーションのモデル一覧パスへ認証付きGETを1回発行し、
//! ベンダー標準の `{data: [{id, ...}]}` エンベロープをIDのフラットな
//! リストへ正規化する。失敗は呼び出し元に伝播させず、タグ付きの
//! 無効結果として返す。

use crate::types::station::Station;
use reqwest::Client;
use std::time::Duration;

/// モデル一覧取得のタイムアウト（秒）
const MODEL_LIST_TIMEOUT_SECS: u64 = 10;

/// モデル一覧の取得結果
#[derive(Debug, Clone, PartialEq)]
pub struct ModelListing {
    /// 取得に成功したか（ステーションの有効性判定にも使う）
    pub valid: bool,
    /// モデルID一覧（無効時は空）
    pub models: Vec<String>,
    /// 失敗理由
    pub error: Option<String>,
}

impl ModelListing {
    fn invalid(reason: String) -> Self {
        Self {
            valid: false,
            models: Vec::new(),
            error: Some(reason),
        }
    }
}

/// ステーションのモデル一覧を取得
///
/// 非2xx・タイムアウト・接続エラーはすべて `valid=false` の結果に
/// 畳み込まれ、この関数はエラーを返さない。
pub async fn list_models(client: &Client, station: &Station) -> ModelListing {
    let url = station.models_url();

    let result = client
        .get(&url)
        .bearer_auth(&station.api_key)
        .timeout(Duration::from_secs(MODEL_LIST_TIMEOUT_SECS))
        .send()
        .await;

    let response = match result {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!(station_id = %station.id, error = %e, "Model listing request failed");
            return ModelListing::invalid(e.to_string());
        }
    };

    if !response.status().is_success() {
        let reason = format!("HTTP {}", response.status().as_u16());
        tracing::debug!(station_id = %station.id, reason = %reason, "Model listing rejected");
        return ModelListing::invalid(reason);
    }

    let json = match response.json::<serde_json::Value>().await {
        Ok(json) => json,
        Err(e) => {
            tracing::debug!(station_id = %station.id, error = %e, "Model listing body unreadable");
            return ModelListing::invalid(format!("invalid response body: {}", e));
        }
    };

    // `data`の欠落・空はエラーではなく空リスト扱い
    let models = json["data"]
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(|m| m["id"].as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default();

    ModelListing {
        valid: true,
        models,
        error: None,
    }
}
