//! 全ステーション有効性集計
//!
//! ユーザーの全ステーションに対してモデル一覧取得を同時に走らせ、
//! ダッシュボード用の有効/無効カウントとステーション別の詳細を作る。
//! 一覧取得は軽量なGETでステーション数も高々数十のため、同時実行数の
//! 上限は設けない。

use crate::probe::{lister, usage};
use crate::types::station::Station;
use crate::types::usage::UsageSnapshot;
use reqwest::Client;
use serde::Serialize;
use uuid::Uuid;

/// ステーション別の有効性
#[derive(Debug, Clone, Serialize)]
pub struct StationValidity {
    /// ステーションID
    pub station_id: Uuid,
    /// 表示名
    pub name: String,
    /// モデル一覧取得に成功したか
    pub valid: bool,
    /// 取得できたモデル数
    pub model_count: usize,
    /// 額度スナップショット（有効なステーションのみ照会、取得できた場合のみ）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageSnapshot>,
}

/// 有効性集計
#[derive(Debug, Clone, Serialize)]
pub struct ValiditySummary {
    /// ステーション総数
    pub total: usize,
    /// 有効なステーション数
    pub valid: usize,
    /// 無効なステーション数
    pub invalid: usize,
    /// ステーション別詳細
    pub stations: Vec<StationValidity>,
}

impl ValiditySummary {
    fn empty() -> Self {
        Self {
            total: 0,
            valid: 0,
            invalid: 0,
            stations: Vec::new(),
        }
    }
}

/// 全ステーションの有効性を同時にチェックする
///
/// ステーションごとに独立したタスクを起動し、1ステーションの失敗
/// （パニックを含む）が他のステーションの集計を妨げないようにする。
/// JoinErrorになったステーションは無効としてカウントされる。
pub async fn check_all(client: &Client, stations: Vec<Station>) -> ValiditySummary {
    if stations.is_empty() {
        return ValiditySummary::empty();
    }

    let total = stations.len();
    let mut handles = Vec::with_capacity(total);

    for station in stations {
        let client = client.clone();
        let station_id = station.id;
        let station_name = station.name.clone();
        let handle = tokio::spawn(async move {
            let listing = lister::list_models(&client, &station).await;

            // 有効なステーションだけ額度を追加照会（失敗は非致命）
            let usage = if listing.valid {
                usage::fetch_usage(&client, &station).await
            } else {
                None
            };

            StationValidity {
                station_id: station.id,
                name: station.name,
                valid: listing.valid,
                model_count: listing.models.len(),
                usage,
            }
        });
        handles.push((station_id, station_name, handle));
    }

    let mut results = Vec::with_capacity(total);
    let mut valid = 0;
    let mut invalid = 0;

    for (station_id, name, handle) in handles {
        let validity = match handle.await {
            Ok(validity) => validity,
            Err(e) => {
                tracing::error!(station_id = %station_id, "Validity task join error: {}", e);
                StationValidity {
                    station_id,
                    name,
                    valid: false,
                    model_count: 0,
                    usage: None,
                }
            }
        };

        if validity.valid {
            valid += 1;
        } else {
            invalid += 1;
        }
        results.push(validity);
    }

    tracing::debug!(total, valid, invalid, "Station validity check completed");

    ValiditySummary {
        total,
        valid,
        invalid,
        stations: results,
    }
}
