//! バッチプローブエンジン
//!
//! モデル集合をロックステップのバッチに分割し、バッチ内は同時、
//! バッチ間は直列にテストリクエストを送る。同時実行数の上限は
//! バッチサイズそのもので、サードパーティAPIへの過剰な同時接続を
//! 防ぐ唯一のバックプレッシャー機構でもある。スライディング
//! ウィンドウ化しないこと（同時実行数の上限保証が崩れる）。

use crate::types::station::Station;
use futures::future::join_all;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// プローブリクエスト
///
/// 未指定のフィールドはステーションの既定値にフォールバックする。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProbeRequest {
    /// テスト対象のモデルID集合
    pub models: Vec<String>,
    /// テスト質問
    #[serde(default)]
    pub question: Option<String>,
    /// ストリーミングで消費するか
    #[serde(default)]
    pub stream: Option<bool>,
    /// プローブごとのタイムアウト（秒）
    #[serde(default, rename = "timeout")]
    pub timeout_secs: Option<u64>,
    /// バッチサイズ（同時実行数の上限）
    #[serde(default)]
    pub concurrency: Option<u32>,
}

/// プローブの判定結果
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    /// 成功（抽出したコンテンツつき）
    Success {
        /// 応答から抽出したコンテンツ
        content: String,
        /// ストリーミングで消費したか
        streaming: bool,
    },
    /// 失敗（人間可読な理由つき）
    Failure {
        /// 失敗理由
        reason: String,
    },
}

/// モデル1件ぶんのプローブ結果
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeResult {
    /// モデルID
    pub model: String,
    /// 判定
    pub outcome: ProbeOutcome,
}

impl ProbeResult {
    /// 成功したか
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ProbeOutcome::Success { .. })
    }
}

/// バッチプローブエンジン
#[derive(Clone)]
pub struct ProbeEngine {
    client: Client,
}

impl ProbeEngine {
    /// 共有HTTPクライアントからエンジンを作成
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// モデル集合をバッチでテストする
    ///
    /// 入力の各モデルに対して必ず1件の結果を返す。タイムアウトや
    /// ネットワークエラーはそのモデルのFailureになるだけで、バッチも
    /// リクエスト全体も中断しない。モデル集合が空なら一切リクエストを
    /// 発行しない。
    pub async fn run(&self, station: &Station, request: &ProbeRequest) -> Vec<ProbeResult> {
        if request.models.is_empty() {
            return Vec::new();
        }

        let question = request
            .question
            .as_deref()
            .filter(|q| !q.is_empty())
            .unwrap_or(&station.test_question);
        let stream = request.stream.unwrap_or(station.default_stream);
        let timeout = effective_timeout(request.timeout_secs, station.default_timeout_secs);
        let batch_size = effective_concurrency(request.concurrency, station.default_concurrency);
        let chat_url = station.chat_url();

        tracing::debug!(
            station_id = %station.id,
            models = request.models.len(),
            batch_size = batch_size,
            timeout_secs = timeout.as_secs(),
            stream = stream,
            "Starting model probe"
        );

        let mut results = Vec::with_capacity(request.models.len());

        // バッチは直列、バッチ内は同時。遅いプローブは自分のバッチの
        // 完了だけを遅らせ、自身はタイマーで必ず解決する。
        for batch in request.models.chunks(batch_size) {
            let probes = batch
                .iter()
                .map(|model| self.probe_model(station, &chat_url, model, question, stream, timeout));
            results.extend(join_all(probes).await);
        }

        let failed = results.iter().filter(|r| !r.is_success()).count();
        tracing::debug!(
            station_id = %station.id,
            total = results.len(),
            failed = failed,
            "Model probe finished"
        );

        results
    }

    /// 単一モデルのプローブ
    async fn probe_model(
        &self,
        station: &Station,
        chat_url: &str,
        model: &str,
        question: &str,
        stream: bool,
        timeout: Duration,
    ) -> ProbeResult {
        let outcome = match tokio::time::timeout(
            timeout,
            self.send_probe(station, chat_url, model, question, stream),
        )
        .await
        {
            Ok(outcome) => outcome,
            // タイマー発火はこのモデルのリクエストだけを中断する
            Err(_) => ProbeOutcome::Failure {
                reason: format!("timed out after {}s", timeout.as_secs()),
            },
        };

        if let ProbeOutcome::Failure { ref reason } = outcome {
            tracing::debug!(station_id = %station.id, model = %model, reason = %reason, "Probe failed");
        }

        ProbeResult {
            model: model.to_string(),
            outcome,
        }
    }

    /// テストリクエストを送信して応答を判定する
    async fn send_probe(
        &self,
        station: &Station,
        chat_url: &str,
        model: &str,
        question: &str,
        stream: bool,
    ) -> ProbeOutcome {
        let body = json!({
            "model": model,
            "messages": [{ "role": "user", "content": question }],
            "stream": stream,
        });

        let response = match self
            .client
            .post(chat_url)
            .bearer_auth(&station.api_key)
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                return ProbeOutcome::Failure {
                    reason: e.to_string(),
                }
            }
        };

        if !response.status().is_success() {
            return ProbeOutcome::Failure {
                reason: format!("HTTP {}", response.status().as_u16()),
            };
        }

        if stream {
            super::sse::consume_stream(response).await
        } else {
            consume_json(response).await
        }
    }
}

/// 非ストリーミング応答からコンテンツを抽出する
async fn consume_json(response: reqwest::Response) -> ProbeOutcome {
    let json = match response.json::<serde_json::Value>().await {
        Ok(json) => json,
        Err(e) => {
            return ProbeOutcome::Failure {
                reason: format!("invalid response body: {}", e),
            }
        }
    };

    let message = &json["choices"][0]["message"];
    let content = message["content"]
        .as_str()
        .filter(|s| !s.is_empty())
        .or_else(|| message["reasoning_content"].as_str())
        .unwrap_or_default();

    ProbeOutcome::Success {
        content: content.to_string(),
        streaming: false,
    }
}

/// 有効タイムアウトを決定する
///
/// リクエストで指定された場合はステーション既定値との大きい方、
/// 未指定なら既定値。最低1秒にクランプする。
fn effective_timeout(requested: Option<u64>, default_secs: u64) -> Duration {
    let secs = match requested {
        Some(t) => t.max(default_secs),
        None => default_secs,
    };
    Duration::from_secs(secs.max(1))
}

/// 有効バッチサイズを決定する
///
/// 0は「未指定」と同じ扱いで既定値へフォールバックし、既定値も
/// 非正なら1にクランプする（0バッチの無限ループ防止）。
fn effective_concurrency(requested: Option<u32>, default_concurrency: u32) -> usize {
    requested
        .filter(|c| *c > 0)
        .unwrap_or(default_concurrency)
        .max(1) as usize
}
