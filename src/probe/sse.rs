//! ストリーミング応答の集約
//!
//! `text/event-stream` 風のボディを行単位で読み、`data: ` 行のJSONから
//! `delta.content` と `delta.reasoning_content` を別々に蓄積する。
//! 不正なJSON行はスキップし、`data: [DONE]` で読み取りを打ち切る。

use super::engine::ProbeOutcome;
use futures::StreamExt;

/// 両アキュムレータが空のときに返すプレースホルダー
const EMPTY_RESPONSE_PLACEHOLDER: &str = "(empty response)";

/// ストリーミングチャンクのアキュムレータ
///
/// ネットワークから切り離された純粋なロジックで、行の解釈と蓄積のみを行う。
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    content: String,
    reasoning: String,
    done: bool,
}

impl StreamAccumulator {
    /// 1行を処理する
    ///
    /// `data: [DONE]` で完了フラグを立てる。`data: ` で始まらない行と
    /// 解釈できないJSONは黙ってスキップする（致命的ではない）。
    pub fn push_line(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() || self.done {
            return;
        }

        if line == "data: [DONE]" {
            self.done = true;
            return;
        }

        let Some(payload) = line.strip_prefix("data: ") else {
            return;
        };

        let Ok(json) = serde_json::from_str::<serde_json::Value>(payload) else {
            // 不正なJSONチャンクはスキップ
            return;
        };

        let delta = &json["choices"][0]["delta"];
        if let Some(content) = delta["content"].as_str() {
            self.content.push_str(content);
        }
        if let Some(reasoning) = delta["reasoning_content"].as_str() {
            self.reasoning.push_str(reasoning);
        }
    }

    /// `data: [DONE]` を受信済みか
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// 最終コンテンツを確定する
    ///
    /// content → reasoning_content → プレースホルダーの順でフォールバック。
    pub fn finish(self) -> String {
        if !self.content.is_empty() {
            self.content
        } else if !self.reasoning.is_empty() {
            self.reasoning
        } else {
            EMPTY_RESPONSE_PLACEHOLDER.to_string()
        }
    }
}

/// ストリーミング応答ボディを消費して最終コンテンツを得る
///
/// ボディは改行区切りで逐次読みし、チャンク境界が行の途中に来ても
/// バッファリングで正しく復元する。
pub async fn consume_stream(response: reqwest::Response) -> ProbeOutcome {
    let mut accumulator = StreamAccumulator::default();
    let mut buffer = String::new();
    let mut body = response.bytes_stream();

    'read: while let Some(chunk) = body.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                return ProbeOutcome::Failure {
                    reason: format!("stream read error: {}", e),
                }
            }
        };

        buffer.push_str(&String::from_utf8_lossy(&chunk));

        while let Some(pos) = buffer.find('\n') {
            let line: String = buffer.drain(..=pos).collect();
            accumulator.push_line(&line);
            if accumulator.is_done() {
                break 'read;
            }
        }
    }

    // 末尾に改行のない最終行を処理
    if !accumulator.is_done() && !buffer.trim().is_empty() {
        accumulator.push_line(&buffer);
    }

    ProbeOutcome::Success {
        content: accumulator.finish(),
        streaming: true,
    }
}
