//! プローブエンジンの結合テスト
//!
//! wiremockで上流APIを模擬し、バッチ実行・タイムアウト・ストリーミング
//! 集約・部分失敗の振る舞いを検証する。

use relayhub::probe::{ProbeEngine, ProbeOutcome, ProbeRequest};
use relayhub::types::station::Station;
use std::collections::HashSet;
use std::time::{Duration, Instant};
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn station_for(mock: &MockServer) -> Station {
    let mut station = Station::new(
        Uuid::new_v4(),
        "Mock".to_string(),
        mock.uri(),
        "sk-test-key".to_string(),
    );
    station.default_timeout_secs = 5;
    station
}

fn chat_completion_body(content: &str) -> serde_json::Value {
    serde_json::json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    })
}

#[tokio::test]
async fn probe_produces_one_result_per_model() {
    let mock = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion_body("pong")))
        .mount(&mock)
        .await;

    let engine = ProbeEngine::new(reqwest::Client::new());
    let station = station_for(&mock);

    let models: Vec<String> = (0..7).map(|i| format!("model-{}", i)).collect();
    let request = ProbeRequest {
        models: models.clone(),
        stream: Some(false),
        concurrency: Some(3),
        ..Default::default()
    };

    let results = engine.run(&station, &request).await;

    // モデル集合と完全一致（重複なし・欠落なし）
    assert_eq!(results.len(), models.len());
    let result_models: HashSet<&str> = results.iter().map(|r| r.model.as_str()).collect();
    let input_models: HashSet<&str> = models.iter().map(|m| m.as_str()).collect();
    assert_eq!(result_models, input_models);
    assert!(results.iter().all(|r| r.is_success()));
}

#[tokio::test]
async fn probe_sends_authenticated_chat_request() {
    let mock = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test-key"))
        .and(body_partial_json(serde_json::json!({
            "model": "gpt-4",
            "messages": [{ "role": "user", "content": "who are u?" }],
            "stream": false,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion_body("hi")))
        .expect(1)
        .mount(&mock)
        .await;

    let engine = ProbeEngine::new(reqwest::Client::new());
    let station = station_for(&mock);

    let request = ProbeRequest {
        models: vec!["gpt-4".to_string()],
        stream: Some(false),
        ..Default::default()
    };
    let results = engine.run(&station, &request).await;

    assert_eq!(results.len(), 1);
    assert_eq!(
        results[0].outcome,
        ProbeOutcome::Success {
            content: "hi".to_string(),
            streaming: false,
        }
    );
}

#[tokio::test]
async fn mixed_batch_reports_per_model_verdicts() {
    let mock = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(serde_json::json!({ "model": "bad-model" })))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion_body("ok")))
        .mount(&mock)
        .await;

    let engine = ProbeEngine::new(reqwest::Client::new());
    let station = station_for(&mock);

    let request = ProbeRequest {
        models: vec!["gpt-4".to_string(), "bad-model".to_string()],
        stream: Some(false),
        concurrency: Some(2),
        ..Default::default()
    };
    let results = engine.run(&station, &request).await;

    assert_eq!(results.len(), 2);
    let by_model = |name: &str| results.iter().find(|r| r.model == name).unwrap();

    assert!(by_model("gpt-4").is_success());
    assert_eq!(
        by_model("bad-model").outcome,
        ProbeOutcome::Failure {
            reason: "HTTP 404".to_string(),
        }
    );
}

#[tokio::test]
async fn unresponsive_upstream_resolves_to_failure_within_timeout() {
    let mock = MockServer::start().await;

    // タイムアウトより長く遅延させる
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(chat_completion_body("late"))
                .set_delay(Duration::from_secs(30)),
        )
        .mount(&mock)
        .await;

    let engine = ProbeEngine::new(reqwest::Client::new());
    let mut station = station_for(&mock);
    station.default_timeout_secs = 1;

    let request = ProbeRequest {
        models: vec!["slow-model".to_string()],
        stream: Some(false),
        ..Default::default()
    };

    let start = Instant::now();
    let results = engine.run(&station, &request).await;
    let elapsed = start.elapsed();

    assert_eq!(results.len(), 1);
    assert!(!results[0].is_success());
    // タイムアウト（1秒）+ スケジューリング余裕内で解決する
    assert!(
        elapsed < Duration::from_secs(5),
        "probe should resolve promptly, took {:?}",
        elapsed
    );
}

#[tokio::test]
async fn batches_run_in_lock_step() {
    let mock = MockServer::start().await;

    const DELAY_MS: u64 = 300;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(chat_completion_body("ok"))
                .set_delay(Duration::from_millis(DELAY_MS)),
        )
        .mount(&mock)
        .await;

    let engine = ProbeEngine::new(reqwest::Client::new());
    let station = station_for(&mock);

    // 4モデル・バッチサイズ2 → 2バッチ直列 → 所要時間は遅延2回ぶん以上
    let request = ProbeRequest {
        models: vec![
            "m1".to_string(),
            "m2".to_string(),
            "m3".to_string(),
            "m4".to_string(),
        ],
        stream: Some(false),
        concurrency: Some(2),
        ..Default::default()
    };

    let start = Instant::now();
    let results = engine.run(&station, &request).await;
    let elapsed = start.elapsed();

    assert_eq!(results.len(), 4);
    assert!(results.iter().all(|r| r.is_success()));
    assert!(
        elapsed >= Duration::from_millis(2 * DELAY_MS - 50),
        "two sequential batches should take at least two delays, took {:?}",
        elapsed
    );
}

#[tokio::test]
async fn zero_concurrency_is_clamped_and_all_results_returned() {
    let mock = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion_body("ok")))
        .mount(&mock)
        .await;

    let engine = ProbeEngine::new(reqwest::Client::new());
    let mut station = station_for(&mock);
    // ステーション既定値も0という誤設定でも無限ループしない
    station.default_concurrency = 0;

    let request = ProbeRequest {
        models: vec!["a".to_string(), "b".to_string(), "c".to_string()],
        stream: Some(false),
        concurrency: Some(0),
        ..Default::default()
    };
    let results = engine.run(&station, &request).await;

    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r.is_success()));
}

#[tokio::test]
async fn streaming_probe_accumulates_deltas() {
    let mock = MockServer::start().await;

    let sse_body = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
        "data: [DONE]\n\n",
    );

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(sse_body, "text/event-stream")
                .insert_header("cache-control", "no-cache"),
        )
        .mount(&mock)
        .await;

    let engine = ProbeEngine::new(reqwest::Client::new());
    let station = station_for(&mock);

    let request = ProbeRequest {
        models: vec!["stream-model".to_string()],
        stream: Some(true),
        ..Default::default()
    };
    let results = engine.run(&station, &request).await;

    assert_eq!(results.len(), 1);
    assert_eq!(
        results[0].outcome,
        ProbeOutcome::Success {
            content: "Hello".to_string(),
            streaming: true,
        }
    );
}

#[tokio::test]
async fn malformed_streaming_chunk_is_skipped() {
    let mock = MockServer::start().await;

    let sse_body = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
        "data: {not json\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
        "data: [DONE]\n\n",
    );

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse_body, "text/event-stream"))
        .mount(&mock)
        .await;

    let engine = ProbeEngine::new(reqwest::Client::new());
    let station = station_for(&mock);

    let request = ProbeRequest {
        models: vec!["stream-model".to_string()],
        stream: Some(true),
        ..Default::default()
    };
    let results = engine.run(&station, &request).await;

    assert_eq!(
        results[0].outcome,
        ProbeOutcome::Success {
            content: "Hello".to_string(),
            streaming: true,
        }
    );
}

#[tokio::test]
async fn streaming_empty_response_uses_placeholder() {
    let mock = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("data: [DONE]\n\n", "text/event-stream"),
        )
        .mount(&mock)
        .await;

    let engine = ProbeEngine::new(reqwest::Client::new());
    let station = station_for(&mock);

    let request = ProbeRequest {
        models: vec!["empty-model".to_string()],
        stream: Some(true),
        ..Default::default()
    };
    let results = engine.run(&station, &request).await;

    assert_eq!(
        results[0].outcome,
        ProbeOutcome::Success {
            content: "(empty response)".to_string(),
            streaming: true,
        }
    );
}

#[tokio::test]
async fn non_streaming_falls_back_to_reasoning_content() {
    let mock = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": "", "reasoning_content": "thought" } }]
        })))
        .mount(&mock)
        .await;

    let engine = ProbeEngine::new(reqwest::Client::new());
    let station = station_for(&mock);

    let request = ProbeRequest {
        models: vec!["reasoner".to_string()],
        stream: Some(false),
        ..Default::default()
    };
    let results = engine.run(&station, &request).await;

    assert_eq!(
        results[0].outcome,
        ProbeOutcome::Success {
            content: "thought".to_string(),
            streaming: false,
        }
    );
}

#[tokio::test]
async fn reprobe_of_healthy_station_is_stable() {
    let mock = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion_body("pong")))
        .mount(&mock)
        .await;

    let engine = ProbeEngine::new(reqwest::Client::new());
    let station = station_for(&mock);

    let request = ProbeRequest {
        models: vec!["m1".to_string(), "m2".to_string()],
        stream: Some(false),
        ..Default::default()
    };

    let first = engine.run(&station, &request).await;
    let second = engine.run(&station, &request).await;

    // 上流が変わらなければ成功/失敗の分類は安定している
    for (a, b) in first.iter().zip(second.iter()) {
        assert_eq!(a.model, b.model);
        assert_eq!(a.is_success(), b.is_success());
    }
}
