//! ダッシュボード統計APIの結合テスト
//!
//! 有効性集計が個別ステーションの失敗に影響されないことを検証する。

mod support;

use axum::body::Body;
use axum::http::StatusCode;
use relayhub::common::auth::UserRole;
use relayhub::types::station::Station;
use serde_json::json;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use support::{authed_request, body_json, build_app, create_user, token_for};

async fn insert_station(pool: &sqlx::SqlitePool, user_id: uuid::Uuid, name: &str, base_url: &str) {
    let station = Station::new(
        user_id,
        name.to_string(),
        base_url.to_string(),
        "sk-test".to_string(),
    );
    relayhub::db::stations::create_station(pool, &station)
        .await
        .expect("Failed to insert station");
}

async fn mock_with_models(model_count: usize) -> MockServer {
    let mock = MockServer::start().await;
    let models: Vec<serde_json::Value> = (0..model_count)
        .map(|i| json!({ "id": format!("model-{}", i) }))
        .collect();
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": models })))
        .mount(&mock)
        .await;
    // 額度は未対応の上流を模す
    Mock::given(method("GET"))
        .and(path("/api/usage/token"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock)
        .await;
    mock
}

#[tokio::test]
async fn user_stats_counts_valid_and_invalid_stations() {
    let healthy_a = mock_with_models(2).await;
    let healthy_c = mock_with_models(5).await;

    let test_app = build_app().await;
    let user = create_user(&test_app.db_pool, "alice", "password123", UserRole::User).await;

    insert_station(&test_app.db_pool, user.id, "A", &healthy_a.uri()).await;
    // Bは接続不能（到達できないポート）
    insert_station(&test_app.db_pool, user.id, "B", "http://127.0.0.1:1").await;
    insert_station(&test_app.db_pool, user.id, "C", &healthy_c.uri()).await;

    let response = test_app
        .app
        .clone()
        .oneshot(
            authed_request(&token_for(&user))
                .uri("/api/stats/user")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Bの失敗はAとCの集計に影響しない
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["stats"]["total_stations"], 3);
    assert_eq!(json["stats"]["valid_stations"], 2);
    assert_eq!(json["stats"]["invalid_stations"], 1);

    let stations = json["stations"].as_array().unwrap();
    assert_eq!(stations.len(), 3);
    let by_name = |name: &str| {
        stations
            .iter()
            .find(|s| s["name"] == name)
            .unwrap_or_else(|| panic!("missing station {}", name))
    };
    assert_eq!(by_name("A")["valid"], true);
    assert_eq!(by_name("A")["model_count"], 2);
    assert_eq!(by_name("B")["valid"], false);
    assert_eq!(by_name("C")["valid"], true);
    assert_eq!(by_name("C")["model_count"], 5);
}

#[tokio::test]
async fn user_stats_includes_usage_for_supporting_stations() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "data": [{ "id": "m" }] })),
        )
        .mount(&mock)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/usage/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "total_granted": 50.0,
                "total_used": 10.0,
                "total_available": 40.0,
                "unlimited_quota": false,
                "model_limits": {},
                "model_limits_enabled": false,
                "expires_at": 0,
            }
        })))
        .mount(&mock)
        .await;

    let test_app = build_app().await;
    let user = create_user(&test_app.db_pool, "alice", "password123", UserRole::User).await;
    insert_station(&test_app.db_pool, user.id, "WithUsage", &mock.uri()).await;

    let response = test_app
        .app
        .clone()
        .oneshot(
            authed_request(&token_for(&user))
                .uri("/api/stats/user")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["stations"][0]["usage"]["total_available"], 40.0);
}

#[tokio::test]
async fn user_stats_with_no_stations_is_empty() {
    let test_app = build_app().await;
    let user = create_user(&test_app.db_pool, "alice", "password123", UserRole::User).await;

    let response = test_app
        .app
        .clone()
        .oneshot(
            authed_request(&token_for(&user))
                .uri("/api/stats/user")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["stats"]["total_stations"], 0);
    assert_eq!(json["stats"]["valid_stations"], 0);
    assert_eq!(json["stats"]["invalid_stations"], 0);
}

#[tokio::test]
async fn admin_stats_requires_admin_role() {
    let test_app = build_app().await;
    let user = create_user(&test_app.db_pool, "alice", "password123", UserRole::User).await;

    let response = test_app
        .app
        .clone()
        .oneshot(
            authed_request(&token_for(&user))
                .uri("/api/stats/admin")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_stats_counts_users_and_stations() {
    let test_app = build_app().await;
    let admin = create_user(&test_app.db_pool, "root", "password123", UserRole::Admin).await;
    let alice = create_user(&test_app.db_pool, "alice", "password123", UserRole::User).await;
    create_user(&test_app.db_pool, "bob", "password123", UserRole::User).await;

    insert_station(&test_app.db_pool, alice.id, "S1", "https://api.example.com").await;
    insert_station(&test_app.db_pool, alice.id, "S2", "https://api.example.org").await;

    let response = test_app
        .app
        .clone()
        .oneshot(
            authed_request(&token_for(&admin))
                .uri("/api/stats/admin")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["stats"]["total_users"], 2);
    assert_eq!(json["stats"]["total_admins"], 1);
    assert_eq!(json["stats"]["total_stations"], 2);
    assert_eq!(json["stats"]["active_users"], 2);
}
