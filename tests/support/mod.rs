//! テスト用ヘルパー

#![allow(dead_code)]

use axum::body::Body;
use axum::http::Request;
use axum::Router;
use relayhub::common::auth::{User, UserRole};
use relayhub::db::settings::SettingsStorage;
use relayhub::{api, AppState};
use sqlx::SqlitePool;

/// テスト用のJWT秘密鍵
pub const TEST_JWT_SECRET: &str = "test-jwt-secret-key-for-testing-only";

/// テスト用アプリケーション一式
pub struct TestApp {
    /// axumルーター（.oneshot()で叩く）
    pub app: Router,
    /// データベース接続プール
    pub db_pool: SqlitePool,
}

/// テスト用のSQLiteデータベースプールを作成する
pub async fn create_test_db_pool() -> SqlitePool {
    let pool = SqlitePool::connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory SQLite pool");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

/// テスト用アプリケーションを構築する
pub async fn build_app() -> TestApp {
    let db_pool = create_test_db_pool().await;

    SettingsStorage::new(db_pool.clone())
        .seed_defaults()
        .await
        .expect("Failed to seed settings");

    let state = AppState {
        db_pool: db_pool.clone(),
        jwt_secret: TEST_JWT_SECRET.to_string(),
        http_client: reqwest::Client::new(),
    };

    TestApp {
        app: api::create_app(state),
        db_pool,
    }
}

/// テストユーザーを作成する
pub async fn create_user(
    pool: &SqlitePool,
    username: &str,
    password: &str,
    role: UserRole,
) -> User {
    let password_hash =
        relayhub::auth::password::hash_password(password).expect("Failed to hash password");
    relayhub::db::users::create(pool, username, &password_hash, role)
        .await
        .expect("Failed to create test user")
}

/// ユーザーのセッショントークンを発行する
pub fn token_for(user: &User) -> String {
    relayhub::auth::jwt::create_jwt(
        &user.id.to_string(),
        &user.username,
        user.role,
        TEST_JWT_SECRET,
    )
    .expect("Failed to create test JWT")
}

/// 認証ヘッダー付きのリクエストビルダー
pub fn authed_request(token: &str) -> axum::http::request::Builder {
    Request::builder().header("authorization", format!("Bearer {}", token))
}

/// レスポンスボディをJSONとして読む
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Body is not valid JSON")
}

/// JSONボディ付きリクエストを組み立てる
pub fn json_body(value: &serde_json::Value) -> Body {
    Body::from(serde_json::to_vec(value).expect("Failed to serialize body"))
}
