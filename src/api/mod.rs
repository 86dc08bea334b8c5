//! REST APIハンドラー
//!
//! 認証・ステーション管理・プロービング・設定・統計のルーティング

/// 共通エラーレスポンス
pub mod error;

/// 認証API
pub mod auth;

/// プロフィールAPI
pub mod profile;

/// ステーション管理API
pub mod stations;

/// ダッシュボード統計API
pub mod dashboard;

/// 管理者向けユーザー管理API
pub mod users;

/// 設定API
pub mod settings;

use crate::AppState;
use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// アプリケーションルーターを作成
pub fn create_app(state: AppState) -> Router {
    // 認証不要のルート
    let public_routes = Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/public-settings", get(settings::public_settings));

    // セッション認証が必要なルート
    let authed_routes = Router::new()
        .route("/api/auth/me", get(auth::me))
        .route(
            "/api/user/profile",
            get(profile::get_profile).put(profile::update_profile),
        )
        .route(
            "/api/stations",
            get(stations::list_stations).post(stations::create_station),
        )
        .route(
            "/api/stations/:id",
            get(stations::get_station)
                .put(stations::update_station)
                .delete(stations::delete_station),
        )
        .route("/api/stations/:id/models", get(stations::list_station_models))
        .route("/api/stations/:id/test", post(stations::test_station_models))
        .route("/api/stations/:id/usage", get(stations::get_station_usage))
        .route("/api/stats/user", get(dashboard::user_stats))
        .route("/api/stats/admin", get(dashboard::admin_stats))
        .route(
            "/api/settings",
            get(settings::get_user_settings).put(settings::update_user_settings),
        )
        .route(
            "/api/admin/users",
            get(users::list_users).post(users::create_user),
        )
        .route(
            "/api/admin/users/:id",
            put(users::update_user).delete(users::delete_user),
        )
        .route(
            "/api/admin/settings",
            get(settings::get_system_settings).put(settings::update_system_settings),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            crate::auth::middleware::session_auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(authed_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
