//! Relayhub Server Entry Point

use clap::{Parser, Subcommand};
use relayhub::config::{get_database_url, get_env_with_fallback, get_env_with_fallback_or,
    get_env_with_fallback_parse};
use relayhub::db::settings::SettingsStorage;
use relayhub::{api, auth, db, logging, AppState};
use std::net::SocketAddr;
use tracing::info;

/// Relayhub - AI relay station management console
#[derive(Parser)]
#[command(name = "relayhub", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Serve(ServeArgs),
}

#[derive(clap::Args)]
struct ServeArgs {
    /// Bind address
    #[arg(long, env = "RELAYHUB_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Bind port
    #[arg(long, env = "RELAYHUB_PORT", default_value_t = 8080)]
    port: u16,
}

#[derive(Clone)]
struct ServerConfig {
    host: String,
    port: u16,
}

impl ServerConfig {
    fn from_env() -> Self {
        let host = get_env_with_fallback_or("RELAYHUB_HOST", "RELAYHUB_HOST", "0.0.0.0");
        let port = get_env_with_fallback_parse("RELAYHUB_PORT", "RELAYHUB_PORT", 8080);
        Self { host, port }
    }

    fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve(args)) => {
            logging::init().expect("failed to initialize logging");
            let config = ServerConfig {
                host: args.host,
                port: args.port,
            };
            run_server(config).await;
        }
        None => {
            // サブコマンドなしはserveと同じ
            logging::init().expect("failed to initialize logging");
            run_server(ServerConfig::from_env()).await;
        }
    }
}

/// JWT秘密鍵を取得
///
/// 環境変数が未設定の場合はランダム生成する（その場合、再起動で
/// 既存セッションは無効になる）。
fn get_jwt_secret() -> String {
    match get_env_with_fallback("RELAYHUB_JWT_SECRET", "JWT_SECRET") {
        Some(secret) if !secret.is_empty() => secret,
        _ => {
            tracing::warn!(
                "RELAYHUB_JWT_SECRET not set, using a random secret (sessions will not survive restarts)"
            );
            auth::generate_random_token(64)
        }
    }
}

async fn run_server(config: ServerConfig) {
    info!("Relayhub v{}", env!("CARGO_PKG_VERSION"));

    // データベース接続プールを最初に作成（他コンポーネントが依存）
    let database_url = get_database_url();
    let db_pool = db::migrations::initialize_database(&database_url)
        .await
        .expect("Failed to initialize database");

    // システム設定の既定値を投入
    SettingsStorage::new(db_pool.clone())
        .seed_defaults()
        .await
        .expect("Failed to seed system settings");

    // 管理者が存在しない場合は作成
    auth::bootstrap::ensure_admin_exists(&db_pool)
        .await
        .expect("Failed to ensure admin exists");

    let jwt_secret = get_jwt_secret();
    info!("Authentication system initialized");

    // HTTPクライアント（接続プーリング有効）を作成
    let http_client = reqwest::Client::builder()
        .pool_max_idle_per_host(32)
        .pool_idle_timeout(std::time::Duration::from_secs(60))
        .tcp_keepalive(std::time::Duration::from_secs(30))
        .build()
        .expect("Failed to create HTTP client");

    let state = AppState {
        db_pool,
        jwt_secret,
        http_client,
    };

    let app = api::create_app(state);

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("Failed to bind to address");

    info!("Relayhub server listening on {}", bind_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Server error");

    info!("Server shutdown complete");
}

/// シャットダウンシグナルを待機
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down...");
        }
    }
}
