//! ステーション管理API
//!
//! ステーションCRUDと、モデル一覧取得・バッチテスト・額度照会の
//! コア操作を提供する。すべて所有ユーザーでスコープされる。

use crate::common::auth::Claims;
use crate::common::error::ConsoleError;
use crate::db::stations as db;
use crate::probe::{self, ProbeOutcome, ProbeRequest, ProbeResult};
use crate::types::station::Station;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::AppError;

/// ステーション登録リクエスト
#[derive(Debug, Deserialize)]
pub struct CreateStationRequest {
    /// 表示名
    pub name: String,
    /// ベースURL
    pub base_url: String,
    /// APIキー
    pub api_key: String,
    /// モデル一覧パス
    #[serde(default)]
    pub models_path: Option<String>,
    /// チャット補完パス
    #[serde(default)]
    pub chat_path: Option<String>,
    /// 既定のテスト質問
    #[serde(default)]
    pub test_question: Option<String>,
    /// 既定のストリーミングフラグ
    #[serde(default)]
    pub default_stream: Option<bool>,
    /// 既定のタイムアウト（秒）
    #[serde(default)]
    pub default_timeout_secs: Option<u64>,
    /// 既定の同時実行数
    #[serde(default)]
    pub default_concurrency: Option<u32>,
}

/// ステーション更新リクエスト
///
/// Noneのフィールドは変更しない。
#[derive(Debug, Default, Deserialize)]
pub struct UpdateStationRequest {
    /// 表示名
    #[serde(default)]
    pub name: Option<String>,
    /// ベースURL
    #[serde(default)]
    pub base_url: Option<String>,
    /// APIキー
    #[serde(default)]
    pub api_key: Option<String>,
    /// モデル一覧パス
    #[serde(default)]
    pub models_path: Option<String>,
    /// チャット補完パス
    #[serde(default)]
    pub chat_path: Option<String>,
    /// 既定のテスト質問
    #[serde(default)]
    pub test_question: Option<String>,
    /// 既定のストリーミングフラグ
    #[serde(default)]
    pub default_stream: Option<bool>,
    /// 既定のタイムアウト（秒）
    #[serde(default)]
    pub default_timeout_secs: Option<u64>,
    /// 既定の同時実行数
    #[serde(default)]
    pub default_concurrency: Option<u32>,
    /// 有効フラグ
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// ステーションレスポンス
#[derive(Debug, Serialize)]
pub struct StationResponse {
    /// 一意識別子
    pub id: Uuid,
    /// 表示名
    pub name: String,
    /// ベースURL
    pub base_url: String,
    /// APIキー（所有者にのみ返る）
    pub api_key: String,
    /// モデル一覧パス
    pub models_path: String,
    /// チャット補完パス
    pub chat_path: String,
    /// 既定のテスト質問
    pub test_question: String,
    /// 既定のストリーミングフラグ
    pub default_stream: bool,
    /// 既定のタイムアウト（秒）
    pub default_timeout_secs: u64,
    /// 既定の同時実行数
    pub default_concurrency: u32,
    /// 有効フラグ
    pub is_active: bool,
    /// 作成日時
    pub created_at: String,
    /// 更新日時
    pub updated_at: String,
}

impl From<Station> for StationResponse {
    fn from(station: Station) -> Self {
        StationResponse {
            id: station.id,
            name: station.name,
            base_url: station.base_url,
            api_key: station.api_key,
            models_path: station.models_path,
            chat_path: station.chat_path,
            test_question: station.test_question,
            default_stream: station.default_stream,
            default_timeout_secs: station.default_timeout_secs,
            default_concurrency: station.default_concurrency,
            is_active: station.is_active,
            created_at: station.created_at.to_rfc3339(),
            updated_at: station.updated_at.to_rfc3339(),
        }
    }
}

/// ステーション一覧レスポンス
#[derive(Debug, Serialize)]
pub struct ListStationsResponse {
    /// 成功フラグ
    pub success: bool,
    /// ステーション一覧
    pub stations: Vec<StationResponse>,
    /// 総数
    pub total: usize,
}

/// ステーション単体レスポンス
#[derive(Debug, Serialize)]
pub struct StationDetailResponse {
    /// 成功フラグ
    pub success: bool,
    /// ステーション
    pub station: StationResponse,
}

/// 書き込み操作レスポンス
#[derive(Debug, Serialize)]
pub struct MutationResponse {
    /// 成功フラグ
    pub success: bool,
    /// メッセージ
    pub message: String,
    /// 対象ステーションID（作成時のみ）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub station_id: Option<Uuid>,
}

/// モデル一覧レスポンス
///
/// 上流の失敗はHTTPエラーではなく `success=false, valid=false` の
/// タグ付き結果として返す。
#[derive(Debug, Serialize)]
pub struct ListModelsResponse {
    /// 成功フラグ
    pub success: bool,
    /// ステーションが有効か
    pub valid: bool,
    /// モデルID一覧
    pub models: Vec<String>,
    /// モデル数
    pub count: usize,
    /// 失敗理由
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// モデル1件ぶんのテスト結果
#[derive(Debug, Serialize)]
pub struct ProbeResultResponse {
    /// モデルID
    pub model: String,
    /// 成功フラグ
    pub success: bool,
    /// 抽出したコンテンツ（成功時のみ）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// ストリーミングで消費したか（成功時のみ）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub streaming: Option<bool>,
    /// 失敗理由（失敗時のみ）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<ProbeResult> for ProbeResultResponse {
    fn from(result: ProbeResult) -> Self {
        match result.outcome {
            ProbeOutcome::Success { content, streaming } => ProbeResultResponse {
                model: result.model,
                success: true,
                content: Some(content),
                streaming: Some(streaming),
                message: None,
            },
            ProbeOutcome::Failure { reason } => ProbeResultResponse {
                model: result.model,
                success: false,
                content: None,
                streaming: None,
                message: Some(reason),
            },
        }
    }
}

/// バッチテストレスポンス
#[derive(Debug, Serialize)]
pub struct TestModelsResponse {
    /// 成功フラグ（リクエスト自体の成否。モデル別の成否はresults側）
    pub success: bool,
    /// モデル別の結果
    pub results: Vec<ProbeResultResponse>,
}

/// 額度照会レスポンス
#[derive(Debug, Serialize)]
pub struct UsageResponse {
    /// 成功フラグ
    pub success: bool,
    /// 額度スナップショット（対応ステーションのみ）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<crate::types::usage::UsageSnapshot>,
    /// メッセージ（未対応時）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// 認証済みユーザーのステーションを取得（所有チェック込み）
async fn load_owned_station(
    state: &AppState,
    claims: &Claims,
    id: Uuid,
) -> Result<Station, ConsoleError> {
    let user_id = claims
        .user_id()
        .map_err(|e| ConsoleError::Authentication(format!("Invalid user ID: {}", e)))?;

    db::get_station(&state.db_pool, id, user_id)
        .await?
        .ok_or(ConsoleError::StationNotFound(id))
}

// --- CRUD ---

/// GET /api/stations - ステーション一覧
pub async fn list_stations(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
) -> Result<Json<ListStationsResponse>, AppError> {
    let user_id = claims
        .user_id()
        .map_err(|e| ConsoleError::Authentication(format!("Invalid user ID: {}", e)))?;

    let stations = db::list_stations(&state.db_pool, user_id).await?;
    let total = stations.len();

    Ok(Json(ListStationsResponse {
        success: true,
        stations: stations.into_iter().map(StationResponse::from).collect(),
        total,
    }))
}

/// POST /api/stations - ステーション登録
pub async fn create_station(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Json(request): Json<CreateStationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims
        .user_id()
        .map_err(|e| ConsoleError::Authentication(format!("Invalid user ID: {}", e)))?;

    if request.name.trim().is_empty()
        || request.base_url.trim().is_empty()
        || request.api_key.trim().is_empty()
    {
        return Err(ConsoleError::Validation(
            "Name, base URL and API key are required".to_string(),
        )
        .into());
    }

    if Url::parse(&request.base_url).is_err() {
        return Err(ConsoleError::Validation("Invalid base URL format".to_string()).into());
    }

    let mut station = Station::new(user_id, request.name, request.base_url, request.api_key);
    if let Some(models_path) = request.models_path {
        station.models_path = models_path;
    }
    if let Some(chat_path) = request.chat_path {
        station.chat_path = chat_path;
    }
    if let Some(test_question) = request.test_question {
        station.test_question = test_question;
    }
    if let Some(default_stream) = request.default_stream {
        station.default_stream = default_stream;
    }
    if let Some(default_timeout_secs) = request.default_timeout_secs {
        station.default_timeout_secs = default_timeout_secs;
    }
    if let Some(default_concurrency) = request.default_concurrency {
        station.default_concurrency = default_concurrency;
    }

    db::create_station(&state.db_pool, &station).await?;

    tracing::info!(station_id = %station.id, user_id = %user_id, "Station created");

    Ok((
        StatusCode::CREATED,
        Json(MutationResponse {
            success: true,
            message: "Station created".to_string(),
            station_id: Some(station.id),
        }),
    ))
}

/// GET /api/stations/:id - ステーション詳細
pub async fn get_station(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<StationDetailResponse>, AppError> {
    let station = load_owned_station(&state, &claims, id).await?;

    Ok(Json(StationDetailResponse {
        success: true,
        station: StationResponse::from(station),
    }))
}

/// PUT /api/stations/:id - ステーション更新
pub async fn update_station(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateStationRequest>,
) -> Result<Json<MutationResponse>, AppError> {
    let mut station = load_owned_station(&state, &claims, id).await?;

    if let Some(ref base_url) = request.base_url {
        if Url::parse(base_url).is_err() {
            return Err(ConsoleError::Validation("Invalid base URL format".to_string()).into());
        }
    }

    if let Some(name) = request.name {
        station.name = name;
    }
    if let Some(base_url) = request.base_url {
        station.base_url = base_url;
    }
    if let Some(api_key) = request.api_key {
        station.api_key = api_key;
    }
    if let Some(models_path) = request.models_path {
        station.models_path = models_path;
    }
    if let Some(chat_path) = request.chat_path {
        station.chat_path = chat_path;
    }
    if let Some(test_question) = request.test_question {
        station.test_question = test_question;
    }
    if let Some(default_stream) = request.default_stream {
        station.default_stream = default_stream;
    }
    if let Some(default_timeout_secs) = request.default_timeout_secs {
        station.default_timeout_secs = default_timeout_secs;
    }
    if let Some(default_concurrency) = request.default_concurrency {
        station.default_concurrency = default_concurrency;
    }
    if let Some(is_active) = request.is_active {
        station.is_active = is_active;
    }

    let updated = db::update_station(&state.db_pool, &station).await?;
    if !updated {
        return Err(ConsoleError::StationNotFound(id).into());
    }

    Ok(Json(MutationResponse {
        success: true,
        message: "Station updated".to_string(),
        station_id: None,
    }))
}

/// DELETE /api/stations/:id - ステーション削除
pub async fn delete_station(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MutationResponse>, AppError> {
    let user_id = claims
        .user_id()
        .map_err(|e| ConsoleError::Authentication(format!("Invalid user ID: {}", e)))?;

    let deleted = db::delete_station(&state.db_pool, id, user_id).await?;
    if !deleted {
        return Err(ConsoleError::StationNotFound(id).into());
    }

    tracing::info!(station_id = %id, user_id = %user_id, "Station deleted");

    Ok(Json(MutationResponse {
        success: true,
        message: "Station deleted".to_string(),
        station_id: None,
    }))
}

// --- コア操作 ---

/// GET /api/stations/:id/models - モデル一覧取得
///
/// 上流の失敗（非2xx・タイムアウト）は200で `success=false, valid=false`
/// として返す。リクエストレベルで失敗するのは対象ステーション自体の
/// NotFound/未認証のみ。
pub async fn list_station_models(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ListModelsResponse>, AppError> {
    let station = load_owned_station(&state, &claims, id).await?;

    let listing = probe::lister::list_models(&state.http_client, &station).await;

    if !listing.valid {
        return Ok(Json(ListModelsResponse {
            success: false,
            valid: false,
            models: Vec::new(),
            count: 0,
            message: listing.error,
        }));
    }

    let count = listing.models.len();
    Ok(Json(ListModelsResponse {
        success: true,
        valid: true,
        models: listing.models,
        count,
        message: None,
    }))
}

/// POST /api/stations/:id/test - モデルのバッチテスト
///
/// モデル別の失敗はresults内のFailureとして返り、リクエスト全体は
/// 成功のまま完了する。
pub async fn test_station_models(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ProbeRequest>,
) -> Result<Json<TestModelsResponse>, AppError> {
    let station = load_owned_station(&state, &claims, id).await?;

    let engine = probe::ProbeEngine::new(state.http_client.clone());
    let results = engine.run(&station, &request).await;

    Ok(Json(TestModelsResponse {
        success: true,
        results: results.into_iter().map(ProbeResultResponse::from).collect(),
    }))
}

/// GET /api/stations/:id/usage - 額度照会
///
/// 未対応・失敗は `success=false` とメッセージで返す（ハードエラーに
/// しない）。
pub async fn get_station_usage(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UsageResponse>, AppError> {
    let station = load_owned_station(&state, &claims, id).await?;

    match probe::usage::fetch_usage(&state.http_client, &station).await {
        Some(usage) => Ok(Json(UsageResponse {
            success: true,
            usage: Some(usage),
            message: None,
        })),
        None => Ok(Json(UsageResponse {
            success: false,
            usage: None,
            message: Some("Usage query failed or not supported".to_string()),
        })),
    }
}
