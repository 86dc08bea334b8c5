//! 設定API
//!
//! ユーザー設定（ステーション既定値・チャットアプリ）、公開設定、
//! 管理者向けシステム設定。

use crate::common::auth::Claims;
use crate::common::error::ConsoleError;
use crate::db::settings::{
    SettingsStorage, KEY_ANNOUNCEMENT, KEY_ENABLE_LOGIN, KEY_ENABLE_LOGIN_CAPTCHA,
    KEY_ENABLE_REGISTRATION, KEY_ENABLE_REGISTER_CAPTCHA, KEY_SYSTEM_NAME,
};
use crate::db::user_settings::{self, UserSettings};
use crate::types::chat_app::{validate_all, ChatAppTemplate};
use crate::AppState;
use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::error::AppError;

/// ユーザー設定レスポンス
#[derive(Debug, Serialize)]
pub struct UserSettingsResponse {
    /// 成功フラグ
    pub success: bool,
    /// 設定内容
    pub settings: UserSettingsBody,
}

/// ユーザー設定の内容
#[derive(Debug, Serialize, Deserialize)]
pub struct UserSettingsBody {
    /// チャットアプリテンプレート一覧
    pub chat_apps: Vec<ChatAppTemplate>,
    /// モデル一覧パスの既定値
    pub models_path: String,
    /// チャット補完パスの既定値
    pub chat_path: String,
    /// テスト質問の既定値
    pub test_question: String,
    /// ストリーミングの既定値
    pub default_stream: bool,
    /// タイムアウトの既定値（秒）
    pub default_timeout_secs: u64,
    /// 同時実行数の既定値
    pub default_concurrency: u32,
}

/// 設定保存レスポンス
#[derive(Debug, Serialize)]
pub struct SaveSettingsResponse {
    /// 成功フラグ
    pub success: bool,
    /// メッセージ
    pub message: String,
}

/// 公開設定レスポンス
#[derive(Debug, Serialize)]
pub struct PublicSettingsResponse {
    /// 成功フラグ
    pub success: bool,
    /// 公開設定（システム名・お知らせ・登録/キャプチャのトグル）
    pub settings: HashMap<String, String>,
}

/// システム設定レスポンス（管理者向け）
#[derive(Debug, Serialize)]
pub struct SystemSettingsResponse {
    /// 成功フラグ
    pub success: bool,
    /// 全設定のキーバリュー
    pub settings: HashMap<String, String>,
}

/// システム設定更新リクエスト
#[derive(Debug, Deserialize)]
pub struct UpdateSystemSettingsRequest {
    /// 更新するキーバリュー
    pub settings: HashMap<String, String>,
}

/// GET /api/settings - ユーザー設定取得
///
/// 未保存のユーザーには既定値を返す。
pub async fn get_user_settings(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
) -> Result<Json<UserSettingsResponse>, AppError> {
    let user_id = claims
        .user_id()
        .map_err(|e| ConsoleError::Authentication(format!("Invalid user ID: {}", e)))?;

    let settings = user_settings::get(&state.db_pool, user_id).await?;

    Ok(Json(UserSettingsResponse {
        success: true,
        settings: UserSettingsBody {
            chat_apps: settings.chat_apps,
            models_path: settings.models_path,
            chat_path: settings.chat_path,
            test_question: settings.test_question,
            default_stream: settings.default_stream,
            default_timeout_secs: settings.default_timeout_secs,
            default_concurrency: settings.default_concurrency,
        },
    }))
}

/// PUT /api/settings - ユーザー設定保存
///
/// チャットアプリテンプレートは保存前にプレースホルダー検証される。
pub async fn update_user_settings(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Json(body): Json<UserSettingsBody>,
) -> Result<Json<SaveSettingsResponse>, AppError> {
    let user_id = claims
        .user_id()
        .map_err(|e| ConsoleError::Authentication(format!("Invalid user ID: {}", e)))?;

    validate_all(&body.chat_apps)?;

    let settings = UserSettings {
        user_id,
        chat_apps: body.chat_apps,
        models_path: body.models_path,
        chat_path: body.chat_path,
        test_question: body.test_question,
        default_stream: body.default_stream,
        default_timeout_secs: body.default_timeout_secs,
        default_concurrency: body.default_concurrency,
    };
    user_settings::upsert(&state.db_pool, &settings).await?;

    Ok(Json(SaveSettingsResponse {
        success: true,
        message: "Settings saved".to_string(),
    }))
}

/// GET /api/public-settings - 公開設定取得
///
/// 認証不要。ログイン/登録画面が参照するトグルのみを公開する。
pub async fn public_settings(
    State(state): State<AppState>,
) -> Result<Json<PublicSettingsResponse>, AppError> {
    let storage = SettingsStorage::new(state.db_pool.clone());

    let mut settings = HashMap::new();
    for key in [
        KEY_SYSTEM_NAME,
        KEY_ANNOUNCEMENT,
        KEY_ENABLE_REGISTRATION,
        KEY_ENABLE_LOGIN,
        KEY_ENABLE_REGISTER_CAPTCHA,
        KEY_ENABLE_LOGIN_CAPTCHA,
    ] {
        if let Some(value) = storage.get_setting(key).await? {
            settings.insert(key.to_string(), value);
        }
    }

    Ok(Json(PublicSettingsResponse {
        success: true,
        settings,
    }))
}

/// GET /api/admin/settings - システム設定取得（管理者のみ）
pub async fn get_system_settings(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
) -> Result<Json<SystemSettingsResponse>, AppError> {
    if !claims.is_admin() {
        return Err(ConsoleError::Authorization("Admin permission required".to_string()).into());
    }

    let storage = SettingsStorage::new(state.db_pool.clone());
    let settings = storage.list_settings().await?.into_iter().collect();

    Ok(Json(SystemSettingsResponse {
        success: true,
        settings,
    }))
}

/// PUT /api/admin/settings - システム設定保存（管理者のみ）
pub async fn update_system_settings(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
    Json(request): Json<UpdateSystemSettingsRequest>,
) -> Result<Json<SaveSettingsResponse>, AppError> {
    if !claims.is_admin() {
        return Err(ConsoleError::Authorization("Admin permission required".to_string()).into());
    }

    let storage = SettingsStorage::new(state.db_pool.clone());
    for (key, value) in &request.settings {
        storage.set_setting(key, value).await?;
    }

    tracing::info!(
        "Admin {} updated {} system settings",
        claims.username,
        request.settings.len()
    );

    Ok(Json(SaveSettingsResponse {
        success: true,
        message: "System settings saved".to_string(),
    }))
}
