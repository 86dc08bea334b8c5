//! APIエラーレスポンス型
//!
//! axum用の共通エラーハンドリング

use crate::common::error::ConsoleError;
use axum::{response::IntoResponse, Json};
use serde_json::json;

/// Axum用のエラーレスポンス型
#[derive(Debug)]
pub struct AppError(pub ConsoleError);

impl From<ConsoleError> for AppError {
    fn from(err: ConsoleError) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        // external_message() で内部詳細（SQL・URL等）の露出を防ぐ。
        // 完全なエラー内容はサーバーログ側にのみ残る。
        let status = self.0.status_code();
        let payload = json!({
            "success": false,
            "message": self.0.external_message(),
        });

        (status, Json(payload)).into_response()
    }
}
