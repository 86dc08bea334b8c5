//! 認証関連のデータモデル

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// ユーザーロール
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// 管理者（ユーザー管理・システム設定）
    Admin,
    /// 一般ユーザー（自分のステーションのみ）
    User,
}

impl UserRole {
    /// UserRoleを文字列に変換
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }
}

/// ユーザー
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// ユーザーID
    pub id: Uuid,
    /// ユーザー名
    pub username: String,
    /// パスワードハッシュ（bcrypt）
    pub password_hash: String,
    /// ユーザーロール
    pub role: UserRole,
    /// アカウント有効フラグ（管理者が無効化可能）
    pub is_active: bool,
    /// 作成日時
    pub created_at: DateTime<Utc>,
    /// 更新日時
    pub updated_at: DateTime<Utc>,
    /// 最終ログイン日時
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    /// 管理者かどうか
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// JWTクレーム
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// ユーザーID（JWT sub claim）
    pub sub: String,
    /// ユーザー名
    pub username: String,
    /// ユーザーロール
    pub role: UserRole,
    /// 有効期限（Unix timestamp、JWT exp claim）
    pub exp: usize,
}

impl Claims {
    /// ユーザーIDをUuidとして取得
    pub fn user_id(&self) -> Result<Uuid, uuid::Error> {
        self.sub.parse()
    }

    /// 管理者かどうか
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}
