//! チャットアプリ起動URLテンプレート
//!
//! ユーザー設定に保存される、外部チャットアプリへのジャンプURL。
//! プレースホルダーは `{key}` / `{address}` / `{model}` のみを許可し、
//! 保存時に検証する。

use crate::common::error::{ConsoleError, ConsoleResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// テンプレート内のプレースホルダー（`{name}`形式）を抽出する正規表現
///
/// 許可プレースホルダーと同じ字種（英小文字）のみ対象。JSONを埋め込んだ
/// テンプレートに含まれる `{"key":...}` のような波括弧は一致しない。
static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([a-z_]+)\}").expect("invalid placeholder regex"));

/// 許可されるプレースホルダー名
const ALLOWED_PLACEHOLDERS: &[&str] = &["key", "address", "model"];

/// テンプレート展開パラメータ
#[derive(Debug, Clone)]
pub struct RenderParams<'a> {
    /// APIキー
    pub key: &'a str,
    /// ステーションのベースURL
    pub address: &'a str,
    /// モデルID
    pub model: &'a str,
}

/// チャットアプリ起動URLテンプレート
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatAppTemplate {
    /// アプリ名
    pub name: String,
    /// URLテンプレート
    pub url_template: String,
}

impl ChatAppTemplate {
    /// テンプレートを検証つきで作成
    pub fn new(name: impl Into<String>, url_template: impl Into<String>) -> ConsoleResult<Self> {
        let template = Self {
            name: name.into(),
            url_template: url_template.into(),
        };
        template.validate()?;
        Ok(template)
    }

    /// プレースホルダー名を検証
    ///
    /// 未知のプレースホルダーを含むテンプレートは保存前に拒否する。
    pub fn validate(&self) -> ConsoleResult<()> {
        if self.name.trim().is_empty() {
            return Err(ConsoleError::Validation(
                "Chat app name is required".to_string(),
            ));
        }
        for capture in PLACEHOLDER_RE.captures_iter(&self.url_template) {
            let placeholder = &capture[1];
            if !ALLOWED_PLACEHOLDERS.contains(&placeholder) {
                return Err(ConsoleError::Validation(format!(
                    "Unknown placeholder '{{{}}}' in chat app '{}'",
                    placeholder, self.name
                )));
            }
        }
        Ok(())
    }

    /// プレースホルダーを実際の値で展開する
    pub fn render(&self, params: &RenderParams<'_>) -> String {
        self.url_template
            .replace("{key}", params.key)
            .replace("{address}", params.address)
            .replace("{model}", params.model)
    }
}

/// テンプレート一覧をまとめて検証
pub fn validate_all(templates: &[ChatAppTemplate]) -> ConsoleResult<()> {
    for template in templates {
        template.validate()?;
    }
    Ok(())
}

/// 新規ユーザー向けの既定チャットアプリ一覧
pub fn default_chat_apps() -> Vec<ChatAppTemplate> {
    vec![
        ChatAppTemplate {
            name: "ChatGPT Next Web".to_string(),
            url_template:
                "https://n3xt.chat/#/?settings={\"key\":\"{key}\",\"url\":\"{address}\"}"
                    .to_string(),
        },
        ChatAppTemplate {
            name: "Lobe Chat".to_string(),
            url_template: "https://chat-preview.lobehub.com/?settings={\"keyVaults\":{\"openai\":{\"apiKey\":\"{key}\",\"baseURL\":\"{address}/v1\"}}}".to_string(),
        },
        ChatAppTemplate {
            name: "AMA".to_string(),
            url_template: "ama://set-api-key?server={address}&key={key}".to_string(),
        },
        ChatAppTemplate {
            name: "OpenCat".to_string(),
            url_template: "opencat://team/join?domain={address}&token={key}".to_string(),
        },
    ]
}
