use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

use super::timestamp;

/// ユーザードキュメント。
/// `is_active` は keyword フィールドとして `"true"` / `"false"` の文字列で保存される。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    #[serde(default)]
    pub bio: String,
    pub is_active: String,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub updated_at: DateTime<Utc>,
}

/// ユーザー作成 API が受け取るペイロード。
/// `bio` と `is_active` は省略時にそれぞれ空文字列と `"true"` になる。
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub full_name: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default = "default_is_active")]
    pub is_active: String,
}

fn default_is_active() -> String {
    "true".to_string()
}

impl User {
    /// UUID とタイムスタンプを埋めた `User` を生成する。
    pub fn new(username: String, email: String, full_name: String, bio: String, is_active: String) -> Self {
        let now = Utc::now();

        User {
            id: Uuid::new_v4().to_string(),
            username,
            email,
            full_name,
            bio,
            is_active,
            created_at: now,
            updated_at: now,
        }
    }
}

impl CreateUserRequest {
    /// ユーザー作成時のビジネスルール (空欄禁止・文字数上限・メール形式) を検証する。
    /// 失敗時は `Err(String)` を返し、サービス層で `ApiError::Validation` に変換される。
    pub fn validate(&self) -> Result<(), String> {
        // Validate username
        if self.username.trim().is_empty() {
            return Err("Username cannot be empty".to_string());
        }

        if self.username.trim().chars().count() > 100 {
            return Err("Username cannot exceed 100 characters".to_string());
        }

        if !self.username.trim().chars().all(|c| c.is_alphanumeric() || "._-".contains(c)) {
            return Err("Username may only contain letters, digits, '.', '_' and '-'".to_string());
        }

        // Validate email
        if self.email.trim().is_empty() {
            return Err("Email cannot be empty".to_string());
        }

        if !is_valid_email(self.email.trim()) {
            return Err("Invalid email format".to_string());
        }

        if self.email.trim().chars().count() > 255 {
            return Err("Email cannot exceed 255 characters".to_string());
        }

        // Validate full name
        if self.full_name.trim().is_empty() {
            return Err("Full name cannot be empty".to_string());
        }

        if self.full_name.chars().count() > 200 {
            return Err("Full name cannot exceed 200 characters".to_string());
        }

        if self.bio.chars().count() > 2000 {
            return Err("Bio cannot exceed 2000 characters".to_string());
        }

        match self.is_active.trim() {
            "true" | "false" => {}
            _ => return Err("is_active must be \"true\" or \"false\"".to_string()),
        }

        Ok(())
    }

    /// 入力をトリムし、メールは小文字化して `User` に変換する。
    pub fn into_user(self) -> User {
        User::new(
            self.username.trim().to_string(),
            self.email.trim().to_lowercase(),
            self.full_name.trim().to_string(),
            self.bio.trim().to_string(),
            self.is_active.trim().to_string(),
        )
    }
}

/// シンプルなメールフォーマット検証。
/// 正規表現を使わず、`split('@')` などで最小限のルールをチェックしている。
fn is_valid_email(email: &str) -> bool {
    let parts: Vec<&str> = email.split('@').collect();

    if parts.len() != 2 {
        return false;
    }

    let local = parts[0];
    let domain = parts[1];

    if local.is_empty() || local.len() > 64 {
        return false;
    }

    if domain.is_empty() || domain.len() > 253 {
        return false;
    }

    // Domain should contain at least one dot
    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return false;
    }

    let valid_chars = |c: char| c.is_alphanumeric() || ".-_+".contains(c);

    local.chars().all(valid_chars) && domain.chars().all(|c| c.is_alphanumeric() || ".-".contains(c))
}
