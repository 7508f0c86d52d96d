use serde::{Deserialize, Serialize};
use validator::Validate;

const FALLBACK_DISPLAY_NAME: &str = "Quiz Taker";

/// GitLab user as returned by `GET /api/v4/users?username=...`.
/// Only the fields the quiz uses are kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub web_url: Option<String>,
}

impl UserRecord {
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .or_else(|| Some(self.username.as_str()).filter(|name| !name.is_empty()))
            .unwrap_or(FALLBACK_DISPLAY_NAME)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct IdentifyRequest {
    #[validate(length(min = 1, max = 255, message = "Username cannot be empty."))]
    pub username: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: u64,
    pub username: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

impl From<&UserRecord> for UserSummary {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            display_name: user.display_name().to_string(),
            avatar_url: user.avatar_url.clone(),
        }
    }
}
