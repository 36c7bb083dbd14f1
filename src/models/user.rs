use serde::{Deserialize, Serialize};

/// Account created on first GitHub sign-in.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct User {
    pub user_id: String, // PRIMARY IDENTIFIER
    pub name: Option<String>,
    pub image: Option<String>,
    /// GitHub account id; `None` for dev-login accounts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_id: Option<i64>,
    pub created_at: i64,
}

impl User {
    pub fn info(&self) -> UserInfo {
        UserInfo {
            id: self.user_id.clone(),
            name: self.name.clone(),
            image: self.image.clone(),
        }
    }
}

/// Public profile shown next to a set.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, utoipa::ToSchema)]
pub struct UserInfo {
    pub id: String,
    pub name: Option<String>,
    pub image: Option<String>,
}

impl UserInfo {
    /// Stand-in when the owner record is gone.
    pub fn unknown(user_id: &str) -> Self {
        UserInfo {
            id: user_id.to_string(),
            name: None,
            image: None,
        }
    }
}
