use serde::{Deserialize, Serialize};

/// Subscription plan attached to an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    #[default]
    Free,
    Pro,
    Premium,
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Plan::Free => write!(f, "Free"),
            Plan::Pro => write!(f, "Pro"),
            Plan::Premium => write!(f, "Premium"),
        }
    }
}

/// Identity snapshot as returned by the server.
///
/// Always replaced wholesale from a server response; never patched locally
/// and never written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub plan: Plan,
    #[serde(rename = "isAdmin", default)]
    pub is_admin: bool,
    #[serde(rename = "connectedPlatforms", default)]
    pub connected_platforms: Vec<String>,
    #[serde(rename = "videosGenerated", default)]
    pub videos_generated: u64,
    #[serde(rename = "lastLogin", default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<String>,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl User {
    /// First name for greetings ("Welcome back, Ann")
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or(&self.name)
    }
}
