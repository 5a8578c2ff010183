use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Social platforms a generated video can be published to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Youtube,
    Instagram,
    Tiktok,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Youtube, Platform::Instagram, Platform::Tiktok];

    /// Identifier used by the API (`connectedPlatforms`)
    pub fn id(&self) -> &'static str {
        match self {
            Platform::Youtube => "youtube",
            Platform::Instagram => "instagram",
            Platform::Tiktok => "tiktok",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Youtube => "YouTube Shorts",
            Platform::Instagram => "Instagram Reels",
            Platform::Tiktok => "TikTok",
        }
    }

    /// Parse an API identifier, case-insensitively
    pub fn from_id(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.id().eq_ignore_ascii_case(s.trim()))
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Generating,
    Generated,
    Published,
    Scheduled,
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PostStatus::Generating => write!(f, "Generating"),
            PostStatus::Generated => write!(f, "Generated"),
            PostStatus::Published => write!(f, "Published"),
            PostStatus::Scheduled => write!(f, "Scheduled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoPost {
    pub id: String,
    pub title: String,
    pub prompt: String,
    pub status: PostStatus,
    pub created_at: DateTime<Utc>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub thumbnail: Option<String>,
    pub platforms: Vec<Platform>,
}

/// Partial update applied by `Studio::update_post`
#[derive(Debug, Clone, Default)]
pub struct PostUpdate {
    pub title: Option<String>,
    pub status: Option<PostStatus>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub thumbnail: Option<String>,
}

impl VideoPost {
    pub fn apply(&mut self, update: PostUpdate) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(at) = update.scheduled_at {
            self.scheduled_at = Some(at);
        }
        if let Some(thumb) = update.thumbnail {
            self.thumbnail = Some(thumb);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_from_id() {
        assert_eq!(Platform::from_id("youtube"), Some(Platform::Youtube));
        assert_eq!(Platform::from_id(" TikTok "), Some(Platform::Tiktok));
        assert_eq!(Platform::from_id("myspace"), None);
    }

    #[test]
    fn test_platform_serializes_as_id() {
        let json = serde_json::to_string(&Platform::Instagram).expect("Failed to serialize platform");
        assert_eq!(json, "\"instagram\"");
    }
}
