use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use crate::models::{Platform, PostStatus, PostUpdate, User, VideoPost};

use super::StudioError;

/// Simulated generation time for a video, in seconds
pub const GENERATION_DELAY_SECS: u64 = 5;

/// Titles are cut from the prompt at this many characters
const TITLE_MAX_CHARS: usize = 50;

/// Buffer size for the studio event channel
const EVENT_BUFFER_SIZE: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudioEvent {
    Generated { post_id: String },
}

#[derive(Default)]
struct StudioState {
    posts: Vec<VideoPost>,
    connected: Vec<Platform>,
    next_seq: u64,
}

/// Post queue and platform connections for the dashboard.
/// Clone is cheap; clones share the same queue.
#[derive(Clone)]
pub struct Studio {
    state: Arc<RwLock<StudioState>>,
    generation_delay: Duration,
    events: broadcast::Sender<StudioEvent>,
}

impl Studio {
    pub fn new(generation_delay: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER_SIZE);
        Self {
            state: Arc::new(RwLock::new(StudioState::default())),
            generation_delay,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StudioEvent> {
        self.events.subscribe()
    }

    // ===== Platforms =====

    /// Returns false if the platform was already connected
    pub async fn connect_platform(&self, platform: Platform) -> bool {
        let mut state = self.state.write().await;
        if state.connected.contains(&platform) {
            return false;
        }
        state.connected.push(platform);
        true
    }

    /// Returns false if the platform was not connected
    pub async fn disconnect_platform(&self, platform: Platform) -> bool {
        let mut state = self.state.write().await;
        let before = state.connected.len();
        state.connected.retain(|p| *p != platform);
        state.connected.len() != before
    }

    pub async fn connected_platforms(&self) -> Vec<Platform> {
        self.state.read().await.connected.clone()
    }

    /// Replace the connected platforms with the ones on the account
    pub async fn sync_from_user(&self, user: &User) {
        let mut connected = Vec::new();
        for id in &user.connected_platforms {
            match Platform::from_id(id) {
                Some(platform) if !connected.contains(&platform) => connected.push(platform),
                Some(_) => {}
                None => debug!(platform = %id, "Ignoring unknown platform"),
            }
        }
        self.state.write().await.connected = connected;
    }

    // ===== Posts =====

    /// Queue a new video. Generation completes in the background.
    pub async fn submit(&self, prompt: &str, platforms: &[Platform]) -> Result<VideoPost, StudioError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(StudioError::EmptyPrompt);
        }
        if platforms.is_empty() {
            return Err(StudioError::NoPlatformsSelected);
        }

        let post = {
            let mut state = self.state.write().await;
            if let Some(missing) = platforms.iter().find(|p| !state.connected.contains(*p)) {
                return Err(StudioError::PlatformNotConnected(*missing));
            }

            state.next_seq += 1;
            let now = Utc::now();
            let mut selected: Vec<Platform> = Vec::with_capacity(platforms.len());
            for platform in platforms {
                if !selected.contains(platform) {
                    selected.push(*platform);
                }
            }

            let post = VideoPost {
                id: format!("{}-{}", now.timestamp_millis(), state.next_seq),
                title: make_title(prompt),
                prompt: prompt.to_string(),
                status: PostStatus::Generating,
                created_at: now,
                scheduled_at: None,
                thumbnail: None,
                platforms: selected,
            };
            // Newest first
            state.posts.insert(0, post.clone());
            post
        };

        debug!(post_id = %post.id, "Video generation started");
        self.spawn_generation(post.id.clone());
        Ok(post)
    }

    fn spawn_generation(&self, post_id: String) {
        let studio = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(studio.generation_delay).await;

            let finished = {
                let mut state = studio.state.write().await;
                match state.posts.iter_mut().find(|p| p.id == post_id) {
                    // Only a post still generating completes; a post published or
                    // scheduled in the meantime keeps its status
                    Some(post) if post.status == PostStatus::Generating => {
                        post.status = PostStatus::Generated;
                        true
                    }
                    _ => false,
                }
            };

            if finished {
                debug!(post_id = %post_id, "Video generation finished");
                // No subscribers is fine
                let _ = studio.events.send(StudioEvent::Generated { post_id });
            }
        });
    }

    pub async fn update_post(&self, post_id: &str, update: PostUpdate) -> Result<VideoPost, StudioError> {
        let mut state = self.state.write().await;
        let post = state
            .posts
            .iter_mut()
            .find(|p| p.id == post_id)
            .ok_or_else(|| StudioError::PostNotFound(post_id.to_string()))?;
        post.apply(update);
        Ok(post.clone())
    }

    pub async fn posts(&self) -> Vec<VideoPost> {
        self.state.read().await.posts.clone()
    }

    pub async fn post(&self, post_id: &str) -> Option<VideoPost> {
        self.state
            .read()
            .await
            .posts
            .iter()
            .find(|p| p.id == post_id)
            .cloned()
    }
}

impl Default for Studio {
    fn default() -> Self {
        Self::new(Duration::from_secs(GENERATION_DELAY_SECS))
    }
}

/// First 50 characters of the prompt, with "..." when cut
fn make_title(prompt: &str) -> String {
    let mut chars = prompt.chars();
    let title: String = chars.by_ref().take(TITLE_MAX_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", title)
    } else {
        title
    }
}
