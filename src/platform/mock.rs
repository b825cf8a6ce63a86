//! In-memory platform implementation for tests.
//!
//! Exposed as a normal module (not behind `cfg(test)`) so integration
//! tests under `tests/` can drive the full meeting flow without a real
//! host platform.

use super::{Channel, Platform, PlatformError, Post, SiteConfig, Team, User};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// An event captured by [`MockPlatform::publish_event`].
#[derive(Debug, Clone)]
pub struct RecordedEvent {
    pub event: String,
    pub payload: serde_json::Value,
    pub user_id: String,
}

/// In-memory [`Platform`] with seeded records and captured outputs.
#[derive(Default)]
pub struct MockPlatform {
    users: Mutex<HashMap<String, User>>,
    channels: Mutex<HashMap<String, Channel>>,
    teams: Mutex<HashMap<String, Team>>,
    kv: Mutex<HashMap<String, Vec<u8>>>,
    posts: Mutex<Vec<Post>>,
    ephemeral: Mutex<Vec<(String, String, Post)>>,
    events: Mutex<Vec<RecordedEvent>>,
    site: Mutex<Option<SiteConfig>>,
    post_seq: AtomicU64,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, user: User) -> Self {
        if let Ok(mut users) = self.users.lock() {
            users.insert(user.id.clone(), user);
        }
        self
    }

    pub fn with_channel(self, channel: Channel) -> Self {
        if let Ok(mut channels) = self.channels.lock() {
            channels.insert(channel.id.clone(), channel);
        }
        self
    }

    pub fn with_team(self, team: Team) -> Self {
        if let Ok(mut teams) = self.teams.lock() {
            teams.insert(team.id.clone(), team);
        }
        self
    }

    pub fn with_site_config(self, site: SiteConfig) -> Self {
        if let Ok(mut slot) = self.site.lock() {
            *slot = Some(site);
        }
        self
    }

    /// All regular posts created so far.
    pub fn posts(&self) -> Vec<Post> {
        self.posts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    /// All ephemeral posts still visible, as (post id, target user, post).
    pub fn ephemeral_posts(&self) -> Vec<(String, String, Post)> {
        self.ephemeral.lock().map(|p| p.clone()).unwrap_or_default()
    }

    /// All broadcast events captured so far.
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Raw stored value for a key, if any.
    pub fn kv_value(&self, key: &str) -> Option<Vec<u8>> {
        self.kv.lock().ok().and_then(|kv| kv.get(key).cloned())
    }

    /// Seeds a raw key/value record, bypassing validation.
    pub fn seed_kv(&self, key: &str, value: Vec<u8>) {
        if let Ok(mut kv) = self.kv.lock() {
            kv.insert(key.to_string(), value);
        }
    }

    fn next_post_id(&self) -> String {
        format!("post-{}", self.post_seq.fetch_add(1, Ordering::Relaxed))
    }

    fn poisoned() -> PlatformError {
        PlatformError::Transport("mock state lock poisoned".to_string())
    }
}

#[async_trait]
impl Platform for MockPlatform {
    async fn get_user(&self, id: &str) -> Result<User, PlatformError> {
        self.users
            .lock()
            .map_err(|_| Self::poisoned())?
            .get(id)
            .cloned()
            .ok_or_else(|| PlatformError::NotFound {
                entity: "user",
                id: id.to_string(),
            })
    }

    async fn get_channel(&self, id: &str) -> Result<Channel, PlatformError> {
        self.channels
            .lock()
            .map_err(|_| Self::poisoned())?
            .get(id)
            .cloned()
            .ok_or_else(|| PlatformError::NotFound {
                entity: "channel",
                id: id.to_string(),
            })
    }

    async fn get_team(&self, id: &str) -> Result<Team, PlatformError> {
        self.teams
            .lock()
            .map_err(|_| Self::poisoned())?
            .get(id)
            .cloned()
            .ok_or_else(|| PlatformError::NotFound {
                entity: "team",
                id: id.to_string(),
            })
    }

    async fn create_post(&self, post: Post) -> Result<String, PlatformError> {
        self.posts.lock().map_err(|_| Self::poisoned())?.push(post);
        Ok(self.next_post_id())
    }

    async fn send_ephemeral_post(&self, user_id: &str, post: Post) -> Result<String, PlatformError> {
        let id = self.next_post_id();
        self.ephemeral
            .lock()
            .map_err(|_| Self::poisoned())?
            .push((id.clone(), user_id.to_string(), post));
        Ok(id)
    }

    async fn delete_ephemeral_post(
        &self,
        user_id: &str,
        post_id: &str,
    ) -> Result<(), PlatformError> {
        let mut posts = self.ephemeral.lock().map_err(|_| Self::poisoned())?;
        posts.retain(|(id, uid, _)| !(id == post_id && uid == user_id));
        Ok(())
    }

    async fn kv_get(&self, key: &str) -> Result<Option<Vec<u8>>, PlatformError> {
        Ok(self
            .kv
            .lock()
            .map_err(|_| Self::poisoned())?
            .get(key)
            .cloned())
    }

    async fn kv_set(&self, key: &str, value: Vec<u8>) -> Result<(), PlatformError> {
        self.kv
            .lock()
            .map_err(|_| Self::poisoned())?
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn publish_event(
        &self,
        event: &str,
        payload: serde_json::Value,
        user_id: &str,
    ) -> Result<(), PlatformError> {
        self.events
            .lock()
            .map_err(|_| Self::poisoned())?
            .push(RecordedEvent {
                event: event.to_string(),
                payload,
                user_id: user_id.to_string(),
            });
        Ok(())
    }

    async fn get_site_config(&self) -> Result<SiteConfig, PlatformError> {
        self.site
            .lock()
            .map_err(|_| Self::poisoned())?
            .clone()
            .ok_or(PlatformError::Transport(
                "mock site config not seeded".to_string(),
            ))
    }
}
