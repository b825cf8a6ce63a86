//! Host chat-platform collaborator interface.
//!
//! The bridge never talks to the chat platform directly; everything goes
//! through the [`Platform`] trait so the host integration (and the tests)
//! can supply their own transport. The trait covers exactly the surface
//! the bridge consumes: identity/channel/team lookups, post delivery,
//! key/value persistence, event broadcast and the site configuration read.

pub mod mock;

use crate::models::ChannelType;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by the host platform.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("platform transport error: {0}")]
    Transport(String),
}

/// A chat-platform user, as much of it as the bridge needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub nickname: String,
    pub email: String,

    /// Cache-busting timestamp for the avatar image URL.
    pub last_picture_update: i64,
}

impl User {
    /// Display name preference order: nickname, full name, username.
    ///
    /// Mirrors the host platform's "show nickname or full name" render
    /// mode so meeting topics match what the user sees elsewhere.
    pub fn display_name(&self) -> String {
        if !self.nickname.is_empty() {
            return self.nickname.clone();
        }
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if !full.is_empty() {
            return full.to_string();
        }
        self.username.clone()
    }
}

/// A chat channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub team_id: String,
    pub name: String,
    pub display_name: String,
    pub channel_type: ChannelType,
}

/// A team the channel belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
    pub display_name: String,
}

/// Site-wide settings the bridge reads from the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Public base URL of the host platform.
    pub site_url: String,

    /// Privacy flag: expose users' full names to integrations.
    pub show_full_name: bool,

    /// Privacy flag: expose users' email addresses to integrations.
    pub show_email: bool,
}

/// A post to deliver into a channel (regular or ephemeral).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub user_id: String,
    pub channel_id: String,
    pub message: String,

    /// Custom post type consumed by the client-side renderer; empty for
    /// plain posts.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub post_type: String,

    /// Free-form props attached to the post.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub props: serde_json::Map<String, serde_json::Value>,
}

impl Post {
    /// A plain text post with no type or props.
    pub fn plain(user_id: &str, channel_id: &str, message: &str) -> Self {
        Post {
            user_id: user_id.to_string(),
            channel_id: channel_id.to_string(),
            message: message.to_string(),
            post_type: String::new(),
            props: serde_json::Map::new(),
        }
    }
}

/// Operations the bridge consumes from the host chat platform.
///
/// All calls are fallible and may block on the host's own transport; the
/// orchestrator wraps each one in a deadline.
#[async_trait]
pub trait Platform: Send + Sync {
    async fn get_user(&self, id: &str) -> Result<User, PlatformError>;

    async fn get_channel(&self, id: &str) -> Result<Channel, PlatformError>;

    async fn get_team(&self, id: &str) -> Result<Team, PlatformError>;

    /// Creates a regular post and returns its id.
    async fn create_post(&self, post: Post) -> Result<String, PlatformError>;

    /// Sends a post only the given user can see; returns the post id.
    async fn send_ephemeral_post(&self, user_id: &str, post: Post) -> Result<String, PlatformError>;

    async fn delete_ephemeral_post(&self, user_id: &str, post_id: &str)
        -> Result<(), PlatformError>;

    /// Reads a raw value from the host key/value store; `None` when absent.
    async fn kv_get(&self, key: &str) -> Result<Option<Vec<u8>>, PlatformError>;

    async fn kv_set(&self, key: &str, value: Vec<u8>) -> Result<(), PlatformError>;

    /// Broadcasts an event to the given user's connected clients.
    async fn publish_event(
        &self,
        event: &str,
        payload: serde_json::Value,
        user_id: &str,
    ) -> Result<(), PlatformError>;

    async fn get_site_config(&self) -> Result<SiteConfig, PlatformError>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    fn user(nickname: &str, first: &str, last: &str, username: &str) -> User {
        User {
            id: "u1".to_string(),
            username: username.to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            nickname: nickname.to_string(),
            email: "u1@example.com".to_string(),
            last_picture_update: 0,
        }
    }

    #[test]
    fn test_display_name_prefers_nickname() {
        assert_eq!(user("nick", "Ada", "Lovelace", "ada").display_name(), "nick");
    }

    #[test]
    fn test_display_name_falls_back_to_full_name() {
        assert_eq!(
            user("", "Ada", "Lovelace", "ada").display_name(),
            "Ada Lovelace"
        );
    }

    #[test]
    fn test_display_name_falls_back_to_username() {
        assert_eq!(user("", "", "", "ada").display_name(), "ada");
    }

    #[test]
    fn test_display_name_trims_partial_names() {
        assert_eq!(user("", "Ada", "", "ada").display_name(), "Ada");
    }
}
