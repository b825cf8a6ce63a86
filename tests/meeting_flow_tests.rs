//! Integration tests for the meeting-creation flow.
//!
//! Drives the orchestrator end to end against the in-memory mock
//! platform, with wiremock standing in for the URL-shortening service.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use anyhow::Result;
use async_trait::async_trait;
use jitsi_bridge::config::Config;
use jitsi_bridge::errors::BridgeError;
use jitsi_bridge::models::{ChannelType, MeetingCandidate, MeetingSession, StartMeetingOutcome};
use jitsi_bridge::platform::mock::MockPlatform;
use jitsi_bridge::platform::{Channel, Platform, PlatformError, Post, SiteConfig, Team, User};
use jitsi_bridge::services::MeetingService;
use jitsi_bridge::settings::SettingsError;
use jitsi_bridge::token;
use secrecy::SecretString;
use std::collections::HashMap;
use std::sync::Arc;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

const PRIMARY_URL: &str = "https://meet.example.com";
const SECONDARY_URL: &str = "https://overflow.example.com";
const PRIMARY_SECRET: &str = "primary-app-secret";

fn config_vars(shortener_url: &str) -> HashMap<String, String> {
    HashMap::from([
        ("JITSI_URL".to_string(), format!("{}/", PRIMARY_URL)),
        ("JITSI_JWT_ENABLED".to_string(), "true".to_string()),
        ("JITSI_LINK_VALID_MINUTES".to_string(), "30".to_string()),
        ("JITSI_APP_ID".to_string(), "bridge-app".to_string()),
        ("JITSI_APP_SECRET".to_string(), PRIMARY_SECRET.to_string()),
        ("JITSI2_URL".to_string(), SECONDARY_URL.to_string()),
        ("PRIMARY_TEAM_IDS".to_string(), "t-primary".to_string()),
        ("SHORTENER_API_URL".to_string(), shortener_url.to_string()),
        ("SHORTENER_SECRET".to_string(), "hush".to_string()),
        ("SHORTENER_TIMEOUT_MS".to_string(), "500".to_string()),
    ])
}

fn test_config(shortener_url: &str) -> Result<Config> {
    Ok(Config::from_vars(&config_vars(shortener_url))?)
}

/// Config with a deliberately short outbound-call deadline.
fn short_deadline_config(shortener_url: &str) -> Result<Config> {
    let mut vars = config_vars(shortener_url);
    vars.insert("LOOKUP_TIMEOUT_MS".to_string(), "100".to_string());
    Ok(Config::from_vars(&vars)?)
}

fn seeded_platform() -> MockPlatform {
    MockPlatform::new()
        .with_user(User {
            id: "u1".to_string(),
            username: "ada".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            nickname: String::new(),
            email: "ada@example.com".to_string(),
            last_picture_update: 42,
        })
        .with_channel(Channel {
            id: "c-open".to_string(),
            team_id: "t-primary".to_string(),
            name: "town-square".to_string(),
            display_name: "Town Square".to_string(),
            channel_type: ChannelType::Open,
        })
        .with_channel(Channel {
            id: "c-other".to_string(),
            team_id: "t-other".to_string(),
            name: "off-topic".to_string(),
            display_name: "Off Topic".to_string(),
            channel_type: ChannelType::Open,
        })
        .with_channel(Channel {
            id: "c-direct".to_string(),
            team_id: String::new(),
            name: "dm".to_string(),
            display_name: "DM".to_string(),
            channel_type: ChannelType::Direct,
        })
        .with_team(Team {
            id: "t-primary".to_string(),
            name: "core".to_string(),
            display_name: "Core".to_string(),
        })
        .with_team(Team {
            id: "t-other".to_string(),
            name: "guests".to_string(),
            display_name: "Guests".to_string(),
        })
        .with_site_config(SiteConfig {
            site_url: "https://chat.example.com".to_string(),
            show_full_name: true,
            show_email: true,
        })
}

async fn shortener_ok(server: &MockServer, short: &str) {
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "shorturl": short })),
        )
        .mount(server)
        .await;
}

fn started(outcome: StartMeetingOutcome) -> MeetingSession {
    match outcome {
        StartMeetingOutcome::Started(session) => session,
        StartMeetingOutcome::ChoiceRequired(_) => panic!("expected a started session"),
    }
}

/// Wraps the mock platform so selected operations never complete,
/// simulating a hung backend.
struct StallingPlatform {
    inner: MockPlatform,
    stall_user_lookup: bool,
    stall_kv: bool,
}

#[async_trait]
impl Platform for StallingPlatform {
    async fn get_user(&self, id: &str) -> Result<User, PlatformError> {
        if self.stall_user_lookup {
            std::future::pending::<()>().await;
        }
        self.inner.get_user(id).await
    }

    async fn get_channel(&self, id: &str) -> Result<Channel, PlatformError> {
        self.inner.get_channel(id).await
    }

    async fn get_team(&self, id: &str) -> Result<Team, PlatformError> {
        self.inner.get_team(id).await
    }

    async fn create_post(&self, post: Post) -> Result<String, PlatformError> {
        self.inner.create_post(post).await
    }

    async fn send_ephemeral_post(&self, user_id: &str, post: Post) -> Result<String, PlatformError> {
        self.inner.send_ephemeral_post(user_id, post).await
    }

    async fn delete_ephemeral_post(&self, user_id: &str, post_id: &str) -> Result<(), PlatformError> {
        self.inner.delete_ephemeral_post(user_id, post_id).await
    }

    async fn kv_get(&self, key: &str) -> Result<Option<Vec<u8>>, PlatformError> {
        if self.stall_kv {
            std::future::pending::<()>().await;
        }
        self.inner.kv_get(key).await
    }

    async fn kv_set(&self, key: &str, value: Vec<u8>) -> Result<(), PlatformError> {
        if self.stall_kv {
            std::future::pending::<()>().await;
        }
        self.inner.kv_set(key, value).await
    }

    async fn publish_event(
        &self,
        event: &str,
        payload: serde_json::Value,
        user_id: &str,
    ) -> Result<(), PlatformError> {
        self.inner.publish_event(event, payload, user_id).await
    }

    async fn get_site_config(&self) -> Result<SiteConfig, PlatformError> {
        self.inner.get_site_config().await
    }
}

#[tokio::test]
async fn test_explicit_topic_creates_tokenized_primary_meeting() -> Result<()> {
    let server = MockServer::start().await;
    shortener_ok(&server, "https://s.example.com/sr").await;

    let platform = Arc::new(seeded_platform());
    let service = MeetingService::new(platform.clone())?;
    let config = test_config(&server.uri())?;

    let session = started(
        service
            .start_meeting(&config, "u1", "c-open", None, Some("Sprint Review"))
            .await?,
    );

    assert_eq!(session.meeting_id, "SprintReview");
    assert_eq!(session.topic, "Sprint Review");
    assert!(!session.personal);
    assert!(session
        .long_url
        .starts_with(&format!("{}/SprintReview?jwt=", PRIMARY_URL)));
    assert!(session
        .long_url
        .ends_with("#config.callDisplayName=\"Sprint Review\""));
    assert_eq!(session.short_url.as_deref(), Some("https://s.example.com/sr"));
    assert_eq!(session.primary_link(), "https://s.example.com/sr");

    // Exactly one notification, carrying both links.
    let posts = platform.posts();
    assert_eq!(posts.len(), 1);
    let post = posts.first().unwrap();
    assert_eq!(post.post_type, "custom_jitsi");
    assert_eq!(post.props.get("meeting_id").unwrap(), "SprintReview");
    assert_eq!(
        post.props.get("meeting_link").unwrap(),
        "https://s.example.com/sr"
    );
    assert_eq!(
        post.props.get("meeting_raw_link").unwrap(),
        &serde_json::Value::from(session.long_url.clone())
    );
    assert!(post.message.contains("Meeting link valid until:"));
    Ok(())
}

#[tokio::test]
async fn test_issued_token_admits_the_resolved_room() -> Result<()> {
    let server = MockServer::start().await;
    shortener_ok(&server, "https://s.example.com/x").await;

    let service = MeetingService::new(Arc::new(seeded_platform()))?;
    let config = test_config(&server.uri())?;

    let session = started(
        service
            .start_meeting(&config, "u1", "c-open", None, Some("Standup"))
            .await?,
    );

    let signed = session.token.expect("primary route issues tokens");
    let claims = token::verify(&signed, &SecretString::from(PRIMARY_SECRET))?;

    assert_eq!(claims.room, "Standup");
    assert_eq!(claims.iss, "bridge-app");
    assert_eq!(claims.aud, vec!["bridge-app".to_string()]);
    assert_eq!(claims.sub, "meet.example.com");
    assert!(claims.exp > chrono::Utc::now().timestamp());
    assert_eq!(claims.context.user.id, "u1");
    assert_eq!(claims.context.user.email, "ada@example.com");
    assert_eq!(
        session.token_valid_until.map(|t| t.timestamp()),
        Some(claims.exp)
    );
    Ok(())
}

#[tokio::test]
async fn test_team_outside_primary_set_uses_secondary_route() -> Result<()> {
    let server = MockServer::start().await;
    shortener_ok(&server, "https://s.example.com/x").await;

    let service = MeetingService::new(Arc::new(seeded_platform()))?;
    let config = test_config(&server.uri())?;

    let session = started(
        service
            .start_meeting(&config, "u1", "c-other", None, Some("Overflow"))
            .await?,
    );

    assert!(session.long_url.starts_with(SECONDARY_URL));
    // The secondary route has token issuance disabled.
    assert!(session.token.is_none());
    assert!(session.token_valid_until.is_none());
    assert!(!session.long_url.contains("?jwt="));
    Ok(())
}

#[tokio::test]
async fn test_shortener_outage_falls_back_to_long_url() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let platform = Arc::new(seeded_platform());
    let service = MeetingService::new(platform.clone())?;
    let config = test_config(&server.uri())?;

    let session = started(
        service
            .start_meeting(&config, "u1", "c-open", None, Some("Sprint Review"))
            .await?,
    );

    assert!(session.short_url.is_none());
    assert_eq!(session.primary_link(), session.long_url);

    // The meeting still went out, pointing at the long link.
    let posts = platform.posts();
    assert_eq!(posts.len(), 1);
    assert_eq!(
        posts.first().unwrap().props.get("meeting_link").unwrap(),
        &serde_json::Value::from(session.long_url.clone())
    );
    Ok(())
}

#[tokio::test]
async fn test_mattermost_scheme_in_direct_channel_is_personal() -> Result<()> {
    let server = MockServer::start().await;
    shortener_ok(&server, "https://s.example.com/x").await;

    let platform = Arc::new(seeded_platform());
    platform.seed_kv(
        "config_u1",
        br#"{"embedded":false,"naming_scheme":"mattermost"}"#.to_vec(),
    );
    let service = MeetingService::new(platform.clone())?;
    let config = test_config(&server.uri())?;

    let session = started(
        service
            .start_meeting(&config, "u1", "c-direct", None, None)
            .await?,
    );

    assert!(session.personal);
    assert_eq!(session.topic, "Ada Lovelace's Personal Meeting");
    assert_eq!(session.meeting_id, "ada-u1");
    // Direct channels have no team, so routing falls to the secondary.
    assert!(session.long_url.starts_with(SECONDARY_URL));

    let posts = platform.posts();
    assert_eq!(posts.len(), 1);
    assert!(posts
        .first()
        .unwrap()
        .message
        .starts_with("Personal Meeting ID (PMI):"));
    Ok(())
}

#[tokio::test]
async fn test_ask_scheme_defers_and_candidate_reentry_completes() -> Result<()> {
    let server = MockServer::start().await;
    shortener_ok(&server, "https://s.example.com/x").await;

    let platform = Arc::new(seeded_platform());
    platform.seed_kv(
        "config_u1",
        br#"{"embedded":false,"naming_scheme":"ask"}"#.to_vec(),
    );
    let service = MeetingService::new(platform.clone())?;
    let config = test_config(&server.uri())?;

    let outcome = service
        .start_meeting(&config, "u1", "c-open", None, None)
        .await?;

    let candidates = match outcome {
        StartMeetingOutcome::ChoiceRequired(candidates) => candidates,
        StartMeetingOutcome::Started(_) => panic!("ask scheme must defer"),
    };
    assert_eq!(candidates.len(), 4, "words, personal, channel, uuid");

    // Step one presented an ephemeral prompt, no meeting post yet.
    assert!(platform.posts().is_empty());
    let prompts = platform.ephemeral_posts();
    assert_eq!(prompts.len(), 1);
    let (_, target, prompt) = prompts.first().unwrap();
    assert_eq!(target, "u1");
    assert!(prompt.props.contains_key("meeting_candidates"));

    // Step two: stateless re-entry with the chosen candidate.
    let chosen = candidates.first().unwrap();
    let session = service
        .start_meeting_from_candidate(&config, "u1", "c-open", chosen)
        .await?;

    assert_eq!(session.meeting_id, chosen.meeting_id);
    assert_eq!(session.topic, chosen.topic);
    assert_eq!(platform.posts().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_forged_candidate_identifier_is_rejected() -> Result<()> {
    let server = MockServer::start().await;
    let service = MeetingService::new(Arc::new(seeded_platform()))?;
    let config = test_config(&server.uri())?;

    let forged = MeetingCandidate {
        label: "x".to_string(),
        meeting_id: "room?jwt=evil".to_string(),
        topic: "x".to_string(),
        personal: false,
    };

    let result = service
        .start_meeting_from_candidate(&config, "u1", "c-open", &forged)
        .await;
    assert!(matches!(result, Err(BridgeError::Validation(_))));
    Ok(())
}

#[tokio::test]
async fn test_unknown_requester_aborts_without_notification() -> Result<()> {
    let server = MockServer::start().await;
    let platform = Arc::new(seeded_platform());
    let service = MeetingService::new(platform.clone())?;
    let config = test_config(&server.uri())?;

    let result = service
        .start_meeting(&config, "ghost", "c-open", None, Some("Topic"))
        .await;

    assert!(matches!(result, Err(BridgeError::Lookup(_))));
    assert!(platform.posts().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_enrich_token_refreshes_identity_with_privacy_redaction() -> Result<()> {
    let server = MockServer::start().await;
    shortener_ok(&server, "https://s.example.com/x").await;

    let platform = Arc::new(
        seeded_platform().with_site_config(SiteConfig {
            site_url: "https://chat.example.com".to_string(),
            show_full_name: true,
            show_email: false,
        }),
    );
    let service = MeetingService::new(platform.clone())?;
    let config = test_config(&server.uri())?;

    let session = started(
        service
            .start_meeting(&config, "u1", "c-open", None, Some("Standup"))
            .await?,
    );
    let original = session.token.expect("token issued");

    let refreshed = service
        .enrich_meeting_token(&config, &original, "u1")
        .await?;

    let claims = token::verify(&refreshed, &SecretString::from(PRIMARY_SECRET))?;
    assert_eq!(claims.context.user.id, "u1");
    assert_eq!(claims.context.user.name, "Ada Lovelace");
    assert_eq!(claims.context.user.email, "", "email redacted");
    assert_eq!(claims.room, "Standup");
    Ok(())
}

#[tokio::test]
async fn test_hung_user_lookup_aborts_with_timeout() -> Result<()> {
    let server = MockServer::start().await;
    let platform = Arc::new(StallingPlatform {
        inner: seeded_platform(),
        stall_user_lookup: true,
        stall_kv: false,
    });
    let service = MeetingService::new(platform.clone())?;
    let config = short_deadline_config(&server.uri())?;

    let result = service
        .start_meeting(&config, "u1", "c-open", None, Some("Topic"))
        .await;

    assert!(matches!(result, Err(BridgeError::Timeout { .. })));
    assert!(platform.inner.posts().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_hung_kv_store_aborts_preference_read_with_timeout() -> Result<()> {
    let server = MockServer::start().await;
    let platform = Arc::new(StallingPlatform {
        inner: seeded_platform(),
        stall_user_lookup: false,
        stall_kv: true,
    });
    let service = MeetingService::new(platform.clone())?;
    let config = short_deadline_config(&server.uri())?;

    // No explicit topic, so the flow has to read the stored preference.
    let result = service
        .start_meeting(&config, "u1", "c-open", None, None)
        .await;

    assert!(matches!(
        result,
        Err(BridgeError::Settings(SettingsError::Timeout { .. }))
    ));
    assert!(platform.inner.posts().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_generated_schemes_skip_the_team_lookup() -> Result<()> {
    let server = MockServer::start().await;
    shortener_ok(&server, "https://s.example.com/x").await;

    // Channel points at a team the platform cannot resolve.
    let platform = Arc::new(seeded_platform().with_channel(Channel {
        id: "c-ghost-team".to_string(),
        team_id: "t-ghost".to_string(),
        name: "orphans".to_string(),
        display_name: "Orphans".to_string(),
        channel_type: ChannelType::Open,
    }));
    let service = MeetingService::new(platform.clone())?;
    let config = test_config(&server.uri())?;

    // The default words scheme never consults the team.
    let session = started(
        service
            .start_meeting(&config, "u1", "c-ghost-team", None, None)
            .await?,
    );
    assert!(!session.meeting_id.is_empty());
    assert_eq!(platform.posts().len(), 1);

    // The platform-derived scheme does, and the failure surfaces.
    platform.seed_kv(
        "config_u1",
        br#"{"embedded":false,"naming_scheme":"mattermost"}"#.to_vec(),
    );
    let result = service
        .start_meeting(&config, "u1", "c-ghost-team", None, None)
        .await;
    assert!(matches!(result, Err(BridgeError::Lookup(_))));
    Ok(())
}

#[tokio::test]
async fn test_punctuation_only_topic_is_rejected() -> Result<()> {
    let server = MockServer::start().await;
    let platform = Arc::new(seeded_platform());
    let service = MeetingService::new(platform.clone())?;
    let config = test_config(&server.uri())?;

    let result = service
        .start_meeting(&config, "u1", "c-open", None, Some("!!!"))
        .await;

    assert!(matches!(result, Err(BridgeError::Validation(_))));
    assert!(platform.posts().is_empty());
    Ok(())
}
