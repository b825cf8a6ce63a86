//! Meeting orchestrator.
//!
//! Ties routing, naming, token issuance, link shortening and
//! notification delivery into a single meeting-creation outcome.
//!
//! # Guarantees
//!
//! - At most one notification per successful invocation.
//! - Every outbound platform call runs under the configured deadline.
//! - A shortener failure never aborts the flow; the long URL is used.
//! - Any other failure aborts the whole operation with a typed error.

use crate::config::Config;
use crate::errors::BridgeError;
use crate::models::{MeetingCandidate, MeetingSession, NamingScheme, StartMeetingOutcome};
use crate::naming::{self, NamingContext, ResolvedName, Resolution};
use crate::platform::{Channel, Platform, PlatformError, Post, Team, User};
use crate::services::shortener::ShortenerClient;
use crate::settings::SettingsStore;
use crate::token::{self, RoomClaims, RoomContext};
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Custom post type consumed by the client-side meeting renderer.
const MEETING_POST_TYPE: &str = "custom_jitsi";

/// Timestamp format for the human-readable validity window.
const VALID_UNTIL_FORMAT: &str = "%a %b %-d , %H:%M:%S";

/// Icon shown for the webhook-styled meeting notification.
const MEETING_ICON_URL: &str = "https://s3.amazonaws.com/mattermost-plugin-media/Zoom+App.png";

/// Meeting orchestrator. Composes the naming resolver, the token issuer,
/// the shortener and the host platform.
pub struct MeetingService {
    platform: Arc<dyn Platform>,
    settings: SettingsStore,
    shortener: ShortenerClient,
}

/// Runs a platform lookup under the configured deadline.
async fn lookup<T>(
    config: &Config,
    operation: &'static str,
    fut: impl Future<Output = Result<T, PlatformError>>,
) -> Result<T, BridgeError> {
    tokio::time::timeout(config.lookup_timeout, fut)
        .await
        .map_err(|_| BridgeError::Timeout { operation })?
        .map_err(BridgeError::Lookup)
}

/// Runs a post delivery under the configured deadline.
async fn deliver<T>(
    config: &Config,
    operation: &'static str,
    fut: impl Future<Output = Result<T, PlatformError>>,
) -> Result<T, BridgeError> {
    tokio::time::timeout(config.lookup_timeout, fut)
        .await
        .map_err(|_| BridgeError::Timeout { operation })?
        .map_err(BridgeError::Publish)
}

fn is_valid_meeting_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

impl MeetingService {
    pub fn new(platform: Arc<dyn Platform>) -> Result<Self, BridgeError> {
        Ok(MeetingService {
            settings: SettingsStore::new(platform.clone()),
            shortener: ShortenerClient::new()?,
            platform,
        })
    }

    /// Starts a meeting for the requester in the given channel.
    ///
    /// With an explicit id or topic the naming scheme is bypassed.
    /// Otherwise the requester's preference drives resolution; under the
    /// `Ask` scheme the candidates are presented as an ephemeral prompt
    /// and no session is created — the caller completes the flow with
    /// [`MeetingService::start_meeting_from_candidate`].
    #[instrument(
        skip_all,
        name = "bridge.meeting.start",
        fields(requester_id = %requester_id, channel_id = %channel_id)
    )]
    pub async fn start_meeting(
        &self,
        config: &Config,
        requester_id: &str,
        channel_id: &str,
        explicit_id: Option<&str>,
        explicit_topic: Option<&str>,
    ) -> Result<StartMeetingOutcome, BridgeError> {
        let user = lookup(config, "get_user", self.platform.get_user(requester_id)).await?;
        let channel = lookup(config, "get_channel", self.platform.get_channel(channel_id)).await?;

        let explicit_id = explicit_id.map(str::trim).filter(|s| !s.is_empty());
        let explicit_topic = explicit_topic.map(str::trim).filter(|s| !s.is_empty());

        let resolution = if let Some(raw) = explicit_id.or(explicit_topic) {
            let meeting_id = naming::sanitize_meeting_id(raw);
            if meeting_id.is_empty() {
                return Err(BridgeError::Validation(format!(
                    "Meeting name `{}` contains no usable characters.",
                    raw
                )));
            }
            Resolution::Single(ResolvedName {
                meeting_id,
                topic: explicit_topic.unwrap_or(raw).to_string(),
                personal: false,
            })
        } else {
            let preference = self.settings.get(config, requester_id).await?;
            // Only the platform-derived schemes ever consult the team.
            let team = match preference.naming_scheme {
                NamingScheme::Mattermost | NamingScheme::Ask => {
                    self.team_for(config, &channel).await?
                }
                NamingScheme::Words | NamingScheme::Uuid => None,
            };
            let ctx = NamingContext {
                requester: &user,
                channel: &channel,
                team: team.as_ref(),
            };
            naming::resolve(&preference, &ctx, None)
        };

        match resolution {
            Resolution::Choices(candidates) => {
                self.send_choice_prompt(config, &user, &channel, &candidates)
                    .await?;
                Ok(StartMeetingOutcome::ChoiceRequired(candidates))
            }
            Resolution::Single(name) => {
                let session = self.create_session(config, &user, &channel, name).await?;
                Ok(StartMeetingOutcome::Started(session))
            }
        }
    }

    /// Step two of the deferred "ask" flow: a stateless re-entry carrying
    /// one previously presented candidate's full parameters.
    #[instrument(
        skip_all,
        name = "bridge.meeting.start_from_candidate",
        fields(requester_id = %requester_id, channel_id = %channel_id)
    )]
    pub async fn start_meeting_from_candidate(
        &self,
        config: &Config,
        requester_id: &str,
        channel_id: &str,
        candidate: &MeetingCandidate,
    ) -> Result<MeetingSession, BridgeError> {
        if !is_valid_meeting_id(&candidate.meeting_id) {
            return Err(BridgeError::Validation(format!(
                "Invalid meeting identifier `{}`.",
                candidate.meeting_id
            )));
        }

        let user = lookup(config, "get_user", self.platform.get_user(requester_id)).await?;
        let channel = lookup(config, "get_channel", self.platform.get_channel(channel_id)).await?;

        self.create_session(
            config,
            &user,
            &channel,
            ResolvedName {
                meeting_id: candidate.meeting_id.clone(),
                topic: candidate.topic.clone(),
                personal: candidate.personal,
            },
        )
        .await
    }

    /// Verifies a room-access token, refreshes the identity context it
    /// carries from the current user record (privacy redaction applied),
    /// and returns the re-signed token.
    #[instrument(skip_all, name = "bridge.meeting.enrich_token", fields(user_id = %user_id))]
    pub async fn enrich_meeting_token(
        &self,
        config: &Config,
        meeting_token: &str,
        user_id: &str,
    ) -> Result<String, BridgeError> {
        let user = lookup(config, "get_user", self.platform.get_user(user_id)).await?;
        let site = lookup(
            config,
            "get_site_config",
            self.platform.get_site_config(),
        )
        .await?;

        // The token was signed by whichever route issued it; try the
        // primary secret first and fall back to the secondary only on a
        // signature mismatch.
        match token::refresh_identity_context(
            meeting_token,
            &config.primary.app_secret,
            &user,
            &site,
        ) {
            Err(crate::token::TokenError::BadSignature) => Ok(token::refresh_identity_context(
                meeting_token,
                &config.secondary.app_secret,
                &user,
                &site,
            )?),
            other => Ok(other?),
        }
    }

    async fn team_for(
        &self,
        config: &Config,
        channel: &Channel,
    ) -> Result<Option<Team>, BridgeError> {
        if channel.team_id.is_empty() {
            return Ok(None);
        }
        let team = lookup(config, "get_team", self.platform.get_team(&channel.team_id)).await?;
        Ok(Some(team))
    }

    async fn create_session(
        &self,
        config: &Config,
        user: &User,
        channel: &Channel,
        name: ResolvedName,
    ) -> Result<MeetingSession, BridgeError> {
        let route = config.route_for_team(&channel.team_id);
        let base = route.base_url.trim().trim_end_matches('/');
        let mut long_url = format!("{}/{}", base, name.meeting_id);

        let mut access_token = None;
        let mut valid_until = None;
        if route.token_enabled {
            let site = lookup(
                config,
                "get_site_config",
                self.platform.get_site_config(),
            )
            .await?;

            let until = Utc::now() + chrono::Duration::minutes(route.token_valid_minutes);
            let claims = RoomClaims {
                iss: route.app_id.clone(),
                aud: vec![route.app_id.clone()],
                exp: until.timestamp(),
                sub: route.host_domain()?,
                room: name.meeting_id.clone(),
                context: RoomContext {
                    user: token::identity_context(user, &site),
                    group: String::new(),
                },
            };

            let signed = token::sign(&claims, &route.app_secret)?;
            long_url = format!("{}?jwt={}", long_url, signed);
            access_token = Some(signed);
            valid_until = Some(until);
        }

        long_url = format!("{}#config.callDisplayName=\"{}\"", long_url, name.topic);

        // Shortening is best-effort: the unshortened link is a complete
        // fallback, so a shortener outage must not abort the meeting.
        let short_url = match self.shortener.shorten(&config.shortener, &long_url).await {
            Ok(short) => Some(short),
            Err(e) => {
                warn!(
                    target: "bridge.services.meeting",
                    error = %e,
                    "URL shortening failed, falling back to the long URL"
                );
                None
            }
        };

        let session = MeetingSession {
            meeting_id: name.meeting_id,
            topic: name.topic,
            long_url,
            short_url,
            token: access_token,
            token_valid_until: valid_until,
            personal: name.personal,
        };

        let post = meeting_post(user, channel, &session);
        deliver(config, "create_post", self.platform.create_post(post)).await?;

        info!(
            target: "bridge.services.meeting",
            meeting_id = %session.meeting_id,
            route = %route.base_url,
            personal = session.personal,
            tokenized = session.token.is_some(),
            "Meeting started"
        );
        Ok(session)
    }

    async fn send_choice_prompt(
        &self,
        config: &Config,
        user: &User,
        channel: &Channel,
        candidates: &[MeetingCandidate],
    ) -> Result<(), BridgeError> {
        let mut message = String::from("Select the type of meeting you want to start:\n");
        for candidate in candidates {
            message.push_str(&format!("* {}\n", candidate.label));
        }

        let mut post = Post::plain(&user.id, &channel.id, &message);
        post.props.insert(
            "meeting_candidates".to_string(),
            serde_json::json!(candidates),
        );

        deliver(
            config,
            "send_ephemeral_post",
            self.platform.send_ephemeral_post(&user.id, post),
        )
        .await?;
        Ok(())
    }
}

/// Builds the rich meeting notification.
fn meeting_post(user: &User, channel: &Channel, session: &MeetingSession) -> Post {
    let link = session.primary_link();
    let until_line = session
        .token_valid_until
        .map(|t| format!("Meeting link valid until: {}", t.format(VALID_UNTIL_FORMAT)))
        .unwrap_or_default();
    let type_label = if session.personal {
        "Personal Meeting ID (PMI)"
    } else {
        "Meeting Link"
    };

    let message = format!(
        "{}: [{}]({})\n\n[Join Meeting]({})\n\n{}",
        type_label, link, link, link, until_line
    );

    let mut post = Post {
        user_id: user.id.clone(),
        channel_id: channel.id.clone(),
        message,
        post_type: MEETING_POST_TYPE.to_string(),
        props: serde_json::Map::new(),
    };

    post.props
        .insert("meeting_id".to_string(), session.meeting_id.clone().into());
    post.props
        .insert("meeting_link".to_string(), link.to_string().into());
    post.props
        .insert("meeting_raw_link".to_string(), session.long_url.clone().into());
    post.props
        .insert("meeting_topic".to_string(), session.topic.clone().into());
    post.props
        .insert("meeting_personal".to_string(), session.personal.into());
    post.props
        .insert("jwt_meeting".to_string(), session.token.is_some().into());
    post.props.insert(
        "meeting_jwt".to_string(),
        session.token.clone().unwrap_or_default().into(),
    );
    post.props.insert(
        "jwt_meeting_valid_until".to_string(),
        session
            .token_valid_until
            .map(|t| t.timestamp())
            .unwrap_or_default()
            .into(),
    );
    post.props
        .insert("from_webhook".to_string(), "true".into());
    post.props
        .insert("override_username".to_string(), "Jitsi".into());
    post.props
        .insert("override_icon_url".to_string(), MEETING_ICON_URL.into());
    post
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::models::ChannelType;
    use chrono::TimeZone;

    fn sample_session(personal: bool) -> MeetingSession {
        MeetingSession {
            meeting_id: "SprintReview".to_string(),
            topic: "Sprint Review".to_string(),
            long_url: "https://meet.example.com/SprintReview".to_string(),
            short_url: Some("https://s.example.com/sr".to_string()),
            token: Some("signed".to_string()),
            token_valid_until: Some(Utc.with_ymd_and_hms(2026, 1, 5, 15, 4, 5).unwrap()),
            personal,
        }
    }

    fn sample_user() -> User {
        User {
            id: "u1".to_string(),
            username: "ada".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            nickname: String::new(),
            email: String::new(),
            last_picture_update: 0,
        }
    }

    fn sample_channel() -> Channel {
        Channel {
            id: "c1".to_string(),
            team_id: "t1".to_string(),
            name: "town-square".to_string(),
            display_name: "Town Square".to_string(),
            channel_type: ChannelType::Open,
        }
    }

    #[test]
    fn test_meeting_post_props() {
        let post = meeting_post(&sample_user(), &sample_channel(), &sample_session(false));

        assert_eq!(post.post_type, MEETING_POST_TYPE);
        assert_eq!(post.props["meeting_id"], "SprintReview");
        assert_eq!(post.props["meeting_link"], "https://s.example.com/sr");
        assert_eq!(
            post.props["meeting_raw_link"],
            "https://meet.example.com/SprintReview"
        );
        assert_eq!(post.props["jwt_meeting"], true);
        assert_eq!(post.props["meeting_personal"], false);
        assert_eq!(post.props["from_webhook"], "true");
        assert_eq!(post.props["override_username"], "Jitsi");
        assert_eq!(post.props["override_icon_url"], MEETING_ICON_URL);
        assert!(post.message.starts_with("Meeting Link:"));
        assert!(post.message.contains("Meeting link valid until: Mon Jan 5 , 15:04:05"));
    }

    #[test]
    fn test_meeting_post_personal_label() {
        let post = meeting_post(&sample_user(), &sample_channel(), &sample_session(true));
        assert!(post.message.starts_with("Personal Meeting ID (PMI):"));
    }

    #[test]
    fn test_meeting_post_without_token_omits_validity() {
        let session = MeetingSession {
            token: None,
            token_valid_until: None,
            short_url: None,
            ..sample_session(false)
        };
        let post = meeting_post(&sample_user(), &sample_channel(), &session);

        assert_eq!(post.props["jwt_meeting"], false);
        assert_eq!(post.props["meeting_jwt"], "");
        assert_eq!(post.props["jwt_meeting_valid_until"], 0);
        assert!(!post.message.contains("valid until"));
        // Falls back to the long link.
        assert_eq!(
            post.props["meeting_link"],
            "https://meet.example.com/SprintReview"
        );
    }

    #[test]
    fn test_meeting_id_guard() {
        assert!(is_valid_meeting_id("SprintReview"));
        assert!(is_valid_meeting_id("ada-u1"));
        assert!(!is_valid_meeting_id(""));
        assert!(!is_valid_meeting_id("../../etc"));
        assert!(!is_valid_meeting_id("room?jwt=x"));
    }
}
