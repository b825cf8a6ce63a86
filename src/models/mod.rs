//! Jitsi Bridge data models.
//!
//! Contains the domain types shared across the bridge: naming schemes,
//! per-user preferences, meeting sessions and the candidate tuples used
//! by the deferred "ask" flow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How meeting identifiers and topics are generated when the user does
/// not supply a topic.
///
/// The scheme is a closed enumeration: unknown wire values are rejected
/// at the settings write boundary and never stored, so the resolver only
/// ever sees one of these four values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamingScheme {
    /// Present pre-computed candidates and let the user pick one.
    Ask,

    /// Three random English words concatenated in title case.
    Words,

    /// A freshly generated v4 UUID.
    Uuid,

    /// Names derived from the platform context: personal meeting slug in
    /// direct/group channels, team + channel slug elsewhere.
    Mattermost,
}

impl NamingScheme {
    /// Wire tags accepted by the settings command, in help-text order.
    pub const ACCEPTED_TAGS: [&'static str; 4] = ["words", "uuid", "mattermost", "ask"];

    /// Returns the wire tag for this scheme.
    pub fn as_str(&self) -> &'static str {
        match self {
            NamingScheme::Ask => "ask",
            NamingScheme::Words => "words",
            NamingScheme::Uuid => "uuid",
            NamingScheme::Mattermost => "mattermost",
        }
    }

    /// Parses a wire tag. Returns `None` for anything outside the closed set.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "ask" => Some(NamingScheme::Ask),
            "words" => Some(NamingScheme::Words),
            "uuid" => Some(NamingScheme::Uuid),
            "mattermost" => Some(NamingScheme::Mattermost),
            _ => None,
        }
    }
}

/// The type of the channel a meeting is started from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelType {
    /// One-to-one direct message channel.
    Direct,

    /// Multi-member group message channel.
    Group,

    /// Public channel.
    Open,

    /// Private channel.
    Private,
}

impl ChannelType {
    /// True for channels where a meeting is tied to the people rather
    /// than the channel (direct and group messages).
    pub fn is_personal_scope(&self) -> bool {
        matches!(self, ChannelType::Direct | ChannelType::Group)
    }
}

/// Per-user bridge preferences.
///
/// Created lazily from the configured defaults on first read and mutated
/// only through validated settings writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPreference {
    /// Owning user.
    pub user_id: String,

    /// Whether the meeting opens embedded in the chat client instead of
    /// a new window.
    pub embedded: bool,

    /// Active naming scheme.
    pub naming_scheme: NamingScheme,
}

/// The JSON record persisted per user in the platform key/value store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredPreference {
    pub embedded: bool,
    pub naming_scheme: NamingScheme,
}

/// A created meeting, returned from the orchestrator after the
/// notification has been emitted. Not persisted.
#[derive(Debug, Clone)]
pub struct MeetingSession {
    /// Sanitized room slug; only alphanumerics and hyphens.
    pub meeting_id: String,

    /// Human-readable topic shown in the notification and the room.
    pub topic: String,

    /// Full join URL including token and display-name fragment.
    pub long_url: String,

    /// Shortened join URL, when the shortener was reachable.
    pub short_url: Option<String>,

    /// Signed room-access token, when the route has token issuance enabled.
    pub token: Option<String>,

    /// Expiry of the access token.
    pub token_valid_until: Option<DateTime<Utc>>,

    /// Whether this is a personal meeting (identifier derived from the
    /// requester rather than the channel).
    pub personal: bool,
}

impl MeetingSession {
    /// The link to present first: the short form when available,
    /// otherwise the long form.
    pub fn primary_link(&self) -> &str {
        self.short_url.as_deref().unwrap_or(&self.long_url)
    }
}

/// One pre-computed naming option offered to the user by the "ask" flow.
///
/// Carries everything needed to re-enter meeting creation statelessly:
/// the follow-up request passes the chosen candidate back verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingCandidate {
    /// Button label shown to the user.
    pub label: String,

    /// Pre-computed meeting identifier.
    pub meeting_id: String,

    /// Pre-computed topic.
    pub topic: String,

    /// Whether picking this candidate starts a personal meeting.
    pub personal: bool,
}

/// Outcome of a meeting-start request.
#[derive(Debug)]
pub enum StartMeetingOutcome {
    /// A session was created and the notification emitted.
    Started(MeetingSession),

    /// The user's scheme is `Ask`: candidates were presented and no
    /// session was created. The caller completes the flow with a
    /// follow-up request carrying one candidate.
    ChoiceRequired(Vec<MeetingCandidate>),
}
