//! Naming strategy resolver.
//!
//! Turns a user's naming preference plus the request context into a
//! meeting identifier and topic, or into a set of pre-computed candidates
//! when the user's scheme asks for a manual choice.

mod words;

use crate::models::{MeetingCandidate, NamingScheme, UserPreference};
use crate::platform::{Channel, Team, User};
use rand::seq::SliceRandom;
use words::WORDS;

/// Topic used when the scheme generates an arbitrary identifier.
const GENERATED_TOPIC: &str = "Jitsi Meeting";

/// Number of dictionary words combined by the word scheme.
const WORDS_PER_NAME: usize = 3;

/// Candidate labels for the deferred "ask" flow.
const LABEL_WORDS: &str = "Meeting name with random words";
const LABEL_PERSONAL: &str = "Personal meeting";
const LABEL_CHANNEL: &str = "Channel meeting";
const LABEL_UUID: &str = "Meeting name with UUID";

/// A fully resolved meeting name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedName {
    pub meeting_id: String,
    pub topic: String,
    pub personal: bool,
}

/// Resolver outcome: either exactly one name, or the candidate set to
/// present to the user.
#[derive(Debug, Clone)]
pub enum Resolution {
    Single(ResolvedName),
    Choices(Vec<MeetingCandidate>),
}

/// Everything the resolver may consult about the request.
#[derive(Debug, Clone)]
pub struct NamingContext<'a> {
    pub requester: &'a User,
    pub channel: &'a Channel,

    /// The channel's team, when it has one. Needed for channel meetings
    /// under the platform-derived scheme.
    pub team: Option<&'a Team>,
}

/// Strips a raw topic down to a meeting identifier.
///
/// Spaces become hyphens first, then every character outside
/// `[A-Za-z0-9]` is dropped. `"Sprint Review"` becomes `"SprintReview"`.
pub fn sanitize_meeting_id(raw: &str) -> String {
    raw.replace(' ', "-")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// Three random title-case dictionary words concatenated.
pub fn generate_words_name() -> String {
    let mut rng = rand::thread_rng();
    (0..WORDS_PER_NAME)
        .filter_map(|_| WORDS.choose(&mut rng))
        .copied()
        .collect()
}

/// A fresh v4 UUID string.
pub fn generate_uuid_name() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Deterministic personal-meeting slug from the requester's identity.
pub fn personal_meeting_name(username: &str, user_id: &str) -> String {
    format!(
        "{}-{}",
        sanitize_meeting_id(username),
        sanitize_meeting_id(user_id)
    )
}

/// Slug for a channel meeting, combining team and channel names when a
/// team is present.
pub fn team_channel_name(team: Option<&Team>, channel: &Channel) -> String {
    match team {
        Some(team) => format!(
            "{}-{}",
            sanitize_meeting_id(&team.name),
            sanitize_meeting_id(&channel.name)
        ),
        None => sanitize_meeting_id(&channel.name),
    }
}

/// Resolves a meeting name from the preference and request context.
///
/// A non-empty explicit topic always wins over scheme generation. The
/// `Ask` scheme yields the candidate set instead of a single name;
/// meeting creation is deferred until the user picks one.
pub fn resolve(
    preference: &UserPreference,
    ctx: &NamingContext<'_>,
    explicit_topic: Option<&str>,
) -> Resolution {
    if let Some(topic) = explicit_topic.map(str::trim).filter(|t| !t.is_empty()) {
        return Resolution::Single(ResolvedName {
            meeting_id: sanitize_meeting_id(topic),
            topic: topic.to_string(),
            personal: false,
        });
    }

    match preference.naming_scheme {
        NamingScheme::Words => Resolution::Single(ResolvedName {
            meeting_id: generate_words_name(),
            topic: GENERATED_TOPIC.to_string(),
            personal: false,
        }),
        NamingScheme::Uuid => Resolution::Single(ResolvedName {
            meeting_id: generate_uuid_name(),
            topic: GENERATED_TOPIC.to_string(),
            personal: false,
        }),
        NamingScheme::Mattermost => {
            if ctx.channel.channel_type.is_personal_scope() {
                Resolution::Single(ResolvedName {
                    meeting_id: personal_meeting_name(&ctx.requester.username, &ctx.requester.id),
                    topic: format!("{}'s Personal Meeting", ctx.requester.display_name()),
                    personal: true,
                })
            } else {
                Resolution::Single(ResolvedName {
                    meeting_id: team_channel_name(ctx.team, ctx.channel),
                    topic: format!("{} Channel Meeting", ctx.channel.display_name),
                    personal: false,
                })
            }
        }
        NamingScheme::Ask => Resolution::Choices(candidates(ctx)),
    }
}

/// Eagerly computes one candidate per concrete scheme, in presentation
/// order. The channel candidate only applies outside direct and group
/// channels.
pub fn candidates(ctx: &NamingContext<'_>) -> Vec<MeetingCandidate> {
    let mut options = vec![
        MeetingCandidate {
            label: LABEL_WORDS.to_string(),
            meeting_id: generate_words_name(),
            topic: GENERATED_TOPIC.to_string(),
            personal: false,
        },
        MeetingCandidate {
            label: LABEL_PERSONAL.to_string(),
            meeting_id: personal_meeting_name(&ctx.requester.username, &ctx.requester.id),
            topic: format!("{}'s Meeting", ctx.requester.display_name()),
            personal: true,
        },
    ];

    if !ctx.channel.channel_type.is_personal_scope() {
        options.push(MeetingCandidate {
            label: LABEL_CHANNEL.to_string(),
            meeting_id: team_channel_name(ctx.team, ctx.channel),
            topic: format!("{} Channel Meeting", ctx.channel.display_name),
            personal: false,
        });
    }

    options.push(MeetingCandidate {
        label: LABEL_UUID.to_string(),
        meeting_id: generate_uuid_name(),
        topic: GENERATED_TOPIC.to_string(),
        personal: false,
    });

    options
}
