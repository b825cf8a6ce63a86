//! Text command dispatcher.
//!
//! Thin glue between raw `/meet ...` input and the core components:
//! whitespace parsing, action routing and the user-facing ephemeral
//! responses. All decision logic lives in the orchestrator and the
//! settings store.

use crate::config::Config;
use crate::errors::BridgeError;
use crate::models::{MeetingCandidate, StartMeetingOutcome};
use crate::platform::{Platform, Post};
use crate::services::MeetingService;
use crate::settings::SettingsStore;
use std::sync::Arc;
use tracing::{error, instrument};

/// The slash-command trigger word.
pub const COMMAND_TRIGGER: &str = "meet";

/// Help text rendered for `/meet help`.
pub const COMMAND_HELP: &str = r#"###### Jitsi Bridge - Slash Command Help
* `/meet` - Create a new video conference
* `/meet [topic]` - Create a new video conference with specified topic
* `/meet help` - Show this help text
* `/meet settings` - View your current user settings
* `/meet settings [setting] [value]` - Update your user settings (see below for options)

###### Settings:
* `/meet settings embedded [true/false]`: When true, the meeting opens embedded inside the chat client. When false, it opens in a new window.
* `/meet settings naming_scheme [words/uuid/mattermost/ask]`: Select how meeting names are generated with one of these options:
    * `words`: Random English words in title case (e.g. PlayfulDragonsObserve)
    * `uuid`: UUID (universally unique identifier)
    * `mattermost`: Names derived from the platform context. Team and channel names in public and private channels; personal meeting name in direct and group message channels.
    * `ask`: You select the name every time you start a meeting"#;

/// A whitespace-parsed command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// Trigger word with any leading slash stripped.
    pub trigger: String,

    /// First token after the trigger; empty when absent.
    pub action: String,

    /// Remaining tokens.
    pub parameters: Vec<String>,
}

/// Splits raw command text into trigger, action and parameters.
pub fn parse_command(text: &str) -> ParsedCommand {
    let mut tokens = text.split_whitespace();
    let trigger = tokens
        .next()
        .map(|t| t.trim_start_matches('/').to_string())
        .unwrap_or_default();
    let action = tokens.next().map(str::to_string).unwrap_or_default();
    let parameters = tokens.map(str::to_string).collect();

    ParsedCommand {
        trigger,
        action,
        parameters,
    }
}

/// Who invoked the command and where.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub user_id: String,
    pub channel_id: String,
}

/// Routes parsed commands to the orchestrator and the settings store.
pub struct CommandHandler {
    platform: Arc<dyn Platform>,
    meetings: MeetingService,
    settings: SettingsStore,
}

impl CommandHandler {
    pub fn new(platform: Arc<dyn Platform>) -> Result<Self, BridgeError> {
        Ok(CommandHandler {
            meetings: MeetingService::new(platform.clone())?,
            settings: SettingsStore::new(platform.clone()),
            platform,
        })
    }

    pub fn meetings(&self) -> &MeetingService {
        &self.meetings
    }

    /// Executes one raw command invocation.
    ///
    /// User-visible outcomes (including failures) are delivered as
    /// ephemeral posts; only a failure to deliver those surfaces as an
    /// error to the host.
    #[instrument(skip_all, name = "bridge.command", fields(user_id = %ctx.user_id))]
    pub async fn execute(
        &self,
        config: &Config,
        ctx: &CommandContext,
        text: &str,
    ) -> Result<(), BridgeError> {
        let parsed = parse_command(text);
        if parsed.trigger != COMMAND_TRIGGER {
            return Ok(());
        }

        match parsed.action.as_str() {
            "help" => self.respond(ctx, COMMAND_HELP).await,
            "settings" => self.handle_settings(config, ctx, &parsed.parameters).await,
            _ => {
                // Everything after the trigger is the topic.
                let topic = text
                    .trim_start()
                    .trim_start_matches('/')
                    .trim_start_matches(COMMAND_TRIGGER)
                    .trim();
                self.handle_start(config, ctx, topic).await
            }
        }
    }

    /// Completes the deferred "ask" flow with the candidate the user
    /// picked; the follow-up request carries the candidate verbatim.
    pub async fn complete_choice(
        &self,
        config: &Config,
        ctx: &CommandContext,
        candidate: &MeetingCandidate,
    ) -> Result<(), BridgeError> {
        let result = self
            .meetings
            .start_meeting_from_candidate(config, &ctx.user_id, &ctx.channel_id, candidate)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                error!(
                    target: "bridge.handlers.command",
                    error = %e,
                    "Meeting start from candidate failed"
                );
                self.respond(ctx, &e.user_message()).await
            }
        }
    }

    async fn handle_start(
        &self,
        config: &Config,
        ctx: &CommandContext,
        topic: &str,
    ) -> Result<(), BridgeError> {
        let topic = (!topic.is_empty()).then_some(topic);
        let result = self
            .meetings
            .start_meeting(config, &ctx.user_id, &ctx.channel_id, None, topic)
            .await;

        match result {
            Ok(StartMeetingOutcome::Started(_)) => Ok(()),
            // The choice prompt has already been delivered.
            Ok(StartMeetingOutcome::ChoiceRequired(_)) => Ok(()),
            Err(e) => {
                error!(
                    target: "bridge.handlers.command",
                    error = %e,
                    "Meeting start failed"
                );
                self.respond(ctx, &e.user_message()).await
            }
        }
    }

    async fn handle_settings(
        &self,
        config: &Config,
        ctx: &CommandContext,
        parameters: &[String],
    ) -> Result<(), BridgeError> {
        match parameters {
            [] => {
                let preference = match self.settings.get(config, &ctx.user_id).await {
                    Ok(p) => p,
                    Err(e) => {
                        error!(
                            target: "bridge.handlers.command",
                            error = %e,
                            "Unable to read user settings"
                        );
                        return self.respond(ctx, "Unable to get user settings.").await;
                    }
                };
                let summary = format!(
                    "###### Jitsi Settings:\n* Embedded: `{}`\n* Naming Scheme: `{}`",
                    preference.embedded,
                    preference.naming_scheme.as_str()
                );
                self.respond(ctx, &summary).await
            }
            [field, value] => {
                match self
                    .settings
                    .set(config, &ctx.user_id, field, value)
                    .await
                {
                    Ok(_) => self.respond(ctx, "Jitsi settings updated").await,
                    Err(e) => {
                        error!(
                            target: "bridge.handlers.command",
                            error = %e,
                            "Settings update rejected"
                        );
                        self.respond(ctx, &BridgeError::from(e).user_message()).await
                    }
                }
            }
            _ => self.respond(ctx, "Invalid settings parameters").await,
        }
    }

    async fn respond(&self, ctx: &CommandContext, message: &str) -> Result<(), BridgeError> {
        self.platform
            .send_ephemeral_post(
                &ctx.user_id,
                Post::plain(&ctx.user_id, &ctx.channel_id, message),
            )
            .await
            .map_err(BridgeError::Publish)?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_trigger() {
        let parsed = parse_command("/meet");
        assert_eq!(parsed.trigger, "meet");
        assert_eq!(parsed.action, "");
        assert!(parsed.parameters.is_empty());
    }

    #[test]
    fn test_parse_action_and_parameters() {
        let parsed = parse_command("/meet settings embedded true");
        assert_eq!(parsed.trigger, "meet");
        assert_eq!(parsed.action, "settings");
        assert_eq!(parsed.parameters, vec!["embedded", "true"]);
    }

    #[test]
    fn test_parse_collapses_whitespace() {
        let parsed = parse_command("  /meet   settings   ");
        assert_eq!(parsed.action, "settings");
        assert!(parsed.parameters.is_empty());
    }

    #[test]
    fn test_parse_empty_input() {
        let parsed = parse_command("");
        assert_eq!(parsed.trigger, "");
        assert_eq!(parsed.action, "");
    }
}
