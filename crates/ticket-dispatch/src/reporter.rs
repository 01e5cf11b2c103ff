//! Error replies with correlation ids

use crate::settings::DispatchSettings;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use ticket_access::AuthorizationResolver;
use ticket_command::{CommandContext, CommandError};
use ticket_model::error::codes;
use ticket_model::{
    Colour, Component, Embed, ExternalError, InvocationKind, ResponseEnvelope, UnknownResource,
};
use ulid::Ulid;

const GENERAL_ERROR: &str = "An error occurred while performing this action.";

/// Send an error reply; a refused reply is logged, not propagated
pub(crate) fn deliver(
    ctx: &CommandContext,
    response: ResponseEnvelope,
    correlation_id: Ulid,
) -> bool {
    match ctx.reply(response) {
        Ok(()) => true,
        Err(reply_err) => {
            tracing::debug!(
                correlation_id = %correlation_id,
                error = %reply_err,
                "Error reply not delivered"
            );
            false
        }
    }
}

/// Whether the actor is guild staff, as far as could be determined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaffStatus {
    /// Permission level above `Everyone`
    Staff,
    /// Regular member, or outside a guild
    NotStaff,
    /// Permission level could not be resolved
    Unknown,
}

/// Converts handler errors into a single user-visible reply
#[derive(Debug, Clone)]
pub struct ErrorReporter {
    settings: Arc<DispatchSettings>,
    authorization: AuthorizationResolver,
}

impl ErrorReporter {
    /// Reporter using `authorization` for the staff lookup
    #[must_use]
    pub fn new(settings: Arc<DispatchSettings>, authorization: AuthorizationResolver) -> Self {
        Self {
            settings,
            authorization,
        }
    }

    /// Log `err` under a fresh correlation id and reply with an error embed
    ///
    /// Nothing is sent when `err` means a reply already went out.
    pub async fn report(&self, ctx: &CommandContext, command: &str, err: &CommandError) -> Ulid {
        let correlation_id = Ulid::new();
        tracing::error!(
            correlation_id = %correlation_id,
            command,
            guild_id = ?ctx.guild_id(),
            user_id = %ctx.user_id(),
            error = %err,
            "Command failed"
        );

        if err.is_reply_limit() {
            return correlation_id;
        }

        let staff = self.staff_status(ctx).await;
        let response = self.build_response(err, correlation_id, staff);
        deliver(ctx, response, correlation_id);
        correlation_id
    }

    async fn staff_status(&self, ctx: &CommandContext) -> StaffStatus {
        let (Some(guild_id), Some(member), InvocationKind::Guild) =
            (ctx.guild_id(), ctx.member(), ctx.kind())
        else {
            return StaffStatus::NotStaff;
        };

        match self
            .authorization
            .permission_level(guild_id, member, self.settings.error_lookup_timeout)
            .await
        {
            Ok(level) if level.is_staff() => StaffStatus::Staff,
            Ok(_) => StaffStatus::NotStaff,
            Err(err) => {
                tracing::warn!(error = %err, "Staff lookup for error reply failed");
                StaffStatus::Unknown
            }
        }
    }

    /// Ephemeral error embed for `err`
    #[must_use]
    pub fn build_response(
        &self,
        err: &CommandError,
        correlation_id: Ulid,
        staff: StaffStatus,
    ) -> ResponseEnvelope {
        let message = match err.as_external() {
            Some(external) => self.external_message(external, correlation_id, staff),
            None => general_with_id(correlation_id),
        };

        let mut response =
            ResponseEnvelope::ephemeral_embed(Embed::new(Colour::Red, "Error", message));

        if !self.settings.whitelabel && staff != StaffStatus::NotStaff {
            response = response.with_component(Component::LinkButton {
                label: "Join Support Server".to_owned(),
                url: self.settings.support_server_invite.replace('\n', ""),
                emoji: Some("❓".to_owned()),
            });
        }
        response
    }

    fn external_message(&self, err: &ExternalError, id: Ulid, staff: StaffStatus) -> String {
        let dashboard = &self.settings.dashboard_url;
        match err {
            ExternalError::NotFound(resource) => match resource {
                UnknownResource::Channel => format!(
                    "The channel could not be found. It may have been deleted. Check the ticket category at {dashboard}"
                ),
                UnknownResource::Guild => "The server could not be found.".to_owned(),
                UnknownResource::Member => {
                    "The member could not be found. They may have left the server.".to_owned()
                }
                UnknownResource::Message => {
                    "The message could not be found. It may have been deleted.".to_owned()
                }
                UnknownResource::Role => format!(
                    "The role could not be found. It may have been deleted. Check your role settings at {dashboard}"
                ),
                UnknownResource::User => "The user could not be found.".to_owned(),
                UnknownResource::Category => format!(
                    "The ticket category could not be found. Set a new one at {dashboard}"
                ),
                UnknownResource::Interaction => {
                    "This interaction has expired. Please try again.".to_owned()
                }
            },
            ExternalError::Rest {
                code,
                first_error_code,
                ..
            } => match *code {
                codes::MAX_WEBHOOKS => {
                    "This channel has reached the maximum number of webhooks.".to_owned()
                }
                codes::MAX_CHANNELS => {
                    "This server has reached the maximum number of channels.".to_owned()
                }
                codes::INTERACTION_ACKNOWLEDGED => {
                    "This interaction has already been responded to.".to_owned()
                }
                codes::MISSING_ACCESS | codes::MISSING_PERMISSIONS => format!(
                    "The bot is missing permissions to perform this action. See {}/miscellaneous/permissions-explained",
                    self.settings.docs_url
                ),
                codes::INVALID_FORM_BODY => {
                    form_message(first_error_code.as_deref(), dashboard).unwrap_or_else(|| {
                        format!(
                            "The request contained invalid data.\n\n{}",
                            self.raw_or_general(err, id, staff)
                        )
                    })
                }
                codes::THREAD_LOCKED => "This thread is locked.".to_owned(),
                codes::MAX_ACTIVE_THREADS => {
                    "This server has reached the maximum number of active threads.".to_owned()
                }
                codes::MAX_ACTIVE_ANNOUNCEMENT_THREADS => {
                    "This server has reached the maximum number of active announcement threads."
                        .to_owned()
                }
                _ => self.raw_or_general(err, id, staff),
            },
            ExternalError::RateLimited {
                retry_after,
                global,
            } => {
                let when = relative_timestamp(*retry_after);
                if *global {
                    format!("The bot is being rate limited by Discord. Please try again {when}.")
                } else {
                    format!("This action is being rate limited. Please try again {when}.")
                }
            }
            ExternalError::DeadlineExceeded => {
                "The operation timed out. Please try again.".to_owned()
            }
            ExternalError::Transient(_) => general_with_id(id),
        }
    }

    fn raw_or_general(&self, err: &ExternalError, id: Ulid, staff: StaffStatus) -> String {
        if staff == StaffStatus::Staff {
            format!("{GENERAL_ERROR}:\n```\n{err}\n```\nError ID: `{id}`")
        } else {
            general_with_id(id)
        }
    }
}

fn general_with_id(id: Ulid) -> String {
    format!("{GENERAL_ERROR}\nError ID: `{id}`")
}

fn form_message(first_error_code: Option<&str>, dashboard: &str) -> Option<String> {
    let msg = match first_error_code? {
        "BASE_TYPE_BAD_LENGTH" => format!("A value was too long or too short. Check your settings at {dashboard}"),
        "BASE_TYPE_REQUIRED" => format!("A required field was left empty. Check your settings at {dashboard}"),
        "CHANNEL_INVALID_TYPE" => format!("A channel of the wrong type was selected. Check your settings at {dashboard}"),
        "CHANNEL_PARENT_INVALID" => format!("The ticket category is invalid. Set a new one at {dashboard}"),
        "NUMBER_TYPE_COERCE" => format!("An invalid ID was provided. Check your settings at {dashboard}"),
        "STRING_TYPE_REGEX" => "A value contained invalid characters.".to_owned(),
        "UNION_TYPE_CHOICES" => format!("An invalid option was selected. Check your settings at {dashboard}"),
        _ => return None,
    };
    Some(msg)
}

fn relative_timestamp(retry_after: Duration) -> String {
    if retry_after.is_zero() {
        return "soon".to_owned();
    }
    let secs = i64::try_from(retry_after.as_secs()).unwrap_or(i64::MAX);
    let at = Utc::now().timestamp().saturating_add(secs.max(1));
    format!("<t:{at}:R>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ticket_command::{response_channel, ArgumentError, ReplyError};
    use ticket_model::PermissionLevel;
    use ticket_test_utils::{guild_event, member, FakePermissions, FakePremium};

    fn reporter(whitelabel: bool) -> ErrorReporter {
        ErrorReporter::new(
            Arc::new(DispatchSettings::default().with_whitelabel(whitelabel)),
            AuthorizationResolver::new(
                Arc::new(FakePermissions::fixed(PermissionLevel::Everyone)),
                Arc::new(FakePremium::default()),
            ),
        )
    }

    fn body(response: &ResponseEnvelope) -> &str {
        response.text_body().unwrap_or_default()
    }

    #[tokio::test]
    async fn refused_error_reply_is_not_fatal() {
        let (tx, rx) = response_channel();
        let ctx = CommandContext::new(
            &guild_event("ping", member(7, "ada")),
            Duration::from_secs(5),
            tx,
        );

        assert!(deliver(&ctx, ResponseEnvelope::ephemeral_text("first"), Ulid::new()));
        assert!(!deliver(&ctx, ResponseEnvelope::ephemeral_text("second"), Ulid::new()));
        assert_eq!(rx.await.unwrap().text_body(), Some("first"));
    }

    #[tokio::test]
    async fn dropped_receiver_is_not_fatal() {
        let (tx, rx) = response_channel();
        drop(rx);
        let ctx = CommandContext::new(
            &guild_event("ping", member(7, "ada")),
            Duration::from_secs(5),
            tx,
        );

        assert!(!deliver(&ctx, ResponseEnvelope::ephemeral_text("lost"), Ulid::new()));
    }

    #[test]
    fn internal_errors_show_only_the_id() {
        let id = Ulid::new();
        let err = CommandError::internal("secret database detail");
        let response = reporter(false).build_response(&err, id, StaffStatus::Staff);

        assert!(response.ephemeral);
        assert!(!body(&response).contains("secret"));
        assert!(body(&response).contains(&id.to_string()));
    }

    #[test]
    fn raw_rest_errors_only_for_staff() {
        let id = Ulid::new();
        let err = CommandError::from(ExternalError::from_rest(500, 0, "upstream exploded"));

        let staff = reporter(false).build_response(&err, id, StaffStatus::Staff);
        assert!(body(&staff).contains("upstream exploded"));

        let member = reporter(false).build_response(&err, id, StaffStatus::NotStaff);
        assert!(!body(&member).contains("upstream exploded"));
        assert!(body(&member).contains(&id.to_string()));
    }

    #[test]
    fn invite_link_rules() {
        let err = CommandError::internal("x");
        let id = Ulid::new();

        assert!(reporter(false)
            .build_response(&err, id, StaffStatus::Staff)
            .components
            .len()
            == 1);
        assert!(reporter(false)
            .build_response(&err, id, StaffStatus::Unknown)
            .components
            .len()
            == 1);
        assert!(reporter(false)
            .build_response(&err, id, StaffStatus::NotStaff)
            .components
            .is_empty());
        assert!(reporter(true)
            .build_response(&err, id, StaffStatus::Staff)
            .components
            .is_empty());
    }

    #[test]
    fn known_codes_map_to_messages() {
        let r = reporter(false);
        let id = Ulid::new();

        let role = CommandError::from(ExternalError::NotFound(UnknownResource::Role));
        assert!(body(&r.build_response(&role, id, StaffStatus::NotStaff)).contains("role could not be found"));

        let perms = CommandError::from(ExternalError::from_rest(
            403,
            codes::MISSING_PERMISSIONS,
            "Missing Permissions",
        ));
        assert!(body(&r.build_response(&perms, id, StaffStatus::NotStaff))
            .contains("permissions-explained"));

        let form = CommandError::from(
            ExternalError::from_rest(400, codes::INVALID_FORM_BODY, "Invalid Form Body")
                .with_first_error_code("STRING_TYPE_REGEX"),
        );
        assert_eq!(
            body(&r.build_response(&form, id, StaffStatus::NotStaff)),
            "A value contained invalid characters."
        );

        let timeout = CommandError::from(ExternalError::DeadlineExceeded);
        assert!(body(&r.build_response(&timeout, id, StaffStatus::NotStaff)).contains("timed out"));
    }

    #[test]
    fn rate_limits_use_relative_timestamps() {
        let r = reporter(false);
        let err = CommandError::from(ExternalError::RateLimited {
            retry_after: Duration::from_secs(30),
            global: true,
        });
        let text = body(&r.build_response(&err, Ulid::new(), StaffStatus::NotStaff)).to_owned();
        assert!(text.contains("<t:"));
        assert!(text.contains(":R>"));
        assert!(text.contains("rate limited by Discord"));

        assert_eq!(relative_timestamp(Duration::ZERO), "soon");
    }

    #[test]
    fn non_external_errors_are_general() {
        let r = reporter(false);
        let err = CommandError::from(ArgumentError::Missing { name: "id".into() });
        assert!(body(&r.build_response(&err, Ulid::new(), StaffStatus::NotStaff))
            .starts_with(GENERAL_ERROR));
        let err = CommandError::from(ReplyError::ReceiverDropped);
        assert!(body(&r.build_response(&err, Ulid::new(), StaffStatus::NotStaff))
            .starts_with(GENERAL_ERROR));
    }
}
