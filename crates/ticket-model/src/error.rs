//! Platform REST failure taxonomy
//!
//! Provider traits across the workspace return [`ExternalError`] so that
//! callers can distinguish a missing resource (recoverable, triggers
//! self-heal) from transient and deadline failures.

use std::fmt;
use std::time::Duration;

/// JSON error codes returned by the platform REST API
pub mod codes {
    /// Unknown channel
    pub const UNKNOWN_CHANNEL: u32 = 10003;
    /// Unknown guild
    pub const UNKNOWN_GUILD: u32 = 10004;
    /// Unknown member
    pub const UNKNOWN_MEMBER: u32 = 10007;
    /// Unknown message
    pub const UNKNOWN_MESSAGE: u32 = 10008;
    /// Unknown role
    pub const UNKNOWN_ROLE: u32 = 10011;
    /// Unknown user
    pub const UNKNOWN_USER: u32 = 10013;
    /// Unknown category
    pub const UNKNOWN_CATEGORY: u32 = 10059;
    /// Unknown interaction
    pub const UNKNOWN_INTERACTION: u32 = 10062;
    /// Maximum number of webhooks reached
    pub const MAX_WEBHOOKS: u32 = 30007;
    /// Maximum number of guild channels reached
    pub const MAX_CHANNELS: u32 = 30013;
    /// Interaction has already been acknowledged
    pub const INTERACTION_ACKNOWLEDGED: u32 = 40060;
    /// Missing access
    pub const MISSING_ACCESS: u32 = 50001;
    /// Missing permissions
    pub const MISSING_PERMISSIONS: u32 = 50013;
    /// Invalid form body
    pub const INVALID_FORM_BODY: u32 = 50035;
    /// Thread is locked
    pub const THREAD_LOCKED: u32 = 160_005;
    /// Maximum number of active threads reached
    pub const MAX_ACTIVE_THREADS: u32 = 160_006;
    /// Maximum number of active announcement threads reached
    pub const MAX_ACTIVE_ANNOUNCEMENT_THREADS: u32 = 160_007;
}

/// Resource kinds that the platform reports as unknown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnknownResource {
    /// Channel
    Channel,
    /// Guild
    Guild,
    /// Member
    Member,
    /// Message
    Message,
    /// Role
    Role,
    /// User
    User,
    /// Category
    Category,
    /// Interaction
    Interaction,
}

impl UnknownResource {
    /// Map a JSON error code to the resource it reports missing
    #[must_use]
    pub fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            codes::UNKNOWN_CHANNEL => Self::Channel,
            codes::UNKNOWN_GUILD => Self::Guild,
            codes::UNKNOWN_MEMBER => Self::Member,
            codes::UNKNOWN_MESSAGE => Self::Message,
            codes::UNKNOWN_ROLE => Self::Role,
            codes::UNKNOWN_USER => Self::User,
            codes::UNKNOWN_CATEGORY => Self::Category,
            codes::UNKNOWN_INTERACTION => Self::Interaction,
            _ => return None,
        })
    }

    /// JSON error code for this resource
    #[must_use]
    pub const fn code(self) -> u32 {
        match self {
            Self::Channel => codes::UNKNOWN_CHANNEL,
            Self::Guild => codes::UNKNOWN_GUILD,
            Self::Member => codes::UNKNOWN_MEMBER,
            Self::Message => codes::UNKNOWN_MESSAGE,
            Self::Role => codes::UNKNOWN_ROLE,
            Self::User => codes::UNKNOWN_USER,
            Self::Category => codes::UNKNOWN_CATEGORY,
            Self::Interaction => codes::UNKNOWN_INTERACTION,
        }
    }
}

impl fmt::Display for UnknownResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Channel => "channel",
            Self::Guild => "guild",
            Self::Member => "member",
            Self::Message => "message",
            Self::Role => "role",
            Self::User => "user",
            Self::Category => "category",
            Self::Interaction => "interaction",
        };
        f.write_str(s)
    }
}

/// Failure reported by an external collaborator (REST API, database, cache)
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExternalError {
    /// The referenced resource no longer exists
    #[error("unknown {0} (code {code})", code = .0.code())]
    NotFound(UnknownResource),

    /// The platform rejected the request
    #[error("{status} {message} (code {code})")]
    Rest {
        /// HTTP status
        status: u16,
        /// JSON error code
        code: u32,
        /// Error message body
        message: String,
        /// First nested validation error code, for invalid form bodies
        first_error_code: Option<String>,
    },

    /// The request was rate limited
    #[error("rate limited, retry after {retry_after:?} (global: {global})")]
    RateLimited {
        /// Time until the bucket resets
        retry_after: Duration,
        /// Whether the global limit was hit
        global: bool,
    },

    /// The operation's deadline elapsed
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// Transport or storage failure
    #[error("transient failure: {0}")]
    Transient(String),
}

impl ExternalError {
    /// Build from a REST error response, classifying unknown-resource codes
    #[must_use]
    pub fn from_rest(status: u16, code: u32, message: impl Into<String>) -> Self {
        match UnknownResource::from_code(code) {
            Some(resource) => Self::NotFound(resource),
            None => Self::Rest {
                status,
                code,
                message: message.into(),
                first_error_code: None,
            },
        }
    }

    /// Builder: attach the first validation error code
    #[must_use]
    pub fn with_first_error_code(self, first: impl Into<String>) -> Self {
        match self {
            Self::Rest {
                status,
                code,
                message,
                ..
            } => Self::Rest {
                status,
                code,
                message,
                first_error_code: Some(first.into()),
            },
            other => other,
        }
    }

    /// Transient failure with a message
    #[must_use]
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    /// JSON error code, if the platform supplied one
    #[must_use]
    pub fn code(&self) -> Option<u32> {
        match self {
            Self::NotFound(resource) => Some(resource.code()),
            Self::Rest { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Whether the platform reported a missing resource
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether the platform reported the role as missing
    #[inline]
    #[must_use]
    pub fn is_unknown_role(&self) -> bool {
        matches!(self, Self::NotFound(UnknownResource::Role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_codes_classify_as_not_found() {
        let err = ExternalError::from_rest(404, codes::UNKNOWN_ROLE, "Unknown Role");
        assert!(err.is_not_found());
        assert!(err.is_unknown_role());
        assert_eq!(err.code(), Some(10011));
        assert_eq!(err.to_string(), "unknown role (code 10011)");
    }

    #[test]
    fn other_codes_stay_rest_errors() {
        let err = ExternalError::from_rest(403, codes::MISSING_PERMISSIONS, "Missing Permissions");
        assert!(!err.is_not_found());
        assert_eq!(err.code(), Some(50013));
    }

    #[test]
    fn first_error_code_only_applies_to_rest() {
        let err = ExternalError::from_rest(400, codes::INVALID_FORM_BODY, "Invalid Form Body")
            .with_first_error_code("BASE_TYPE_REQUIRED");
        assert!(matches!(
            err,
            ExternalError::Rest { first_error_code: Some(ref c), .. } if c == "BASE_TYPE_REQUIRED"
        ));

        let err = ExternalError::DeadlineExceeded.with_first_error_code("X");
        assert_eq!(err, ExternalError::DeadlineExceeded);
    }
}
