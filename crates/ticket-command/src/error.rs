//! Handler error type

use crate::arguments::ArgumentError;
use crate::context::ReplyError;
use ticket_model::ExternalError;

/// Error returned by a command handler
#[derive(Debug, Clone, thiserror::Error)]
pub enum CommandError {
    /// External collaborator failed
    #[error(transparent)]
    External(#[from] ExternalError),

    /// Reply could not be delivered
    #[error(transparent)]
    Reply(#[from] ReplyError),

    /// Arguments could not be bound
    #[error(transparent)]
    Argument(#[from] ArgumentError),

    /// Handler-internal failure
    #[error("{0}")]
    Internal(String),
}

impl CommandError {
    /// Internal failure with a message
    #[must_use]
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the error means a reply was already sent
    #[inline]
    #[must_use]
    pub fn is_reply_limit(&self) -> bool {
        matches!(self, Self::Reply(ReplyError::LimitReached))
    }

    /// The external failure, if any
    #[must_use]
    pub fn as_external(&self) -> Option<&ExternalError> {
        match self {
            Self::External(err) => Some(err),
            _ => None,
        }
    }
}
