//! Guild tags exposed as slash commands

use crate::context::CommandContext;
use crate::descriptor::CommandDescriptor;
use crate::error::CommandError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use ticket_model::{Embed, ResponseEnvelope};

/// Deadline of every tag alias invocation
pub const TAG_TIMEOUT: Duration = Duration::from_secs(5);

/// Stored tag body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Tag id, also the command name
    pub id: String,
    /// Message content
    #[serde(default)]
    pub content: Option<String>,
    /// Embed body
    #[serde(default)]
    pub embed: Option<Embed>,
}

impl Tag {
    /// Properties of the command generated for this tag
    #[must_use]
    pub fn descriptor(&self) -> CommandDescriptor {
        CommandDescriptor::new(self.id.clone(), "Alias for a tag").timeout(TAG_TIMEOUT)
    }

    /// Reply with the tag body as a public message
    ///
    /// # Errors
    ///
    /// Internal error when the tag is empty; reply failures otherwise.
    pub fn send(&self, ctx: &CommandContext) -> Result<(), CommandError> {
        if self.content.is_none() && self.embed.is_none() {
            return Err(CommandError::internal(format!("tag {} has no body", self.id)));
        }

        ctx.reply(ResponseEnvelope {
            content: self.content.clone(),
            embed: self.embed.clone(),
            components: Vec::new(),
            ephemeral: false,
        })?;
        Ok(())
    }
}
