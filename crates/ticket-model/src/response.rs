//! Outbound response envelopes

use serde::{Deserialize, Serialize};

/// Embed accent colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Colour {
    /// Success
    Green,
    /// Failure or denial
    Red,
    /// Warning
    Orange,
}

impl Colour {
    /// Default RGB value
    #[must_use]
    pub const fn rgb(self) -> u32 {
        match self {
            Self::Green => 0x002E_CC71,
            Self::Red => 0x00FC_3F35,
            Self::Orange => 0x00FF_A500,
        }
    }
}

/// Rich embed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    /// Title line
    pub title: String,
    /// Body text
    pub description: String,
    /// Accent colour
    pub colour: Colour,
}

impl Embed {
    /// Create an embed
    #[must_use]
    pub fn new(colour: Colour, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            colour,
        }
    }
}

/// Message component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Component {
    /// Button that opens a URL
    LinkButton {
        /// Button label
        label: String,
        /// Target URL
        url: String,
        /// Optional emoji
        #[serde(default, skip_serializing_if = "Option::is_none")]
        emoji: Option<String>,
    },
}

/// Exactly one message destined for the invoking user
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    /// Plain text content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Embed payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embed: Option<Embed>,
    /// Components rendered below the message
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Component>,
    /// Visible only to the invoking user
    pub ephemeral: bool,
}

impl ResponseEnvelope {
    /// Ephemeral plain-text reply
    #[must_use]
    pub fn ephemeral_text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ephemeral: true,
            ..Self::default()
        }
    }

    /// Public plain-text reply
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    /// Ephemeral embed reply
    #[must_use]
    pub fn ephemeral_embed(embed: Embed) -> Self {
        Self {
            embed: Some(embed),
            ephemeral: true,
            ..Self::default()
        }
    }

    /// Public embed reply
    #[must_use]
    pub fn embed(embed: Embed) -> Self {
        Self {
            embed: Some(embed),
            ..Self::default()
        }
    }

    /// Builder: append a component
    #[must_use]
    pub fn with_component(mut self, component: Component) -> Self {
        self.components.push(component);
        self
    }

    /// Text of the envelope (content, else embed description)
    #[must_use]
    pub fn text_body(&self) -> Option<&str> {
        self.content
            .as_deref()
            .or_else(|| self.embed.as_ref().map(|e| e.description.as_str()))
    }
}
