use serde::{Deserialize, Serialize};

use super::{Attachment, Embed, MessageFlags};

// Not every field discord returns is here, only the ones a webhook
// owner has a use for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookMessage {
    pub id: String,
    pub channel_id: String,
    #[serde(default)]
    pub content: String,
    pub timestamp: String,
    pub edited_timestamp: Option<String>,
    #[serde(default)]
    pub tts: bool,
    #[serde(default)]
    pub mention_everyone: bool,
    #[serde(default)]
    pub embeds: Vec<Embed>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub pinned: bool,
    pub webhook_id: Option<String>,
    #[serde(default)]
    pub flags: MessageFlags,
    pub author: Option<MessageAuthor>,
    /// Components are kept raw, responses may contain kinds a webhook
    /// can't send
    #[serde(default)]
    pub components: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageAuthor {
    pub id: String,
    pub username: String,
    pub avatar: Option<String>,
    #[serde(default)]
    pub discriminator: String,
    #[serde(default)]
    pub bot: bool,
    pub global_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Webhook {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: u8,
    pub guild_id: Option<String>,
    pub channel_id: Option<String>,
    pub name: Option<String>,
    pub avatar: Option<String>,
    pub application_id: Option<String>,
    /// Only present when the webhook was fetched with its token
    pub token: Option<String>,
}

/// Changes to a webhook. `avatar` is an image data URI
/// (`data:image/png;base64,...`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModifyWebhook {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
}
