use serde::{Deserialize, Serialize};

use super::{AllowedMentions, Attachment, Component, Embed, MessageFlags, WebhookFile};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PollMedia {
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PollAnswer {
    pub poll_media: PollMedia,
}

/// Polls sent through webhooks only support text, emojis are ignored
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Poll {
    pub question: PollMedia,
    pub answers: Vec<PollAnswer>,
    /// Number of hours the poll stays open
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub allow_multiselect: bool,
}

impl Poll {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: PollMedia {
                text: question.into(),
            },
            ..Default::default()
        }
    }

    pub fn answer(mut self, text: impl Into<String>) -> Self {
        self.answers.push(PollAnswer {
            poll_media: PollMedia { text: text.into() },
        });
        self
    }
}

/// A message to execute a webhook with, or to edit a message with.
///
/// Setters only mutate data, nothing is checked until the payload goes
/// through [`crate::validate::validate`] on its way out.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct MessagePayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tts: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Component>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_mentions: Option<AllowedMentions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<MessageFlags>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub applied_tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll: Option<Poll>,
    /// Uploaded as separate multipart parts, never part of the JSON
    #[serde(skip)]
    pub files: Vec<WebhookFile>,
}

impl MessagePayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn avatar_url(mut self, avatar_url: impl Into<String>) -> Self {
        self.avatar_url = Some(avatar_url.into());
        self
    }

    pub fn tts(mut self, tts: bool) -> Self {
        self.tts = Some(tts);
        self
    }

    pub fn embed(mut self, embed: Embed) -> Self {
        self.embeds.push(embed);
        self
    }

    pub fn component(mut self, component: impl Into<Component>) -> Self {
        self.components.push(component.into());
        self
    }

    pub fn allowed_mentions(mut self, allowed_mentions: AllowedMentions) -> Self {
        self.allowed_mentions = Some(allowed_mentions);
        self
    }

    pub fn flags(mut self, flags: MessageFlags) -> Self {
        self.flags = Some(flags);
        self
    }

    pub fn attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn file(mut self, file: WebhookFile) -> Self {
        self.files.push(file);
        self
    }

    /// Creates a new thread with this name when the webhook targets a forum
    /// or media channel
    pub fn thread_name(mut self, thread_name: impl Into<String>) -> Self {
        self.thread_name = Some(thread_name.into());
        self
    }

    pub fn applied_tag(mut self, tag: impl Into<String>) -> Self {
        self.applied_tags.push(tag.into());
        self
    }

    pub fn poll(mut self, poll: Poll) -> Self {
        self.poll = Some(poll);
        self
    }

    pub fn has_files(&self) -> bool {
        !self.files.is_empty()
    }
}
