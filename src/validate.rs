use log::debug;
use thiserror::Error;

use crate::models::MessagePayload;

pub const MAX_EMBEDS: usize = 10;
pub const MAX_EMBED_FIELDS: usize = 25;
pub const MAX_FILES: usize = 10;

/// Structural problems that would get a payload rejected by discord.
/// Caught before anything touches the network.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("a message can have at most 10 embeds, got {count}")]
    TooManyEmbeds { count: usize },
    #[error("embed {index} has {count} fields, at most 25 are allowed")]
    TooManyFields { index: usize, count: usize },
    #[error("a message can upload at most 10 files, got {count}")]
    TooManyFiles { count: usize },
    #[error("one of content, embeds, attachments or files must be set")]
    EmptyPayload,
}

/// Identity fields filled into payloads that don't set their own
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientDefaults {
    pub username: Option<String>,
    pub avatar_url: Option<String>,
}

/// A payload that passed [`validate`] with the client defaults merged in.
/// Only obtainable through validation, so the encoder never sees a payload
/// that breaks the limits.
#[derive(Debug)]
pub struct ValidatedPayload(MessagePayload);

impl ValidatedPayload {
    pub fn payload(&self) -> &MessagePayload {
        &self.0
    }

    pub fn into_inner(self) -> MessagePayload {
        self.0
    }

    pub(crate) fn payload_mut(&mut self) -> &mut MessagePayload {
        &mut self.0
    }
}

/// Checks the limits in a fixed order (embeds, fields, files, emptiness) and
/// returns the first one broken. On success the defaults are merged into the
/// payload where it leaves the username or avatar unset.
pub fn validate(
    mut payload: MessagePayload,
    defaults: &ClientDefaults,
) -> Result<ValidatedPayload, ValidationError> {
    if payload.embeds.len() > MAX_EMBEDS {
        return Err(ValidationError::TooManyEmbeds {
            count: payload.embeds.len(),
        });
    }

    if let Some((index, embed)) = payload
        .embeds
        .iter()
        .enumerate()
        .find(|(_, embed)| embed.fields.len() > MAX_EMBED_FIELDS)
    {
        return Err(ValidationError::TooManyFields {
            index,
            count: embed.fields.len(),
        });
    }

    if payload.files.len() > MAX_FILES {
        return Err(ValidationError::TooManyFiles {
            count: payload.files.len(),
        });
    }

    let has_content = payload
        .content
        .as_deref()
        .map_or(false, |content| !content.is_empty());
    if !has_content
        && payload.embeds.is_empty()
        && payload.attachments.is_empty()
        && payload.files.is_empty()
    {
        return Err(ValidationError::EmptyPayload);
    }

    if payload.username.is_none() {
        if let Some(username) = &defaults.username {
            debug!("Using default username {}", username);
            payload.username = Some(username.clone());
        }
    }
    if payload.avatar_url.is_none() {
        payload.avatar_url = defaults.avatar_url.clone();
    }

    Ok(ValidatedPayload(payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Attachment, Embed, EmbedField, WebhookFile};

    fn embeds(count: usize) -> Vec<Embed> {
        (0..count).map(|i| Embed::new().title(i.to_string())).collect()
    }

    fn files(count: usize) -> Vec<WebhookFile> {
        (0..count)
            .map(|i| WebhookFile::from_bytes(format!("{}.txt", i), "x"))
            .collect()
    }

    fn with_fields(count: usize) -> Embed {
        Embed::new().fields((0..count).map(|i| EmbedField::new(i.to_string(), "v")))
    }

    #[test]
    fn too_many_embeds() {
        let payload = MessagePayload {
            embeds: embeds(11),
            ..Default::default()
        };
        assert_eq!(
            validate(payload, &ClientDefaults::default()).unwrap_err(),
            ValidationError::TooManyEmbeds { count: 11 }
        );
    }

    #[test]
    fn ten_embeds_is_fine() {
        let payload = MessagePayload {
            embeds: embeds(10),
            ..Default::default()
        };
        assert!(validate(payload, &ClientDefaults::default()).is_ok());
    }

    #[test]
    fn too_many_fields_names_the_embed() {
        let payload = MessagePayload::new()
            .embed(with_fields(25))
            .embed(with_fields(3))
            .embed(with_fields(26));
        assert_eq!(
            validate(payload, &ClientDefaults::default()).unwrap_err(),
            ValidationError::TooManyFields {
                index: 2,
                count: 26
            }
        );
    }

    #[test]
    fn too_many_files() {
        let payload = MessagePayload {
            content: Some("x".to_owned()),
            files: files(11),
            ..Default::default()
        };
        assert_eq!(
            validate(payload, &ClientDefaults::default()).unwrap_err(),
            ValidationError::TooManyFiles { count: 11 }
        );
    }

    #[test]
    fn first_broken_rule_wins() {
        // breaks every limit at once
        let mut too_many = embeds(11);
        too_many[0] = with_fields(30);
        let payload = MessagePayload {
            embeds: too_many,
            files: files(12),
            ..Default::default()
        };
        assert_eq!(
            validate(payload, &ClientDefaults::default()).unwrap_err(),
            ValidationError::TooManyEmbeds { count: 11 }
        );

        let payload = MessagePayload {
            embeds: vec![with_fields(30)],
            files: files(12),
            ..Default::default()
        };
        assert_eq!(
            validate(payload, &ClientDefaults::default()).unwrap_err(),
            ValidationError::TooManyFields {
                index: 0,
                count: 30
            }
        );
    }

    #[test]
    fn empty_payload() {
        let defaults = ClientDefaults::default();
        assert_eq!(
            validate(MessagePayload::new(), &defaults).unwrap_err(),
            ValidationError::EmptyPayload
        );
        assert_eq!(
            validate(MessagePayload::new().content(""), &defaults).unwrap_err(),
            ValidationError::EmptyPayload
        );
        // identity alone doesn't make a message
        assert_eq!(
            validate(MessagePayload::new().username("bot").tts(true), &defaults).unwrap_err(),
            ValidationError::EmptyPayload
        );
    }

    #[test]
    fn any_single_body_field_is_enough() {
        let defaults = ClientDefaults::default();
        let candidates = vec![
            MessagePayload::new().content("hi"),
            MessagePayload::new().embed(Embed::new()),
            MessagePayload::new().attachment(Attachment {
                id: Some("0".to_owned()),
                ..Default::default()
            }),
            MessagePayload::new().file(WebhookFile::from_bytes("a.txt", "a")),
        ];
        for payload in candidates {
            assert!(validate(payload, &defaults).is_ok());
        }
    }

    #[test]
    fn defaults_fill_missing_identity() {
        let defaults = ClientDefaults {
            username: Some("Bot".to_owned()),
            avatar_url: Some("http://a".to_owned()),
        };
        let validated = validate(MessagePayload::new().content("hi"), &defaults).unwrap();
        assert_eq!(validated.payload().username.as_deref(), Some("Bot"));
        assert_eq!(validated.payload().avatar_url.as_deref(), Some("http://a"));
    }

    #[test]
    fn explicit_identity_wins_over_defaults() {
        let defaults = ClientDefaults {
            username: Some("Bot".to_owned()),
            avatar_url: Some("http://a".to_owned()),
        };
        let before = defaults.clone();
        let payload = MessagePayload::new().content("hi").username("Override");
        let validated = validate(payload, &defaults).unwrap();
        assert_eq!(validated.payload().username.as_deref(), Some("Override"));
        assert_eq!(validated.payload().avatar_url.as_deref(), Some("http://a"));
        assert_eq!(defaults, before);
    }

    #[test]
    fn no_defaults_leaves_identity_unset() {
        let validated =
            validate(MessagePayload::new().content("hi"), &ClientDefaults::default()).unwrap();
        assert_eq!(validated.payload().username, None);
        assert_eq!(validated.payload().avatar_url, None);
    }
}
