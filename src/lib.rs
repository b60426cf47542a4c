pub mod client;
pub mod config;
pub mod encode;
pub mod error;
pub mod models;
pub mod request;
pub mod validate;

pub use client::{ExecuteParams, MessageParams, WebhookClient, WebhookIdentity};
pub use config::ClientConfig;
pub use error::{Result, WebhookError};
pub use models::{Embed, EmbedField, MessagePayload, WebhookFile};
pub use validate::ClientDefaults;
