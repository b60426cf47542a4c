use std::env;
use std::time::Duration;

use dotenv::dotenv;
use log::{debug, warn};
use thiserror::Error;

use crate::client::WebhookIdentity;
use crate::validate::ClientDefaults;

pub const WEBHOOK_URL_VAR: &str = "DISCORD_WEBHOOK_URL";
pub const WEBHOOK_ID_VAR: &str = "DISCORD_WEBHOOK_ID";
pub const WEBHOOK_TOKEN_VAR: &str = "DISCORD_WEBHOOK_TOKEN";
pub const USERNAME_VAR: &str = "DISCORD_WEBHOOK_USERNAME";
pub const AVATAR_URL_VAR: &str = "DISCORD_WEBHOOK_AVATAR_URL";
pub const TIMEOUT_VAR: &str = "DISCORD_WEBHOOK_TIMEOUT_SECS";
pub const USER_AGENT_VAR: &str = "USER_AGENT";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing DISCORD_WEBHOOK_URL or DISCORD_WEBHOOK_ID and DISCORD_WEBHOOK_TOKEN environment variables")]
    MissingIdentity,
}

/// Everything needed to build a client, usually read from the environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub identity: WebhookIdentity,
    pub defaults: ClientDefaults,
    pub user_agent: String,
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new(identity: WebhookIdentity) -> Self {
        Self {
            identity,
            defaults: ClientDefaults::default(),
            user_agent: Self::default_user_agent(),
            timeout: None,
        }
    }

    pub fn default_user_agent() -> String {
        format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
    }

    /// Reads the config from the environment, loading `.env` first if there
    /// is one
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Self, ConfigError> {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let identity = match (
            lookup(WEBHOOK_URL_VAR),
            lookup(WEBHOOK_ID_VAR),
            lookup(WEBHOOK_TOKEN_VAR),
        ) {
            (Some(url), _, _) => WebhookIdentity::Url(url),
            (None, Some(id), Some(token)) => WebhookIdentity::Token { id, token },
            _ => return Err(ConfigError::MissingIdentity),
        };
        let timeout = lookup(TIMEOUT_VAR).and_then(|secs| match secs.parse::<u64>() {
            Ok(secs) => Some(Duration::from_secs(secs)),
            Err(_) => {
                warn!("{} is not a valid number of seconds, using no timeout", TIMEOUT_VAR);
                None
            }
        });
        let user_agent = lookup(USER_AGENT_VAR).unwrap_or_else(|| {
            debug!("No {} found, using the default", USER_AGENT_VAR);
            Self::default_user_agent()
        });
        Ok(Self {
            identity,
            defaults: ClientDefaults {
                username: lookup(USERNAME_VAR),
                avatar_url: lookup(AVATAR_URL_VAR),
            },
            user_agent,
            timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<ClientConfig, ConfigError> {
        let vars = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<HashMap<_, _>>();
        ClientConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn url_takes_precedence() {
        let config = config(&[
            (WEBHOOK_URL_VAR, "https://discord.com/api/webhooks/1/a"),
            (WEBHOOK_ID_VAR, "2"),
            (WEBHOOK_TOKEN_VAR, "b"),
        ])
        .unwrap();
        assert_eq!(
            config.identity,
            WebhookIdentity::Url("https://discord.com/api/webhooks/1/a".to_owned())
        );
        assert_eq!(config.user_agent, ClientConfig::default_user_agent());
        assert_eq!(config.timeout, None);
        assert_eq!(config.defaults, ClientDefaults::default());
    }

    #[test]
    fn id_and_token() {
        let config = config(&[
            (WEBHOOK_ID_VAR, "2"),
            (WEBHOOK_TOKEN_VAR, "b"),
            (USERNAME_VAR, "Bot"),
            (AVATAR_URL_VAR, "http://a"),
            (TIMEOUT_VAR, "15"),
            (USER_AGENT_VAR, "my-agent"),
        ])
        .unwrap();
        assert_eq!(
            config.identity,
            WebhookIdentity::Token {
                id: "2".to_owned(),
                token: "b".to_owned()
            }
        );
        assert_eq!(config.defaults.username.as_deref(), Some("Bot"));
        assert_eq!(config.defaults.avatar_url.as_deref(), Some("http://a"));
        assert_eq!(config.timeout, Some(Duration::from_secs(15)));
        assert_eq!(config.user_agent, "my-agent");
    }

    #[test]
    fn missing_identity() {
        assert_eq!(
            config(&[(WEBHOOK_ID_VAR, "2")]).unwrap_err(),
            ConfigError::MissingIdentity
        );
        assert_eq!(
            config(&[(WEBHOOK_URL_VAR, "  ")]).unwrap_err(),
            ConfigError::MissingIdentity
        );
    }

    #[test]
    fn invalid_timeout_is_ignored() {
        let config = config(&[(WEBHOOK_ID_VAR, "2"), (WEBHOOK_TOKEN_VAR, "b"), (TIMEOUT_VAR, "soon")])
            .unwrap();
        assert_eq!(config.timeout, None);
    }
}
