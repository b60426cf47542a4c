use lazy_static::lazy_static;
use log::{debug, info};
use regex::Regex;
use reqwest::Method;
use url::Url;

use crate::config::ClientConfig;
use crate::encode::{encode, RequestDescriptor, UrlBuilder};
use crate::error::{IdentityError, Result};
use crate::models::{MessagePayload, ModifyWebhook, Webhook, WebhookMessage};
use crate::request::{
    expect_success, parse_response, parse_successful_response, HttpSender, ReqwestSender,
};
use crate::validate::{validate, ClientDefaults};

const DISCORD_API: &str = "https://discord.com/api";

lazy_static! {
    /// `/api[/v10]/webhooks/{id}/{token}`, on any host so proxies keep working
    static ref WEBHOOK_PATH: Regex =
        Regex::new(r"^/api(?:/v\d+)?/webhooks/(\d+)/([\w-]+)/?$").unwrap();
}

pub fn is_discord_webhook_url(url: &str) -> bool {
    Url::parse(url)
        .map(|parsed| WEBHOOK_PATH.is_match(parsed.path()))
        .unwrap_or(false)
}

/// How a webhook is addressed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookIdentity {
    Token { id: String, token: String },
    Url(String),
}

impl WebhookIdentity {
    /// Resolves the identity into the webhook's base url, without query or
    /// trailing slash
    pub fn base_url(&self) -> std::result::Result<Url, IdentityError> {
        let url = match self {
            WebhookIdentity::Token { id, token } => {
                Url::parse(&format!("{}/webhooks/{}/{}", DISCORD_API, id, token))?
            }
            WebhookIdentity::Url(raw) => Url::parse(raw)?,
        };
        let path = url.path().trim_end_matches('/').to_owned();
        let shaped = matches!(url.scheme(), "http" | "https") && WEBHOOK_PATH.is_match(&path);
        if !shaped {
            return Err(IdentityError::NotAWebhook(self.redacted()));
        }
        let mut url = url;
        url.set_path(&path);
        url.set_query(None);
        url.set_fragment(None);
        Ok(url)
    }

    /// Printable form with the token hidden
    fn redacted(&self) -> String {
        match self {
            WebhookIdentity::Token { id, .. } => format!("webhook {}", id),
            WebhookIdentity::Url(raw) => match Url::parse(raw) {
                Ok(url) => {
                    let shown = format!("{}{}", url.origin().ascii_serialization(), url.path());
                    match shown.rfind('/') {
                        Some(last) => format!("{}/...", &shown[..last]),
                        None => shown,
                    }
                }
                Err(_) => "<unparseable url>".to_owned(),
            },
        }
    }
}

/// Query parameters accepted when executing a webhook
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecuteParams {
    /// Wait for the message to be created and return it. Without it discord
    /// answers `204 No Content`.
    pub wait: bool,
    /// Post into this thread of the webhook's channel
    pub thread_id: Option<String>,
    /// Allow non-interactive components on webhooks not owned by an
    /// application
    pub with_components: bool,
}

impl ExecuteParams {
    pub fn wait() -> Self {
        Self {
            wait: true,
            ..Default::default()
        }
    }

    fn apply(&self, base_url: &Url) -> Url {
        UrlBuilder::default()
            .flag("wait", self.wait)
            .optional("thread_id", &self.thread_id)
            .flag("with_components", self.with_components)
            .build(base_url)
    }
}

/// Query parameters accepted by the single message endpoints
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageParams {
    pub thread_id: Option<String>,
    pub with_components: bool,
}

impl MessageParams {
    pub fn in_thread(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: Some(thread_id.into()),
            ..Default::default()
        }
    }

    fn apply(&self, base_url: &Url) -> Url {
        UrlBuilder::default()
            .optional("thread_id", &self.thread_id)
            .flag("with_components", self.with_components)
            .build(base_url)
    }
}

/// A client bound to a single webhook.
///
/// The base url is resolved once at construction and never changes. Defaults
/// are read by every call and can only be changed through `&mut self`.
pub struct WebhookClient<S = ReqwestSender> {
    base_url: Url,
    defaults: ClientDefaults,
    sender: S,
}

impl WebhookClient<ReqwestSender> {
    pub fn new(id: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        Self::from_identity(WebhookIdentity::Token {
            id: id.into(),
            token: token.into(),
        })
    }

    pub fn from_url(url: impl Into<String>) -> Result<Self> {
        Self::from_identity(WebhookIdentity::Url(url.into()))
    }

    pub fn from_identity(identity: WebhookIdentity) -> Result<Self> {
        let sender = ReqwestSender::new(&ClientConfig::default_user_agent(), None)?;
        Self::with_sender(identity, sender)
    }

    pub fn from_config(config: ClientConfig) -> Result<Self> {
        let sender = ReqwestSender::new(&config.user_agent, config.timeout)?;
        let mut client = Self::with_sender(config.identity, sender)?;
        client.defaults = config.defaults;
        Ok(client)
    }
}

impl<S: HttpSender> WebhookClient<S> {
    pub fn with_sender(identity: WebhookIdentity, sender: S) -> Result<Self> {
        Ok(Self {
            base_url: identity.base_url()?,
            defaults: ClientDefaults::default(),
            sender,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The webhook's id, taken from its url
    pub fn id(&self) -> &str {
        self.base_url
            .path_segments()
            .and_then(|segments| segments.rev().nth(1))
            .unwrap_or_default()
    }

    pub fn defaults(&self) -> &ClientDefaults {
        &self.defaults
    }

    /// Username used for every message that doesn't set one itself
    pub fn set_default_username(&mut self, username: impl Into<String>) -> &mut Self {
        self.defaults.username = Some(username.into());
        self
    }

    /// Avatar used for every message that doesn't set one itself
    pub fn set_default_avatar_url(&mut self, avatar_url: impl Into<String>) -> &mut Self {
        self.defaults.avatar_url = Some(avatar_url.into());
        self
    }

    fn message_url(&self, message_id: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push("messages").push(message_id);
        }
        url
    }

    fn payload_request(
        &self,
        method: Method,
        url: Url,
        payload: MessagePayload,
    ) -> Result<RequestDescriptor> {
        let validated = validate(payload, &self.defaults)?;
        Ok(encode(method, url, validated)?)
    }

    /// Executes the webhook. Returns the created message when `params.wait`
    /// is set, `None` otherwise.
    pub async fn execute(
        &self,
        payload: MessagePayload,
        params: &ExecuteParams,
    ) -> Result<Option<WebhookMessage>> {
        let request = self
            .payload_request(Method::POST, params.apply(&self.base_url), payload)?;
        debug!("Executing webhook {}", self.id());
        let response = self.sender.send(request).await?;
        let message = parse_response::<WebhookMessage>(response)?;
        if let Some(message) = &message {
            info!("Webhook {} created message {}", self.id(), message.id);
        }
        Ok(message)
    }

    /// Executes the webhook and waits for the created message
    pub async fn send(&self, payload: MessagePayload) -> Result<WebhookMessage> {
        let request = self
            .payload_request(
                Method::POST,
                ExecuteParams::wait().apply(&self.base_url),
                payload,
            )?;
        debug!("Executing webhook {}", self.id());
        parse_successful_response(self.sender.send(request).await?)
    }

    pub async fn edit_message(
        &self,
        message_id: &str,
        payload: MessagePayload,
        params: &MessageParams,
    ) -> Result<WebhookMessage> {
        let url = params.apply(&self.message_url(message_id));
        let request = self.payload_request(Method::PATCH, url, payload)?;
        debug!("Editing message {} of webhook {}", message_id, self.id());
        parse_successful_response(self.sender.send(request).await?)
    }

    pub async fn get_message(
        &self,
        message_id: &str,
        params: &MessageParams,
    ) -> Result<WebhookMessage> {
        let url = params.apply(&self.message_url(message_id));
        let request = RequestDescriptor::new(Method::GET, url);
        parse_successful_response(self.sender.send(request).await?)
    }

    pub async fn delete_message(&self, message_id: &str, params: &MessageParams) -> Result<()> {
        let url = params.apply(&self.message_url(message_id));
        debug!("Deleting message {} of webhook {}", message_id, self.id());
        let request = RequestDescriptor::new(Method::DELETE, url);
        expect_success(self.sender.send(request).await?)
    }

    pub async fn get_webhook(&self) -> Result<Webhook> {
        let request = RequestDescriptor::new(Method::GET, self.base_url.clone());
        parse_successful_response(self.sender.send(request).await?)
    }

    /// Renames the webhook or replaces its avatar. Moving it to another
    /// channel needs a bot token, so discord ignores `channel_id` here.
    pub async fn modify_webhook(&self, changes: &ModifyWebhook) -> Result<Webhook> {
        let request =
            RequestDescriptor::new(Method::PATCH, self.base_url.clone()).json(changes)?;
        parse_successful_response(self.sender.send(request).await?)
    }

    /// Deletes the webhook itself. The client is useless afterwards.
    pub async fn delete_webhook(&self) -> Result<()> {
        info!("Deleting webhook {}", self.id());
        let request = RequestDescriptor::new(Method::DELETE, self.base_url.clone());
        expect_success(self.sender.send(request).await?)
    }
}

impl WebhookMessage {
    pub async fn edit<S: HttpSender>(
        &self,
        client: &WebhookClient<S>,
        payload: MessagePayload,
    ) -> Result<WebhookMessage> {
        client
            .edit_message(&self.id, payload, &MessageParams::default())
            .await
    }

    pub async fn delete<S: HttpSender>(&self, client: &WebhookClient<S>) -> Result<()> {
        client
            .delete_message(&self.id, &MessageParams::default())
            .await
    }
}
