use thiserror::Error;

use crate::encode::EncodingError;
use crate::request::RawResponse;
use crate::validate::ValidationError;

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("Invalid webhook url")]
    Url(#[from] url::ParseError),
    #[error("{0} is not a discord webhook url")]
    NotAWebhook(String),
}

#[derive(Error, Debug)]
pub enum WebhookError {
    #[error("Invalid payload: {0}")]
    Validation(#[from] ValidationError),
    #[error("Could not build the request body")]
    Encoding(#[from] EncodingError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error("Invalid {0} header value")]
    InvalidHeader(&'static str),
    #[error("Request error")]
    Transport(#[from] reqwest::Error),
    #[error("Failed response code {}", .0.status)]
    Remote(RawResponse),
    #[error("Unexpected body {:?}", .0.body)]
    UnexpectedBody(RawResponse),
}

pub type Result<T> = std::result::Result<T, WebhookError>;
