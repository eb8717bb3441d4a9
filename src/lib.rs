pub mod auth;
pub mod config;
pub mod error;
pub mod mail;
pub mod models;

pub use auth::{AccessToken, Authenticator};
pub use config::{Config, Credentials, TokenPolicy};
pub use error::{MailError, Result};
pub use mail::Mailer;
pub use models::{Attachment, BodyType, EmailMessage, Importance, ListMessagesQuery, SendResult};
