pub mod graph;

use reqwest::Client;

use crate::auth::Authenticator;
use crate::config::Config;
use crate::error::Result;
use crate::models::{
    build_send_mail_request, payload, EmailMessage, FileAttachment, ListMessagesQuery, MailFolder,
    SendResult,
};

/// Mailer backed by Microsoft Graph.
///
/// Holds one token cache; sends on the same instance share it. The
/// instance is `Send + Sync` and can be wrapped in an `Arc`.
pub struct Mailer {
    config: Config,
    auth: Authenticator,
    graph: graph::GraphClient,
}

impl Mailer {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let client = Client::builder().timeout(config.request_timeout).build()?;
        let auth = Authenticator::with_client(&config, client.clone());
        Ok(Self::assemble(config, auth, client))
    }

    /// Use an authenticator built elsewhere, e.g. one shared with other Graph clients.
    pub fn with_authenticator(config: Config, auth: Authenticator) -> Result<Self> {
        config.validate()?;
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self::assemble(config, auth, client))
    }

    /// Create mailer from env (AZURE_TENANT_ID, OAUTH_CLIENT_ID, MAIL_FROM, etc.)
    pub fn new_from_env() -> Result<Self> {
        Self::new(Config::from_env()?)
    }

    fn assemble(config: Config, auth: Authenticator, client: Client) -> Self {
        let graph = graph::GraphClient::new(client, config.graph_url.clone());
        Self {
            config,
            auth,
            graph,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.auth
    }

    /// New message from the configured sender address and display name.
    pub fn compose(&self, subject: impl Into<String>, body: impl Into<String>) -> EmailMessage {
        let message = EmailMessage::new(self.config.sender_address.clone(), subject, body);
        match &self.config.sender_name {
            Some(name) => message.with_sender_name(name.clone()),
            None => message,
        }
    }

    /// Send one message. Validation and attachment reads happen before any
    /// network call; the token fetch (if needed) and the send follow in order.
    pub async fn send(&self, message: &EmailMessage) -> Result<SendResult> {
        message.validate()?;

        tracing::info!(
            sender = %message.from_address,
            recipients = ?message.to,
            cc = message.cc.len(),
            bcc = message.bcc.len(),
            attachments = message.attachments.len(),
            "Sending email"
        );

        let mut attachments = Vec::with_capacity(message.attachments.len());
        for attachment in &message.attachments {
            let bytes = attachment.read_bytes().await?;
            tracing::debug!(name = %attachment.filename, size = bytes.len(), "Encoded attachment");
            attachments.push(FileAttachment::encode(attachment, &bytes));
        }

        let request = build_send_mail_request(message, attachments, self.config.save_to_sent_items);
        if self.config.log_payloads {
            let rendered = payload::redacted_json(&request)?;
            tracing::debug!(payload = %rendered, "Prepared sendMail payload");
        }

        let token = self.auth.token().await?;
        let result = self
            .graph
            .send_mail(&token, &message.from_address, &request)
            .await?;

        tracing::info!(sender = %message.from_address, recipients = ?message.to, "Email sent");
        Ok(result)
    }

    /// Send a plain-text message to `to` from the configured sender.
    pub async fn send_text(&self, to: Vec<String>, subject: String, text: String) -> Result<SendResult> {
        let message = self.compose(subject, text).to_all(to);
        self.send(&message).await
    }

    pub async fn get_mail_folder(&self, mailbox: &str, folder: &str) -> Result<MailFolder> {
        let token = self.auth.token().await?;
        self.graph.get_mail_folder(&token, mailbox, folder).await
    }

    pub async fn list_messages(
        &self,
        mailbox: &str,
        folder: &str,
        query: &ListMessagesQuery,
    ) -> Result<Vec<serde_json::Value>> {
        query.validate()?;
        let token = self.auth.token().await?;
        let messages = self.graph.list_messages(&token, mailbox, folder, query).await?;
        tracing::info!(mailbox = %mailbox, folder = %folder, count = messages.len(), "Listed messages");
        Ok(messages)
    }

    pub async fn delete_message(&self, mailbox: &str, message_id: &str) -> Result<()> {
        let token = self.auth.token().await?;
        self.graph.delete_message(&token, mailbox, message_id).await?;
        tracing::info!(mailbox = %mailbox, message_id = %message_id, "Deleted message");
        Ok(())
    }
}
