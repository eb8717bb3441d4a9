use serde::{Deserialize, Serialize};

use super::attachment::Attachment;
use crate::error::{MailError, Result};

/// Message body format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyType {
    #[default]
    Text,
    Html,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    Low,
    #[default]
    Normal,
    High,
}

/// An outgoing message, built per send call.
#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub from_address: String,
    pub sender_name: Option<String>,
    pub subject: String,
    pub body: String,
    pub body_type: BodyType,
    pub importance: Importance,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub attachments: Vec<Attachment>,
}

impl EmailMessage {
    pub fn new(
        from_address: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            from_address: from_address.into().trim().to_string(),
            sender_name: None,
            subject: subject.into(),
            body: body.into(),
            body_type: BodyType::Text,
            importance: Importance::Normal,
            to: Vec::new(),
            cc: Vec::new(),
            bcc: Vec::new(),
            attachments: Vec::new(),
        }
    }

    pub fn with_body_type(mut self, body_type: BodyType) -> Self {
        self.body_type = body_type;
        self
    }

    pub fn with_importance(mut self, importance: Importance) -> Self {
        self.importance = importance;
        self
    }

    pub fn with_sender_name(mut self, name: impl Into<String>) -> Self {
        self.sender_name = Some(name.into());
        self
    }

    pub fn to(mut self, address: impl Into<String>) -> Self {
        push_unique(&mut self.to, address.into());
        self
    }

    pub fn cc(mut self, address: impl Into<String>) -> Self {
        push_unique(&mut self.cc, address.into());
        self
    }

    pub fn bcc(mut self, address: impl Into<String>) -> Self {
        push_unique(&mut self.bcc, address.into());
        self
    }

    pub fn to_all<I, S>(self, addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        addresses.into_iter().fold(self, |msg, addr| msg.to(addr))
    }

    pub fn cc_all<I, S>(self, addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        addresses.into_iter().fold(self, |msg, addr| msg.cc(addr))
    }

    pub fn bcc_all<I, S>(self, addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        addresses.into_iter().fold(self, |msg, addr| msg.bcc(addr))
    }

    /// Attachments keep the order they were added in.
    pub fn attach(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Checks required fields. Runs before any network traffic.
    pub fn validate(&self) -> Result<()> {
        if self.from_address.trim().is_empty() {
            return Err(MailError::Validation("from_address is required".to_string()));
        }
        if !is_email_like(&self.from_address) || self.from_address.trim() != self.from_address
        {
            return Err(MailError::Validation(format!(
                "from_address is not a valid email address: {}",
                self.from_address
            )));
        }
        if self.subject.trim().is_empty() {
            return Err(MailError::Validation("subject is required".to_string()));
        }
        if self.to.is_empty() {
            return Err(MailError::Validation(
                "at least one recipient is required".to_string(),
            ));
        }

        for (kind, list) in [("to", &self.to), ("cc", &self.cc), ("bcc", &self.bcc)] {
            if let Some(bad) = list.iter().find(|addr| !is_email_like(addr)) {
                return Err(MailError::Validation(format!(
                    "invalid {} recipient: {:?}",
                    kind, bad
                )));
            }
        }

        Ok(())
    }
}

fn push_unique(list: &mut Vec<String>, address: String) {
    let address = address.trim().to_string();
    if !list.iter().any(|a| a.eq_ignore_ascii_case(&address)) {
        list.push(address);
    }
}

/// Loose `local@domain` shape check; the provider does the real validation.
pub fn is_email_like(address: &str) -> bool {
    let address = address.trim();
    if address.chars().any(char::is_whitespace) {
        return false;
    }
    match address.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

/// Outcome of an accepted sendMail call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SendResult {
    pub status_code: u16,
    pub success: bool,
}

impl SendResult {
    pub fn accepted() -> Self {
        Self {
            status_code: 202,
            success: true,
        }
    }
}
