//! Microsoft Graph `sendMail` request body.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Serialize;

use super::attachment::Attachment;
use super::message::{BodyType, EmailMessage, Importance};

pub const FILE_ATTACHMENT_TYPE: &str = "#microsoft.graph.fileAttachment";

/// Top-level envelope posted to `/users/{id}/sendMail`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMailRequest {
    pub message: GraphMessage,
    pub save_to_sent_items: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphMessage {
    pub subject: String,
    pub body: ItemBody,
    pub to_recipients: Vec<Recipient>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cc_recipients: Vec<Recipient>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bcc_recipients: Vec<Recipient>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<Recipient>,
    pub importance: Importance,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_attachments: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<FileAttachment>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemBody {
    pub content_type: BodyType,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    pub email_address: EmailAddress,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EmailAddress {
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Recipient {
    pub fn new(address: &str) -> Self {
        Self {
            email_address: EmailAddress {
                address: address.to_string(),
                name: None,
            },
        }
    }

    pub fn named(address: &str, name: &str) -> Self {
        Self {
            email_address: EmailAddress {
                address: address.to_string(),
                name: Some(name.to_string()),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileAttachment {
    #[serde(rename = "@odata.type")]
    pub odata_type: &'static str,
    pub name: String,
    pub content_type: String,
    pub content_bytes: String,
}

impl FileAttachment {
    pub fn encode(attachment: &Attachment, bytes: &[u8]) -> Self {
        Self {
            odata_type: FILE_ATTACHMENT_TYPE,
            name: attachment.filename.clone(),
            content_type: attachment.content_type.clone(),
            content_bytes: STANDARD.encode(bytes),
        }
    }
}

/// Recipients go out trimmed and case-insensitively unique even when the
/// message lists were assigned directly.
fn recipients(list: &[String]) -> Vec<Recipient> {
    let mut seen: Vec<String> = Vec::with_capacity(list.len());
    for address in list {
        let address = address.trim();
        if !seen.iter().any(|s| s.eq_ignore_ascii_case(address)) {
            seen.push(address.to_string());
        }
    }
    seen.iter().map(|address| Recipient::new(address)).collect()
}

/// Map a validated message plus its already-encoded attachments onto the
/// Graph schema.
pub fn build_send_mail_request(
    message: &EmailMessage,
    attachments: Vec<FileAttachment>,
    save_to_sent_items: bool,
) -> SendMailRequest {
    let sender = message
        .sender_name
        .as_deref()
        .map(|name| Recipient::named(&message.from_address, name));

    SendMailRequest {
        message: GraphMessage {
            subject: message.subject.clone(),
            body: ItemBody {
                content_type: message.body_type,
                content: message.body.clone(),
            },
            to_recipients: recipients(&message.to),
            cc_recipients: recipients(&message.cc),
            bcc_recipients: recipients(&message.bcc),
            sender,
            importance: message.importance,
            has_attachments: (!attachments.is_empty()).then_some(true),
            attachments,
        },
        save_to_sent_items,
    }
}

/// Payload as JSON with attachment content elided, for debug logging.
pub fn redacted_json(request: &SendMailRequest) -> serde_json::Result<String> {
    let mut value = serde_json::to_value(request)?;
    if let Some(items) = value
        .pointer_mut("/message/attachments")
        .and_then(|v| v.as_array_mut())
    {
        for item in items {
            if let Some(obj) = item.as_object_mut() {
                let len = obj
                    .get("contentBytes")
                    .and_then(|v| v.as_str())
                    .map(str::len)
                    .unwrap_or(0);
                obj.insert(
                    "contentBytes".to_string(),
                    serde_json::Value::String(format!("<{} base64 chars>", len)),
                );
            }
        }
    }
    serde_json::to_string_pretty(&value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn message() -> EmailMessage {
        EmailMessage::new("sender@contoso.com", "Status", "<p>All good</p>")
            .with_body_type(BodyType::Html)
            .to_all(["alice@contoso.com", "bob@contoso.com"])
    }

    #[test]
    fn test_minimal_envelope_shape() {
        let request = build_send_mail_request(&message(), vec![], true);
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(
            value,
            json!({
                "message": {
                    "subject": "Status",
                    "body": { "contentType": "html", "content": "<p>All good</p>" },
                    "toRecipients": [
                        { "emailAddress": { "address": "alice@contoso.com" } },
                        { "emailAddress": { "address": "bob@contoso.com" } }
                    ],
                    "importance": "normal"
                },
                "saveToSentItems": true
            })
        );
    }

    #[test]
    fn test_cc_bcc_and_sender() {
        let msg = message()
            .cc("carol@contoso.com")
            .bcc("dave@contoso.com")
            .with_sender_name("Reporting Bot")
            .with_importance(Importance::High);
        let value = serde_json::to_value(build_send_mail_request(&msg, vec![], false)).unwrap();

        assert_eq!(
            value["message"]["ccRecipients"],
            json!([{ "emailAddress": { "address": "carol@contoso.com" } }])
        );
        assert_eq!(
            value["message"]["bccRecipients"],
            json!([{ "emailAddress": { "address": "dave@contoso.com" } }])
        );
        assert_eq!(
            value["message"]["sender"],
            json!({ "emailAddress": { "address": "sender@contoso.com", "name": "Reporting Bot" } })
        );
        assert_eq!(value["message"]["importance"], "high");
        assert_eq!(value["saveToSentItems"], false);
    }

    #[test]
    fn test_assigned_recipients_deduplicated() {
        let mut msg = message();
        msg.to = vec![
            "alice@contoso.com".to_string(),
            " ALICE@contoso.com".to_string(),
            "bob@contoso.com".to_string(),
            "alice@contoso.com".to_string(),
        ];
        msg.cc = vec!["carol@contoso.com".to_string(), "carol@contoso.com".to_string()];

        let request = build_send_mail_request(&msg, vec![], true);
        let to: Vec<&str> = request
            .message
            .to_recipients
            .iter()
            .map(|r| r.email_address.address.as_str())
            .collect();

        assert_eq!(to, vec!["alice@contoso.com", "bob@contoso.com"]);
        assert_eq!(request.message.cc_recipients.len(), 1);
    }

    #[test]
    fn test_attachments_encoded_in_order() {
        let first = Attachment::from_bytes("a.txt", "text/plain", b"first".to_vec());
        let second = Attachment::from_bytes("b.bin", "application/octet-stream", vec![0u8, 255, 7]);
        let encoded = vec![
            FileAttachment::encode(&first, b"first"),
            FileAttachment::encode(&second, &[0u8, 255, 7]),
        ];

        let value = serde_json::to_value(build_send_mail_request(&message(), encoded, true)).unwrap();
        let attachments = value["message"]["attachments"].as_array().unwrap();

        assert_eq!(value["message"]["hasAttachments"], true);
        assert_eq!(attachments.len(), 2);
        assert_eq!(attachments[0]["@odata.type"], FILE_ATTACHMENT_TYPE);
        assert_eq!(attachments[0]["name"], "a.txt");
        assert_eq!(attachments[1]["name"], "b.bin");
        assert_eq!(attachments[1]["contentType"], "application/octet-stream");

        let decoded = STANDARD
            .decode(attachments[1]["contentBytes"].as_str().unwrap())
            .unwrap();
        assert_eq!(decoded, vec![0u8, 255, 7]);
    }

    #[test]
    fn test_redacted_json_hides_content() {
        let att = Attachment::from_bytes("secret.txt", "text/plain", b"top secret".to_vec());
        let request =
            build_send_mail_request(&message(), vec![FileAttachment::encode(&att, b"top secret")], true);
        let rendered = redacted_json(&request).unwrap();

        assert!(rendered.contains("secret.txt"));
        assert!(!rendered.contains(&STANDARD.encode(b"top secret")));
    }
}
