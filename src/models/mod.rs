pub mod attachment;
pub mod mailbox;
pub mod message;
pub mod payload;

// -----------------------------
// Message module re-exports
// -----------------------------
pub use message::{is_email_like, BodyType, EmailMessage, Importance, SendResult};

pub use attachment::{Attachment, AttachmentContent};

// -----------------------------
// Mailbox module re-exports
// -----------------------------
pub use mailbox::{ListMessagesQuery, MailFolder, MessagePage};

pub use payload::{build_send_mail_request, FileAttachment, Recipient, SendMailRequest};
