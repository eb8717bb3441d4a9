use std::path::{Path, PathBuf};

use crate::error::{MailError, Result};

/// Where the attachment bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentContent {
    /// Read in full when the message is sent.
    Path(PathBuf),
    Bytes(Vec<u8>),
}

/// A file attached to an outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub content: AttachmentContent,
}

impl Attachment {
    /// Attach a local file. The filename is taken from the last path
    /// component and the content type is guessed from the extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                MailError::Validation(format!(
                    "attachment path has no file name: {}",
                    path.display()
                ))
            })?
            .to_string();

        let content_type = mime_guess::from_path(path)
            .first()
            .map(|mime| mime.essence_str().to_string())
            .ok_or_else(|| {
                MailError::Validation(format!(
                    "could not guess the content type of {}; set one with with_content_type",
                    path.display()
                ))
            })?;

        Ok(Self {
            filename,
            content_type,
            content: AttachmentContent::Path(path.to_path_buf()),
        })
    }

    /// Attach a file whose content type can't be inferred from its extension.
    pub fn from_path_with_type(path: impl AsRef<Path>, content_type: impl Into<String>) -> Result<Self> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                MailError::Validation(format!(
                    "attachment path has no file name: {}",
                    path.display()
                ))
            })?
            .to_string();

        Ok(Self {
            filename,
            content_type: content_type.into(),
            content: AttachmentContent::Path(path.to_path_buf()),
        })
    }

    pub fn from_bytes(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            content: AttachmentContent::Bytes(bytes.into()),
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Full content of the attachment; files are read completely or not at all.
    pub async fn read_bytes(&self) -> Result<Vec<u8>> {
        match &self.content {
            AttachmentContent::Bytes(bytes) => Ok(bytes.clone()),
            AttachmentContent::Path(path) => {
                tokio::fs::read(path)
                    .await
                    .map_err(|source| MailError::AttachmentRead {
                        path: path.clone(),
                        source,
                    })
            }
        }
    }
}
