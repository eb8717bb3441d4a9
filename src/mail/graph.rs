use std::collections::HashSet;

use reqwest::header::RETRY_AFTER;
use reqwest::{Client, Response, StatusCode};
use url::{Origin, Url};

use crate::auth::AccessToken;
use crate::error::{MailError, Result};
use crate::models::{ListMessagesQuery, MailFolder, MessagePage, SendMailRequest, SendResult};

/// Raw Microsoft Graph calls. Every method takes the token to present;
/// acquiring it is the caller's job.
#[derive(Clone)]
pub struct GraphClient {
    client: Client,
    base_url: String,
}

impl GraphClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// `{base}/users/{mailbox}/{segments...}` with each segment percent-encoded.
    fn user_url(&self, mailbox: &str, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| MailError::Validation(format!("invalid Graph URL {}: {}", self.base_url, e)))?;
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| MailError::Validation(format!("Graph URL cannot be a base: {}", self.base_url)))?;
            path.pop_if_empty()
                .push("users")
                .push(mailbox)
                .extend(segments);
        }
        Ok(url)
    }

    /// POST `/users/{from}/sendMail`. Only 202 Accepted counts as success.
    pub async fn send_mail(
        &self,
        token: &AccessToken,
        from: &str,
        request: &SendMailRequest,
    ) -> Result<SendResult> {
        let url = self.user_url(from, &["sendMail"])?;
        tracing::debug!(url = %url, "Posting sendMail request");

        let res = self
            .client
            .post(url)
            .bearer_auth(&token.value)
            .json(request)
            .send()
            .await?;

        let status = res.status();
        if status == StatusCode::ACCEPTED {
            return Ok(SendResult::accepted());
        }

        let retry_after = res
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let body = res.text().await.unwrap_or_default();

        tracing::warn!(status = %status, retry_after = ?retry_after, "sendMail rejected");

        Err(MailError::Send {
            status: status.as_u16(),
            body,
            retry_after,
        })
    }

    pub async fn get_mail_folder(
        &self,
        token: &AccessToken,
        mailbox: &str,
        folder: &str,
    ) -> Result<MailFolder> {
        let url = self.user_url(mailbox, &["mailFolders", folder])?;
        tracing::debug!(url = %url, "Fetching mail folder");

        let res = self.client.get(url).bearer_auth(&token.value).send().await?;
        let res = ensure_success(res).await?;
        Ok(res.json().await?)
    }

    /// Lists every message matching `query`, following `@odata.nextLink` pages.
    pub async fn list_messages(
        &self,
        token: &AccessToken,
        mailbox: &str,
        folder: &str,
        query: &ListMessagesQuery,
    ) -> Result<Vec<serde_json::Value>> {
        query.validate()?;

        let mut url = self.user_url(mailbox, &["mailFolders", folder, "messages"])?;
        url.query_pairs_mut()
            .extend_pairs(query.to_params().iter().map(|(k, v)| (*k, v.as_str())));

        let origin = url.origin();
        let mut visited = HashSet::new();
        let mut messages = Vec::new();
        let mut next = Some(url);

        while let Some(page_url) = next.take() {
            if !visited.insert(page_url.to_string()) {
                tracing::warn!(url = %page_url, "nextLink repeats an earlier page, stopping");
                break;
            }
            tracing::debug!(url = %page_url, "Fetching message page");

            let mut req = self.client.get(page_url).bearer_auth(&token.value);
            if query.needs_eventual_consistency() {
                req = req.header("ConsistencyLevel", "eventual");
            }

            let res = ensure_success(req.send().await?).await?;
            let page: MessagePage = res.json().await?;

            tracing::debug!(count = page.value.len(), "Received message page");
            messages.extend(page.value);
            next = page
                .next_link
                .map(|link| same_origin_link(&origin, &link))
                .transpose()?;
        }

        Ok(messages)
    }

    pub async fn delete_message(
        &self,
        token: &AccessToken,
        mailbox: &str,
        message_id: &str,
    ) -> Result<()> {
        let url = self.user_url(mailbox, &["messages", message_id])?;
        tracing::debug!(url = %url, "Deleting message");

        let res = self.client.delete(url).bearer_auth(&token.value).send().await?;
        ensure_success(res).await?;
        Ok(())
    }
}

/// Parse a `@odata.nextLink`, refusing hosts other than the Graph base URL's
/// so the bearer token never leaves it.
fn same_origin_link(origin: &Origin, link: &str) -> Result<Url> {
    let url = Url::parse(link)
        .map_err(|e| MailError::Validation(format!("invalid nextLink {}: {}", link, e)))?;
    if &url.origin() != origin {
        return Err(MailError::Validation(format!(
            "nextLink points outside the Graph endpoint: {}",
            link
        )));
    }
    Ok(url)
}

async fn ensure_success(res: Response) -> Result<Response> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }

    let body = res.text().await.unwrap_or_default();
    tracing::warn!(status = %status, "Graph API request failed");
    Err(MailError::Graph {
        status: status.as_u16(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn client(base: &str) -> GraphClient {
        GraphClient::new(Client::new(), base)
    }

    #[test]
    fn test_user_url() {
        let url = client("https://graph.microsoft.com/v1.0")
            .user_url("sender@contoso.com", &["sendMail"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://graph.microsoft.com/v1.0/users/sender@contoso.com/sendMail"
        );
    }

    #[test]
    fn test_user_url_trailing_slash_and_encoding() {
        let url = client("http://localhost:8080/v1.0/")
            .user_url("a b@contoso.com", &["messages", "id/with/slash"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/v1.0/users/a%20b@contoso.com/messages/id%2Fwith%2Fslash"
        );
    }

    #[test]
    fn test_user_url_invalid_base() {
        assert!(matches!(
            client("not a url").user_url("x@y.z", &[]),
            Err(MailError::Validation(_))
        ));
    }

    #[test]
    fn test_same_origin_link() {
        let origin = Url::parse("https://graph.microsoft.com/v1.0").unwrap().origin();

        let url = same_origin_link(
            &origin,
            "https://graph.microsoft.com/v1.0/users/a@b.c/messages?$skip=10",
        )
        .unwrap();
        assert_eq!(url.query(), Some("$skip=10"));

        for link in [
            "https://evil.example.com/v1.0/users/a@b.c/messages",
            "http://graph.microsoft.com/v1.0/users/a@b.c/messages",
            "https://graph.microsoft.com:8443/v1.0/users/a@b.c/messages",
            "/v1.0/users/a@b.c/messages",
        ] {
            assert!(
                matches!(same_origin_link(&origin, link), Err(MailError::Validation(_))),
                "{link} should be refused"
            );
        }
    }
}
