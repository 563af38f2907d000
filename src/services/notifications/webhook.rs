use anyhow::Context;
use async_trait::async_trait;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::Sha1;

use super::NotificationSink;
use crate::models::Notification;

pub const SIGNATURE_HEADER: &str = "X-Servicebook-Signature";

/// POSTs each notification as JSON to a fixed URL, signed with a shared secret.
pub struct WebhookSink {
    url: String,
    secret: String,
    client: reqwest::Client,
}

impl WebhookSink {
    pub fn new(url: String, secret: String) -> Self {
        Self {
            url,
            secret,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    async fn deliver(&self, notification: &Notification) -> anyhow::Result<()> {
        let body = serde_json::to_vec(notification).context("failed to encode notification")?;
        let signature = sign(&self.secret, &body)?;

        self.client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(SIGNATURE_HEADER, signature)
            .body(body)
            .send()
            .await
            .context("failed to send notification webhook")?
            .error_for_status()
            .context("notification webhook returned error")?;

        Ok(())
    }
}

/// base64(HMAC-SHA1(secret, body)).
pub fn sign(secret: &str, body: &[u8]) -> anyhow::Result<String> {
    let mut mac = Hmac::<Sha1>::new_from_slice(secret.as_bytes())
        .map_err(|e| anyhow::anyhow!("invalid webhook secret: {e}"))?;
    mac.update(body);
    let result = mac.finalize().into_bytes();
    Ok(base64::engine::general_purpose::STANDARD.encode(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_known_vector() {
        let signature = sign("key", b"The quick brown fox jumps over the lazy dog").unwrap();
        assert_eq!(signature, "3nybhbi3iqa8ino29wqQcBydtNk=");
    }

    #[test]
    fn test_sign_depends_on_secret() {
        let body = br#"{"id":1}"#;
        assert_eq!(sign("s3cret", body).unwrap(), "Lw7lGS7RIMn8TRZVVjbds1gR9H4=");
        assert_ne!(sign("other", body).unwrap(), sign("s3cret", body).unwrap());
    }
}
