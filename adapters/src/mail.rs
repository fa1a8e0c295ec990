//! Transactional mail client.
//!
//! Sends HTML mail through an HTTP mail-delivery API (endpoint and key come
//! from configuration), used for password resets and the contact form.

use reqwest::Client;
use tracing::debug;

use crate::errors::AdapterError;
use crate::models::OutboundMail;

#[derive(Clone)]
pub struct MailClient {
    http: Client,
    endpoint: String,
    api_key: String,
    from: String,
}

impl MailClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        from: impl Into<String>,
    ) -> Self {
        Self {
            http: Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            from: from.into(),
        }
    }

    pub async fn send(
        &self,
        to: &str,
        subject: &str,
        html: &str,
    ) -> Result<(), AdapterError> {
        let mail = OutboundMail {
            from: self.from.clone(),
            to: to.to_string(),
            subject: subject.to_string(),
            html: html.to_string(),
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&mail)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AdapterError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        debug!(to = %mail.to, subject = %mail.subject, "mail dispatched");
        Ok(())
    }
}
