//! Stripe-specific implementation of the `PaymentGateway` trait.
//!
//! Talks to the hosted Checkout API over form-encoded HTTPS and verifies
//! webhook signatures. Only the small slice of the Checkout surface the
//! booking flows need is wrapped here.

use std::collections::HashMap;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::Client;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::errors::AdapterError;
use crate::models::{CheckoutSession, CheckoutSessionRequest};
use crate::PaymentGateway;

const API_BASE: &str = "https://api.stripe.com/v1";

/// How far a webhook timestamp may drift before the event is rejected.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

#[derive(Clone)]
pub struct StripeClient {
    http: Client,
    secret_key: String,
    api_base: String,
}

impl StripeClient {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            secret_key: secret_key.into(),
            api_base: API_BASE.to_string(),
        }
    }

    /// Point the client at a different base URL (test servers).
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    async fn post_form(
        &self,
        path: &str,
        form: &[(String, String)],
    ) -> Result<CheckoutSession, AdapterError> {
        let response = self
            .http
            .post(format!("{}{}", self.api_base, path))
            .bearer_auth(&self.secret_key)
            .form(form)
            .send()
            .await?;

        decode_session(response).await
    }
}

async fn decode_session(response: reqwest::Response) -> Result<CheckoutSession, AdapterError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AdapterError::Provider {
            status: status.as_u16(),
            body,
        });
    }

    response
        .json::<CheckoutSession>()
        .await
        .map_err(|e| AdapterError::Decode(e.to_string()))
}

#[async_trait]
impl PaymentGateway for StripeClient {
    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CheckoutSession, AdapterError> {
        let mut form: Vec<(String, String)> = vec![
            ("mode".into(), "payment".into()),
            ("payment_method_types[0]".into(), "card".into()),
            (
                "line_items[0][price_data][currency]".into(),
                request.currency,
            ),
            (
                "line_items[0][price_data][product_data][name]".into(),
                request.product_name,
            ),
            (
                "line_items[0][price_data][unit_amount]".into(),
                request.amount_cents.to_string(),
            ),
            ("line_items[0][quantity]".into(), "1".into()),
            ("success_url".into(), request.success_url),
            ("cancel_url".into(), request.cancel_url),
        ];

        if let Some(description) = request.product_description {
            form.push((
                "line_items[0][price_data][product_data][description]".into(),
                description,
            ));
        }
        if let Some(email) = request.customer_email {
            form.push(("customer_email".into(), email));
        }
        if let Some(expires_at) = request.expires_at {
            form.push(("expires_at".into(), expires_at.to_string()));
        }
        for (key, value) in request.metadata {
            form.push((format!("metadata[{key}]"), value));
        }

        let session = self.post_form("/checkout/sessions", &form).await?;
        debug!(session_id = %session.id, "created checkout session");
        Ok(session)
    }

    async fn retrieve_checkout_session(&self, id: &str) -> Result<CheckoutSession, AdapterError> {
        let response = self
            .http
            .get(format!("{}/checkout/sessions/{id}", self.api_base))
            .bearer_auth(&self.secret_key)
            .send()
            .await?;

        decode_session(response).await
    }
}

/// Verify a `Stripe-Signature` header against the raw request body.
///
/// The header carries `t=<unix ts>,v1=<hex hmac>` pairs; the signed payload
/// is `"{t}.{body}"` keyed with the endpoint secret. Comparison is constant
/// time and the timestamp must be within `tolerance_secs` of `now`.
pub fn verify_webhook_signature(
    secret: &str,
    header: &str,
    payload: &[u8],
    now: i64,
    tolerance_secs: i64,
) -> Result<(), AdapterError> {
    let parts: HashMap<&str, &str> = header
        .split(',')
        .filter_map(|pair| pair.trim().split_once('='))
        .collect();

    let timestamp: i64 = parts
        .get("t")
        .ok_or_else(|| AdapterError::Signature("missing timestamp".into()))?
        .parse()
        .map_err(|_| AdapterError::Signature("malformed timestamp".into()))?;

    let expected = parts
        .get("v1")
        .ok_or_else(|| AdapterError::Signature("missing v1 signature".into()))?;
    let expected = hex::decode(expected)
        .map_err(|_| AdapterError::Signature("signature is not hex".into()))?;

    if (now - timestamp).abs() > tolerance_secs {
        return Err(AdapterError::Signature("timestamp outside tolerance".into()));
    }

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| AdapterError::Signature(e.to_string()))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    let computed = mac.finalize().into_bytes();

    if bool::from(computed.as_slice().ct_eq(&expected)) {
        Ok(())
    } else {
        Err(AdapterError::Signature("signature mismatch".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, timestamp: i64, payload: &[u8]) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn accepts_valid_signature() {
        let payload = br#"{"type":"checkout.session.completed"}"#;
        let header = format!("t=1000,v1={}", sign("whsec_test", 1000, payload));

        assert!(verify_webhook_signature("whsec_test", &header, payload, 1000, 300).is_ok());
    }

    #[test]
    fn tolerates_extra_header_pairs() {
        let payload = b"{}";
        let v1 = sign("whsec_test", 1000, payload);
        let header = format!("t=1000,v1={v1},v0=deadbeef");

        assert!(verify_webhook_signature("whsec_test", &header, payload, 1100, 300).is_ok());
    }

    #[test]
    fn rejects_tampered_payload() {
        let payload = b"{}";
        let header = format!("t=1000,v1={}", sign("whsec_test", 1000, payload));

        let result =
            verify_webhook_signature("whsec_test", &header, b"{\"a\":1}", 1000, 300);
        assert!(matches!(result, Err(AdapterError::Signature(_))));
    }

    #[test]
    fn rejects_stale_timestamp() {
        let payload = b"{}";
        let header = format!("t=1000,v1={}", sign("whsec_test", 1000, payload));

        let result = verify_webhook_signature("whsec_test", &header, payload, 2000, 300);
        assert!(matches!(result, Err(AdapterError::Signature(_))));
    }

    #[test]
    fn rejects_wrong_secret() {
        let payload = b"{}";
        let header = format!("t=1000,v1={}", sign("whsec_other", 1000, payload));

        let result = verify_webhook_signature("whsec_test", &header, payload, 1000, 300);
        assert!(matches!(result, Err(AdapterError::Signature(_))));
    }

    #[test]
    fn rejects_missing_signature_parts() {
        let result = verify_webhook_signature("whsec_test", "t=1000", b"{}", 1000, 300);
        assert!(matches!(result, Err(AdapterError::Signature(_))));

        let result = verify_webhook_signature("whsec_test", "v1=aa", b"{}", 1000, 300);
        assert!(matches!(result, Err(AdapterError::Signature(_))));
    }
}
