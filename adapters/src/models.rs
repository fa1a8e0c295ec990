//! Generic data models for the `adapters` crate.
//!
//! These define provider-agnostic representations of hosted checkout
//! sessions and outbound mail, so the backend services interact with a
//! consistent data format regardless of the concrete provider.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Parameters for opening a hosted checkout session.
#[derive(Debug, Clone)]
pub struct CheckoutSessionRequest {
    /// Display name of the purchased item, e.g. `Consultation: career`.
    pub product_name: String,
    /// Optional longer description shown on the checkout page.
    pub product_description: Option<String>,
    /// Amount in the currency's smallest unit (cents).
    pub amount_cents: i64,
    /// ISO currency code, lowercase.
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
    /// Prefilled customer email, when known.
    pub customer_email: Option<String>,
    /// Opaque key/value pairs echoed back on retrieval and in webhooks.
    pub metadata: HashMap<String, String>,
    /// Unix timestamp after which the session can no longer be completed.
    pub expires_at: Option<i64>,
}

/// Payment state of a checkout session as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPaymentStatus {
    Paid,
    Unpaid,
    NoPaymentRequired,
}

/// A hosted checkout session, freshly created or retrieved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    /// Redirect URL; present on creation, absent once the session expires.
    pub url: Option<String>,
    pub payment_status: SessionPaymentStatus,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CheckoutSession {
    pub fn is_paid(&self) -> bool {
        self.payment_status == SessionPaymentStatus::Paid
    }
}

/// A webhook notification from the payment provider.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEventData {
    pub object: CheckoutSession,
}

/// An outbound transactional mail.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundMail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn webhook_event_deserializes_provider_shape() {
        let raw = r#"{
            "id": "evt_123",
            "type": "checkout.session.completed",
            "data": {
                "object": {
                    "id": "cs_test_123",
                    "url": null,
                    "payment_status": "paid",
                    "metadata": { "kind": "consultation" }
                }
            }
        }"#;

        let event: WebhookEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(event.event_type, "checkout.session.completed");
        assert!(event.data.object.is_paid());
        assert_eq!(
            event.data.object.metadata.get("kind").map(String::as_str),
            Some("consultation")
        );
    }

    #[test]
    fn session_without_metadata_defaults_empty() {
        let raw = r#"{"id":"cs_1","url":"https://pay.example/x","payment_status":"unpaid"}"#;
        let session: CheckoutSession = serde_json::from_str(raw).unwrap();
        assert!(!session.is_paid());
        assert!(session.metadata.is_empty());
    }
}
