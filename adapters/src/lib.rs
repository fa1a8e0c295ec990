//! Core `adapters` crate for abstracting external provider interactions.
//!
//! This crate defines the `PaymentGateway` trait, which outlines the hosted
//! checkout operations the backend relies on, and provides the concrete
//! Stripe implementation alongside the transactional mail client.

pub mod errors;
pub mod mail;
pub mod models;
pub mod stripe;

use async_trait::async_trait;

use crate::errors::AdapterError;
use crate::models::{CheckoutSession, CheckoutSessionRequest};

/// Hosted checkout operations used by the booking flows.
///
/// Abstracted behind a trait so the checkout service can be exercised in
/// tests without talking to the real provider.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a hosted checkout session and return its id and redirect URL.
    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CheckoutSession, AdapterError>;

    /// Fetch the current state of a checkout session by id.
    async fn retrieve_checkout_session(&self, id: &str) -> Result<CheckoutSession, AdapterError>;
}

pub use mail::MailClient;
pub use stripe::StripeClient;
