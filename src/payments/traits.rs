//! Payment driver trait definitions
//!
//! Defines the common interface that all gateway drivers must implement.

use crate::error::PaymentResult;
use crate::payments::types::{CallbackParams, Invoice, Receipt, RedirectionForm};
use async_trait::async_trait;

/// Trait for payment gateway drivers
///
/// A driver owns exactly one [`Invoice`] and walks it through the
/// purchase → redirect → verify lifecycle against one vendor's API. The
/// caller persists the invoice (and its transaction id) between the steps,
/// which in real deployments span separate HTTP requests.
#[async_trait]
pub trait PaymentDriver: Send + Sync {
    /// Register the payment with the gateway
    ///
    /// On success the gateway-issued transaction id is stored on the owned
    /// invoice and returned. Must succeed before `pay()` or `verify()` are
    /// meaningful.
    async fn purchase(&mut self) -> PaymentResult<String>;

    /// Build the redirect that sends the payer to the hosted payment page
    ///
    /// Requires a transaction id from a prior successful `purchase()`.
    fn pay(&self) -> PaymentResult<RedirectionForm>;

    /// Verify the payment after the payer returns
    ///
    /// Reads the vendor's callback parameters, confirms the payment with
    /// the gateway and returns a [`Receipt`] on success.
    async fn verify(&self, callback: &CallbackParams) -> PaymentResult<Receipt>;

    /// Get driver name
    fn name(&self) -> &str;

    /// The invoice this driver owns
    fn invoice(&self) -> &Invoice;

    /// Mutable access to the owned invoice
    fn invoice_mut(&mut self) -> &mut Invoice;
}
