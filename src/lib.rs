//! Pardakht — payment gateway abstraction for Shaparak-compliant PSPs
//!
//! Provides a unified driver interface (invoice, receipt, redirection form)
//! and gateway drivers. Flow: `purchase()` registers the payment and stores
//! the gateway's transaction id on the invoice, `pay()` builds the redirect
//! to the hosted payment page, and `verify()` confirms the payment once the
//! payer returns.

pub mod error;
pub mod payments;
pub mod soap;

// Re-export commonly used types
pub use error::{PaymentError, PaymentResult};
pub use payments::providers::zarinpal::ZarinpalDriver;
pub use payments::traits::PaymentDriver;
pub use payments::types::{CallbackParams, Invoice, Receipt, RedirectionForm};
