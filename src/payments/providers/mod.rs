//! Gateway driver implementations
//!
//! Concrete implementations of the PaymentDriver trait for different gateways.

pub mod zarinpal;

pub use zarinpal::ZarinpalDriver;
