//! Payment gateway integration module
//!
//! Provides a unified driver interface (invoice, receipt, redirection form)
//! and concrete gateway drivers for Shaparak-compliant PSPs.

pub mod providers;
pub mod traits;
pub mod types;
