//! Payment types and data structures
//!
//! Common types exchanged between the application and gateway drivers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// A payment request owned by the caller.
///
/// The invoice is created before `purchase()`, persisted by the caller
/// between redirect and callback, and handed back to the driver for
/// verification. `transaction_id` is set exactly once, by a successful
/// purchase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    /// Internal invoice identity
    pub uuid: Uuid,
    /// Amount in the smallest currency unit (rials)
    pub amount: u64,
    /// Free-form details forwarded to the gateway; a non-empty
    /// `"description"` entry overrides the configured default description
    pub details: HashMap<String, serde_json::Value>,
    /// Gateway-issued token identifying this payment attempt
    pub transaction_id: Option<String>,
}

impl Invoice {
    pub fn new(amount: u64) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            amount,
            details: HashMap::new(),
            transaction_id: None,
        }
    }

    /// Attach a detail entry, builder-style.
    pub fn detail(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// The `"description"` detail, when present and non-empty.
    pub fn description(&self) -> Option<&str> {
        self.details
            .get("description")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
    }
}

/// Proof of payment returned after successful verification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    /// Name of the gateway that settled the payment
    pub gateway: String,
    /// Vendor reference id for the settled transaction
    pub reference_id: String,
    /// When the receipt was issued
    pub date: DateTime<Utc>,
}

impl Receipt {
    pub fn new(gateway: impl Into<String>, reference_id: impl Into<String>) -> Self {
        Self {
            gateway: gateway.into(),
            reference_id: reference_id.into(),
            date: Utc::now(),
        }
    }
}

/// Instruction telling the caller how to redirect the payer's browser to
/// the gateway's hosted payment page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedirectionForm {
    pub url: String,
    /// Form fields to submit alongside the redirect (empty for GET flows)
    pub fields: HashMap<String, String>,
    /// HTTP method, e.g. "GET"
    pub method: String,
}

impl RedirectionForm {
    /// A plain GET redirect with no form fields.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            fields: HashMap::new(),
            method: "GET".to_string(),
        }
    }
}

/// Query/form parameters of the redirect-back request.
///
/// Parameter names are fixed by each vendor; drivers read what they need.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallbackParams(HashMap<String, String>);

impl CallbackParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter, builder-style.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
}

impl From<HashMap<String, String>> for CallbackParams {
    fn from(params: HashMap<String, String>) -> Self {
        Self(params)
    }
}

impl FromIterator<(String, String)> for CallbackParams {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
