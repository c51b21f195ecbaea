//! SOAP transport for gateway drivers
//!
//! Drivers depend on the [`SoapTransport`] trait rather than on an HTTP
//! client directly, so tests can substitute a fake implementation without
//! network access. [`HttpSoapTransport`] is the production implementation.

use crate::error::{PaymentError, PaymentResult};
use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Client;
use std::time::Duration;
use tracing::warn;

/// Capability to invoke a remote SOAP operation.
///
/// `call` posts a complete envelope and returns the raw response body.
/// Transport faults surface untranslated; interpreting the body is the
/// driver's job.
#[async_trait]
pub trait SoapTransport: Send + Sync {
    async fn call(&self, url: &str, action: &str, envelope: &str) -> PaymentResult<String>;
}

/// Reqwest-backed SOAP transport
///
/// Retries transport errors and HTTP 5xx with exponential backoff.
/// Application-level gateway rejections are carried in 2xx bodies and are
/// never retried here.
pub struct HttpSoapTransport {
    client: Client,
    max_retries: u32,
}

impl HttpSoapTransport {
    pub fn new(timeout_secs: u64, max_retries: u32) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            max_retries,
        }
    }
}

impl Default for HttpSoapTransport {
    fn default() -> Self {
        Self::new(30, 3)
    }
}

#[async_trait]
impl SoapTransport for HttpSoapTransport {
    async fn call(&self, url: &str, action: &str, envelope: &str) -> PaymentResult<String> {
        let mut last_error: Option<PaymentError> = None;

        for attempt in 0..=self.max_retries {
            let result = self
                .client
                .post(url)
                .header("Content-Type", "text/xml; charset=utf-8")
                .header("SOAPAction", action)
                .body(envelope.to_string())
                .send()
                .await;

            match result {
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();

                    if status.is_success() {
                        return Ok(body);
                    }

                    if status.is_server_error() && attempt < self.max_retries {
                        let backoff = 2_u64.pow(attempt);
                        warn!(
                            "Server error {}, retrying after {} seconds (attempt {})",
                            status,
                            backoff,
                            attempt + 1
                        );
                        tokio::time::sleep(Duration::from_secs(backoff)).await;
                        continue;
                    }

                    return Err(PaymentError::Transport(format!(
                        "HTTP {}: {}",
                        status, body
                    )));
                }
                Err(e) => {
                    if attempt < self.max_retries {
                        let backoff = 2_u64.pow(attempt);
                        warn!(
                            "Request error, retrying after {} seconds (attempt {}): {}",
                            backoff,
                            attempt + 1,
                            e
                        );
                        last_error = Some(e.into());
                        tokio::time::sleep(Duration::from_secs(backoff)).await;
                        continue;
                    }
                    return Err(e.into());
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            PaymentError::transport(format!(
                "Request failed after {} retries",
                self.max_retries
            ))
        }))
    }
}

/// Wrap an operation payload in a SOAP 1.1 envelope.
pub fn envelope(body: &str) -> String {
    format!(
        r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" xmlns:zar="http://zarinpal.com/">
<soapenv:Body>
{body}
</soapenv:Body>
</soapenv:Envelope>"#
    )
}

/// Text content of the first element whose local name matches `field`.
///
/// Matching by local name keeps the parser agnostic to whatever namespace
/// prefixes the vendor's SOAP stack emits. Empty elements yield `Some("")`.
pub fn response_field(xml: &str, field: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    let mut inside = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == field.as_bytes() => {
                inside = true;
            }
            Ok(Event::Empty(e)) if e.local_name().as_ref() == field.as_bytes() => {
                return Some(String::new());
            }
            Ok(Event::Text(t)) if inside => {
                return t.unescape().ok().map(|s| s.trim().to_string());
            }
            Ok(Event::End(e)) if inside && e.local_name().as_ref() == field.as_bytes() => {
                return Some(String::new());
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}

/// Like [`response_field`] but required and numeric.
pub fn int_field(xml: &str, field: &str) -> PaymentResult<i32> {
    let raw = response_field(xml, field)
        .ok_or_else(|| PaymentError::Xml(format!("missing <{field}> in response")))?;
    raw.parse()
        .map_err(|_| PaymentError::Xml(format!("non-numeric <{field}>: {raw}")))
}
