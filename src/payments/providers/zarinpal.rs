//! Zarinpal payment gateway driver
//!
//! Integrates with Zarinpal's SOAP WebGate: a purchase call obtains an
//! authority token, the payer is redirected to the hosted payment page, and
//! the callback is confirmed with a verification call. Three deployment
//! modes share the flow: `normal` (production), `sandbox` (test
//! environment) and `zaringate` (alternate redirect variant of the same
//! vendor).

use crate::error::{PaymentError, PaymentResult};
use crate::payments::traits::PaymentDriver;
use crate::payments::types::{CallbackParams, Invoice, Receipt, RedirectionForm};
use crate::soap::{self, HttpSoapTransport, SoapTransport};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

/// Gateway name recorded on receipts
pub const GATEWAY_NAME: &str = "zarinpal";

/// Message used when the payer aborts on the hosted page
const CANCELLED_BY_USER: &str = "عملیات پرداخت توسط کاربر لغو شد.";

/// Deployment target selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Normal,
    Sandbox,
    Zaringate,
}

impl Mode {
    /// Parse a mode string, case-insensitively. Anything other than
    /// `sandbox` or `zaringate` selects the production endpoints.
    pub fn parse(raw: &str) -> Self {
        match raw.to_lowercase().as_str() {
            "sandbox" => Mode::Sandbox,
            "zaringate" => Mode::Zaringate,
            _ => Mode::Normal,
        }
    }
}

/// Zarinpal driver configuration
///
/// Immutable after construction. Endpoint URLs come in three families
/// (purchase, payment page, verification), one set per mode; `Default`
/// carries the vendor's published URLs.
#[derive(Debug, Clone)]
pub struct ZarinpalConfig {
    /// Merchant id issued by the vendor
    pub merchant_id: String,
    /// URL the payer is sent back to after the hosted page
    pub callback_url: String,
    /// Default purchase description, used when the invoice carries none
    pub description: String,
    pub mode: Mode,
    pub api_purchase_url: String,
    pub api_payment_url: String,
    pub api_verification_url: String,
    pub sandbox_api_purchase_url: String,
    pub sandbox_api_payment_url: String,
    pub sandbox_api_verification_url: String,
    pub zaringate_api_purchase_url: String,
    pub zaringate_api_payment_url: String,
    pub zaringate_api_verification_url: String,
}

impl Default for ZarinpalConfig {
    fn default() -> Self {
        Self {
            merchant_id: String::new(),
            callback_url: String::new(),
            description: "payment".to_string(),
            mode: Mode::Normal,
            api_purchase_url: "https://ir.zarinpal.com/pg/services/WebGate/wsdl".to_string(),
            api_payment_url: "https://www.zarinpal.com/pg/StartPay/".to_string(),
            api_verification_url: "https://ir.zarinpal.com/pg/services/WebGate/wsdl".to_string(),
            sandbox_api_purchase_url: "https://sandbox.zarinpal.com/pg/services/WebGate/wsdl"
                .to_string(),
            sandbox_api_payment_url: "https://sandbox.zarinpal.com/pg/StartPay/".to_string(),
            sandbox_api_verification_url: "https://sandbox.zarinpal.com/pg/services/WebGate/wsdl"
                .to_string(),
            zaringate_api_purchase_url: "https://ir.zarinpal.com/pg/services/WebGate/wsdl"
                .to_string(),
            zaringate_api_payment_url: "https://www.zarinpal.com/pg/StartPay/:authority/ZarinGate"
                .to_string(),
            zaringate_api_verification_url: "https://ir.zarinpal.com/pg/services/WebGate/wsdl"
                .to_string(),
        }
    }
}

impl ZarinpalConfig {
    /// Create config from environment variables
    pub fn from_env() -> PaymentResult<Self> {
        let merchant_id = std::env::var("ZARINPAL_MERCHANT_ID").map_err(|_| {
            PaymentError::configuration("ZARINPAL_MERCHANT_ID environment variable is required")
        })?;

        let callback_url = std::env::var("ZARINPAL_CALLBACK_URL").map_err(|_| {
            PaymentError::configuration("ZARINPAL_CALLBACK_URL environment variable is required")
        })?;

        let description =
            std::env::var("ZARINPAL_DESCRIPTION").unwrap_or_else(|_| "payment".to_string());

        let mode = std::env::var("ZARINPAL_MODE")
            .map(|m| Mode::parse(&m))
            .unwrap_or(Mode::Normal);

        let config = Self {
            merchant_id,
            callback_url,
            description,
            mode,
            ..Self::default()
        };

        config.validate()?;
        Ok(config)
    }

    /// Check that the merchant credentials and the URLs for the selected
    /// mode are present.
    pub fn validate(&self) -> PaymentResult<()> {
        if self.merchant_id.trim().is_empty() {
            return Err(PaymentError::configuration("merchant_id cannot be empty"));
        }
        if self.callback_url.trim().is_empty() {
            return Err(PaymentError::configuration("callback_url cannot be empty"));
        }

        for (name, url) in [
            ("purchase", self.purchase_url()),
            ("payment", self.payment_url()),
            ("verification", self.verification_url()),
        ] {
            if url.trim().is_empty() {
                return Err(PaymentError::Configuration(format!(
                    "{} URL for mode {:?} cannot be empty",
                    name, self.mode
                )));
            }
        }

        Ok(())
    }

    /// SOAP endpoint for `PaymentRequest`
    pub fn purchase_url(&self) -> &str {
        match self.mode {
            Mode::Sandbox => &self.sandbox_api_purchase_url,
            Mode::Zaringate => &self.zaringate_api_purchase_url,
            Mode::Normal => &self.api_purchase_url,
        }
    }

    /// Hosted payment page base URL
    pub fn payment_url(&self) -> &str {
        match self.mode {
            Mode::Sandbox => &self.sandbox_api_payment_url,
            Mode::Zaringate => &self.zaringate_api_payment_url,
            Mode::Normal => &self.api_payment_url,
        }
    }

    /// SOAP endpoint for `PaymentVerification`
    pub fn verification_url(&self) -> &str {
        match self.mode {
            Mode::Sandbox => &self.sandbox_api_verification_url,
            Mode::Zaringate => &self.zaringate_api_verification_url,
            Mode::Normal => &self.api_verification_url,
        }
    }
}

/// Translate a vendor status code to its published message.
///
/// The table is vendor-supplied domain knowledge and is reproduced
/// verbatim; unknown codes fall back to a generic message.
pub fn translate_status(status: i32) -> &'static str {
    match status {
        -1 => "اطلاعات ارسال شده ناقص است.",
        -2 => "IP و يا مرچنت كد پذيرنده صحيح نيست.",
        -3 => "با توجه به محدوديت هاي شاپرك امكان پرداخت با رقم درخواست شده ميسر نمي باشد.",
        -4 => "سطح تاييد پذيرنده پايين تر از سطح نقره اي است.",
        -11 => "درخواست مورد نظر يافت نشد.",
        -12 => "امكان ويرايش درخواست ميسر نمي باشد.",
        -21 => "هيچ نوع عمليات مالي براي اين تراكنش يافت نشد.",
        -22 => "تراكنش نا موفق ميباشد.",
        -33 => "رقم تراكنش با رقم پرداخت شده مطابقت ندارد.",
        -34 => "سقف تقسيم تراكنش از لحاظ تعداد يا رقم عبور نموده است.",
        -40 => "اجازه دسترسي به متد مربوطه وجود ندارد.",
        -41 => "اطلاعات ارسال شده مربوط به AdditionalData غيرمعتبر ميباشد.",
        -42 => "مدت زمان معتبر طول عمر شناسه پرداخت بايد بين 30 دقيه تا 45 روز مي باشد.",
        -54 => "درخواست مورد نظر آرشيو شده است.",
        101 => "عمليات پرداخت موفق بوده و قبلا PaymentVerification تراكنش انجام شده است.",
        _ => "خطای ناشناخته ای رخ داده است.",
    }
}

/// Zarinpal payment driver
///
/// Owns one invoice for its lifetime; safe to run many independent driver
/// instances concurrently.
pub struct ZarinpalDriver {
    config: ZarinpalConfig,
    invoice: Invoice,
    transport: Arc<dyn SoapTransport>,
}

impl ZarinpalDriver {
    /// Create a new driver instance for one invoice
    ///
    /// Fails when the config is missing merchant credentials or the
    /// endpoint URLs for its mode.
    pub fn new(invoice: Invoice, config: ZarinpalConfig) -> PaymentResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            invoice,
            transport: Arc::new(HttpSoapTransport::default()),
        })
    }

    /// Create a driver with config from environment variables
    pub fn from_env(invoice: Invoice) -> PaymentResult<Self> {
        let config = ZarinpalConfig::from_env()?;
        Self::new(invoice, config)
    }

    /// Create a driver with an injected transport (used by tests)
    pub fn with_transport(
        invoice: Invoice,
        config: ZarinpalConfig,
        transport: Arc<dyn SoapTransport>,
    ) -> PaymentResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            invoice,
            transport,
        })
    }

    pub fn config(&self) -> &ZarinpalConfig {
        &self.config
    }

    fn resolve_description(&self) -> String {
        self.invoice
            .description()
            .map(str::to_string)
            .unwrap_or_else(|| self.config.description.clone())
    }
}

#[async_trait]
impl PaymentDriver for ZarinpalDriver {
    async fn purchase(&mut self) -> PaymentResult<String> {
        info!(
            "Initiating zarinpal purchase: amount={} invoice={}",
            self.invoice.amount, self.invoice.uuid
        );

        let body = PaymentRequestBody {
            merchant_id: self.config.merchant_id.clone(),
            amount: self.invoice.amount,
            callback_url: self.config.callback_url.clone(),
            description: self.resolve_description(),
            additional_data: serde_json::to_string(&self.invoice.details)?,
        };
        let payload = quick_xml::se::to_string(&body).map_err(|e| PaymentError::Xml(e.to_string()))?;

        let response = self
            .transport
            .call(
                self.config.purchase_url(),
                "PaymentRequest",
                &soap::envelope(&payload),
            )
            .await?;

        let status = soap::int_field(&response, "Status")?;
        let authority = soap::response_field(&response, "Authority").unwrap_or_default();

        if status != 100 || authority.is_empty() {
            let message = translate_status(status);
            error!(
                "Zarinpal purchase rejected: status={} message={}",
                status, message
            );
            return Err(PaymentError::PurchaseFailed(message.to_string()));
        }

        info!(
            "Zarinpal purchase accepted: invoice={} authority={}",
            self.invoice.uuid, authority
        );

        self.invoice.transaction_id = Some(authority.clone());
        Ok(authority)
    }

    fn pay(&self) -> PaymentResult<RedirectionForm> {
        let transaction_id = self.invoice.transaction_id.as_deref().ok_or_else(|| {
            PaymentError::validation("invoice has no transaction id; purchase() must succeed first")
        })?;

        let payment_url = self.config.payment_url();
        let url = if self.config.mode == Mode::Zaringate {
            payment_url.replace(":authority", transaction_id)
        } else {
            // No separator: the vendor's payment URLs already end in one.
            format!("{payment_url}{transaction_id}")
        };

        Ok(RedirectionForm::get(url))
    }

    async fn verify(&self, callback: &CallbackParams) -> PaymentResult<Receipt> {
        // Exact, case-sensitive compare; the payer cancelled otherwise.
        // Checked before anything else: a cancellation callback may carry
        // no authority at all.
        if callback.get("Status") != Some("OK") {
            return Err(PaymentError::InvalidPayment {
                message: CANCELLED_BY_USER.to_string(),
                status_code: None,
            });
        }

        let authority = self
            .invoice
            .transaction_id
            .as_deref()
            .or_else(|| callback.get("Authority"))
            .ok_or_else(|| {
                PaymentError::validation("no authority token on invoice or callback")
            })?
            .to_string();

        info!(
            "Verifying zarinpal payment: invoice={} authority={}",
            self.invoice.uuid, authority
        );

        let body = PaymentVerificationBody {
            merchant_id: self.config.merchant_id.clone(),
            authority,
            amount: self.invoice.amount,
        };
        let payload = quick_xml::se::to_string(&body).map_err(|e| PaymentError::Xml(e.to_string()))?;

        let response = self
            .transport
            .call(
                self.config.verification_url(),
                "PaymentVerification",
                &soap::envelope(&payload),
            )
            .await?;

        let status = soap::int_field(&response, "Status")?;
        if status != 100 {
            let message = translate_status(status);
            error!(
                "Zarinpal verification rejected: status={} message={}",
                status, message
            );
            return Err(PaymentError::InvalidPayment {
                message: message.to_string(),
                status_code: Some(status),
            });
        }

        let ref_id = soap::response_field(&response, "RefID")
            .ok_or_else(|| PaymentError::Xml("missing <RefID> in verification response".to_string()))?;

        info!("Zarinpal payment verified: ref_id={}", ref_id);

        Ok(Receipt::new(GATEWAY_NAME, ref_id))
    }

    fn name(&self) -> &str {
        GATEWAY_NAME
    }

    fn invoice(&self) -> &Invoice {
        &self.invoice
    }

    fn invoice_mut(&mut self) -> &mut Invoice {
        &mut self.invoice
    }
}

// Wire payloads; element names are fixed by the vendor's WSDL.

#[derive(Debug, Serialize)]
#[serde(rename = "zar:PaymentRequest")]
struct PaymentRequestBody {
    #[serde(rename = "MerchantID")]
    merchant_id: String,
    #[serde(rename = "Amount")]
    amount: u64,
    #[serde(rename = "CallbackURL")]
    callback_url: String,
    #[serde(rename = "Description")]
    description: String,
    #[serde(rename = "AdditionalData")]
    additional_data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename = "zar:PaymentVerification")]
struct PaymentVerificationBody {
    #[serde(rename = "MerchantID")]
    merchant_id: String,
    #[serde(rename = "Authority")]
    authority: String,
    #[serde(rename = "Amount")]
    amount: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(mode: Mode) -> ZarinpalConfig {
        ZarinpalConfig {
            merchant_id: "test-merchant".to_string(),
            callback_url: "https://shop.test/callback".to_string(),
            mode,
            ..ZarinpalConfig::default()
        }
    }

    fn test_driver(mode: Mode, invoice: Invoice) -> ZarinpalDriver {
        ZarinpalDriver::new(invoice, test_config(mode)).unwrap()
    }

    #[test]
    fn test_mode_parse_is_case_insensitive() {
        assert_eq!(Mode::parse("sandbox"), Mode::Sandbox);
        assert_eq!(Mode::parse("SandBox"), Mode::Sandbox);
        assert_eq!(Mode::parse("ZARINGATE"), Mode::Zaringate);
        assert_eq!(Mode::parse("normal"), Mode::Normal);
        assert_eq!(Mode::parse("anything-else"), Mode::Normal);
        assert_eq!(Mode::parse(""), Mode::Normal);
    }

    #[test]
    fn test_endpoint_selection_per_mode() {
        let normal = test_config(Mode::Normal);
        assert_eq!(normal.purchase_url(), normal.api_purchase_url);
        assert_eq!(normal.payment_url(), normal.api_payment_url);
        assert_eq!(normal.verification_url(), normal.api_verification_url);

        let sandbox = test_config(Mode::Sandbox);
        assert_eq!(sandbox.purchase_url(), sandbox.sandbox_api_purchase_url);
        assert_eq!(sandbox.payment_url(), sandbox.sandbox_api_payment_url);
        assert_eq!(
            sandbox.verification_url(),
            sandbox.sandbox_api_verification_url
        );

        let zaringate = test_config(Mode::Zaringate);
        assert_eq!(zaringate.purchase_url(), zaringate.zaringate_api_purchase_url);
        assert_eq!(zaringate.payment_url(), zaringate.zaringate_api_payment_url);
        assert_eq!(
            zaringate.verification_url(),
            zaringate.zaringate_api_verification_url
        );
    }

    #[test]
    fn test_translate_status_known_codes() {
        let cases = [
            (-1, "اطلاعات ارسال شده ناقص است."),
            (-2, "IP و يا مرچنت كد پذيرنده صحيح نيست."),
            (
                -3,
                "با توجه به محدوديت هاي شاپرك امكان پرداخت با رقم درخواست شده ميسر نمي باشد.",
            ),
            (-4, "سطح تاييد پذيرنده پايين تر از سطح نقره اي است."),
            (-11, "درخواست مورد نظر يافت نشد."),
            (-12, "امكان ويرايش درخواست ميسر نمي باشد."),
            (-21, "هيچ نوع عمليات مالي براي اين تراكنش يافت نشد."),
            (-22, "تراكنش نا موفق ميباشد."),
            (-33, "رقم تراكنش با رقم پرداخت شده مطابقت ندارد."),
            (-34, "سقف تقسيم تراكنش از لحاظ تعداد يا رقم عبور نموده است."),
            (-40, "اجازه دسترسي به متد مربوطه وجود ندارد."),
            (-41, "اطلاعات ارسال شده مربوط به AdditionalData غيرمعتبر ميباشد."),
            (
                -42,
                "مدت زمان معتبر طول عمر شناسه پرداخت بايد بين 30 دقيه تا 45 روز مي باشد.",
            ),
            (-54, "درخواست مورد نظر آرشيو شده است."),
            (
                101,
                "عمليات پرداخت موفق بوده و قبلا PaymentVerification تراكنش انجام شده است.",
            ),
        ];

        for (code, expected) in cases {
            assert_eq!(translate_status(code), expected, "code {code}");
        }
    }

    #[test]
    fn test_translate_status_unknown_code() {
        let fallback = "خطای ناشناخته ای رخ داده است.";
        assert_eq!(translate_status(0), fallback);
        assert_eq!(translate_status(-999), fallback);
        assert_eq!(translate_status(100), fallback, "100 is success, not a table entry");
    }

    #[test]
    fn test_pay_appends_transaction_id_without_separator() {
        let mut driver = test_driver(Mode::Normal, Invoice::new(10_000));
        driver.invoice_mut().transaction_id = Some("A000123".to_string());

        let form = driver.pay().unwrap();
        assert_eq!(form.url, "https://www.zarinpal.com/pg/StartPay/A000123");
        assert_eq!(form.method, "GET");
        assert!(form.fields.is_empty());
    }

    #[test]
    fn test_pay_zaringate_substitutes_authority_token() {
        let mut driver = test_driver(Mode::Zaringate, Invoice::new(10_000));
        driver.invoice_mut().transaction_id = Some("A000123".to_string());

        let form = driver.pay().unwrap();
        assert_eq!(
            form.url,
            "https://www.zarinpal.com/pg/StartPay/A000123/ZarinGate"
        );
    }

    #[test]
    fn test_pay_without_purchase_is_a_validation_error() {
        let driver = test_driver(Mode::Normal, Invoice::new(10_000));
        assert!(matches!(driver.pay(), Err(PaymentError::Validation(_))));
    }

    #[test]
    fn test_description_resolution() {
        let driver = test_driver(
            Mode::Normal,
            Invoice::new(10_000).detail("description", "order #42"),
        );
        assert_eq!(driver.resolve_description(), "order #42");

        let driver = test_driver(Mode::Normal, Invoice::new(10_000).detail("description", ""));
        assert_eq!(driver.resolve_description(), "payment");

        let driver = test_driver(Mode::Normal, Invoice::new(10_000));
        assert_eq!(driver.resolve_description(), "payment");
    }

    #[test]
    fn test_config_validate_requires_merchant_id() {
        let config = ZarinpalConfig {
            callback_url: "https://shop.test/callback".to_string(),
            ..ZarinpalConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PaymentError::Configuration(_))
        ));
        assert!(test_config(Mode::Normal).validate().is_ok());
    }

    #[test]
    fn test_driver_construction_validates_config() {
        let config = ZarinpalConfig {
            callback_url: "https://shop.test/callback".to_string(),
            ..ZarinpalConfig::default()
        };
        assert!(matches!(
            ZarinpalDriver::new(Invoice::new(10_000), config),
            Err(PaymentError::Configuration(_))
        ));

        let mut config = test_config(Mode::Sandbox);
        config.sandbox_api_payment_url = String::new();
        assert!(matches!(
            ZarinpalDriver::new(Invoice::new(10_000), config),
            Err(PaymentError::Configuration(_))
        ));
    }

    #[test]
    fn test_purchase_request_body_uses_vendor_element_names() {
        let body = PaymentRequestBody {
            merchant_id: "m1".to_string(),
            amount: 25_000,
            callback_url: "https://shop.test/callback".to_string(),
            description: "order".to_string(),
            additional_data: "{}".to_string(),
        };
        let xml = quick_xml::se::to_string(&body).unwrap();
        assert!(xml.contains("<MerchantID>m1</MerchantID>"));
        assert!(xml.contains("<Amount>25000</Amount>"));
        assert!(xml.contains("<CallbackURL>https://shop.test/callback</CallbackURL>"));
        assert!(xml.contains("<Description>order</Description>"));
        assert!(xml.contains("<AdditionalData>{}</AdditionalData>"));
    }
}
