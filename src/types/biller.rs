//! Biller configuration.
//!
//! A biller entry drives everything the processor does for one payable
//! entity: which identifier it validates (customer reference or phone
//! number), which amounts it accepts, and how the simulation behaves
//! (processing delay, injected error rate).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Kind of service a biller provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceKind {
    /// Invoice settlement against a customer reference
    BillPayment,
    /// Prepaid credit against a phone number
    TelecomRecharge,
}

/// Business category of a biller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillerCategory {
    Electricity,
    Water,
    Gas,
    Phone,
    Internet,
    Telecom,
}

/// Configuration for a single biller.
///
/// Immutable during a request; the catalog is the only writer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillerConfig {
    /// Unique code, e.g. `EGY-ELECTRICITY`
    pub biller_code: String,
    pub biller_name: String,
    pub category: BillerCategory,
    pub service_kind: ServiceKind,
    /// Regex a customer reference must match, if any
    pub customer_reference_format: Option<String>,
    /// Regex a phone number must match, if any
    pub phone_number_format: Option<String>,
    /// Allowed recharge amounts; empty means any amount is accepted
    pub available_amounts: Vec<Decimal>,
    /// Simulated processing delay in milliseconds
    pub processing_delay_ms: u64,
    /// Probability (0-100) that a request fails with an injected fault
    pub error_rate: u8,
    pub is_active: bool,
}

impl BillerConfig {
    /// New bill-payment biller with no formats, no delay and no faults.
    pub fn bill_payment(code: &str, name: &str, category: BillerCategory) -> Self {
        BillerConfig {
            biller_code: code.to_string(),
            biller_name: name.to_string(),
            category,
            service_kind: ServiceKind::BillPayment,
            customer_reference_format: None,
            phone_number_format: None,
            available_amounts: Vec::new(),
            processing_delay_ms: 0,
            error_rate: 0,
            is_active: true,
        }
    }

    /// New telecom-recharge biller with no formats, no delay and no faults.
    pub fn telecom_recharge(code: &str, name: &str) -> Self {
        BillerConfig {
            biller_code: code.to_string(),
            biller_name: name.to_string(),
            category: BillerCategory::Telecom,
            service_kind: ServiceKind::TelecomRecharge,
            customer_reference_format: None,
            phone_number_format: None,
            available_amounts: Vec::new(),
            processing_delay_ms: 0,
            error_rate: 0,
            is_active: true,
        }
    }

    pub fn with_reference_format(mut self, pattern: &str) -> Self {
        self.customer_reference_format = Some(pattern.to_string());
        self
    }

    pub fn with_phone_format(mut self, pattern: &str) -> Self {
        self.phone_number_format = Some(pattern.to_string());
        self
    }

    pub fn with_amounts(mut self, amounts: &[i64]) -> Self {
        self.available_amounts = amounts.iter().map(|a| Decimal::from(*a)).collect();
        self
    }

    pub fn with_delay_ms(mut self, delay: u64) -> Self {
        self.processing_delay_ms = delay;
        self
    }

    pub fn with_error_rate(mut self, rate: u8) -> Self {
        self.error_rate = rate;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}
