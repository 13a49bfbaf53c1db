//! Biller-aware processing of `INQUIRE` and `PAY`.
//!
//! Behavior is driven entirely by the resolved [`BillerConfig`]: which
//! identifier gets validated, how long the simulated settlement takes and
//! how often it fails. `pay` carries the domain-level idempotency check:
//! a session id that already has a transaction is replayed from the stored
//! response instead of re-executing, and the store's atomic insert closes
//! the race between concurrent first submissions.

use std::sync::Arc;

use chrono::{Months, Utc};
use rand::Rng;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::time::{sleep, Duration};
use tracing::{info, warn};
use uuid::Uuid;

use crate::catalog::BillerCatalog;
use crate::store::{InsertOutcome, TransactionStore};
use crate::types::biller::{BillerConfig, ServiceKind};
use crate::types::error::{GatewayError, SimulatedFault};
use crate::types::request::{InquireParams, PayParams, ServiceRequest, ServiceResponse};
use crate::types::status;
use crate::types::transaction::{
    format_timestamp, Transaction, TransactionEvent, TransactionStatus,
};

/// Result payload of a bill inquiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BillInquiry {
    pub biller_code: String,
    pub biller_name: String,
    pub customer_reference: String,
    pub customer_name: String,
    pub due_amount: Decimal,
    pub due_date: String,
    pub bill_period: String,
    pub bill_number: String,
}

/// Result payload of a recharge inquiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RechargeInquiry {
    pub biller_code: String,
    pub biller_name: String,
    pub phone_number: String,
    pub available_amounts: Vec<Decimal>,
    pub min_amount: Decimal,
    pub max_amount: Decimal,
}

/// Receipt returned for a settled bill payment.
///
/// The replay rebuild path produces this same struct from the persisted
/// transaction, so `ParamOut` stays byte-identical whether the stored
/// response or the reconstruction is served.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BillPaymentReceipt {
    pub transaction_id: String,
    pub receipt_number: Option<String>,
    pub customer_reference: String,
    pub biller_code: String,
    pub biller_name: String,
    pub amount: Decimal,
    pub payment_date: String,
    pub status: TransactionStatus,
}

impl BillPaymentReceipt {
    fn from_transaction(tx: &Transaction) -> Self {
        BillPaymentReceipt {
            transaction_id: tx.transaction_id.clone(),
            receipt_number: tx.receipt_number.clone(),
            customer_reference: tx.customer_reference.clone().unwrap_or_default(),
            biller_code: tx.biller_code.clone(),
            biller_name: tx.biller_name.clone(),
            amount: tx.amount,
            payment_date: format_timestamp(&tx.completed_at.unwrap_or(tx.created_at)),
            status: tx.status,
        }
    }
}

/// Receipt returned for a settled telecom recharge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RechargeReceipt {
    pub transaction_id: String,
    pub receipt_number: Option<String>,
    pub phone_number: String,
    pub biller_code: String,
    pub biller_name: String,
    pub amount: Decimal,
    pub recharge_date: String,
    pub status: TransactionStatus,
}

impl RechargeReceipt {
    fn from_transaction(tx: &Transaction) -> Self {
        RechargeReceipt {
            transaction_id: tx.transaction_id.clone(),
            receipt_number: tx.receipt_number.clone(),
            phone_number: tx.phone_number.clone().unwrap_or_default(),
            biller_code: tx.biller_code.clone(),
            biller_name: tx.biller_name.clone(),
            amount: tx.amount,
            recharge_date: format_timestamp(&tx.completed_at.unwrap_or(tx.created_at)),
            status: tx.status,
        }
    }
}

/// Executes inquiries and payments against resolved biller configuration.
pub struct BillerProcessor {
    catalog: Arc<dyn BillerCatalog>,
    store: Arc<dyn TransactionStore>,
}

impl BillerProcessor {
    pub fn new(catalog: Arc<dyn BillerCatalog>, store: Arc<dyn TransactionStore>) -> Self {
        BillerProcessor { catalog, store }
    }

    /// Checks bill or service availability for a customer.
    pub async fn inquire(
        &self,
        request: &ServiceRequest,
        params: &InquireParams,
    ) -> Result<ServiceResponse, GatewayError> {
        let biller = self.resolve(&params.biller_code).await?;
        self.simulate(&biller).await?;

        match biller.service_kind {
            ServiceKind::BillPayment => self.inquire_bill(request, params, &biller),
            ServiceKind::TelecomRecharge => self.inquire_recharge(request, params, &biller),
        }
    }

    /// Settles a bill payment or recharge, idempotently per session id.
    pub async fn pay(
        &self,
        request: &ServiceRequest,
        params: &PayParams,
    ) -> Result<ServiceResponse, GatewayError> {
        let biller = self.resolve(&params.biller_code).await?;

        if let Some(existing) = self.store.get_by_session_id(&request.session_id).await {
            info!(
                session_id = %request.session_id,
                "duplicate payment session, replaying stored response"
            );
            return self.replay(&existing, request);
        }

        self.simulate(&biller).await?;

        // All validation happens here, before any write.
        let transaction = match biller.service_kind {
            ServiceKind::BillPayment => self.validated_bill_payment(request, params, &biller)?,
            ServiceKind::TelecomRecharge => self.validated_recharge(request, params, &biller)?,
        };

        match self.store.create(transaction.clone()).await? {
            InsertOutcome::Duplicate(existing) => {
                // Lost the race against a concurrent identical submission.
                info!(
                    session_id = %request.session_id,
                    "concurrent duplicate payment session, replaying winner"
                );
                return self.replay(&existing, request);
            }
            InsertOutcome::Created => {}
        }

        let (action, subject) = match biller.service_kind {
            ServiceKind::BillPayment => (
                "PAYMENT",
                transaction.customer_reference.clone().unwrap_or_default(),
            ),
            ServiceKind::TelecomRecharge => (
                "RECHARGE",
                transaction.phone_number.clone().unwrap_or_default(),
            ),
        };
        self.store
            .append_event(TransactionEvent {
                transaction_id: transaction.transaction_id.clone(),
                action: action.to_string(),
                details: format!(
                    "{action} {} for {subject} amount {}",
                    biller.biller_code, transaction.amount
                ),
                previous_status: None,
                new_status: TransactionStatus::Completed,
                timestamp: Utc::now(),
            })
            .await;

        let response = self.receipt_response(request, &transaction, &biller)?;
        self.store
            .store_response(&request.session_id, serde_json::to_string(&response)?)
            .await?;

        info!(
            biller_code = %biller.biller_code,
            transaction_id = %transaction.transaction_id,
            amount = %transaction.amount,
            "payment settled"
        );
        Ok(response)
    }

    async fn resolve(&self, biller_code: &str) -> Result<BillerConfig, GatewayError> {
        match self.catalog.get(biller_code).await {
            Some(biller) if biller.is_active => Ok(biller),
            _ => Err(GatewayError::biller_not_found(biller_code)),
        }
    }

    /// Cooperative delay plus probabilistic fault injection.
    async fn simulate(&self, biller: &BillerConfig) -> Result<(), GatewayError> {
        if biller.processing_delay_ms > 0 {
            sleep(Duration::from_millis(biller.processing_delay_ms)).await;
        }
        if biller.error_rate > 0 && rand::thread_rng().gen_range(1..=100u8) <= biller.error_rate {
            let fault = random_fault();
            warn!(biller_code = %biller.biller_code, %fault, "injected simulated fault");
            return Err(fault.into());
        }
        Ok(())
    }

    fn inquire_bill(
        &self,
        request: &ServiceRequest,
        params: &InquireParams,
        biller: &BillerConfig,
    ) -> Result<ServiceResponse, GatewayError> {
        let reference = params
            .customer_reference
            .as_deref()
            .ok_or_else(|| GatewayError::missing_parameter("CustomerReference"))?;
        check_format(
            biller.customer_reference_format.as_deref(),
            reference,
            GatewayError::InvalidReference,
        )?;

        let mut rng = rand::thread_rng();
        let due_date = Utc::now() + chrono::Duration::days(rng.gen_range(5..30));
        let inquiry = BillInquiry {
            biller_code: biller.biller_code.clone(),
            biller_name: biller.biller_name.clone(),
            customer_reference: reference.to_string(),
            customer_name: random_customer_name(),
            due_amount: Decimal::new(rng.gen_range(5_000..=50_000), 2),
            due_date: due_date.format("%Y-%m-%d").to_string(),
            bill_period: format!("{} - {}", month_label(1), month_label(0)),
            bill_number: generate_bill_number(0),
        };

        Ok(ServiceResponse::ok(
            request,
            "Facture trouvée",
            serde_json::to_value(inquiry)?,
        ))
    }

    fn inquire_recharge(
        &self,
        request: &ServiceRequest,
        params: &InquireParams,
        biller: &BillerConfig,
    ) -> Result<ServiceResponse, GatewayError> {
        let phone = params
            .phone_number
            .as_deref()
            .ok_or_else(|| GatewayError::missing_parameter("PhoneNumber"))?;
        check_format(
            biller.phone_number_format.as_deref(),
            phone,
            GatewayError::InvalidPhone,
        )?;

        let amounts = &biller.available_amounts;
        let inquiry = RechargeInquiry {
            biller_code: biller.biller_code.clone(),
            biller_name: biller.biller_name.clone(),
            phone_number: phone.to_string(),
            available_amounts: amounts.clone(),
            min_amount: amounts.iter().min().copied().unwrap_or(Decimal::ZERO),
            max_amount: amounts.iter().max().copied().unwrap_or(Decimal::ZERO),
        };

        Ok(ServiceResponse::ok(
            request,
            "Numéro validé",
            serde_json::to_value(inquiry)?,
        ))
    }

    fn validated_bill_payment(
        &self,
        request: &ServiceRequest,
        params: &PayParams,
        biller: &BillerConfig,
    ) -> Result<Transaction, GatewayError> {
        let reference = params
            .customer_reference
            .clone()
            .ok_or_else(|| GatewayError::missing_parameter("CustomerReference"))?;
        let amount = parse_amount(params.amount.as_deref())?;
        check_format(
            biller.customer_reference_format.as_deref(),
            &reference,
            GatewayError::InvalidReference,
        )?;

        self.new_transaction(request, params, biller, Some(reference), None, amount)
    }

    fn validated_recharge(
        &self,
        request: &ServiceRequest,
        params: &PayParams,
        biller: &BillerConfig,
    ) -> Result<Transaction, GatewayError> {
        let phone = params
            .phone_number
            .clone()
            .ok_or_else(|| GatewayError::missing_parameter("PhoneNumber"))?;
        let amount = parse_amount(params.amount.as_deref())?;
        check_format(
            biller.phone_number_format.as_deref(),
            &phone,
            GatewayError::InvalidPhone,
        )?;

        if !biller.available_amounts.is_empty() && !biller.available_amounts.contains(&amount) {
            let allowed = biller
                .available_amounts
                .iter()
                .map(|a| a.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(GatewayError::invalid_amount(format!(
                "Amount not in the allowed set: {allowed}"
            )));
        }

        self.new_transaction(request, params, biller, None, Some(phone), amount)
    }

    fn new_transaction(
        &self,
        request: &ServiceRequest,
        params: &PayParams,
        biller: &BillerConfig,
        customer_reference: Option<String>,
        phone_number: Option<String>,
        amount: Decimal,
    ) -> Result<Transaction, GatewayError> {
        let now = Utc::now();
        Ok(Transaction {
            transaction_id: Uuid::new_v4().simple().to_string(),
            biller_code: biller.biller_code.clone(),
            biller_name: biller.biller_name.clone(),
            customer_reference,
            phone_number,
            amount,
            status: TransactionStatus::Completed,
            session_id: request.session_id.clone(),
            service_id: request.service_id.clone(),
            channel_id: request.channel_id.clone(),
            group_transaction_id: params.group_transaction_id.clone(),
            receipt_number: Some(generate_receipt_number()),
            failure_reason: None,
            created_at: now,
            completed_at: Some(now),
            cancelled_at: None,
            raw_request: Some(serde_json::to_string(request)?),
            raw_response: None,
        })
    }

    fn receipt_response(
        &self,
        request: &ServiceRequest,
        transaction: &Transaction,
        biller: &BillerConfig,
    ) -> Result<ServiceResponse, GatewayError> {
        let (label, param_out) = match biller.service_kind {
            ServiceKind::BillPayment => (
                format!("Paiement {} effectué avec succès", biller.biller_name),
                serde_json::to_value(BillPaymentReceipt::from_transaction(transaction))?,
            ),
            ServiceKind::TelecomRecharge => (
                format!("Recharge {} effectuée avec succès", biller.biller_name),
                serde_json::to_value(RechargeReceipt::from_transaction(transaction))?,
            ),
        };
        Ok(ServiceResponse::ok(request, label, param_out))
    }

    /// Reconstructs the response for a replayed session.
    ///
    /// Prefers the stored raw response with the identifiers rewritten; falls
    /// back to rebuilding the receipt from the row when the stored response
    /// is absent or unreadable (a race loser can observe the winner's row
    /// before its response write lands).
    fn replay(
        &self,
        existing: &Transaction,
        request: &ServiceRequest,
    ) -> Result<ServiceResponse, GatewayError> {
        if let Some(raw) = &existing.raw_response {
            match serde_json::from_str::<ServiceResponse>(raw) {
                Ok(mut stored) => {
                    stored.session_id = request.session_id.clone();
                    stored.service_id = request.service_id.clone();
                    return Ok(stored);
                }
                Err(error) => {
                    warn!(
                        transaction_id = %existing.transaction_id,
                        %error,
                        "stored response unreadable, rebuilding from the transaction"
                    );
                }
            }
        }

        let param_out = if existing.phone_number.is_some() {
            serde_json::to_value(RechargeReceipt::from_transaction(existing))?
        } else {
            serde_json::to_value(BillPaymentReceipt::from_transaction(existing))?
        };

        Ok(ServiceResponse {
            session_id: request.session_id.clone(),
            service_id: request.service_id.clone(),
            status_code: status::SUCCESS.to_string(),
            status_label: "Transaction déjà traitée".to_string(),
            param_out: Some(param_out),
        })
    }
}

fn parse_amount(raw: Option<&str>) -> Result<Decimal, GatewayError> {
    raw.and_then(|value| value.parse::<Decimal>().ok())
        .ok_or_else(|| GatewayError::invalid_amount("Invalid or missing amount"))
}

fn check_format(
    pattern: Option<&str>,
    value: &str,
    mismatch: GatewayError,
) -> Result<(), GatewayError> {
    let Some(pattern) = pattern else {
        return Ok(());
    };
    let regex = Regex::new(pattern).map_err(|error| GatewayError::Configuration {
        message: format!("unusable format pattern {pattern}: {error}"),
    })?;
    if regex.is_match(value) {
        Ok(())
    } else {
        Err(mismatch)
    }
}

fn random_fault() -> SimulatedFault {
    match rand::thread_rng().gen_range(0..5u8) {
        0 => SimulatedFault::ServiceUnavailable,
        1 => SimulatedFault::Timeout,
        2 => SimulatedFault::ExternalService,
        3 => SimulatedFault::Database,
        _ => SimulatedFault::System,
    }
}

/// `REC{yyyyMMdd}{6 random digits}`
fn generate_receipt_number() -> String {
    format!(
        "REC{}{}",
        Utc::now().format("%Y%m%d"),
        rand::thread_rng().gen_range(100_000..1_000_000)
    )
}

/// `INV{yyyyMM}{5 random digits}`, dated `months_back` months ago.
pub(crate) fn generate_bill_number(months_back: u32) -> String {
    let period = Utc::now()
        .checked_sub_months(Months::new(months_back))
        .unwrap_or_else(Utc::now);
    format!(
        "INV{}{}",
        period.format("%Y%m"),
        rand::thread_rng().gen_range(10_000..100_000)
    )
}

/// Month label like `Jan 2026`, `months_back` months ago.
pub(crate) fn month_label(months_back: u32) -> String {
    Utc::now()
        .checked_sub_months(Months::new(months_back))
        .unwrap_or_else(Utc::now)
        .format("%b %Y")
        .to_string()
}

pub(crate) fn random_customer_name() -> String {
    const FIRST: [&str; 10] = [
        "Mohamed", "Ahmed", "Ali", "Omar", "Mahmoud", "Khaled", "Yousef", "Ibrahim", "Hassan",
        "Mostafa",
    ];
    const LAST: [&str; 10] = [
        "Ibrahim", "Ahmed", "Mohamed", "Ali", "Hussein", "Hassan", "Nasser", "Saad", "Sayed",
        "Mahmoud",
    ];
    let mut rng = rand::thread_rng();
    format!(
        "{} {}",
        FIRST[rng.gen_range(0..FIRST.len())],
        LAST[rng.gen_range(0..LAST.len())]
    )
}
