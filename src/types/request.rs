//! Wire envelope types and typed operation parameters.
//!
//! The wire contract uses PascalCase field names (`SessionId`, `ParamIn`,
//! ...). `ParamIn` arrives as an open key-value bag; it is decoded exactly
//! once, at the dispatch boundary, into an [`OperationRequest`] so that
//! required-parameter checks are exhaustive and the rest of the engine works
//! with typed values.

use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::error::GatewayError;
use crate::types::status;

fn default_channel() -> String {
    "API".to_string()
}

/// Inbound request envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceRequest {
    /// Caller-supplied opaque string, doubles as the idempotency key
    pub session_id: String,
    pub service_id: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default = "default_channel")]
    pub channel_id: String,
    /// 1 activates sandbox behavior for batch payments
    #[serde(default)]
    pub is_demo: u8,
    /// Operation-dependent parameter bag
    #[serde(default)]
    pub param_in: HashMap<String, Value>,
}

impl ServiceRequest {
    /// Minimal request for a given session/service pair.
    pub fn new(session_id: &str, service_id: &str) -> Self {
        ServiceRequest {
            session_id: session_id.to_string(),
            service_id: service_id.to_string(),
            user_name: String::new(),
            password: String::new(),
            language: None,
            channel_id: default_channel(),
            is_demo: 0,
            param_in: HashMap::new(),
        }
    }

    /// Resolved response language: the `Language` field, then
    /// `ParamIn["Language"]`, then French. Always lowercase.
    pub fn lang(&self) -> String {
        if let Some(lang) = &self.language {
            if !lang.is_empty() {
                return lang.to_lowercase();
            }
        }
        if let Some(lang) = self.param_string("Language") {
            return lang.to_lowercase();
        }
        "fr".to_string()
    }

    /// Raw parameter lookup.
    pub fn param(&self, key: &str) -> Option<&Value> {
        self.param_in.get(key)
    }

    /// Parameter as a non-empty string.
    ///
    /// Strings are taken as-is, scalars are stringified, `null` and empty
    /// strings count as absent.
    pub fn param_string(&self, key: &str) -> Option<String> {
        param_value_string(self.param_in.get(key)?)
    }
}

/// Stringifies a `ParamIn` value; `None` for null and empty strings.
pub(crate) fn param_value_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Outbound response envelope.
///
/// Every outcome, success or failure, uses this same shape; callers branch
/// on `StatusCode` alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceResponse {
    pub session_id: String,
    pub service_id: String,
    /// Three-digit status code as a string
    pub status_code: String,
    /// Localized human-readable label
    pub status_label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param_out: Option<Value>,
}

impl ServiceResponse {
    /// Successful response echoing the request's identifiers.
    pub fn ok(request: &ServiceRequest, label: impl Into<String>, param_out: Value) -> Self {
        ServiceResponse {
            session_id: request.session_id.clone(),
            service_id: request.service_id.clone(),
            status_code: status::SUCCESS.to_string(),
            status_label: label.into(),
            param_out: Some(param_out),
        }
    }

    /// Error response for a domain error, with a localized label.
    ///
    /// The label is the localized text for the error's status code, suffixed
    /// with the specific detail when the two differ. The detail is also
    /// echoed in `ParamOut.ErrorMessage`.
    pub fn from_error(request: &ServiceRequest, error: &GatewayError) -> Self {
        let code = error.status_code();
        let base = status::label(code, &request.lang());
        let detail = error.to_string();
        let status_label = if detail == base {
            base
        } else {
            format!("{base} - {detail}")
        };

        ServiceResponse {
            session_id: request.session_id.clone(),
            service_id: request.service_id.clone(),
            status_code: code.to_string(),
            status_label,
            param_out: Some(serde_json::json!({ "ErrorMessage": detail })),
        }
    }
}

/// Supported values of `ParamIn["Operation"]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Inquire,
    InquireMultiple,
    Pay,
    PayMultiple,
    Status,
    Cancel,
}

impl Operation {
    /// Payment operations are the ones guarded by the idempotency layers
    /// and followed by history/webhook side channels.
    pub fn is_payment(&self) -> bool {
        matches!(self, Operation::Pay | Operation::PayMultiple)
    }
}

impl FromStr for Operation {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "INQUIRE" => Ok(Operation::Inquire),
            "INQUIRE_MULTIPLE" => Ok(Operation::InquireMultiple),
            "PAY" => Ok(Operation::Pay),
            "PAY_MULTIPLE" => Ok(Operation::PayMultiple),
            "STATUS" => Ok(Operation::Status),
            "CANCEL" => Ok(Operation::Cancel),
            other => Err(GatewayError::unsupported_operation(other)),
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Operation::Inquire => "INQUIRE",
            Operation::InquireMultiple => "INQUIRE_MULTIPLE",
            Operation::Pay => "PAY",
            Operation::PayMultiple => "PAY_MULTIPLE",
            Operation::Status => "STATUS",
            Operation::Cancel => "CANCEL",
        };
        f.write_str(s)
    }
}

/// Parameters for `INQUIRE`.
#[derive(Debug, Clone, PartialEq)]
pub struct InquireParams {
    pub biller_code: String,
    pub customer_reference: Option<String>,
    pub phone_number: Option<String>,
}

/// Parameters for `PAY`.
///
/// The amount stays a raw string here: amount-level validation belongs to
/// the processor, after delay and fault injection, so that an unparsable
/// amount reports `INVALID_AMOUNT` rather than a decode failure.
#[derive(Debug, Clone, PartialEq)]
pub struct PayParams {
    pub biller_code: String,
    pub customer_reference: Option<String>,
    pub phone_number: Option<String>,
    pub amount: Option<String>,
    pub group_transaction_id: Option<String>,
}

/// Parameters for `STATUS` and `CANCEL`.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRef {
    pub transaction_id: String,
}

/// Parameters for `INQUIRE_MULTIPLE`.
#[derive(Debug, Clone, PartialEq)]
pub struct InquireMultipleParams {
    pub biller_code: String,
    pub customer_reference: String,
}

/// Parameters for `PAY_MULTIPLE`: one object per payment instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct PayMultipleParams {
    pub payments: Vec<serde_json::Map<String, Value>>,
}

/// A fully decoded operation request.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationRequest {
    Inquire(InquireParams),
    InquireMultiple(InquireMultipleParams),
    Pay(PayParams),
    PayMultiple(PayMultipleParams),
    Status(TransactionRef),
    Cancel(TransactionRef),
}

impl OperationRequest {
    /// Decodes `ParamIn` into typed parameters.
    ///
    /// Fails with `MISSING_PARAMETER` when `Operation` or a structurally
    /// required parameter is absent, and `INVALID_PARAMETER` for an
    /// unrecognized operation or a malformed batch payload.
    pub fn decode(request: &ServiceRequest) -> Result<(Operation, Self), GatewayError> {
        let raw = request
            .param_string("Operation")
            .ok_or_else(|| GatewayError::missing_parameter("Operation"))?;
        let operation = Operation::from_str(&raw)?;

        let decoded = match operation {
            Operation::Inquire => OperationRequest::Inquire(InquireParams {
                biller_code: required(request, "BillerCode")?,
                customer_reference: request.param_string("CustomerReference"),
                phone_number: request.param_string("PhoneNumber"),
            }),
            Operation::InquireMultiple => OperationRequest::InquireMultiple(InquireMultipleParams {
                biller_code: required(request, "BillerCode")?,
                customer_reference: required(request, "CustomerReference")?,
            }),
            Operation::Pay => OperationRequest::Pay(PayParams {
                biller_code: required(request, "BillerCode")?,
                customer_reference: request.param_string("CustomerReference"),
                phone_number: request.param_string("PhoneNumber"),
                amount: request.param_string("Amount"),
                group_transaction_id: request.param_string("GroupTransactionId"),
            }),
            Operation::PayMultiple => {
                OperationRequest::PayMultiple(decode_payments(request)?)
            }
            Operation::Status => OperationRequest::Status(TransactionRef {
                transaction_id: required(request, "TransactionId")?,
            }),
            Operation::Cancel => OperationRequest::Cancel(TransactionRef {
                transaction_id: required(request, "TransactionId")?,
            }),
        };

        Ok((operation, decoded))
    }
}

fn required(request: &ServiceRequest, key: &str) -> Result<String, GatewayError> {
    request
        .param_string(key)
        .ok_or_else(|| GatewayError::missing_parameter(key))
}

/// Decodes the `Payments` batch payload.
///
/// Accepts either a JSON array or a JSON string encoding one. Anything else,
/// a non-object item, or an empty list fails fast before any sub-payment
/// runs.
fn decode_payments(request: &ServiceRequest) -> Result<PayMultipleParams, GatewayError> {
    let raw = request
        .param("Payments")
        .ok_or_else(|| GatewayError::missing_parameter("Payments"))?;

    let items: Vec<Value> = match raw {
        Value::Array(items) => items.clone(),
        Value::String(encoded) => serde_json::from_str(encoded)
            .map_err(|_| GatewayError::invalid_parameter("Malformed 'Payments' payload"))?,
        _ => {
            return Err(GatewayError::invalid_parameter(
                "'Payments' must be a list of payment instructions",
            ))
        }
    };

    let mut payments = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::Object(map) => payments.push(map),
            _ => {
                return Err(GatewayError::invalid_parameter(
                    "Each payment instruction must be an object",
                ))
            }
        }
    }

    if payments.is_empty() {
        return Err(GatewayError::invalid_parameter("No payments specified"));
    }

    Ok(PayMultipleParams { payments })
}
