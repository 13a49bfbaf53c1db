//! Batch operations: `INQUIRE_MULTIPLE` and `PAY_MULTIPLE`.
//!
//! `INQUIRE_MULTIPLE` runs one real inquiry and pads it into a short bill
//! history. `PAY_MULTIPLE` fans out over the payment instructions one by
//! one; each instruction gets its own session id so it is independently
//! idempotent, and all share one group transaction id. An item's failure
//! never aborts the batch; the summary response reports both counts.

use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::engine::processor::{generate_bill_number, month_label, BillerProcessor};
use crate::types::request::{
    param_value_string, InquireMultipleParams, InquireParams, OperationRequest, PayMultipleParams,
    ServiceRequest, ServiceResponse,
};
use crate::types::status;
use crate::types::error::GatewayError;

/// Runs multi-bill inquiries and grouped payments on top of the processor.
pub struct BatchOrchestrator {
    processor: Arc<BillerProcessor>,
}

impl BatchOrchestrator {
    pub fn new(processor: Arc<BillerProcessor>) -> Self {
        BatchOrchestrator { processor }
    }

    /// `INQUIRE_MULTIPLE`: current bill plus a few synthesized past bills.
    ///
    /// The current bill comes from a real inquiry, so biller resolution,
    /// reference validation and fault injection all apply. Past bills reuse
    /// its identity fields with freshly generated amounts and periods.
    pub async fn inquire_multiple(
        &self,
        request: &ServiceRequest,
        params: &InquireMultipleParams,
    ) -> Result<ServiceResponse, GatewayError> {
        let inquire = InquireParams {
            biller_code: params.biller_code.clone(),
            customer_reference: Some(params.customer_reference.clone()),
            phone_number: None,
        };
        let current = self.processor.inquire(request, &inquire).await?;

        let mut first = current.param_out.unwrap_or_else(|| json!({}));
        let biller_name = first["BillerName"].as_str().unwrap_or("Fournisseur").to_string();
        let customer_name = first["CustomerName"].as_str().unwrap_or("Client").to_string();
        if let Some(bill) = first.as_object_mut() {
            bill.insert("BillType".to_string(), json!("Current"));
            bill.insert("BillIndex".to_string(), json!(1));
        }

        let mut bills = vec![first];
        let past_count = rand::thread_rng().gen_range(1..=3u32);
        for months_back in 1..=past_count {
            bills.push(self.past_bill(params, &biller_name, &customer_name, months_back));
        }

        let count = bills.len();
        Ok(ServiceResponse::ok(
            request,
            format!("Factures trouvées ({count})"),
            json!({
                "BillerCode": params.biller_code,
                "CustomerReference": params.customer_reference,
                "BillCount": count,
                "Bills": bills,
            }),
        ))
    }

    fn past_bill(
        &self,
        params: &InquireMultipleParams,
        biller_name: &str,
        customer_name: &str,
        months_back: u32,
    ) -> Value {
        let mut rng = rand::thread_rng();
        let due_date = Utc::now() + chrono::Duration::days(rng.gen_range(5..30));
        json!({
            "BillerCode": params.biller_code,
            "BillerName": biller_name,
            "CustomerReference": params.customer_reference,
            "CustomerName": customer_name,
            "DueAmount": Decimal::new(rng.gen_range(5_000..=50_000), 2),
            "DueDate": due_date.format("%Y-%m-%d").to_string(),
            "BillPeriod": month_label(months_back),
            "BillNumber": generate_bill_number(months_back),
            "BillType": "Past",
            "BillIndex": months_back + 1,
        })
    }

    /// `PAY_MULTIPLE`: settles each instruction and prepends a summary.
    ///
    /// The returned vector always starts with the summary response; one
    /// detail response per instruction follows, in submission order.
    pub async fn pay_multiple(
        &self,
        request: &ServiceRequest,
        params: &PayMultipleParams,
    ) -> Vec<ServiceResponse> {
        let group_id = Uuid::new_v4().simple().to_string();
        let mut details = Vec::with_capacity(params.payments.len());
        for item in &params.payments {
            details.push(self.pay_one(request, item, &group_id).await);
        }

        let success_count = details
            .iter()
            .filter(|response| response.status_code == status::SUCCESS)
            .count();
        let failed_count = details.len() - success_count;
        let summary_code = if failed_count == 0 {
            status::SUCCESS
        } else {
            status::PARTIAL_SUCCESS
        };
        info!(
            group_transaction_id = %group_id,
            total = details.len(),
            success = success_count,
            failed = failed_count,
            "batch payment settled"
        );

        let detail_views: Vec<Value> = details
            .iter()
            .map(|response| {
                json!({
                    "StatusCode": response.status_code,
                    "StatusLabel": response.status_label,
                    "Details": response.param_out,
                })
            })
            .collect();

        let summary = ServiceResponse {
            session_id: request.session_id.clone(),
            service_id: request.service_id.clone(),
            status_code: summary_code.to_string(),
            status_label: format!(
                "Paiements traités: {success_count} réussis, {failed_count} échoués"
            ),
            param_out: Some(json!({
                "TotalPayments": details.len(),
                "SuccessCount": success_count,
                "FailedCount": failed_count,
                "GlobalTransactionId": group_id,
                "Details": detail_views,
            })),
        };

        let mut responses = Vec::with_capacity(details.len() + 1);
        responses.push(summary);
        responses.extend(details);
        responses
    }

    /// Settles one batch instruction.
    async fn pay_one(
        &self,
        request: &ServiceRequest,
        item: &serde_json::Map<String, Value>,
        group_id: &str,
    ) -> ServiceResponse {
        let field = |key: &str| item.get(key).and_then(param_value_string);

        let Some(biller_code) = field("BillerCode") else {
            return self.rejected_item(request, item, "Missing parameter: BillerCode");
        };
        let Some(amount) = field("Amount") else {
            return self.rejected_item(request, item, "Missing parameter: Amount");
        };
        let phone_number = field("PhoneNumber");
        let customer_reference = field("CustomerReference");
        if phone_number.is_none() && customer_reference.is_none() {
            return self.rejected_item(
                request,
                item,
                "Missing parameter: CustomerReference or PhoneNumber",
            );
        }

        if request.is_demo == 1 {
            return ServiceResponse::ok(
                request,
                "Paiement simulé avec succès",
                json!({
                    "TransactionId": Uuid::new_v4().to_string(),
                    "Payment": item,
                    "Simulated": true,
                    "Message": format!("Simulated payment of {amount} to {biller_code}"),
                }),
            );
        }

        let sub_request = self.sub_request(request, item, &biller_code, &amount, group_id);
        let decoded = match OperationRequest::decode(&sub_request) {
            Ok((_, OperationRequest::Pay(params))) => params,
            Ok(_) | Err(_) => {
                return self.rejected_item(request, item, "Unusable payment instruction")
            }
        };

        match self.processor.pay(&sub_request, &decoded).await {
            Ok(response) => response,
            Err(error) => ServiceResponse::from_error(&sub_request, &error),
        }
    }

    /// Hand-built rejection for an instruction that never reaches the
    /// processor; echoes the instruction so the caller can match it up.
    fn rejected_item(
        &self,
        request: &ServiceRequest,
        item: &serde_json::Map<String, Value>,
        detail: &str,
    ) -> ServiceResponse {
        let base = status::label(status::MISSING_PARAMETER, &request.lang());
        ServiceResponse {
            session_id: request.session_id.clone(),
            service_id: request.service_id.clone(),
            status_code: status::MISSING_PARAMETER.to_string(),
            status_label: format!("{base} - {detail}"),
            param_out: Some(json!({
                "Payment": item,
                "Error": detail,
            })),
        }
    }

    /// Derives the per-instruction request: fresh session id, `PAY`
    /// operation, shared group id, extra instruction fields passed through.
    fn sub_request(
        &self,
        request: &ServiceRequest,
        item: &serde_json::Map<String, Value>,
        biller_code: &str,
        amount: &str,
        group_id: &str,
    ) -> ServiceRequest {
        let mut sub = ServiceRequest::new(&Uuid::new_v4().to_string(), &request.service_id);
        sub.user_name = request.user_name.clone();
        sub.language = request.language.clone();
        sub.channel_id = request.channel_id.clone();
        for (key, value) in item {
            sub.param_in.insert(key.clone(), value.clone());
        }
        sub.param_in
            .insert("Operation".to_string(), json!("PAY"));
        sub.param_in
            .insert("BillerCode".to_string(), json!(biller_code));
        sub.param_in.insert("Amount".to_string(), json!(amount));
        sub.param_in
            .insert("GroupTransactionId".to_string(), json!(group_id));
        sub
    }
}
