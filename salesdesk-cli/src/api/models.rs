//! Wire types for the action protocol
//!
//! Requests are `{ "action": <name>, "params": { ... } }`; responses are
//! `{ "success": true, "data": ... }` or `{ "success": false, "message": ... }`.
//! Field names are camelCase on the wire. The same types serve the client,
//! the gateway server, and the local engine.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Action names as they appear on the wire.
pub mod actions {
    pub const AUTHENTICATE_BY_PIN: &str = "authenticateByPin";
    pub const GET_INITIAL_DATA: &str = "getInitialData";
    pub const GET_CUSTOMER_LIST: &str = "getCustomerList";
    pub const GET_PAYMENT_CUSTOMER_LIST: &str = "getPaymentCustomerList";
    pub const GET_OVERDUE_PAYMENT_LIST: &str = "getOverduePaymentList";
    pub const SUBMIT_REPORT: &str = "submitReport";
    pub const SUBMIT_PAYMENT: &str = "submitPayment";
    pub const GET_PLAN_LIST: &str = "getPlanList";
    pub const GET_PAYMENT_METHODS: &str = "getPaymentMethods";
}

/// Raw request envelope. The engine dispatches on the action name and
/// decodes `params` per action, so unknown actions can be answered with a
/// proper failure envelope instead of a deserialization error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRequest {
    pub action: String,
    #[serde(default)]
    pub params: Value,
}

impl ActionRequest {
    pub fn new(action: &str, params: Value) -> Self {
        Self {
            action: action.to_string(),
            params,
        }
    }
}

/// Typed request builders, one per operation.
pub struct Action;

impl Action {
    pub fn authenticate_by_pin(pin: &str) -> ActionRequest {
        ActionRequest::new(actions::AUTHENTICATE_BY_PIN, json!({ "pin": pin }))
    }

    pub fn get_initial_data(document_id: &str, staff_name: Option<&str>) -> ActionRequest {
        ActionRequest::new(
            actions::GET_INITIAL_DATA,
            json!({ "documentId": document_id, "staffName": staff_name }),
        )
    }

    pub fn get_customer_list(
        document_id: &str,
        staff_name: Option<&str>,
        target_gid: Option<u32>,
    ) -> ActionRequest {
        ActionRequest::new(
            actions::GET_CUSTOMER_LIST,
            json!({
                "documentId": document_id,
                "staffName": staff_name,
                "targetGid": target_gid,
            }),
        )
    }

    pub fn get_payment_customer_list(document_id: &str) -> ActionRequest {
        ActionRequest::new(
            actions::GET_PAYMENT_CUSTOMER_LIST,
            json!({ "documentId": document_id }),
        )
    }

    pub fn get_overdue_payment_list(document_id: &str) -> ActionRequest {
        ActionRequest::new(
            actions::GET_OVERDUE_PAYMENT_LIST,
            json!({ "documentId": document_id }),
        )
    }

    pub fn submit_report(form: &ReportForm) -> ActionRequest {
        ActionRequest::new(
            actions::SUBMIT_REPORT,
            serde_json::to_value(form).unwrap_or(Value::Null),
        )
    }

    pub fn submit_payment(form: &PaymentForm) -> ActionRequest {
        ActionRequest::new(
            actions::SUBMIT_PAYMENT,
            serde_json::to_value(form).unwrap_or(Value::Null),
        )
    }

    pub fn get_plan_list() -> ActionRequest {
        ActionRequest::new(actions::GET_PLAN_LIST, json!({}))
    }

    pub fn get_payment_methods() -> ActionRequest {
        ActionRequest::new(actions::GET_PAYMENT_METHODS, json!({}))
    }
}

/// Response envelope. Business failures (bad PIN, full payment slots)
/// travel here with `success: false`; only transport problems surface as
/// errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ApiResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }
}

/// Health probe body for GET on the endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    pub version: String,
}

impl Health {
    pub fn active(version: &str) -> Self {
        Self {
            status: "active".to_string(),
            version: version.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthResult {
    pub staff_name: String,
    pub document_id: String,
}

/// One reconciled customer row. `link` locates the source row as
/// `sheets://<document>/<gid>?row=<n>` (1-based).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub link: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCustomer {
    pub id: String,
    pub customer_name: String,
    pub link: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OverdueEntry {
    pub id: String,
    pub customer_name: String,
    /// `yyyy/MM/dd` in the business timezone, `----/--/--` when unknown.
    pub contract_date: String,
    pub overdue_days: i64,
    pub unpaid_amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: String,
    pub name: String,
    pub price_general: f64,
    pub price_bank: f64,
    pub is_installment: bool,
}

/// Contract report submission. Upserted into the payment ledger by
/// interview id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportForm {
    pub document_id: String,
    pub interview_id: String,
    pub contract_name: String,
    #[serde(default)]
    pub onboarding: bool,
    pub payment_method: String,
    pub contract_date: String,
    pub sales_amount: f64,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Payment report submission. Appended into the customer's next free
/// payment slot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentForm {
    pub document_id: String,
    pub customer_id: String,
    pub payment_date: String,
    pub payment_amount: f64,
    pub payment_method: String,
}

/// Aggregate payload the front end loads right after authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialData {
    pub plan_list: Vec<Plan>,
    pub customer_list: Vec<Customer>,
    pub payment_customer_list: Vec<PaymentCustomer>,
    pub payment_methods: Vec<String>,
    /// Same list under the key the payment form binds to.
    pub payment_methods_h: Vec<String>,
    pub system_version: String,
}

/// Common list-call parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub document_id: String,
    #[serde(default)]
    pub staff_name: Option<String>,
    #[serde(default)]
    pub target_gid: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthParams {
    pub pin: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_envelope_round_trips() {
        let req = Action::get_customer_list("doc-1", Some("North"), Some(4));
        let wire = serde_json::to_string(&req).unwrap();
        assert!(wire.contains("\"action\":\"getCustomerList\""));
        assert!(wire.contains("\"documentId\":\"doc-1\""));

        let back: ActionRequest = serde_json::from_str(&wire).unwrap();
        let params: ListParams = serde_json::from_value(back.params).unwrap();
        assert_eq!(params.staff_name.as_deref(), Some("North"));
        assert_eq!(params.target_gid, Some(4));
    }

    #[test]
    fn params_default_when_missing() {
        let back: ActionRequest = serde_json::from_str(r#"{"action":"getPlanList"}"#).unwrap();
        assert_eq!(back.action, "getPlanList");
        assert!(back.params.is_null());
    }

    #[test]
    fn response_envelope_shapes() {
        let ok = serde_json::to_value(ApiResponse::ok(serde_json::json!([1, 2]))).unwrap();
        assert_eq!(ok["success"], true);
        assert!(ok.get("message").is_none());

        let err: ApiResponse =
            serde_json::from_str(r#"{"success":false,"message":"PIN mismatch"}"#).unwrap();
        assert!(!err.success);
        assert_eq!(err.message.as_deref(), Some("PIN mismatch"));
    }

    #[test]
    fn forms_use_camel_case_on_the_wire() {
        let form = ReportForm {
            document_id: "doc-1".into(),
            interview_id: "A-9".into(),
            contract_name: "North Trading".into(),
            onboarding: true,
            payment_method: "Bank transfer".into(),
            contract_date: "2026/01/15".into(),
            sales_amount: 450_000.0,
            notes: None,
        };
        let wire = serde_json::to_value(&form).unwrap();
        assert!(wire.get("interviewId").is_some());
        assert!(wire.get("salesAmount").is_some());
    }
}
