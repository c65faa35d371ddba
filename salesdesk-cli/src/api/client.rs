//! Typed client for the scripting backend
//!
//! One async method per action. Transport failures go through the retry
//! policy; envelope failures (`success: false`) are surfaced as errors
//! carrying the backend's message, untouched and unretried.

use std::time::Duration;

use anyhow::{Result, bail};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::models::{
    Action, ActionRequest, ApiResponse, AuthResult, Customer, InitialData, OverdueEntry,
    PaymentCustomer, PaymentForm, Plan, ReportForm,
};
use super::resilience::{ConcurrencyLimiter, ResilienceConfig, RetryPolicy};
use super::transport::{GatewayError, ScriptTransport};

pub struct ScriptClient {
    transport: ScriptTransport,
    retry: RetryPolicy,
    limiter: ConcurrencyLimiter,
}

impl ScriptClient {
    pub fn new(url: impl Into<String>, resilience: &ResilienceConfig, timeout: Duration) -> Result<Self> {
        Ok(Self {
            transport: ScriptTransport::new(url, timeout)?,
            retry: RetryPolicy::new(resilience.retry.clone()),
            limiter: ConcurrencyLimiter::new(resilience.concurrency.clone()),
        })
    }

    pub fn url(&self) -> &str {
        self.transport.url()
    }

    /// Deliver an envelope and return whatever the backend answered,
    /// business failures included. Used directly by the proxy endpoint,
    /// which must pass `success: false` through untouched.
    pub async fn call(&self, request: &ActionRequest) -> Result<ApiResponse, GatewayError> {
        let _permit = self.limiter.acquire().await;
        self.retry
            .run(&request.action, || self.transport.post_action(request))
            .await
    }

    /// Deliver an envelope and unwrap the data payload.
    async fn call_data<T: DeserializeOwned>(&self, request: ActionRequest) -> Result<T> {
        let response = self.call(&request).await?;
        if !response.success {
            bail!(
                "{}",
                response
                    .message
                    .unwrap_or_else(|| "backend reported failure".to_string())
            );
        }
        let data = response.data.unwrap_or(Value::Null);
        Ok(serde_json::from_value(data)?)
    }

    pub async fn authenticate_by_pin(&self, pin: &str) -> Result<AuthResult> {
        self.call_data(Action::authenticate_by_pin(pin)).await
    }

    pub async fn initial_data(
        &self,
        document_id: &str,
        staff_name: Option<&str>,
    ) -> Result<InitialData> {
        self.call_data(Action::get_initial_data(document_id, staff_name))
            .await
    }

    pub async fn customer_list(
        &self,
        document_id: &str,
        staff_name: Option<&str>,
        target_gid: Option<u32>,
    ) -> Result<Vec<Customer>> {
        self.call_data(Action::get_customer_list(document_id, staff_name, target_gid))
            .await
    }

    pub async fn payment_customer_list(&self, document_id: &str) -> Result<Vec<PaymentCustomer>> {
        self.call_data(Action::get_payment_customer_list(document_id))
            .await
    }

    pub async fn overdue_payment_list(&self, document_id: &str) -> Result<Vec<OverdueEntry>> {
        self.call_data(Action::get_overdue_payment_list(document_id))
            .await
    }

    pub async fn submit_report(&self, form: &ReportForm) -> Result<String> {
        let response = self.call(&Action::submit_report(form)).await?;
        ack_message(response)
    }

    pub async fn submit_payment(&self, form: &PaymentForm) -> Result<String> {
        let response = self.call(&Action::submit_payment(form)).await?;
        ack_message(response)
    }

    pub async fn plan_list(&self) -> Result<Vec<Plan>> {
        self.call_data(Action::get_plan_list()).await
    }

    pub async fn payment_methods(&self) -> Result<Vec<String>> {
        self.call_data(Action::get_payment_methods()).await
    }
}

/// Submissions answer with a human-readable ack in `message` or `data`.
fn ack_message(response: ApiResponse) -> Result<String> {
    if !response.success {
        bail!(
            "{}",
            response
                .message
                .unwrap_or_else(|| "backend reported failure".to_string())
        );
    }
    if let Some(message) = response.message {
        return Ok(message);
    }
    match response.data {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Ok(other.to_string()),
        None => Ok("OK".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ack_prefers_message_over_data() {
        let resp = ApiResponse {
            success: true,
            data: Some(Value::String("ignored".into())),
            message: Some("Recorded.".into()),
        };
        assert_eq!(ack_message(resp).unwrap(), "Recorded.");
    }

    #[test]
    fn ack_fails_on_business_failure() {
        let resp = ApiResponse::failure("Payment slots are full.");
        let err = ack_message(resp).unwrap_err();
        assert_eq!(err.to_string(), "Payment slots are full.");
    }
}
