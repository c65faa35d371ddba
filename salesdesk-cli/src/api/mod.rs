//! Script-backend API
//!
//! The wire protocol spoken between the front end, the gateway, and the
//! spreadsheet scripting backend: the action envelope, a transport that
//! survives the backend's unreliable redirect behavior, and a typed client
//! with retry and concurrency hardening.

pub mod client;
pub mod models;
pub mod resilience;
pub mod transport;

pub use client::ScriptClient;
pub use models::{
    Action, ActionRequest, ApiResponse, AuthResult, Customer, Health, InitialData, OverdueEntry,
    PaymentCustomer, PaymentForm, Plan, ReportForm,
};
pub use resilience::{ConcurrencyLimiter, ResilienceConfig, RetryConfig, RetryPolicy};
pub use transport::{GatewayError, ScriptTransport};
