//! The data-access engine
//!
//! Implements every wire action against the document store: PIN auth,
//! list reconciliation with caching, master data, and the idempotent
//! ledger writes. This is the local counterpart of the remote scripting
//! backend, and the gateway can serve from either.

pub mod auth;
pub mod cache;
pub mod customers;
pub mod masters;
pub mod overdue;
pub mod schema;
pub mod submit;

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use chrono_tz::Tz;
use log::{info, warn};
use serde::Serialize;

use crate::api::models::{
    ActionRequest, ApiResponse, AuthResult, Customer, InitialData, ListParams, OverdueEntry,
    PaymentCustomer, PaymentForm, Plan, ReportForm, actions,
};
use crate::sheets::resolve::find_sheet_index;
use crate::sheets::store::DocumentStore;

pub use cache::ListCache;
pub use schema::SheetSchema;

/// Default TTL for reconciled lists: 6 hours.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(21_600);

pub struct Engine<S> {
    store: S,
    cache: Option<ListCache>,
    schema: SheetSchema,
    data_master_id: String,
    auth_master_id: String,
    tz: Tz,
    cache_ttl: Duration,
    version: String,
}

impl<S: DocumentStore> Engine<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            cache: None,
            schema: SheetSchema::default(),
            data_master_id: "master".to_string(),
            auth_master_id: "master".to_string(),
            tz: chrono_tz::Asia::Tokyo,
            cache_ttl: DEFAULT_CACHE_TTL,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn with_cache(mut self, cache: ListCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_schema(mut self, schema: SheetSchema) -> Self {
        self.schema = schema;
        self
    }

    /// The data master holds plans and dropdowns; the auth master holds
    /// the staff directory. They are usually the same document.
    pub fn with_masters(mut self, data_master_id: &str, auth_master_id: &str) -> Self {
        self.data_master_id = data_master_id.to_string();
        self.auth_master_id = auth_master_id.to_string();
        self
    }

    pub fn with_timezone(mut self, tz: Tz) -> Self {
        self.tz = tz;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Answer one wire request. Failures of any kind come back as a
    /// failure envelope; the dispatch surface never errors.
    pub async fn dispatch(&self, request: ActionRequest) -> ApiResponse {
        let action = request.action.clone();
        match self.dispatch_inner(request).await {
            Ok(response) => response,
            Err(err) => {
                warn!("action {action} failed: {err:#}");
                ApiResponse::failure(format!("Backend error: {err}"))
            }
        }
    }

    async fn dispatch_inner(&self, request: ActionRequest) -> Result<ApiResponse> {
        match request.action.as_str() {
            actions::AUTHENTICATE_BY_PIN => {
                let params: crate::api::models::AuthParams =
                    serde_json::from_value(request.params)?;
                Ok(match self.authenticate_by_pin(&params.pin).await? {
                    Some(auth) => ok_json(&auth)?,
                    None => ApiResponse::failure("PIN mismatch"),
                })
            }
            actions::GET_INITIAL_DATA => {
                let params: ListParams = serde_json::from_value(request.params)?;
                let data = self
                    .initial_data(&params.document_id, params.staff_name.as_deref())
                    .await?;
                ok_json(&data)
            }
            actions::GET_CUSTOMER_LIST => {
                let params: ListParams = serde_json::from_value(request.params)?;
                let list = self
                    .customer_list(
                        &params.document_id,
                        params.staff_name.as_deref(),
                        params.target_gid,
                    )
                    .await?;
                ok_json(&list)
            }
            actions::GET_PAYMENT_CUSTOMER_LIST => {
                let params: ListParams = serde_json::from_value(request.params)?;
                let list = self.payment_customer_list(&params.document_id).await?;
                ok_json(&list)
            }
            actions::GET_OVERDUE_PAYMENT_LIST => {
                let params: ListParams = serde_json::from_value(request.params)?;
                let list = self.overdue_list(&params.document_id).await?;
                ok_json(&list)
            }
            actions::SUBMIT_REPORT => {
                let form: ReportForm = serde_json::from_value(request.params)?;
                match self.submit_report(&form).await {
                    Ok(message) => Ok(ApiResponse {
                        success: true,
                        data: None,
                        message: Some(message),
                    }),
                    Err(err) => Ok(ApiResponse::failure(err.to_string())),
                }
            }
            actions::SUBMIT_PAYMENT => {
                let form: PaymentForm = serde_json::from_value(request.params)?;
                match self.submit_payment(&form).await {
                    Ok(message) => Ok(ApiResponse {
                        success: true,
                        data: None,
                        message: Some(message),
                    }),
                    Err(err) => Ok(ApiResponse::failure(err.to_string())),
                }
            }
            actions::GET_PLAN_LIST => ok_json(&self.plan_list().await?),
            actions::GET_PAYMENT_METHODS => ok_json(&self.payment_methods().await?),
            other => Ok(ApiResponse::failure(format!("Invalid action: {other}"))),
        }
    }

    pub async fn authenticate_by_pin(&self, pin: &str) -> Result<Option<AuthResult>> {
        let workbook = self.store.load(&self.auth_master_id).await?;
        Ok(auth::authenticate(&workbook, &self.schema, pin))
    }

    async fn staff_for_document(&self, document_id: &str) -> Option<String> {
        let workbook = match self.store.load(&self.auth_master_id).await {
            Ok(wb) => wb,
            Err(err) => {
                warn!("staff lookup failed to load auth master: {err:#}");
                return None;
            }
        };
        auth::staff_for_document(&workbook, &self.schema, document_id)
    }

    pub async fn customer_list(
        &self,
        document_id: &str,
        staff_name: Option<&str>,
        target_gid: Option<u32>,
    ) -> Result<Vec<Customer>> {
        let staff = match staff_name {
            Some(name) if !name.trim().is_empty() => Some(name.trim().to_string()),
            _ => self.staff_for_document(document_id).await,
        };
        let key = cache::customer_list_key(document_id, staff.as_deref());

        // A gid-targeted call is a different view; it bypasses the
        // shared cache entirely.
        if target_gid.is_none() {
            if let Some(payload) = self.cache_get(&key).await {
                match serde_json::from_str(&payload) {
                    Ok(list) => return Ok(list),
                    Err(err) => warn!("discarding undecodable cache entry {key}: {err}"),
                }
            }
        }

        let workbook = self.store.load(document_id).await?;
        let list = customers::reconcile_customers(&workbook, &self.schema, document_id, target_gid);

        if target_gid.is_none() {
            self.cache_put(&key, &list).await;
        }
        Ok(list)
    }

    pub async fn payment_customer_list(&self, document_id: &str) -> Result<Vec<PaymentCustomer>> {
        let workbook = self.store.load(document_id).await?;
        Ok(customers::reconcile_payment_customers(
            &workbook,
            &self.schema,
            document_id,
        ))
    }

    pub async fn overdue_list(&self, document_id: &str) -> Result<Vec<OverdueEntry>> {
        let statuses: HashMap<String, String> = self
            .customer_list(document_id, None, None)
            .await
            .unwrap_or_else(|err| {
                warn!("overdue: customer statuses unavailable: {err:#}");
                Vec::new()
            })
            .into_iter()
            .map(|c| (c.id, c.status))
            .collect();

        let workbook = self.store.load(document_id).await?;
        Ok(overdue::overdue_entries(
            &workbook,
            &self.schema,
            &statuses,
            Utc::now(),
            self.tz,
        ))
    }

    pub async fn plan_list(&self) -> Result<Vec<Plan>> {
        let workbook = self.store.load(&self.data_master_id).await?;
        Ok(masters::plan_list(&workbook, &self.schema))
    }

    pub async fn payment_methods(&self) -> Result<Vec<String>> {
        let workbook = self.store.load(&self.data_master_id).await?;
        Ok(masters::payment_methods(&workbook, &self.schema))
    }

    pub async fn initial_data(
        &self,
        document_id: &str,
        staff_name: Option<&str>,
    ) -> Result<InitialData> {
        let master = self.store.load(&self.data_master_id).await?;
        let plan_list = masters::plan_list(&master, &self.schema);
        let payment_methods = masters::payment_methods(&master, &self.schema);

        let customer_list = self.customer_list(document_id, staff_name, None).await?;
        let payment_customer_list = self.payment_customer_list(document_id).await?;

        Ok(InitialData {
            plan_list,
            customer_list,
            payment_customer_list,
            payment_methods_h: payment_methods.clone(),
            payment_methods,
            system_version: self.version.clone(),
        })
    }

    pub async fn submit_report(&self, form: &ReportForm) -> Result<String> {
        let mut workbook = self.store.load(&form.document_id).await?;
        let idx = find_sheet_index(&workbook, &self.schema.payment_sheet)
            .context("Payment ledger sheet not found")?;

        let row = submit::upsert_report(&mut workbook.sheets[idx], form);
        self.store.save(&form.document_id, &workbook).await?;
        self.cache_invalidate(&form.document_id).await;
        info!(
            "report for {} upserted into {} row {}",
            form.interview_id,
            form.document_id,
            row + 1
        );
        Ok("Contract report recorded.".to_string())
    }

    pub async fn submit_payment(&self, form: &PaymentForm) -> Result<String> {
        let mut workbook = self.store.load(&form.document_id).await?;
        let idx = find_sheet_index(&workbook, &self.schema.payment_sheet)
            .context("Payment ledger sheet not found")?;

        let (row, slot) = submit::append_payment(&mut workbook.sheets[idx], form)
            .map_err(|err| anyhow::anyhow!("{err}"))?;
        self.store.save(&form.document_id, &workbook).await?;
        self.cache_invalidate(&form.document_id).await;
        info!(
            "payment for {} recorded in {} row {} slot {}",
            form.customer_id,
            form.document_id,
            row + 1,
            slot + 1
        );
        Ok("Payment recorded.".to_string())
    }

    async fn cache_get(&self, key: &str) -> Option<String> {
        let cache = self.cache.as_ref()?;
        match cache.get(key).await {
            Ok(hit) => hit,
            Err(err) => {
                warn!("cache read failed for {key}: {err:#}");
                None
            }
        }
    }

    async fn cache_put<T: Serialize>(&self, key: &str, value: &T) {
        let Some(cache) = self.cache.as_ref() else {
            return;
        };
        let payload = match serde_json::to_string(value) {
            Ok(p) => p,
            Err(err) => {
                warn!("cache serialize failed for {key}: {err}");
                return;
            }
        };
        if let Err(err) = cache.put(key, &payload, self.cache_ttl).await {
            warn!("cache write failed for {key}: {err:#}");
        }
    }

    async fn cache_invalidate(&self, document_id: &str) {
        let Some(cache) = self.cache.as_ref() else {
            return;
        };
        if let Err(err) = cache.invalidate_document(document_id).await {
            warn!("cache invalidation failed for {document_id}: {err:#}");
        }
    }
}

fn ok_json<T: Serialize>(value: &T) -> Result<ApiResponse> {
    Ok(ApiResponse::ok(serde_json::to_value(value)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::Action;
    use crate::sheets::store::MemoryStore;
    use crate::sheets::workbook::{Cell, Sheet, Workbook};

    fn text_row(cells: &[&str]) -> Vec<Cell> {
        cells.iter().map(|c| Cell::from(*c)).collect()
    }

    /// Master document: staff directory + plan master + dropdowns.
    fn master_workbook() -> Workbook {
        let mut wb = Workbook::new();
        wb.push(Sheet::from_rows(
            "Staff Directory",
            0,
            vec![
                text_row(&["Name", "URL", "Document", "Memo", "PIN"]),
                text_row(&["Tanaka", "", "doc-tanaka", "", "1234"]),
            ],
        ));
        wb.push(Sheet::from_rows(
            "plan_master",
            1,
            vec![
                text_row(&["id", "name", "general", "bank", "memo", "active", "inst"]),
                vec![
                    Cell::from("P1"),
                    Cell::from("Standard"),
                    Cell::Number(450_000.0),
                    Cell::Number(430_000.0),
                    Cell::Empty,
                    Cell::Bool(true),
                    Cell::Bool(false),
                ],
            ],
        ));
        wb.push(Sheet::from_rows(
            "master_dropdown",
            2,
            vec![
                text_row(&["group", "method"]),
                text_row(&["bank", "Bank transfer"]),
                text_row(&["card", "Credit card"]),
            ],
        ));
        wb
    }

    /// A staff document: customer tab + payment ledger.
    fn staff_workbook() -> Workbook {
        let mut wb = Workbook::new();
        wb.push(Sheet::from_rows(
            "Customer List",
            0,
            vec![
                text_row(&["Interview ID", "Name", "Result"]),
                text_row(&["A-1", "North Co", "won"]),
                text_row(&["A-2", "South Co", ""]),
            ],
        ));
        wb.push(Sheet::from_rows(
            "Payment Ledger",
            1,
            vec![
                text_row(&["Ledger"]),
                text_row(&[
                    "Interview ID",
                    "Contract Name",
                    "Onboarding",
                    "Method",
                    "Contract Date",
                    "", "", "", "",
                    "Gross Sales",
                ]),
                text_row(&["A-1", "North Co", "", "Bank transfer", "2026/01/01", "", "", "", "", "500000"]),
            ],
        ));
        wb
    }

    fn engine() -> Engine<MemoryStore> {
        let store = MemoryStore::new();
        store.insert("master", master_workbook());
        store.insert("doc-tanaka", staff_workbook());
        Engine::new(store).with_masters("master", "master")
    }

    #[tokio::test]
    async fn auth_dispatch_round_trip() {
        let engine = engine();
        let ok = engine.dispatch(Action::authenticate_by_pin("1234")).await;
        assert!(ok.success);
        let auth: AuthResult = serde_json::from_value(ok.data.unwrap()).unwrap();
        assert_eq!(auth.staff_name, "Tanaka");
        assert_eq!(auth.document_id, "doc-tanaka");

        let bad = engine.dispatch(Action::authenticate_by_pin("9999")).await;
        assert!(!bad.success);
        assert_eq!(bad.message.as_deref(), Some("PIN mismatch"));
    }

    #[tokio::test]
    async fn unknown_action_is_a_failure_envelope() {
        let engine = engine();
        let resp = engine
            .dispatch(ActionRequest::new("dropEverything", serde_json::json!({})))
            .await;
        assert!(!resp.success);
        assert!(resp.message.unwrap().contains("Invalid action"));
    }

    #[tokio::test]
    async fn initial_data_aggregates_everything() {
        let engine = engine();
        let resp = engine
            .dispatch(Action::get_initial_data("doc-tanaka", Some("Tanaka")))
            .await;
        assert!(resp.success);
        let data: InitialData = serde_json::from_value(resp.data.unwrap()).unwrap();
        assert_eq!(data.plan_list.len(), 1);
        assert_eq!(data.customer_list.len(), 2);
        assert_eq!(data.payment_customer_list.len(), 1);
        assert_eq!(data.payment_methods, vec!["Bank transfer", "Credit card"]);
        assert_eq!(data.payment_methods, data.payment_methods_h);
        assert_eq!(data.system_version, env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn missing_document_fails_gracefully() {
        let engine = engine();
        let resp = engine
            .dispatch(Action::get_customer_list("doc-ghost", None, None))
            .await;
        assert!(!resp.success);
        assert!(resp.message.unwrap().starts_with("Backend error:"));
    }

    #[tokio::test]
    async fn report_upsert_then_overdue_shows_the_contract() {
        let engine = engine();

        let form = ReportForm {
            document_id: "doc-tanaka".into(),
            interview_id: "A-2".into(),
            contract_name: "South Co".into(),
            onboarding: true,
            payment_method: "Credit card".into(),
            contract_date: "2026/01/10".into(),
            sales_amount: 300_000.0,
            notes: None,
        };
        let resp = engine.dispatch(Action::submit_report(&form)).await;
        assert!(resp.success, "{:?}", resp.message);

        let overdue = engine.overdue_list("doc-tanaka").await.unwrap();
        // Both A-1 (preexisting, unpaid) and the new A-2 are unpaid.
        let ids: Vec<&str> = overdue.iter().map(|e| e.id.as_str()).collect();
        assert!(ids.contains(&"A-1"));
        assert!(ids.contains(&"A-2"));
    }

    #[tokio::test]
    async fn excluded_status_drops_contract_from_overdue() {
        let store = MemoryStore::new();
        store.insert("master", master_workbook());
        let mut wb = staff_workbook();
        // Mark A-1 as cancelled in the customer tab.
        wb.sheets[0].set_cell(1, 2, Cell::from("Cancelled"));
        store.insert("doc-tanaka", wb);
        let engine = Engine::new(store).with_masters("master", "master");

        let overdue = engine.overdue_list("doc-tanaka").await.unwrap();
        assert!(overdue.iter().all(|e| e.id != "A-1"));
    }

    #[tokio::test]
    async fn payment_submission_rejects_unknown_customer() {
        let engine = engine();
        let form = PaymentForm {
            document_id: "doc-tanaka".into(),
            customer_id: "A-404".into(),
            payment_date: "2026/02/01".into(),
            payment_amount: 100_000.0,
            payment_method: "Bank transfer".into(),
        };
        let resp = engine.dispatch(Action::submit_payment(&form)).await;
        assert!(!resp.success);
        assert!(resp.message.unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn customer_list_is_cached_and_invalidated_by_writes() {
        let store = MemoryStore::new();
        store.insert("master", master_workbook());
        store.insert("doc-tanaka", staff_workbook());
        let cache = ListCache::open_in_memory().await.unwrap();
        let engine = Engine::new(store)
            .with_masters("master", "master")
            .with_cache(cache);

        let first = engine
            .customer_list("doc-tanaka", Some("Tanaka"), None)
            .await
            .unwrap();
        assert_eq!(first.len(), 2);

        // Mutate the stored document behind the engine's back; the cached
        // view must still answer.
        let mut wb = staff_workbook();
        wb.sheets[0].set_cell(3, 0, Cell::from("A-3"));
        wb.sheets[0].set_cell(3, 1, Cell::from("East Co"));
        engine.store.insert("doc-tanaka", wb);

        let cached = engine
            .customer_list("doc-tanaka", Some("Tanaka"), None)
            .await
            .unwrap();
        assert_eq!(cached.len(), 2);

        // A write through the engine invalidates, so the next read sees
        // the new row.
        let form = ReportForm {
            document_id: "doc-tanaka".into(),
            interview_id: "A-1".into(),
            contract_name: "North Co".into(),
            onboarding: false,
            payment_method: "Bank transfer".into(),
            contract_date: "2026/01/01".into(),
            sales_amount: 500_000.0,
            notes: None,
        };
        engine.submit_report(&form).await.unwrap();

        let fresh = engine
            .customer_list("doc-tanaka", Some("Tanaka"), None)
            .await
            .unwrap();
        assert_eq!(fresh.len(), 3);
    }
}
