//! Command handlers
//!
//! Every command speaks the wire protocol through a [`Backend`]: either
//! the remote scripting backend via the hardened client, or the local
//! workbook engine. `--local` (or an unset script URL) picks the engine,
//! so the whole command surface works offline against the data directory.

mod auth;
mod lists;
mod serve;
mod submit;

use anyhow::{Context, Result};
use log::warn;

use crate::api::ScriptClient;
use crate::api::models::{
    AuthResult, Customer, InitialData, OverdueEntry, PaymentCustomer, PaymentForm, Plan,
    ReportForm,
};
use crate::cli::{Cli, Commands};
use crate::config::Config;
use crate::engine::{Engine, ListCache};
use crate::sheets::store::XlsxStore;

pub async fn run(cli: Cli) -> Result<()> {
    let backend = match &cli.command {
        // Serve builds its own state.
        Commands::Serve { .. } => None,
        _ => Some(Backend::from_flags(cli.local, cli.url.clone()).await?),
    };

    match cli.command {
        Commands::Auth { pin } => auth::handle(&backend.expect("backend"), pin).await,
        Commands::Customers {
            document,
            staff,
            gid,
            format,
        } => lists::customers(&backend.expect("backend"), &document, staff.as_deref(), gid, format).await,
        Commands::PaymentCustomers { document, format } => {
            lists::payment_customers(&backend.expect("backend"), &document, format).await
        }
        Commands::Overdue { document, format } => {
            lists::overdue(&backend.expect("backend"), &document, format).await
        }
        Commands::Report {
            document,
            interview_id,
            contract_name,
            onboarding,
            method,
            date,
            amount,
            notes,
        } => {
            submit::report(
                &backend.expect("backend"),
                ReportForm {
                    document_id: document,
                    interview_id,
                    contract_name,
                    onboarding,
                    payment_method: method,
                    contract_date: date,
                    sales_amount: amount,
                    notes,
                },
            )
            .await
        }
        Commands::Payment {
            document,
            interview_id,
            date,
            amount,
            method,
        } => {
            submit::payment(
                &backend.expect("backend"),
                PaymentForm {
                    document_id: document,
                    customer_id: interview_id,
                    payment_date: date,
                    payment_amount: amount,
                    payment_method: method,
                },
            )
            .await
        }
        Commands::Plans { format } => lists::plans(&backend.expect("backend"), format).await,
        Commands::Methods => lists::methods(&backend.expect("backend")).await,
        Commands::Serve { proxy, addr } => serve::handle(proxy, addr).await,
    }
}

pub enum Backend {
    Remote(ScriptClient),
    Local(Engine<XlsxStore>),
}

impl Backend {
    pub async fn from_flags(local: bool, url_override: Option<String>) -> Result<Self> {
        let config = crate::config::global();
        let url = url_override.or_else(|| config.script_url.clone());

        match url {
            Some(url) if !local => Ok(Backend::Remote(ScriptClient::new(
                url,
                &config.resilience,
                config.request_timeout,
            )?)),
            _ => Ok(Backend::Local(local_engine(config).await)),
        }
    }

    pub async fn authenticate_by_pin(&self, pin: &str) -> Result<AuthResult> {
        match self {
            Backend::Remote(client) => client.authenticate_by_pin(pin).await,
            Backend::Local(engine) => engine
                .authenticate_by_pin(pin)
                .await?
                .context("PIN mismatch"),
        }
    }

    pub async fn initial_data(&self, document: &str, staff: Option<&str>) -> Result<InitialData> {
        match self {
            Backend::Remote(client) => client.initial_data(document, staff).await,
            Backend::Local(engine) => engine.initial_data(document, staff).await,
        }
    }

    pub async fn customer_list(
        &self,
        document: &str,
        staff: Option<&str>,
        gid: Option<u32>,
    ) -> Result<Vec<Customer>> {
        match self {
            Backend::Remote(client) => client.customer_list(document, staff, gid).await,
            Backend::Local(engine) => engine.customer_list(document, staff, gid).await,
        }
    }

    pub async fn payment_customer_list(&self, document: &str) -> Result<Vec<PaymentCustomer>> {
        match self {
            Backend::Remote(client) => client.payment_customer_list(document).await,
            Backend::Local(engine) => engine.payment_customer_list(document).await,
        }
    }

    pub async fn overdue_payment_list(&self, document: &str) -> Result<Vec<OverdueEntry>> {
        match self {
            Backend::Remote(client) => client.overdue_payment_list(document).await,
            Backend::Local(engine) => engine.overdue_list(document).await,
        }
    }

    pub async fn plan_list(&self) -> Result<Vec<Plan>> {
        match self {
            Backend::Remote(client) => client.plan_list().await,
            Backend::Local(engine) => engine.plan_list().await,
        }
    }

    pub async fn payment_methods(&self) -> Result<Vec<String>> {
        match self {
            Backend::Remote(client) => client.payment_methods().await,
            Backend::Local(engine) => engine.payment_methods().await,
        }
    }

    pub async fn submit_report(&self, form: &ReportForm) -> Result<String> {
        match self {
            Backend::Remote(client) => client.submit_report(form).await,
            Backend::Local(engine) => engine.submit_report(form).await,
        }
    }

    pub async fn submit_payment(&self, form: &PaymentForm) -> Result<String> {
        match self {
            Backend::Remote(client) => client.submit_payment(form).await,
            Backend::Local(engine) => engine.submit_payment(form).await,
        }
    }
}

/// Build the local engine from the global config. A broken cache is
/// degraded to no cache, never a startup failure.
pub async fn local_engine(config: &Config) -> Engine<XlsxStore> {
    let mut engine = Engine::new(XlsxStore::new(&config.data_dir))
        .with_masters(&config.data_master_id, &config.auth_master_id)
        .with_schema(config.schema.clone())
        .with_timezone(config.timezone)
        .with_cache_ttl(config.cache_ttl);

    match ListCache::open(&config.cache_path).await {
        Ok(cache) => engine = engine.with_cache(cache),
        Err(err) => warn!(
            "cache unavailable at {}, running uncached: {err:#}",
            config.cache_path.display()
        ),
    }

    engine
}
