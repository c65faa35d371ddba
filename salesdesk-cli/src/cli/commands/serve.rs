//! Gateway serve command

use std::sync::Arc;

use anyhow::{Result, bail};

use crate::api::ScriptClient;
use crate::server::{AppState, GatewayMode, serve};

pub async fn handle(proxy: bool, addr: Option<String>) -> Result<()> {
    let config = crate::config::global();
    let addr = addr.unwrap_or_else(|| config.listen_addr.clone());

    let mode = if proxy {
        let Some(url) = config.script_url.clone() else {
            bail!("--proxy needs a script URL (config script_url or SALESDESK_SCRIPT_URL)");
        };
        GatewayMode::Proxy(ScriptClient::new(
            url,
            &config.resilience,
            config.request_timeout,
        )?)
    } else {
        GatewayMode::Local(super::local_engine(config).await)
    };

    let state = Arc::new(AppState {
        mode,
        version: env!("CARGO_PKG_VERSION").to_string(),
    });
    serve(state, &addr).await
}
