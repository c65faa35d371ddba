//! PIN authentication command

use anyhow::{Context, Result};
use colored::Colorize;
use dialoguer::Password;

use super::Backend;

pub async fn handle(backend: &Backend, pin: Option<String>) -> Result<()> {
    let pin = match pin {
        Some(pin) => pin,
        None => Password::new()
            .with_prompt("PIN")
            .interact()
            .context("Failed to read PIN")?,
    };

    let auth = backend.authenticate_by_pin(&pin).await?;

    println!("Signed in as {}", auth.staff_name.bright_green().bold());
    println!("Document: {}", auth.document_id.cyan());

    // Same first load the front end does after sign-in.
    let data = backend
        .initial_data(&auth.document_id, Some(&auth.staff_name))
        .await?;
    println!(
        "{} customers, {} ledger customers, {} plans, {} payment methods (backend {})",
        data.customer_list.len(),
        data.payment_customer_list.len(),
        data.plan_list.len(),
        data.payment_methods.len(),
        data.system_version.dimmed()
    );
    Ok(())
}
