//! Submission commands

use anyhow::Result;
use colored::Colorize;

use crate::api::models::{PaymentForm, ReportForm};

use super::Backend;

pub async fn report(backend: &Backend, form: ReportForm) -> Result<()> {
    let ack = backend.submit_report(&form).await?;
    println!("{} {}", "✓".bright_green(), ack);
    Ok(())
}

pub async fn payment(backend: &Backend, form: PaymentForm) -> Result<()> {
    let ack = backend.submit_payment(&form).await?;
    println!("{} {}", "✓".bright_green(), ack);
    Ok(())
}
