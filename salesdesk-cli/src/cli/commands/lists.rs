//! List commands: customers, payment customers, overdue, masters

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;

use crate::cli::OutputFormat;

use super::Backend;

pub async fn customers(
    backend: &Backend,
    document: &str,
    staff: Option<&str>,
    gid: Option<u32>,
    format: OutputFormat,
) -> Result<()> {
    let list = backend.customer_list(document, staff, gid).await?;

    match format {
        OutputFormat::Json => print_json(&list)?,
        OutputFormat::Csv => print_csv(&list)?,
        OutputFormat::Table => {
            for customer in &list {
                let status = if customer.status.is_empty() {
                    "-".dimmed().to_string()
                } else {
                    customer.status.yellow().to_string()
                };
                println!(
                    "{:<12} {:<28} {:<16} {}",
                    customer.id.cyan(),
                    customer.name,
                    status,
                    customer.link.dimmed()
                );
            }
            println!("{} customers", list.len().to_string().bold());
        }
    }
    Ok(())
}

pub async fn payment_customers(
    backend: &Backend,
    document: &str,
    format: OutputFormat,
) -> Result<()> {
    let list = backend.payment_customer_list(document).await?;

    match format {
        OutputFormat::Json => print_json(&list)?,
        OutputFormat::Csv => print_csv(&list)?,
        OutputFormat::Table => {
            for customer in &list {
                println!(
                    "{:<12} {:<28} {}",
                    customer.id.cyan(),
                    customer.customer_name,
                    customer.link.dimmed()
                );
            }
            println!("{} ledger customers", list.len().to_string().bold());
        }
    }
    Ok(())
}

pub async fn overdue(backend: &Backend, document: &str, format: OutputFormat) -> Result<()> {
    let list = backend.overdue_payment_list(document).await?;

    match format {
        OutputFormat::Json => print_json(&list)?,
        OutputFormat::Csv => print_csv(&list)?,
        OutputFormat::Table => {
            if list.is_empty() {
                println!("{}", "No overdue payments.".bright_green());
                return Ok(());
            }
            for entry in &list {
                let days = format!("{:>4}d", entry.overdue_days);
                let days = if entry.overdue_days >= 30 {
                    days.bright_red().bold().to_string()
                } else {
                    days.yellow().to_string()
                };
                println!(
                    "{:<12} {:<28} {} {:>12} unpaid (since {})",
                    entry.id.cyan(),
                    entry.customer_name,
                    days,
                    format_amount(entry.unpaid_amount),
                    entry.contract_date
                );
            }
            println!("{} overdue", list.len().to_string().bold());
        }
    }
    Ok(())
}

pub async fn plans(backend: &Backend, format: OutputFormat) -> Result<()> {
    let list = backend.plan_list().await?;

    match format {
        OutputFormat::Json => print_json(&list)?,
        OutputFormat::Csv => print_csv(&list)?,
        OutputFormat::Table => {
            for plan in &list {
                let installment = if plan.is_installment {
                    "installment".yellow().to_string()
                } else {
                    String::new()
                };
                println!(
                    "{:<8} {:<24} {:>12} / {:>12} {}",
                    plan.id.cyan(),
                    plan.name,
                    format_amount(plan.price_general),
                    format_amount(plan.price_bank),
                    installment
                );
            }
        }
    }
    Ok(())
}

pub async fn methods(backend: &Backend) -> Result<()> {
    let list = backend.payment_methods().await?;
    for method in &list {
        println!("{method}");
    }
    Ok(())
}

fn format_amount(amount: f64) -> String {
    // Thousands separators, no decimals: amounts in the ledger are yen.
    let whole = amount.round() as i64;
    let digits = whole.abs().to_string();
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if whole < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

fn print_json<T: Serialize>(list: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(list).context("Failed to format JSON output")?
    );
    Ok(())
}

fn print_csv<T: Serialize>(rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row).context("Failed to format CSV row")?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| anyhow::anyhow!("Failed to flush CSV output: {err}"))?;
    print!("{}", String::from_utf8(bytes).context("CSV output was not UTF-8")?);
    Ok(())
}
