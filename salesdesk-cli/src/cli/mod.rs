//! Command-line interface

pub mod commands;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "salesdesk",
    version,
    about = "Sales reporting front end and gateway for a spreadsheet-backed team"
)]
pub struct Cli {
    /// Answer from the local workbook engine instead of the remote backend
    #[arg(long, global = true)]
    pub local: bool,

    /// Remote script endpoint URL (overrides config)
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Authenticate with a staff PIN
    Auth {
        /// 4-digit PIN (prompted when omitted)
        #[arg(long)]
        pin: Option<String>,
    },

    /// List the reconciled customers of a document
    Customers {
        #[arg(long)]
        document: String,
        #[arg(long)]
        staff: Option<String>,
        /// Also scan the tab with this gid
        #[arg(long)]
        gid: Option<u32>,
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// List the customers present in the payment ledger
    PaymentCustomers {
        #[arg(long)]
        document: String,
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// List overdue payments for a document
    Overdue {
        #[arg(long)]
        document: String,
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Submit a contract report (upserted by interview id)
    Report {
        #[arg(long)]
        document: String,
        #[arg(long)]
        interview_id: String,
        #[arg(long)]
        contract_name: String,
        #[arg(long)]
        onboarding: bool,
        #[arg(long)]
        method: String,
        #[arg(long)]
        date: String,
        #[arg(long)]
        amount: f64,
        #[arg(long)]
        notes: Option<String>,
    },

    /// Submit a payment report (appended to the customer's row)
    Payment {
        #[arg(long)]
        document: String,
        #[arg(long)]
        interview_id: String,
        #[arg(long)]
        date: String,
        #[arg(long)]
        amount: f64,
        #[arg(long)]
        method: String,
    },

    /// List active plans
    Plans {
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// List payment methods
    Methods,

    /// Run the gateway HTTP endpoint
    Serve {
        /// Forward to the remote backend instead of answering locally
        #[arg(long)]
        proxy: bool,
        /// Bind address (overrides config)
        #[arg(long)]
        addr: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}
