mod api;
mod cli;
mod config;
mod engine;
mod server;
mod sheets;

use anyhow::Result;
use clap::Parser;
use is_terminal::IsTerminal;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Cli::parse();

    if args.no_color || !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    config::init(config::Config::load()?);

    cli::commands::run(args).await
}
