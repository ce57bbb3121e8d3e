mod args;
mod commands;
mod logging;
mod sqlite_file;

use services::{ApiConfig, AppServices, Clock};
use tracing::debug;

use crate::args::{Args, Command, print_usage};
use crate::sqlite_file::prepare_sqlite_file;

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    logging::init()?;

    let parsed = Args::parse(std::env::args().skip(1)).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;
    if matches!(parsed.command, Command::Help) {
        print_usage();
        return Ok(());
    }

    let config = match &parsed.api_url {
        Some(url) => ApiConfig::from_env()?.with_base_url(url)?,
        None => ApiConfig::from_env()?,
    };
    debug!(api = %config.base_url, db = %parsed.db_url, "starting");

    // Open + migrate SQLite in the binary glue so services stay storage-agnostic.
    prepare_sqlite_file(&parsed.db_url)?;
    let services = AppServices::sqlite(config, &parsed.db_url, Clock::system()).await?;

    match parsed.command {
        Command::Tutorials(query) => commands::tutorials(&services, &query).await,
        Command::Show(id) => commands::show(&services, &id).await,
        Command::Learn(id) => commands::learn(&services, &id).await,
        Command::Login(draft) => commands::login(&services, draft).await,
        Command::Register(draft) => commands::register(&services, draft).await,
        Command::Logout => commands::logout(&services).await,
        Command::WhoAmI => commands::whoami(&services).await,
        Command::MyLearning => commands::my_learning(&services).await,
        Command::Theme(action) => commands::theme(&services, action).await,
        Command::Help => Ok(()),
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
