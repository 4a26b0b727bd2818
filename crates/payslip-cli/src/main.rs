//! payslip-sync: download missing Paybooks pay slips and file them in Google Drive.
//!
//! Configuration comes from the environment (and `.env`); see `payslip_core::config`.

use anyhow::Context;
use chrono::{Local, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use payslip_cli::{init_tracing, truncate_string};
use payslip_core::constants::MAX_MONTHS_BACK_LIMIT;
use payslip_core::{AuthToken, Config, MonthKey, SyncError, SyncReport};
use payslip_services::{
    normalize_token_input, EmailNotifier, Notifier, Outcome, PaybooksSource, SyncEngine,
    TokenStore,
};
use payslip_storage::{create_destination, LocalArchive};
use serde::Serialize;
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "payslip-sync", about = "Sync Paybooks pay slips into Google Drive")]
struct Cli {
    /// How many months before the current one to check (default: MAX_MONTHS_BACK or 24)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=MAX_MONTHS_BACK_LIMIT as i64))]
    max_months: Option<u32>,
    /// Print the sync report as JSON on stdout
    #[arg(long)]
    json: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Save a login token (or a captured requestData value) for later runs
    SaveToken {
        /// Token or requestData; read from stdin when omitted
        token: Option<String>,
    },
    /// Send a test notification email
    TestEmail,
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize report")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;
    if let Some(path) = init_tracing(config.log_folder()) {
        tracing::debug!(path = %path.display(), "Logging to file");
    }

    match cli.command {
        Some(Commands::SaveToken { token }) => save_token(&config, token).await,
        Some(Commands::TestEmail) => test_email(&config).await,
        None => run_sync(&config, cli.max_months, cli.json).await,
    }
}

async fn build_engine(config: &Config) -> anyhow::Result<SyncEngine> {
    let source = PaybooksSource::from_config(config).context("Failed to create Paybooks client")?;
    let destination = create_destination(config)
        .await
        .context("Failed to create destination")?;

    Ok(SyncEngine::new(
        Arc::new(source),
        destination,
        LocalArchive::new(config.download_folder()),
    )
    .with_fetch_delay(Duration::from_millis(config.fetch_delay_ms()))
    .with_keep_local_copies(config.keep_local_copies()))
}

async fn run_sync(config: &Config, max_months: Option<u32>, json: bool) -> anyhow::Result<()> {
    let notifier = EmailNotifier::from_config(config);
    let max_months = max_months.unwrap_or(config.max_months_back());

    tracing::info!(
        max_months = max_months,
        backend = %config.destination_backend(),
        root = %config.drive_root_folder(),
        "Starting payslip sync"
    );

    let engine = match build_engine(config).await {
        Ok(engine) => engine,
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), "Setup failed");
            let error = SyncError::Config(format!("{:#}", e));
            notifier.notify(&Outcome::from_error(&error)).await;
            return Err(e);
        }
    };

    let today = Local::now().date_naive();
    match engine.sync_at(today, max_months).await {
        Ok(report) => {
            if json {
                print_json(&report)?;
            }

            notifier.notify(&run_outcome(&report, max_months, today)).await;
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, "Sync aborted");
            notifier.notify(&Outcome::from_error(&e)).await;
            Err(e.into())
        }
    }
}

/// Names the checked month on a single-month run that found nothing to do.
/// `today` must be the date the window was computed from.
fn run_outcome(report: &SyncReport, max_months: u32, today: NaiveDate) -> Outcome {
    let mut outcome = Outcome::from_report(report);
    if let Outcome::AlreadyExists { checked } = &mut outcome {
        if max_months == 1 {
            *checked = Some(MonthKey::preceding(today));
        }
    }
    outcome
}

async fn save_token(config: &Config, token: Option<String>) -> anyhow::Result<()> {
    let input = match token {
        Some(token) => token,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read token from stdin")?;
            buffer
        }
    };

    let token = normalize_token_input(&input).context("No token provided")?;
    let store = TokenStore::new(config.token_file());
    store.save_token(&AuthToken::new(token.as_str(), Utc::now())).await?;

    println!("Token saved to {}", store.path().display());
    println!("Token preview: {}", truncate_string(&token, 30));
    Ok(())
}

async fn test_email(config: &Config) -> anyhow::Result<()> {
    let notifier = EmailNotifier::from_config(config);
    if !notifier.send_test_email().await {
        anyhow::bail!("Test email was not sent; check EMAIL_SENDER, EMAIL_PASSWORD and EMAIL_RECIPIENT");
    }
    println!("Test email sent");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_months_accepts_full_range() {
        let cli = Cli::try_parse_from(["payslip-sync", "--max-months", "1200"]).unwrap();
        assert_eq!(cli.max_months, Some(1200));
    }

    #[test]
    fn max_months_rejects_out_of_range() {
        assert!(Cli::try_parse_from(["payslip-sync", "--max-months", "0"]).is_err());
        assert!(Cli::try_parse_from(["payslip-sync", "--max-months", "1201"]).is_err());
        assert!(Cli::try_parse_from(["payslip-sync", "--max-months", "4294967295"]).is_err());
    }

    #[test]
    fn single_month_outcome_names_month_before_sync_date() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let outcome = run_outcome(&SyncReport::default(), 1, today);
        assert!(matches!(
            outcome,
            Outcome::AlreadyExists { checked: Some(month) } if month == MonthKey::new(2025, 12).unwrap()
        ));

        let outcome = run_outcome(&SyncReport::default(), 24, today);
        assert!(matches!(outcome, Outcome::AlreadyExists { checked: None }));
    }
}
