use adimport_core::batch::{parse_records, run_batch};
use adimport_directory::{Credentials, DirectoryClient, DirectoryConfig};
use clap::Parser;
use config::CliConfiguration;
use eyre::Context;
use logging::{LoggingConfig, init_logging};
use reporter::ConsoleReporter;
use std::{path::PathBuf, process::ExitCode};

mod config;
mod logging;
mod prompt;
mod reporter;

/// Bulk import organizations and users from a JSON export into Active Directory
#[derive(Parser)]
#[command(name = "adimport", version, about, long_about = None)]
struct Args {
    /// JSON file containing the array of records to import
    pub json_file: PathBuf,

    /// Path to a JSON configuration file, the environment is used when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> eyre::Result<ExitCode> {
    // Load environment variables
    _ = dotenvy::dotenv();

    // Setup colorful error logging
    color_eyre::install()?;

    let logging_config = LoggingConfig::from_env()?;
    init_logging(logging_config)?;

    let args = match Args::try_parse() {
        Ok(value) => value,
        Err(error) => {
            let code = if error.use_stderr() {
                ExitCode::FAILURE
            } else {
                // --help and --version
                ExitCode::SUCCESS
            };
            error.print()?;
            return Ok(code);
        }
    };

    let config = CliConfiguration::load(args.config.as_deref()).await?;

    // Load the import records before touching the directory
    let input = tokio::fs::read(&args.json_file)
        .await
        .with_context(|| format!("failed to read {}", args.json_file.display()))?;
    let records = parse_records(&input).context("failed to load import records")?;

    let credentials = prompt_credentials(&config.directory).await?;

    let directory = DirectoryClient::connect(config.directory, &credentials)
        .await
        .context("failed to connect to directory")?;

    let mut reporter = ConsoleReporter::new(records.len())?;
    let outcome = run_batch(&directory, &config.import, &records, &mut reporter).await;
    reporter.finish();

    println!("{}", reporter::summary(&outcome));

    if let Err(error) = directory.close().await {
        tracing::warn!(%error, "failed to close directory session");
    }

    Ok(ExitCode::SUCCESS)
}

/// Ask for the bind password of the directory, the in-memory
/// directory does not authenticate so no password is requested
async fn prompt_credentials(config: &DirectoryConfig) -> eyre::Result<Credentials> {
    let DirectoryConfig::Ldap(ldap) = config else {
        return Ok(Credentials::new(String::new()));
    };

    let password = prompt::prompt_password(format!("Password for {}", ldap.bind_dn)).await?;
    prompt::exit_on_interrupt();

    Ok(Credentials::new(password))
}
