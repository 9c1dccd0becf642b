use chrono::Utc;
use clap::{Parser, Subcommand};
use cloudaeye_notifier::credentials::{CredentialStore, FormValidation, Secret, test_connection};
use cloudaeye_notifier::error::NotifierError;
use cloudaeye_notifier::logging::{FileLogger, setup_logging};
use cloudaeye_notifier::notifier::Notifier;
use cloudaeye_notifier::record::RunRecord;
use cloudaeye_notifier::{AppState, api};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8888";
const DEFAULT_CONFIG_PATH: &str = "notifier_config.toml";

#[derive(Parser)]
#[command(name = "cloudaeye-notifier", version, about = "Report CI build results to CloudAEye")]
struct Cli {
    /// Configuration file holding the tenant key and token
    #[arg(long, env = "NOTIFIER_CONFIG", default_value = DEFAULT_CONFIG_PATH, global = true)]
    config: PathBuf,

    /// Also write logs to daily files in this directory
    #[arg(long, env = "NOTIFIER_LOG_DIR", global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the configuration and notification API
    Serve {
        #[arg(long, env = "BIND_ADDRESS", default_value = DEFAULT_BIND_ADDRESS)]
        bind: String,
        /// Token required in X-Admin-Token to change the configuration
        #[arg(long, env = "NOTIFIER_ADMIN_TOKEN", hide_env_values = true)]
        admin_token: Option<String>,
    },
    /// Notify CloudAEye about one finished run
    Notify {
        /// JSON run record written by the CI post-build step
        #[arg(long)]
        run: PathBuf,
        #[arg(long, env = "NOTIFIER_ENABLE_EXPORT")]
        enable_export: bool,
    },
    /// Test connectivity with the stored credentials
    Ping,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let file_logger = cli.log_dir.clone().map(FileLogger::new);
    let _guard = match setup_logging(file_logger.as_ref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Logging setup error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, NotifierError> {
    let store = Arc::new(CredentialStore::load(&cli.config).await?);
    let notifier = Notifier::new(store.clone());
    info!("Using config at {:?}", cli.config);

    match cli.command {
        Command::Serve { bind, admin_token } => {
            let admin_token = admin_token.filter(|t| !t.is_empty()).map(Secret::from);
            if admin_token.is_none() {
                warn!(
                    "NOTIFIER_ADMIN_TOKEN is not set; configuration endpoints are open to anyone who can reach {}",
                    bind
                );
            }
            let state = Arc::new(AppState {
                store,
                notifier,
                admin_token,
                start_time: Instant::now(),
                started_at: Utc::now(),
            });
            let app = api::router(state);

            info!("Listening on {}", bind);
            let listener = tokio::net::TcpListener::bind(bind.as_str()).await?;
            axum::serve(listener, app).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Notify { run, enable_export } => {
            let record = RunRecord::from_file(&run)?;
            let outcome = notifier.perform(&record, enable_export).await?;
            println!("{}", serde_json::to_string(&outcome)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Ping => {
            let credentials = store.get().await;
            let sender = notifier.sender().await;
            match test_connection(&sender, &credentials.tenant_key, &credentials.token).await {
                FormValidation::Ok(msg) => {
                    println!("{}", msg.unwrap_or_default());
                    Ok(ExitCode::SUCCESS)
                }
                FormValidation::Warning(msg) | FormValidation::Error(msg) => {
                    eprintln!("{}", msg);
                    Ok(ExitCode::FAILURE)
                }
            }
        }
    }
}
