//! negform - negative-data form validation runner

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

use negform::{execute, Credentials, Dataset, HarnessConfig, WebDriverPage};

#[derive(Parser)]
#[command(name = "negform")]
#[command(author, version, about = "Feed invalid data into a web form and record how it rejects it")]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every dataset row against the form
    Run(RunArgs),

    /// Write the default configuration to a file
    InitConfig {
        /// Destination TOML file
        path: PathBuf,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Harness configuration (defaults are used if the file does not exist)
    #[arg(long, default_value = "negform.toml")]
    config: PathBuf,

    /// CSV dataset with a header row
    #[arg(long)]
    dataset: PathBuf,

    /// Override `report.artifacts_dir`
    #[arg(long)]
    artifacts_dir: Option<PathBuf>,

    /// Override `browser.webdriver_url`
    #[arg(long)]
    webdriver_url: Option<String>,

    /// Run the browser headless
    #[arg(long)]
    headless: bool,

    #[arg(long, env = "NEGFORM_USERNAME")]
    username: String,

    /// Read from stdin when not given
    #[arg(long, env = "NEGFORM_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

const EXIT_ABORTED: u8 = 1;
const EXIT_SETUP: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Run(args) => run(args).await,
        Commands::InitConfig { path } => init_config(path).map(|()| ExitCode::SUCCESS),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(EXIT_SETUP)
        }
    }
}

async fn run(args: RunArgs) -> anyhow::Result<ExitCode> {
    let mut config = HarnessConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    if let Some(dir) = args.artifacts_dir {
        config.report.artifacts_dir = dir;
    }
    if let Some(url) = args.webdriver_url {
        config.browser.webdriver_url = url;
    }
    if args.headless {
        config.browser.headless = true;
    }

    let dataset = Dataset::from_csv(&args.dataset)?;
    let password = match args.password {
        Some(password) => password,
        None => prompt_password()?,
    };
    let credentials = Credentials {
        username: args.username,
        password,
    };

    let page = WebDriverPage::connect(&config.browser)
        .await
        .with_context(|| format!("connecting to {}", config.browser.webdriver_url))?;
    let summary = execute(&config, Arc::new(page), &credentials, &dataset).await?;

    println!("{}", summary);
    if summary.completed() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(EXIT_ABORTED))
    }
}

fn init_config(path: PathBuf) -> anyhow::Result<()> {
    if path.exists() {
        anyhow::bail!("{} already exists", path.display());
    }
    HarnessConfig::default().save(&path)?;
    info!("Default configuration written to {}", path.display());
    Ok(())
}

fn prompt_password() -> anyhow::Result<String> {
    eprint!("Password: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        anyhow::bail!("no password given");
    }
    Ok(password)
}
