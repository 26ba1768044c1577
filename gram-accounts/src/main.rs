//! gram-accounts - Manage connected Instagram accounts
//!
//! This tool drives the OAuth connect flow and manages the resulting
//! stored accounts.

use clap::{Parser, Subcommand};
use libgramcast::logging::{LogFormat, LoggingConfig};
use libgramcast::service::GramcastService;
use libgramcast::{Account, GramcastError, Result};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "gram-accounts")]
#[command(version)]
#[command(about = "Manage connected Instagram accounts", long_about = "\
gram-accounts - Manage connected Instagram accounts

DESCRIPTION:
    Connects Instagram accounts over OAuth and manages the stored
    credentials. Connecting is a two-step flow: 'connect-url' prints the
    page to authorize on, and 'connect' exchanges the code from the
    redirect for a long-lived token.

USAGE:
    # Start connecting an account
    gram-accounts connect-url

    # Finish connecting with the code from the redirect URL
    gram-accounts connect AQBx7...

    # See what is connected
    gram-accounts list
    gram-accounts list --format json

    # Disconnect (posts are kept)
    gram-accounts deactivate <ACCOUNT_ID>

CONFIGURATION:
    Configuration file: ~/.config/gramcast/config.toml
    Override with the GRAMCAST_CONFIG environment variable.

EXIT CODES:
    0 - Success
    1 - Runtime error (API, database, configuration)
    2 - Account not found
    3 - Invalid input
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the URL to visit for authorizing a new account
    ConnectUrl,

    /// Exchange an OAuth callback code and store the account
    Connect {
        /// Authorization code from the OAuth redirect (reads stdin if omitted)
        code: Option<String>,

        /// Output format
        #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },

    /// List active accounts
    List {
        /// Output format
        #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },

    /// Deactivate an account (its posts are kept)
    Deactivate {
        /// Account id as shown by 'gram-accounts list'
        account_id: String,
    },
}

/// Account as printed to users; the stored token never leaves the database
#[derive(Serialize)]
struct AccountView {
    id: String,
    instagram_user_id: String,
    username: String,
    display_name: Option<String>,
    profile_picture_url: Option<String>,
    token_expires_at: i64,
    created_at: i64,
}

impl From<&Account> for AccountView {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id.clone(),
            instagram_user_id: account.instagram_user_id.clone(),
            username: account.username.clone(),
            display_name: account.display_name.clone(),
            profile_picture_url: account.profile_picture_url.clone(),
            token_expires_at: account.token_expires_at,
            created_at: account.created_at,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    if let Err(e) = run_command(cli.command).await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

fn init_logging(verbose: bool) {
    let format = std::env::var("GRAMCAST_LOG_FORMAT")
        .ok()
        .and_then(|v| v.parse::<LogFormat>().ok())
        .unwrap_or(LogFormat::Text);
    LoggingConfig::new(format, "warn".to_string(), verbose).init();
}

async fn run_command(command: Commands) -> Result<()> {
    let service = GramcastService::new().await?;

    match command {
        Commands::ConnectUrl => {
            println!("{}", service.accounts().authorization_url()?);
            Ok(())
        }
        Commands::Connect { code, format } => connect(&service, code, &format).await,
        Commands::List { format } => list(&service, &format).await,
        Commands::Deactivate { account_id } => {
            service.accounts().deactivate(&account_id).await?;
            println!("✓ Deactivated account {}", account_id);
            Ok(())
        }
    }
}

async fn connect(service: &GramcastService, code: Option<String>, format: &str) -> Result<()> {
    let code = match code {
        Some(code) => code,
        None => read_stdin("authorization code")?,
    };

    let account = service.accounts().connect(code.trim()).await?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&AccountView::from(&account))?);
    } else {
        println!("✓ Connected @{}", account.username);
        println!("  account id:    {}", account.id);
        println!("  token expires: {}", format_day(account.token_expires_at));
    }
    Ok(())
}

async fn list(service: &GramcastService, format: &str) -> Result<()> {
    let accounts = service.accounts().list_active().await?;

    if format == "json" {
        let views: Vec<AccountView> = accounts.iter().map(AccountView::from).collect();
        println!("{}", serde_json::to_string_pretty(&views)?);
        return Ok(());
    }

    if accounts.is_empty() {
        println!("No accounts connected. Run 'gram-accounts connect-url' to start.");
        return Ok(());
    }

    for account in &accounts {
        println!("@{} ({})", account.username, account.id);
        if let Some(name) = &account.display_name {
            println!("  name:          {}", name);
        }
        println!("  instagram id:  {}", account.instagram_user_id);
        println!("  token expires: {}", format_day(account.token_expires_at));
        println!();
    }
    Ok(())
}

fn read_stdin(what: &str) -> Result<String> {
    use std::io::Read;

    let mut buffer = String::new();
    std::io::stdin()
        .read_to_string(&mut buffer)
        .map_err(|e| GramcastError::InvalidInput(format!("could not read {} from stdin: {}", what, e)))?;
    if buffer.trim().is_empty() {
        return Err(GramcastError::InvalidInput(format!(
            "no {} provided (pass as argument or on stdin)",
            what
        )));
    }
    Ok(buffer)
}

fn format_day(timestamp: i64) -> String {
    chrono::DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
