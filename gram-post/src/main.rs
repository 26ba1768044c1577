//! gram-post - Publish media to Instagram

use clap::Parser;
use libgramcast::logging::{LogFormat, LoggingConfig};
use libgramcast::service::publishing::PostRequest;
use libgramcast::service::GramcastService;
use libgramcast::{GramcastError, MediaKind, Result};

#[derive(Parser, Debug)]
#[command(name = "gram-post")]
#[command(version)]
#[command(about = "Publish media to Instagram", long_about = "\
gram-post - Publish media to Instagram

DESCRIPTION:
    Publishes an image or reel to a connected Instagram account and waits
    for the platform to finish processing it. The media must already be
    hosted at a publicly reachable URL; Instagram fetches it from there.

    Publishing is asynchronous on Instagram's side, so this command can
    take a while for reels. Progress is tracked in the local database;
    inspect past and failed posts with gram-history.

USAGE:
    # Publish an image
    gram-post https://cdn.example.com/sunset.jpg --caption \"Golden hour\"

    # Publish a reel
    gram-post https://cdn.example.com/clip.mp4 --kind reels

    # Pipe the URL in
    echo https://cdn.example.com/sunset.jpg | gram-post

    # Pick the account when several are connected
    gram-post https://cdn.example.com/sunset.jpg --account <ACCOUNT_ID>

CONFIGURATION:
    Configuration file: ~/.config/gramcast/config.toml
    Override with the GRAMCAST_CONFIG environment variable.

EXIT CODES:
    0 - Published
    1 - Publish failed (see gram-history for the stored error)
    2 - Account not found
    3 - Invalid input
")]
struct Cli {
    /// URL of the media to publish (reads from stdin if not provided)
    media_url: Option<String>,

    /// Account id to publish as (optional when exactly one account is connected)
    #[arg(short, long)]
    account: Option<String>,

    /// Caption text
    #[arg(short, long)]
    caption: Option<String>,

    /// Media kind
    #[arg(short, long, default_value = "image", value_parser = ["image", "reels"])]
    kind: String,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
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

async fn run(cli: Cli) -> Result<()> {
    let media_url = match cli.media_url {
        Some(url) => url,
        None => read_stdin()?,
    };
    let media_kind = MediaKind::parse(&cli.kind)
        .ok_or_else(|| GramcastError::InvalidInput(format!("unknown media kind: {}", cli.kind)))?;

    let service = GramcastService::new().await?;
    let account_id = resolve_account(&service, cli.account).await?;

    let request = PostRequest {
        account_id,
        media_url: media_url.trim().to_string(),
        caption: cli.caption,
        media_kind: Some(media_kind),
    };
    let post = service.publishing().create_post(request).await?;

    if cli.format == "json" {
        println!("{}", serde_json::to_string_pretty(&post)?);
    } else {
        println!("✓ Published post {}", post.id);
        if let Some(media_id) = &post.instagram_media_id {
            println!("  media id:  {}", media_id);
        }
        if let Some(permalink) = &post.permalink {
            println!("  permalink: {}", permalink);
        }
    }
    Ok(())
}

/// Pick the account to publish as when --account was not given
///
/// Works without the flag only when exactly one account is connected.
async fn resolve_account(service: &GramcastService, account: Option<String>) -> Result<String> {
    if let Some(id) = account {
        return Ok(id);
    }

    let mut accounts = service.accounts().list_active().await?;
    match accounts.len() {
        0 => Err(GramcastError::NotFound(
            "No accounts connected. Run 'gram-accounts connect-url' to add one".to_string(),
        )),
        1 => Ok(accounts.remove(0).id),
        n => Err(GramcastError::InvalidInput(format!(
            "{} accounts connected; choose one with --account",
            n
        ))),
    }
}

fn read_stdin() -> Result<String> {
    use std::io::Read;

    let mut buffer = String::new();
    std::io::stdin()
        .read_to_string(&mut buffer)
        .map_err(|e| GramcastError::InvalidInput(format!("could not read media URL from stdin: {}", e)))?;
    if buffer.trim().is_empty() {
        return Err(GramcastError::InvalidInput(
            "no media URL provided (pass as argument or on stdin)".to_string(),
        ));
    }
    Ok(buffer.trim().to_string())
}
