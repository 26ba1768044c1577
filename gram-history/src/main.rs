//! gram-history - Query local publishing history

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use sqlx::sqlite::SqlitePool;
use sqlx::Row;

#[derive(Parser, Debug)]
#[command(name = "gram-history")]
#[command(version, about = "Query local publishing history")]
#[command(long_about = r#"Query local publishing history with filtering and formatting options.

EXAMPLES:
    # Show last 20 posts (default)
    gram-history

    # Show more posts
    gram-history --limit 50

    # Inspect one post
    gram-history --id 5a3f...

    # Filter by lifecycle status
    gram-history --status published
    gram-history --status failed

    # Filter by account
    gram-history --account <ACCOUNT_ID>

    # Filter by date range
    gram-history --since "2026-08-01" --until "2026-08-15"
    gram-history --since "2026-08-01T09:00:00Z"

    # Search captions
    gram-history --search "launch"

    # JSON output for scripting
    gram-history --format json
    gram-history --format json | jq '.[] | select(.status == "failed") | .error_message'

    # JSONL output (one JSON object per line)
    gram-history --format jsonl

    # Export to CSV for analysis
    gram-history --format csv > posts.csv

OUTPUT FORMATS:
    text  - Human-readable text with timestamps and status (default)
    json  - JSON array (complete data structure)
    jsonl - JSON lines, one object per line (streaming-friendly)
    csv   - CSV with headers (spreadsheet-compatible)

EXIT CODES:
    0 - Success (including empty results)
    1 - Error (database not found, query failed, etc.)
"#)]
struct Args {
    /// Show a single post by id
    #[arg(long, value_name = "POST_ID")]
    id: Option<String>,

    /// Filter by lifecycle status
    #[arg(short, long, value_name = "STATUS")]
    #[arg(value_parser = [
        "pending",
        "container_created",
        "processing",
        "container_finished",
        "published",
        "failed",
    ])]
    status: Option<String>,

    /// Filter by owning account id
    #[arg(short, long, value_name = "ACCOUNT_ID")]
    account: Option<String>,

    /// Filter posts since this date (Unix timestamp or ISO 8601 format)
    #[arg(long, value_name = "DATE")]
    since: Option<String>,

    /// Filter posts until this date (Unix timestamp or ISO 8601 format)
    #[arg(long, value_name = "DATE")]
    until: Option<String>,

    /// Search posts by caption text
    #[arg(long, value_name = "TERM")]
    #[arg(help = "Show posts whose caption contains this text (case-insensitive)")]
    search: Option<String>,

    /// Maximum number of posts to return
    #[arg(short, long, default_value = "20", value_name = "N")]
    limit: usize,

    /// Output format
    #[arg(short, long, default_value = "text", value_name = "FORMAT")]
    #[arg(value_parser = ["text", "json", "jsonl", "csv"])]
    format: String,
}

/// Query parameters for history
#[derive(Debug)]
struct HistoryQuery {
    status: Option<String>,
    account: Option<String>,
    since: Option<i64>,
    until: Option<i64>,
    search: Option<String>,
    limit: usize,
}

/// One post as stored, with raw status/kind strings
#[derive(Debug, Serialize)]
struct HistoryEntry {
    id: String,
    account_id: Option<String>,
    media_kind: String,
    media_url: String,
    caption: Option<String>,
    status: String,
    container_id: Option<String>,
    instagram_media_id: Option<String>,
    permalink: Option<String>,
    error_message: Option<String>,
    created_at: i64,
    updated_at: i64,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    tracing::debug!("gram-history started with args: {:?}", args);

    // Get database path from config
    let config = libgramcast::config::Config::load().context("Failed to load configuration")?;

    let db_path = shellexpand::tilde(&config.database.path).to_string();

    if !std::path::Path::new(&db_path).exists() {
        eprintln!("Error: Database not found at {}", db_path);
        eprintln!("Have you published anything yet? Try: gram-post <MEDIA_URL>");
        std::process::exit(1);
    }

    // Connect read-only; this tool never writes
    let db_url = format!("sqlite://{}?mode=ro", db_path.replace('\\', "/"));
    let pool = SqlitePool::connect(&db_url)
        .await
        .context("Failed to connect to database")?;

    let entries = if let Some(ref id) = args.id {
        let entry = query_one(&pool, id).await?;
        match entry {
            Some(entry) => vec![entry],
            None => anyhow::bail!("No post with id {}", id),
        }
    } else {
        let since = match args.since {
            Some(ref s) => Some(parse_date(s)?),
            None => None,
        };
        let until = match args.until {
            Some(ref s) => Some(parse_date(s)?),
            None => None,
        };

        let query = HistoryQuery {
            status: args.status,
            account: args.account,
            since,
            until,
            search: args.search,
            limit: args.limit,
        };
        query_history(&pool, &query).await?
    };

    print_entries(&entries, &args.format)?;
    Ok(())
}

const ENTRY_COLUMNS: &str = "id, account_id, media_kind, media_url, caption, status, \
     container_id, instagram_media_id, permalink, error_message, created_at, updated_at";

/// Fetch a single post by id
async fn query_one(pool: &SqlitePool, id: &str) -> Result<Option<HistoryEntry>> {
    let sql = format!("SELECT {} FROM posts WHERE id = ?", ENTRY_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to query post")?;
    Ok(row.map(|r| row_to_entry(&r)))
}

/// Query history from the database
async fn query_history(pool: &SqlitePool, query: &HistoryQuery) -> Result<Vec<HistoryEntry>> {
    let mut sql = format!("SELECT {} FROM posts WHERE 1=1", ENTRY_COLUMNS);

    if query.status.is_some() {
        sql.push_str(" AND status = ?");
    }
    if query.account.is_some() {
        sql.push_str(" AND account_id = ?");
    }
    if query.since.is_some() {
        sql.push_str(" AND created_at >= ?");
    }
    if query.until.is_some() {
        sql.push_str(" AND created_at <= ?");
    }
    if query.search.is_some() {
        sql.push_str(" AND caption LIKE '%' || ? || '%'");
    }

    sql.push_str(" ORDER BY created_at DESC LIMIT ?");

    let mut query_builder = sqlx::query(&sql);

    if let Some(ref status) = query.status {
        query_builder = query_builder.bind(status);
    }
    if let Some(ref account) = query.account {
        query_builder = query_builder.bind(account);
    }
    if let Some(since) = query.since {
        query_builder = query_builder.bind(since);
    }
    if let Some(until) = query.until {
        query_builder = query_builder.bind(until);
    }
    if let Some(ref search) = query.search {
        query_builder = query_builder.bind(search);
    }
    query_builder = query_builder.bind(query.limit as i64);

    let rows = query_builder
        .fetch_all(pool)
        .await
        .context("Failed to query posts")?;

    Ok(rows.iter().map(row_to_entry).collect())
}

fn row_to_entry(r: &sqlx::sqlite::SqliteRow) -> HistoryEntry {
    HistoryEntry {
        id: r.get("id"),
        account_id: r.get("account_id"),
        media_kind: r.get("media_kind"),
        media_url: r.get("media_url"),
        caption: r.get("caption"),
        status: r.get("status"),
        container_id: r.get("container_id"),
        instagram_media_id: r.get("instagram_media_id"),
        permalink: r.get("permalink"),
        error_message: r.get("error_message"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    }
}

/// Parse date string to Unix timestamp
fn parse_date(date_str: &str) -> Result<i64> {
    // Try parsing as Unix timestamp first
    if let Ok(timestamp) = date_str.parse::<i64>() {
        return Ok(timestamp);
    }

    // Try parsing as ISO 8601
    let dt = chrono::DateTime::parse_from_rfc3339(date_str)
        .or_else(|_| {
            // Try parsing as date only (YYYY-MM-DD)
            chrono::NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
                .map(|d| d.and_hms_opt(0, 0, 0).unwrap().and_utc().fixed_offset())
        })
        .context(format!(
            "Invalid date format: {}. Use Unix timestamp or ISO 8601 (YYYY-MM-DD or YYYY-MM-DDTHH:MM:SSZ)",
            date_str
        ))?;

    Ok(dt.timestamp())
}

fn print_entries(entries: &[HistoryEntry], format: &str) -> Result<()> {
    match format {
        "json" => {
            let json = serde_json::to_string_pretty(entries)?;
            println!("{}", json);
        }
        "jsonl" => {
            for entry in entries {
                let json = serde_json::to_string(entry)?;
                println!("{}", json);
            }
        }
        "csv" => {
            // CSV format: id,timestamp,status,media_kind,account_id,media_id,permalink,error,caption
            println!("id,created_at,status,media_kind,account_id,instagram_media_id,permalink,error_message,caption");
            for entry in entries {
                let account_id = entry.account_id.as_deref().unwrap_or("");
                let media_id = entry.instagram_media_id.as_deref().unwrap_or("");
                let permalink = entry.permalink.as_deref().unwrap_or("");
                let error = entry.error_message.as_deref().unwrap_or("");
                let caption = entry
                    .caption
                    .as_deref()
                    .unwrap_or("")
                    .replace('"', "\"\""); // Escape quotes

                println!(
                    "{},{},{},{},{},{},{},\"{}\",\"{}\"",
                    entry.id,
                    entry.created_at,
                    entry.status,
                    entry.media_kind,
                    account_id,
                    media_id,
                    permalink,
                    error.replace('"', "\"\""),
                    caption
                );
            }
        }
        "text" => {
            if entries.is_empty() {
                // Empty results - output nothing and exit 0
                return Ok(());
            }

            for entry in entries {
                let dt = chrono::DateTime::from_timestamp(entry.created_at, 0)
                    .unwrap_or_else(chrono::Utc::now);
                let timestamp = dt.format("%Y-%m-%d %H:%M:%S");

                println!(
                    "{} | {} | {} | {}",
                    timestamp, entry.id, entry.media_kind, entry.status
                );

                match entry.status.as_str() {
                    "published" => {
                        let media_id = entry.instagram_media_id.as_deref().unwrap_or("?");
                        if let Some(ref permalink) = entry.permalink {
                            println!("  ✓ media {} → {}", media_id, permalink);
                        } else {
                            println!("  ✓ media {}", media_id);
                        }
                    }
                    "failed" => {
                        let error = entry.error_message.as_deref().unwrap_or("unknown error");
                        println!("  ✗ {}", error);
                    }
                    _ => {
                        if let Some(ref container_id) = entry.container_id {
                            println!("  … in flight (container {})", container_id);
                        } else {
                            println!("  … in flight");
                        }
                    }
                }

                if let Some(ref caption) = entry.caption {
                    // Truncate on char boundaries; captions are full of emoji
                    let mut preview: String = caption.chars().take(60).collect();
                    if preview.len() < caption.len() {
                        preview.push_str("...");
                    }
                    println!("  \"{}\"", preview);
                }
                println!(); // Blank line between entries
            }
        }
        _ => {
            eprintln!(
                "Error: Invalid format '{}'. Valid formats: text, json, jsonl, csv",
                format
            );
            std::process::exit(1);
        }
    }
    Ok(())
}
