//! Courier - retrieve, inspect and share Gmail messages from the terminal
//!
//! Every command prints JSON on stdout; logs go to stderr.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use base64::prelude::*;
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use log::{debug, error, info};
use mail::{
    FetchCriteria, GmailAuth, GmailClient, GmailCredentials, MailService, SearchCriteria,
    ServiceConfig, SessionProvider, ShareManager, ShareOptions, SqliteShareStore,
};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "courier", version, about = "Read-only Gmail retrieval and message sharing")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Authorize access to the mailbox in the browser
    Login,
    /// Forget stored tokens
    Logout,
    /// Show the authenticated mailbox
    Whoami,
    /// Fetch a page of a folder or label
    List {
        /// Folder or label (INBOX, SENT, or any label name)
        #[arg(short, long)]
        label: Option<String>,
        #[arg(long)]
        page_token: Option<String>,
        /// Also filter by label id
        #[arg(long)]
        include_labels: bool,
        #[arg(short, long)]
        max: Option<u32>,
        /// Bypass the page cache
        #[arg(long)]
        no_cache: bool,
    },
    /// Search with Gmail query syntax
    Search {
        query: String,
        #[arg(long = "label-id")]
        label_ids: Vec<String>,
        #[arg(long)]
        page_token: Option<String>,
        #[arg(short, long)]
        max: Option<u32>,
    },
    /// Show a single message
    Show { id: String },
    /// Download an attachment
    Attachment {
        message_id: String,
        attachment_id: String,
        /// Write decoded bytes here instead of printing the raw payload
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Manage share links
    Share {
        #[command(subcommand)]
        command: ShareCommands,
    },
}

#[derive(Subcommand)]
enum ShareCommands {
    /// Create a share link for a message
    Create {
        email_id: String,
        #[arg(short, long)]
        name: Option<String>,
        /// Lifetime in days; the configured default applies otherwise
        #[arg(short, long)]
        days: Option<i64>,
    },
    /// Resolve a share and show its message
    Open { share_id: String },
    /// Deactivate one of your shares
    Revoke { share_id: String },
    /// Rename one of your shares
    Rename { share_id: String, name: String },
    /// List your shares, newest first
    List,
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_millis()
        .init();

    if let Err(e) = config::init() {
        error!("Failed to initialize config directory: {}", e);
    }

    if let Err(e) = run(cli.command) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<()> {
    let settings = ServiceConfig::load().context("Failed to load courier.json")?;
    debug!("Using app url {}", settings.app_url);

    match command {
        Commands::Login => {
            let auth = gmail_auth()?;
            auth.login()?;
            info!("Logged in");
            print_json(&serde_json::json!({ "authenticated": true }))
        }
        Commands::Logout => {
            gmail_auth()?.logout()?;
            info!("Logged out");
            print_json(&serde_json::json!({ "authenticated": false }))
        }
        Commands::Whoami => {
            let client = authenticated_client()?;
            print_json(&client.profile()?)
        }
        Commands::List {
            label,
            page_token,
            include_labels,
            max,
            no_cache,
        } => {
            let service = mail_service(&settings)?;
            let mut criteria = FetchCriteria {
                label,
                page_token,
                include_labels,
                max_results: max,
            };
            if criteria.label.is_none() {
                criteria.label = Some(mail::retrieval::folders::INBOX.to_string());
            }
            print_json(&service.fetch_page(&criteria, !no_cache)?)
        }
        Commands::Search {
            query,
            label_ids,
            page_token,
            max,
        } => {
            let service = mail_service(&settings)?;
            let criteria = SearchCriteria {
                page_token,
                max_results: max,
                label_ids,
            };
            print_json(&service.search(&query, &criteria)?)
        }
        Commands::Show { id } => print_json(&mail_service(&settings)?.get_message(&id)?),
        Commands::Attachment {
            message_id,
            attachment_id,
            output,
        } => {
            let attachment = mail_service(&settings)?.get_attachment(&message_id, &attachment_id)?;
            match output {
                Some(path) => {
                    let bytes = BASE64_URL_SAFE_NO_PAD
                        .decode(attachment.data.trim_end_matches('='))
                        .context("Attachment payload is not valid base64url")?;
                    std::fs::write(&path, &bytes)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!("Wrote {} bytes to {}", bytes.len(), path.display());
                    print_json(&serde_json::json!({
                        "path": path,
                        "size": bytes.len(),
                    }))
                }
                None => print_json(&attachment),
            }
        }
        Commands::Share { command } => run_share(command, &settings),
    }
}

fn run_share(command: ShareCommands, settings: &ServiceConfig) -> Result<()> {
    let store = SqliteShareStore::new(settings.share_db_path()?)?;
    let shares = ShareManager::from_config(Arc::new(store), settings);

    match command {
        ShareCommands::Create {
            email_id,
            name,
            days,
        } => {
            let user_id = authenticated_client()?.current_user_id()?;
            let mut options = ShareOptions::for_user(user_id);
            if let Some(name) = name {
                options = options.name(name);
            }
            if let Some(days) = days {
                if days <= 0 {
                    bail!("--days must be positive");
                }
                options = options.expires_at(Utc::now() + Duration::days(days));
            }
            print_json(&shares.create(&email_id, options)?)
        }
        ShareCommands::Open { share_id } => {
            let record = shares.resolve(&share_id)?;
            let message = mail_service(settings)?.get_message(&record.email_id)?;
            print_json(&serde_json::json!({
                "share": record,
                "email": message,
            }))
        }
        ShareCommands::Revoke { share_id } => {
            let user_id = authenticated_client()?.current_user_id()?;
            let revoked = shares.revoke(&share_id, &user_id)?;
            if !revoked {
                report_unmatched(&shares, &share_id)?;
            }
            print_json(&serde_json::json!({ "shareId": share_id, "revoked": revoked }))
        }
        ShareCommands::Rename { share_id, name } => {
            let user_id = authenticated_client()?.current_user_id()?;
            let renamed = shares.rename(&share_id, &user_id, &name)?;
            if !renamed {
                report_unmatched(&shares, &share_id)?;
            }
            print_json(&serde_json::json!({ "shareId": share_id, "renamed": renamed }))
        }
        ShareCommands::List => {
            let user_id = authenticated_client()?.current_user_id()?;
            print_json(&shares.list(&user_id)?)
        }
    }
}

/// Explain why an owner-scoped update matched nothing
fn report_unmatched(shares: &ShareManager, share_id: &str) -> Result<()> {
    match shares.find(share_id)? {
        Some(_) => info!("Share {} belongs to another user", share_id),
        None => info!("Share {} does not exist", share_id),
    }
    Ok(())
}

fn gmail_auth() -> Result<GmailAuth> {
    let credentials = GmailCredentials::load().map_err(|e| {
        if let Some(path) = GmailCredentials::default_credentials_path() {
            error!(
                "Place your Google OAuth credentials at {} or set GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET",
                path.display()
            );
        }
        e
    })?;
    GmailAuth::new(credentials)
}

fn authenticated_client() -> Result<GmailClient> {
    let client = GmailClient::new(gmail_auth()?);
    if !client.is_token_valid() {
        bail!(mail::AuthError::NotAuthenticated);
    }
    Ok(client)
}

fn mail_service(settings: &ServiceConfig) -> Result<MailService> {
    let client = authenticated_client()?;
    Ok(MailService::from_config(Arc::new(client), settings))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
