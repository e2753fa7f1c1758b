//! capsule - time capsule client
//!
//! Seal a message until a date of your choosing, then open it once that
//! date has passed.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use capsule_cli::actions::CapsuleClient;
use capsule_cli::session::Session;
use capsule_cli::store::HttpStore;
use capsule_cli::view;
use capsule_core::CapsuleError;
use capsule_crypto::ContentKey;

#[derive(Parser, Debug)]
#[command(name = "capsule")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Capsule server base URL
    #[arg(long, env = "CAPSULE_SERVER_URL", default_value = "http://127.0.0.1:3000")]
    server: String,

    /// Base64 content key used to encrypt and decrypt capsule bodies
    #[arg(long, env = "CAPSULE_CONTENT_KEY", hide_env_values = true)]
    content_key: Option<String>,

    /// Where the login session is kept
    #[arg(long, env = "CAPSULE_SESSION_PATH", default_value = ".capsule-session.json")]
    session: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create an account and log in
    Register {
        email: String,
        #[arg(long, env = "CAPSULE_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Log in to an existing account
    Login {
        email: String,
        #[arg(long, env = "CAPSULE_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Forget the saved session
    Logout,

    /// Show who is logged in
    Whoami,

    /// List other people's capsules and your own
    #[command(alias = "ls")]
    List {
        /// Public feed page (1-based)
        #[arg(long, default_value_t = 1)]
        page: u32,
    },

    /// Seal a new capsule
    Create {
        /// When it may be opened: RFC 3339 or YYYY-MM-DD (midnight UTC)
        #[arg(long, value_parser = parse_open_at)]
        open_at: DateTime<Utc>,

        #[arg(long)]
        title: Option<String>,

        /// The message to seal
        message: String,
    },

    /// Open one of your capsules
    Open { id: Uuid },

    /// Delete one of your sealed capsules
    Delete {
        id: Uuid,

        /// Don't ask for confirmation
        #[arg(long)]
        yes: bool,
    },

    /// Print a fresh content key for CAPSULE_CONTENT_KEY
    Keygen,
}

const PUBLIC_PAGE_SIZE: u32 = 6;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let session = Session::load(&cli.session)?;
    let key = cli
        .content_key
        .as_deref()
        .map(ContentKey::from_base64)
        .transpose()
        .context("CAPSULE_CONTENT_KEY is not a valid key")?;

    let store = HttpStore::new(&cli.server, session.as_ref().map(|s| s.token.clone()));
    let client = CapsuleClient::new(store, session.as_ref().map(|s| s.user_id), key);
    let now = Utc::now();

    match cli.command {
        Commands::Register { email, password } => {
            let auth = client.store().register(&email, &password).await.map_err(notice)?;
            Session::from(auth).save(&cli.session)?;
            println!("Welcome, {}!", email);
        }
        Commands::Login { email, password } => {
            let auth = client.store().login(&email, &password).await.map_err(notice)?;
            let session = Session::from(auth);
            session.save(&cli.session)?;
            println!("Logged in as {}.", session.email);
        }
        Commands::Logout => {
            if Session::clear(&cli.session)? {
                println!("Logged out.");
            } else {
                println!("Not logged in.");
            }
        }
        Commands::Whoami => match &session {
            Some(s) => println!("{} ({})", s.email, s.user_id),
            None => println!("Not logged in."),
        },
        Commands::List { page } => {
            let listing = client
                .listing(page.max(1), PUBLIC_PAGE_SIZE, now)
                .await
                .map_err(notice)?;
            print!("{}", view::render_listing(&listing, now, session.is_some()));
        }
        Commands::Create {
            open_at,
            title,
            message,
        } => {
            let created = client
                .create(title.as_deref(), &message, open_at, now)
                .await
                .map_err(notice)?;
            print!("{}", view::render_created(&created));
        }
        Commands::Open { id } => {
            let revealed = client.open(id, now).await.map_err(notice)?;
            print!("{}", view::render_revealed(&revealed));
        }
        Commands::Delete { id, yes } => {
            if !yes && !confirm("Really delete this capsule? It cannot be recovered.")? {
                println!("Cancelled.");
                return Ok(());
            }
            client.delete(id, now).await.map_err(notice)?;
            println!("Deleted.");
        }
        Commands::Keygen => println!("{}", ContentKey::generate().to_base64()),
    }

    Ok(())
}

/// Turn a capsule error into the message shown to the user.
fn notice(err: CapsuleError) -> anyhow::Error {
    match err {
        CapsuleError::Unauthenticated => anyhow::anyhow!("not logged in; run `capsule login <email>` first"),
        CapsuleError::Backend(_) => anyhow::anyhow!("{}; please try again", err),
        other => other.into(),
    }
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(matches!(line.trim(), "y" | "Y" | "yes"))
}

fn parse_open_at(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| format!("expected RFC 3339 or YYYY-MM-DD, got '{}'", raw))
}
