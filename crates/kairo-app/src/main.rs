//! Kairo CLI: sign in, upload, and browse shared files.
//!
//! Set KAIRO_BACKEND_URL and KAIRO_ANON_KEY (or SUPABASE_URL and SUPABASE_ANON_KEY).
//! The session is kept in KAIRO_SESSION_FILE between runs.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use kairo_app::auth::AuthWorkflow;
use kairo_app::listing::{DeleteOutcome, Listing, ListingKind, PrivateFiles, PublicFiles, RowView};
use kairo_app::router::{Navigator, Route};
use kairo_app::selection::SelectedFile;
use kairo_app::session::{SessionState, SessionStore};
use kairo_app::upload::UploadWorkflow;
use kairo_app::{init_tracing, truncate_string, Backend, ConsoleNotifier, Notifier};
use kairo_core::{format_bytes, Config, Credentials, Session, SignUpOutcome, Visibility};
use serde::Serialize;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// How long to wait for the session store to observe a sign-in or sign-out.
const SESSION_CHANGE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "kairo", about = "Kairo file sharing CLI")]
struct Cli {
    /// Answer yes to every confirmation prompt
    #[arg(long, short = 'y', global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: String,
        /// Read from KAIRO_PASSWORD or prompted for when omitted
        #[arg(long, env = "KAIRO_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Create an account
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long, env = "KAIRO_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Sign out and forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Upload a file (private unless --public is given)
    Upload {
        /// Path to the file to upload
        file: PathBuf,
        /// List the file for everyone
        #[arg(long, conflicts_with = "private")]
        public: bool,
        /// Only list the file for its owner (default)
        #[arg(long)]
        private: bool,
    },
    /// List public files
    Public {
        /// Case-insensitive filter on the file name
        #[arg(long)]
        search: Option<String>,
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
    /// List your private files
    Private {
        #[arg(long)]
        search: Option<String>,
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
    /// Download a public file by record ID
    Download {
        id: Uuid,
        /// Directory to save into (defaults to the current directory)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
    /// Delete one of your private files by record ID
    Delete { id: Uuid },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

impl Commands {
    /// View each command acts on; the gate decides whether it is reachable.
    fn route(&self) -> Route {
        match self {
            Commands::Login { .. } | Commands::Signup { .. } => Route::Login,
            Commands::Logout | Commands::Whoami | Commands::Upload { .. } => Route::Home,
            Commands::Public { .. } | Commands::Download { .. } => Route::Public,
            Commands::Private { .. } | Commands::Delete { .. } => Route::Private,
        }
    }
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

fn print_file_table(title: &str, rows: &[RowView], empty_message: &str) {
    println!("\n=== {} ===\n", title);

    if rows.is_empty() {
        println!("{}\n", empty_message);
        return;
    }

    println!(
        "{:<36} {:<30} {:<24} {:>10} {:<12} {}",
        "ID", "File Name", "Type", "Size", "Uploaded On", "Actions"
    );
    println!("{}", "-".repeat(124));

    for row in rows {
        println!(
            "{:<36} {:<30} {:<24} {:>10} {:<12} {}",
            row.id,
            truncate_string(&row.name, 30),
            truncate_string(&row.file_type, 24),
            row.size,
            row.uploaded_on,
            row.action
        );
    }

    println!("\nTotal: {} file(s)\n", rows.len());
}

fn read_password(given: Option<String>) -> anyhow::Result<String> {
    if let Some(password) = given {
        return Ok(password);
    }
    eprint!("Password: ");
    io::stderr().flush().ok();
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read password")?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        bail!("A password is required");
    }
    Ok(password)
}

/// Wait until the store reports the expected sign-in state.
async fn await_session(store: &SessionStore, signed_in: bool) -> anyhow::Result<SessionState> {
    let mut rx = store.subscribe();
    let state = tokio::time::timeout(
        SESSION_CHANGE_TIMEOUT,
        rx.wait_for(|state| state.is_authenticated() == signed_in),
    )
    .await
    .context("Timed out waiting for the session to change")?
    .context("Session store stopped")?;
    Ok(state.clone())
}

async fn show_listing<K: ListingKind>(
    listing: &Listing<K>,
    session: &Session,
    search: Option<String>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let mounted = listing.mount(session).await;
    if let Some(term) = search {
        listing.set_search_term(term);
    }

    match format {
        OutputFormat::Json => print_json(&listing.visible())?,
        OutputFormat::Table => {
            print_file_table(listing.title(), &listing.rows(), &listing.empty_message())
        }
    }

    mounted.context("Failed to load files")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    let config = Config::from_env().context(
        "Failed to load configuration. Set KAIRO_BACKEND_URL and KAIRO_ANON_KEY (or SUPABASE_URL and SUPABASE_ANON_KEY)",
    )?;
    let backend = Backend::remote(&config)?;
    let notifier: Arc<dyn Notifier> = Arc::new(ConsoleNotifier::new(cli.yes));

    let store = SessionStore::start(backend.auth.clone()).await;
    let mut navigator = Navigator::new();

    let route = cli.command.route();
    let mounted = navigator.navigate(&store.state(), route.path());
    if mounted != Some(route) {
        match (route, mounted) {
            (_, Some(Route::Login)) => bail!("Not signed in. Run `kairo login` first."),
            (Route::Login, Some(_)) => {
                if let Some(session) = store.current() {
                    println!("Already signed in as {}", session.email());
                }
                return Ok(());
            }
            _ => bail!("Cannot open {}", route),
        }
    }

    match cli.command {
        Commands::Login { email, password } => {
            let password = read_password(password)?;
            let auth = AuthWorkflow::new(backend.auth.clone());
            auth.sign_in(&Credentials::new(email, password)).await?;

            let state = await_session(&store, true).await?;
            navigator.on_session_change(&state);
            if let Some(session) = state.session() {
                println!("Signed in as {}", session.email());
            }
        }
        Commands::Signup { email, password } => {
            let password = read_password(password)?;
            let auth = AuthWorkflow::new(backend.auth.clone());
            match auth.sign_up(&Credentials::new(email, password)).await? {
                SignUpOutcome::SignedIn(_) => {
                    let state = await_session(&store, true).await?;
                    navigator.on_session_change(&state);
                    if let Some(session) = state.session() {
                        println!("Account created. Signed in as {}", session.email());
                    }
                }
                SignUpOutcome::ConfirmationRequired { email } => {
                    println!(
                        "Account created. Confirm the link sent to {}, then run `kairo login`.",
                        email
                    );
                }
            }
        }
        Commands::Logout => {
            let auth = AuthWorkflow::new(backend.auth.clone());
            auth.sign_out().await?;

            let state = await_session(&store, false).await?;
            navigator.on_session_change(&state);
            println!("Signed out.");
        }
        Commands::Whoami => {
            let session = store.current().context("No session")?;
            println!("{} ({})", session.email(), session.user_id());
        }
        Commands::Upload {
            file,
            public,
            private: _,
        } => {
            let session = store.current().context("No session")?;
            let visibility = if public {
                Visibility::Public
            } else {
                Visibility::Private
            };

            let selection = SelectedFile::from_path(&file).await?;
            let upload = UploadWorkflow::new(&backend, notifier.clone(), config.max_upload_bytes);
            upload.select(selection)?;
            let record = upload.upload(&session, visibility).await?;

            println!(
                "{} ({}, {}) id={}",
                record.file_name,
                format_bytes(u64::try_from(record.file_size).unwrap_or(0), 2),
                visibility,
                record.id
            );
        }
        Commands::Public { search, format } => {
            let session = store.current().context("No session")?;
            let listing: Listing<PublicFiles> = Listing::new(&backend, notifier.clone());
            show_listing(&listing, &session, search, format).await?;
        }
        Commands::Private { search, format } => {
            let session = store.current().context("No session")?;
            let listing: Listing<PrivateFiles> = Listing::new(&backend, notifier.clone());
            show_listing(&listing, &session, search, format).await?;
        }
        Commands::Download { id, output } => {
            let session = store.current().context("No session")?;
            let listing: Listing<PublicFiles> = Listing::new(&backend, notifier.clone());
            listing.mount(&session).await?;

            let dir = output.unwrap_or_else(|| PathBuf::from("."));
            let saved = listing.download(id, &dir).await?;
            println!("Saved {}", saved.display());
        }
        Commands::Delete { id } => {
            let session = store.current().context("No session")?;
            let listing: Listing<PrivateFiles> = Listing::new(&backend, notifier.clone());
            listing.mount(&session).await?;

            match listing.delete(id).await? {
                DeleteOutcome::Cancelled => println!("Cancelled."),
                DeleteOutcome::Deleted(record) => println!("Deleted {}", record.file_name),
            }
        }
    }

    Ok(())
}
