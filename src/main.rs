use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::bail;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use dispensary::auth::{CredentialHasher, generate_password};
use dispensary::config::{DB_FILE_NAME, ServerConfig};
use dispensary::seed::seed_demo_data;
use dispensary::server::{AppState, create_router};
use dispensary::store::{SqliteStore, Store};
use dispensary::types::{NewUser, Role};

const ADMIN_PASSWORD_FILE: &str = ".admin_password";
const DEFAULT_ADMIN_USERNAME: &str = "admin";
const GENERATED_PASSWORD_LEN: usize = 20;

#[cfg(unix)]
fn set_restrictive_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
        tracing::warn!("Failed to set permissions on {}: {e}", path.display());
    }
}

#[derive(Parser)]
#[command(name = "dispensary")]
#[command(about = "A pharmacy management server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve {
        /// Host to bind to (overrides dispensary.toml)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (overrides dispensary.toml)
        #[arg(long, short)]
        port: Option<u16>,

        /// Data directory for the database and config file
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Mark session cookies Secure (serve behind HTTPS)
        #[arg(long)]
        secure_cookies: bool,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Initialize the server (create the database and a manager account)
    Init {
        /// Data directory for the database and config file
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Skip interactive prompts
        #[arg(long)]
        non_interactive: bool,
    },

    /// Load the demo catalogue and demo accounts
    Seed {
        /// Data directory for the database and config file
        #[arg(long, default_value = "./data")]
        data_dir: String,
    },
}

fn open_initialized(data_path: &Path) -> anyhow::Result<SqliteStore> {
    let db_path = data_path.join(DB_FILE_NAME);
    if !db_path.exists() {
        bail!("Server not initialized. Run 'dispensary admin init' first to create the database.");
    }

    let store = SqliteStore::new(&db_path)?;
    store.initialize()?;
    if !store.has_manager()? {
        bail!("Server not initialized. Run 'dispensary admin init' first to create a manager.");
    }
    Ok(store)
}

fn prompt_manager_credentials() -> anyhow::Result<(String, String)> {
    let username = inquire::Text::new("Manager username:")
        .with_default(DEFAULT_ADMIN_USERNAME)
        .with_validator(|input: &str| {
            if input.trim().is_empty() {
                Err("Username cannot be empty".into())
            } else if input.contains(char::is_whitespace) {
                Err("Username cannot contain whitespace".into())
            } else {
                Ok(inquire::validator::Validation::Valid)
            }
        })
        .prompt()?;

    let password = inquire::Password::new("Manager password:")
        .with_validator(|input: &str| {
            if input.len() < 6 {
                Err("Password must be at least 6 characters".into())
            } else {
                Ok(inquire::validator::Validation::Valid)
            }
        })
        .prompt()?;

    Ok((username.trim().to_string(), password))
}

fn run_init(data_dir: String, non_interactive: bool) -> anyhow::Result<()> {
    let data_path: PathBuf = data_dir.into();
    fs::create_dir_all(&data_path)?;

    let store = SqliteStore::new(data_path.join(DB_FILE_NAME))?;
    store.initialize()?;

    let password_file = data_path.join(ADMIN_PASSWORD_FILE);

    if store.has_manager()? {
        bail!(
            "Server already initialized. A manager account exists (initial password file: {}).",
            password_file.display()
        );
    }

    let (username, password, generated) = if non_interactive {
        (
            DEFAULT_ADMIN_USERNAME.to_string(),
            generate_password(GENERATED_PASSWORD_LEN),
            true,
        )
    } else {
        let (username, password) = prompt_manager_credentials()?;
        (username, password, false)
    };

    let hasher = CredentialHasher::new();
    let email = format!("{username}@dispensary.local");
    let manager = store.create_user(&NewUser {
        username,
        password_hash: hasher.hash(&password)?,
        email,
        full_name: "Store Manager".to_string(),
        phone: None,
        address: None,
        role: Role::Manager,
    })?;

    println!();
    println!("========================================");
    println!("Created manager account '{}'", manager.username);

    if generated {
        fs::write(&password_file, &password)?;

        #[cfg(unix)]
        set_restrictive_permissions(&password_file);

        println!("Password (save this, it won't be shown again):");
        println!();
        println!("  {password}");
        println!();
        println!("Password also written to: {}", password_file.display());
    }

    println!("========================================");
    println!();

    Ok(())
}

fn run_seed(data_dir: String) -> anyhow::Result<()> {
    let data_path: PathBuf = data_dir.into();
    let store = open_initialized(&data_path)?;

    let report = seed_demo_data(&store, &CredentialHasher::new(), Utc::now())?;
    if report.is_empty() {
        println!("Database already seeded");
    } else {
        println!(
            "Seeded {} categories, {} medicines, {} batches and {} accounts",
            report.categories, report.medicines, report.batches, report.users
        );
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("dispensary=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => match command {
            AdminCommands::Init {
                data_dir,
                non_interactive,
            } => {
                run_init(data_dir, non_interactive)?;
            }
            AdminCommands::Seed { data_dir } => {
                run_seed(data_dir)?;
            }
        },
        Commands::Serve {
            host,
            port,
            data_dir,
            secure_cookies,
        } => {
            let mut config = ServerConfig::load(data_dir)?;
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            if secure_cookies {
                config.secure_cookies = true;
            }

            let store = open_initialized(&config.data_dir)?;
            let purged = store.purge_expired_sessions(Utc::now())?;
            if purged > 0 {
                info!("Purged {purged} expired sessions");
            }

            let addr = config.socket_addr()?;
            let state = Arc::new(AppState::new(Arc::new(store), config));
            let app = create_router(state);

            info!("Starting server on {}", addr);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
