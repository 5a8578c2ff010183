//! AI VideoGen CLI - sign in, manage your account and queue videos.
//!
//! Every command resolves the stored session first, the same way the app
//! does on launch, then runs against it.

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use videogen_core::models::ResetPasswordRequest;
use videogen_core::{
    ApiClient, Config, CredentialStore, Platform, SessionCache, SessionManager, SessionStatus,
    Studio, StudioEvent, User,
};

// ============================================================================
// Constants
// ============================================================================

/// Log file name in the cache directory
const LOG_FILE: &str = "videogen.log";

/// Extra time allowed past the generation delay before giving up on the event
const GENERATION_GRACE_SECS: u64 = 5;

// ============================================================================
// Command line
// ============================================================================

#[derive(Parser)]
#[command(name = "videogen", version, about = "AI VideoGen command-line client")]
struct Cli {
    /// Keep credentials in memory only; nothing is read from or written to disk
    #[arg(long, global = true)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show who is signed in
    Status {
        /// Print the user record as JSON
        #[arg(long)]
        json: bool,
    },
    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: Option<String>,
    },
    /// Create an account
    Signup {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
    },
    /// Sign out and forget stored credentials
    Logout,
    /// Request a password reset email or code
    ForgotPassword {
        #[arg(long)]
        email: String,
    },
    /// Set a new password with an emailed code or reset token
    ResetPassword {
        #[arg(long, conflicts_with = "token", requires = "code")]
        email: Option<String>,
        #[arg(long, requires = "email")]
        code: Option<String>,
        #[arg(long)]
        token: Option<String>,
    },
    /// Confirm a new account with the emailed code
    VerifyEmail {
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        code: String,
    },
    /// Send the verification code again
    ResendVerification {
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        email: String,
    },
    /// Show the profile, or rename it with --name
    Profile {
        #[arg(long)]
        name: Option<String>,
    },
    /// Change the account password
    ChangePassword,
    /// Permanently delete the account
    DeleteAccount {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Generate a video from a prompt
    Generate {
        prompt: String,
        /// Target platforms (youtube, instagram, tiktok)
        #[arg(long = "platform", short, value_delimiter = ',', required = true)]
        platforms: Vec<String>,
    },
}

// ============================================================================
// Setup
// ============================================================================

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr; with `log_to_file` set they are also appended to a
/// file in the cache directory. The returned guard must outlive `main`.
fn init_tracing(config: &Config) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let mut guard = None;
    let file_layer = if config.log_to_file {
        match config.cache_dir() {
            Ok(dir) => {
                let appender = tracing_appender::rolling::never(dir, LOG_FILE);
                let (writer, worker) = tracing_appender::non_blocking(appender);
                guard = Some(worker);
                Some(fmt::layer().with_ansi(false).with_writer(writer))
            }
            Err(e) => {
                eprintln!("File logging disabled: {}", e);
                None
            }
        }
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

fn load_config() -> Config {
    let mut config = Config::load().unwrap_or_else(|e| {
        eprintln!("Ignoring unreadable config: {}", e);
        Config::default()
    });
    config.apply_env();
    config
}

fn build_manager(config: &Config, ephemeral: bool) -> Result<SessionManager> {
    let store = if ephemeral {
        CredentialStore::in_memory()
    } else {
        config.credential_store()?
    };
    let api = ApiClient::new(
        &config.client_config(),
        Arc::new(store),
        Arc::new(SessionCache::new()),
    )
    .context("Failed to create API client")?;
    Ok(SessionManager::new(api))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let mut config = load_config();
    let _guard = init_tracing(&config);
    info!(api = %config.api_base_url, ephemeral = cli.ephemeral, "VideoGen CLI starting");

    let manager = build_manager(&config, cli.ephemeral)?;
    manager.startup().await;

    run(cli.command, &manager, &mut config).await
}

// ============================================================================
// Commands
// ============================================================================

async fn run(command: Command, manager: &SessionManager, config: &mut Config) -> Result<()> {
    match command {
        Command::Status { json } => status(manager, json),
        Command::Login { email } => {
            let email = match email.or_else(|| config.last_email.clone()) {
                Some(email) => email,
                None => prompt_line("Email: ")?,
            };
            let password = prompt_password("Password: ")?;
            let user = manager.login(&email, &password).await?;
            remember_email(config, &email);
            println!("Welcome back, {}!", user.first_name());
            Ok(())
        }
        Command::Signup { name, email } => {
            let password = prompt_new_password()?;
            let user = manager.signup(&name, &email, &password).await?;
            remember_email(config, &email);
            println!("Account created. Welcome, {}!", user.first_name());
            Ok(())
        }
        Command::Logout => {
            let was_signed_in = manager.is_authenticated();
            manager.logout().await;
            if was_signed_in {
                println!("Signed out.");
            } else {
                println!("Not signed in.");
            }
            Ok(())
        }
        Command::ForgotPassword { email } => {
            match manager.forgot_password(&email).await? {
                Some(challenge) => println!(
                    "A reset code was sent to {}. Reference: {}",
                    email, challenge
                ),
                None => println!("If an account exists for {}, a reset email is on its way.", email),
            }
            Ok(())
        }
        Command::ResetPassword { email, code, token } => {
            let request = match (email, code, token) {
                (_, _, Some(token)) => ResetPasswordRequest::with_token(token, prompt_new_password()?),
                (Some(email), Some(code), None) => {
                    manager.verify_reset_code(&email, &code).await?;
                    ResetPasswordRequest::with_code(email, code, prompt_new_password()?)
                }
                _ => bail!("Provide either --token or both --email and --code"),
            };
            let user = manager.reset_password(&request).await?;
            if let Some(email) = request.email.as_deref() {
                remember_email(config, email);
            }
            println!("Password updated. Signed in as {}.", user.email);
            Ok(())
        }
        Command::VerifyEmail { user_id, code } => {
            let user = manager.verify_email(&user_id, &code).await?;
            remember_email(config, &user.email);
            println!("Email verified. Welcome, {}!", user.first_name());
            Ok(())
        }
        Command::ResendVerification { user_id, email } => {
            manager.resend_verification(&user_id, &email).await?;
            println!("A new verification code was sent to {}.", email);
            Ok(())
        }
        Command::Profile { name } => {
            require_user(manager)?;
            let user = match name {
                Some(name) => manager.update_profile(name.trim()).await?,
                None => manager.reload_identity().await?,
            };
            print_user(&user);
            Ok(())
        }
        Command::ChangePassword => {
            require_user(manager)?;
            let current = prompt_password("Current password: ")?;
            let new = prompt_new_password()?;
            manager.change_password(&current, &new).await?;
            println!("Password changed.");
            Ok(())
        }
        Command::DeleteAccount { yes } => {
            let user = require_user(manager)?;
            if !yes {
                let answer = prompt_line(&format!("Delete the account for {}? Type 'delete' to confirm: ", user.email))?;
                if answer != "delete" {
                    println!("Cancelled.");
                    return Ok(());
                }
            }
            let password = prompt_password("Password: ")?;
            manager.delete_account(&password).await?;
            config.last_email = None;
            save_config(config);
            println!("Account deleted.");
            Ok(())
        }
        Command::Generate { prompt, platforms } => generate(manager, config, &prompt, &platforms).await,
    }
}

fn status(manager: &SessionManager, json: bool) -> Result<()> {
    let session = manager.session();
    match (session.status, session.identity) {
        (SessionStatus::Authenticated, Some(user)) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&user)?);
            } else {
                println!("Signed in");
                print_user(&user);
            }
        }
        _ if json => println!("null"),
        _ => println!("Not signed in."),
    }
    Ok(())
}

async fn generate(manager: &SessionManager, config: &Config, prompt: &str, platforms: &[String]) -> Result<()> {
    let user = require_user(manager)?;

    let mut selected = Vec::with_capacity(platforms.len());
    for id in platforms {
        match Platform::from_id(id.trim()) {
            Some(platform) => selected.push(platform),
            None => bail!(
                "Unknown platform '{}'. Choose from: {}",
                id,
                Platform::ALL.map(|p| p.id()).join(", ")
            ),
        }
    }

    let studio = Studio::new(config.generation_delay());
    studio.sync_from_user(&user).await;
    let mut events = studio.subscribe();

    let post = studio.submit(prompt, &selected).await?;
    println!("Generating \"{}\" for {}...", post.title, join_platforms(&post.platforms));

    let deadline = config.generation_delay() + Duration::from_secs(GENERATION_GRACE_SECS);
    let wait = async {
        loop {
            match events.recv().await {
                Ok(StudioEvent::Generated { post_id }) if post_id == post.id => return Ok(()),
                Ok(_) => continue,
                Err(e) => return Err(e),
            }
        }
    };
    match tokio::time::timeout(deadline, wait).await {
        Ok(Ok(())) => {
            println!("Video ready: {}", post.title);
            Ok(())
        }
        Ok(Err(e)) => bail!("Lost track of the generation: {}", e),
        Err(_) => bail!("Generation did not finish within {}s", deadline.as_secs()),
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn require_user(manager: &SessionManager) -> Result<User> {
    match manager.current_user() {
        Some(user) if manager.is_authenticated() => Ok(user),
        _ => bail!("Not signed in. Run `videogen login` first."),
    }
}

fn print_user(user: &User) {
    println!("  Name:      {}", user.name);
    println!("  Email:     {}", user.email);
    println!("  Plan:      {}", user.plan);
    println!("  Videos:    {}", user.videos_generated);
    if !user.connected_platforms.is_empty() {
        println!("  Platforms: {}", user.connected_platforms.join(", "));
    }
}

fn join_platforms(platforms: &[Platform]) -> String {
    platforms
        .iter()
        .map(|p| p.display_name())
        .collect::<Vec<_>>()
        .join(", ")
}

fn remember_email(config: &mut Config, email: &str) {
    if config.last_email.as_deref() == Some(email) {
        return;
    }
    config.last_email = Some(email.to_string());
    save_config(config);
}

fn save_config(config: &Config) {
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to save config");
    }
}

fn prompt_line(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line).context("Failed to read input")?;
    Ok(line.trim().to_string())
}

fn prompt_password(label: &str) -> Result<String> {
    let password = rpassword::prompt_password(label)?;
    Ok(password)
}

fn prompt_new_password() -> Result<String> {
    let password = prompt_password("New password: ")?;
    let confirm = prompt_password("Confirm password: ")?;
    if password != confirm {
        bail!("Passwords do not match");
    }
    Ok(password)
}
