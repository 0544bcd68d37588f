//! flatcms admin CLI
//!
//! Administration tool for the credential store.
//!
//! # Usage
//!
//! ```bash
//! flatcms-admin user add admin --password super_secret
//! flatcms-admin user list
//! flatcms-admin user verify admin --password super_secret
//! ```
//!
//! Honors the same config file and `FLATCMS_*` environment variables as the
//! server.

use clap::{Args, Parser, Subcommand};
use flatcms::cms::{error_for_signup, CredentialStore};
use flatcms::Config;
use std::path::PathBuf;

// ============================================================================
// CLI Structure
// ============================================================================

#[derive(Parser)]
#[command(name = "flatcms-admin")]
#[command(version)]
#[command(about = "flatcms administration tool")]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage users
    User(UserCommand),
}

#[derive(Args)]
struct UserCommand {
    #[command(subcommand)]
    command: UserSubcommand,
}

#[derive(Subcommand)]
enum UserSubcommand {
    /// Add a new user
    Add {
        /// Username
        username: String,
        /// Password (at least 6 characters)
        #[arg(long, short)]
        password: String,
    },
    /// List all users
    List,
    /// Check a username and password
    Verify {
        /// Username
        username: String,
        /// Password to check
        #[arg(long, short)]
        password: String,
    },
}

// ============================================================================
// Commands
// ============================================================================

fn add_user(
    store: &CredentialStore,
    username: &str,
    password: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    store.ensure_exists()?;
    let credentials = store.load()?;

    if let Some(error) = error_for_signup(username, password, password, &credentials) {
        eprintln!("Error: {}", error);
        std::process::exit(1);
    }

    store.append(username, password)?;

    println!("Added user: {}", username);
    Ok(())
}

fn list_users(store: &CredentialStore) -> Result<(), Box<dyn std::error::Error>> {
    let mut usernames: Vec<String> = store.load()?.into_keys().collect();

    if usernames.is_empty() {
        println!("No users registered.");
        return Ok(());
    }

    usernames.sort();
    for username in &usernames {
        println!("{}", username);
    }

    println!();
    println!("Total: {} user(s)", usernames.len());

    Ok(())
}

fn verify_user(
    store: &CredentialStore,
    username: &str,
    password: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    if store.verify(username, password)? {
        println!("Credentials are valid.");
        Ok(())
    } else {
        eprintln!("Invalid Credentials");
        std::process::exit(1);
    }
}

// ============================================================================
// Main
// ============================================================================

fn main() {
    let cli = Cli::parse();

    let result = Config::load(cli.config)
        .map_err(|e| -> Box<dyn std::error::Error> { Box::new(e) })
        .and_then(|config| {
            let store = CredentialStore::new(config.credentials_path);
            match cli.command {
                Commands::User(user_cmd) => match user_cmd.command {
                    UserSubcommand::Add { username, password } => {
                        add_user(&store, &username, &password)
                    }
                    UserSubcommand::List => list_users(&store),
                    UserSubcommand::Verify { username, password } => {
                        verify_user(&store, &username, &password)
                    }
                },
            }
        });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
