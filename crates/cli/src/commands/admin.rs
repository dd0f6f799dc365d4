//! Admin account management commands.

use clap::Subcommand;
use firin_core::auth::repository::UserRepository;
use firin_core::auth::totp;
use firin_core::auth::user::hash_password;
use ring::rand::{SecureRandom, SystemRandom};

#[derive(Subcommand)]
pub enum AdminCommands {
    /// Create a new admin account
    Create {
        username: String,

        /// Password (hashed with Argon2id before storage)
        #[arg(long)]
        password: String,

        /// Role: admin or editor
        #[arg(long, default_value = "admin")]
        role: String,
    },

    /// List all admin accounts
    List,

    /// Deactivate an account (it can no longer log in)
    Deactivate { username: String },

    /// Reactivate a deactivated account
    Activate { username: String },

    /// Change an account's password
    SetPassword {
        username: String,

        #[arg(long)]
        password: String,
    },

    /// Enable the TOTP second factor; prints the generated secret
    EnableTotp { username: String },

    /// Disable the TOTP second factor
    DisableTotp { username: String },
}

/// # Errors
/// Propagates repository and hashing failures.
pub async fn handle_admin_command(
    command: AdminCommands,
    repo: &dyn UserRepository,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        AdminCommands::Create { username, password, role } => {
            if !matches!(role.as_str(), "admin" | "editor") {
                return Err(format!("unknown role '{role}' (expected admin or editor)").into());
            }
            if repo.find_by_username(&username).await?.is_some() {
                return Err(format!("account '{username}' already exists").into());
            }

            let hash = hash_password(&password)?;
            let id = repo.create(&username, &hash, &role).await?;
            println!("created account '{username}' (id {id}, role {role})");
        }

        AdminCommands::List => {
            let users = repo.list_all().await?;
            if users.is_empty() {
                println!("no admin accounts");
                return Ok(());
            }

            println!("{:<6} {:<24} {:<8} {:<8} {:<6} last login", "id", "username", "role", "active", "2fa");
            for user in users {
                println!(
                    "{:<6} {:<24} {:<8} {:<8} {:<6} {}",
                    user.id,
                    user.username,
                    user.role,
                    if user.is_active { "yes" } else { "no" },
                    if user.two_factor_enabled() { "yes" } else { "no" },
                    user.last_login_at
                        .map_or_else(|| "never".to_string(), |t| t.to_rfc3339()),
                );
            }
        }

        AdminCommands::Deactivate { username } => {
            require_account(repo, &username).await?;
            repo.set_active(&username, false).await?;
            println!("deactivated '{username}'");
        }

        AdminCommands::Activate { username } => {
            require_account(repo, &username).await?;
            repo.set_active(&username, true).await?;
            println!("activated '{username}'");
        }

        AdminCommands::SetPassword { username, password } => {
            require_account(repo, &username).await?;
            let hash = hash_password(&password)?;
            repo.set_password(&username, &hash).await?;
            println!("password updated for '{username}'");
        }

        AdminCommands::EnableTotp { username } => {
            require_account(repo, &username).await?;

            let rng = SystemRandom::new();
            let mut secret = [0u8; 20];
            rng.fill(&mut secret).map_err(|_| "secure random generation failed")?;
            let secret_hex = hex::encode(secret);

            repo.set_totp_secret(&username, Some(&secret_hex)).await?;

            let now = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs() as i64)
                .unwrap_or_default();
            println!("TOTP enabled for '{username}'");
            println!("secret (hex): {secret_hex}");
            println!("current code: {:06}", totp::code_at(&secret, now));
        }

        AdminCommands::DisableTotp { username } => {
            require_account(repo, &username).await?;
            repo.set_totp_secret(&username, None).await?;
            println!("TOTP disabled for '{username}'");
        }
    }

    Ok(())
}

async fn require_account(
    repo: &dyn UserRepository,
    username: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    if repo.find_by_username(username).await?.is_none() {
        return Err(format!("no such account '{username}'").into());
    }
    Ok(())
}
