mod admin;
mod secret;

pub use admin::{handle_admin_command, AdminCommands};
pub use secret::{handle_secret_command, SecretCommands};
