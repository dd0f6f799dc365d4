//! Token signing secret utilities.

use clap::Subcommand;
use ring::rand::{SecureRandom, SystemRandom};

#[derive(Subcommand)]
pub enum SecretCommands {
    /// Generate a fresh signing secret for `security.token_secret`
    Generate {
        /// Secret length in bytes before hex encoding
        #[arg(long, default_value = "32")]
        bytes: usize,
    },
}

pub fn handle_secret_command(command: &SecretCommands) {
    match command {
        SecretCommands::Generate { bytes } => {
            let bytes = (*bytes).clamp(16, 128);
            let rng = SystemRandom::new();
            let mut secret = vec![0u8; bytes];
            if rng.fill(&mut secret).is_err() {
                eprintln!("secure random generation failed");
                std::process::exit(1);
            }

            println!("{}", hex::encode(secret));
        }
    }
}
