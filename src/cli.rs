//! CLI module for the push service
//!
//! Runs the HTTP server, applies the schema, or prints a new VAPID key pair.

use clap::{Parser, Subcommand};

use crate::{
    configuration::{get_configuration, set_configuration, Config, State},
    error::Error,
    provider::DatabasePool,
    push::generate_vapid_keys,
};

/// PWA push notification service
#[derive(Parser)]
#[command(name = "pwa-push")]
#[command(about = "Web Push subscription and delivery service", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the HTTP server (default if no command specified)
    Serve,

    /// Apply the database schema and exit
    Migrate,

    /// Print a fresh VAPID key pair as environment lines
    GenVapid {
        /// Subject written next to the keys
        #[arg(long, default_value = "mailto:you@example.com")]
        subject: String,
    },
}

/// Initialize configuration and return Config
pub fn init_config() -> Result<Config, Error> {
    set_configuration()?;
    get_configuration()
}

pub async fn run_migrate() -> Result<(), Error> {
    let config = init_config()?;
    let database = DatabasePool::new(&config).await?;

    tracing::info!("Applying database schema...");
    State::init_migrations(&database).await?;
    tracing::info!("Schema up to date");

    Ok(())
}

pub fn run_gen_vapid(subject: &str) -> Result<String, Error> {
    let (public_key, private_key) = generate_vapid_keys()?;

    Ok(format!(
        "VAPID_PUBLIC_KEY=\"{public_key}\"\nNEXT_PUBLIC_VAPID_PUBLIC_KEY=\"{public_key}\"\nVAPID_PRIVATE_KEY=\"{private_key}\"\nVAPID_SUBJECT=\"{subject}\""
    ))
}
