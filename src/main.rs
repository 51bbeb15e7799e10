use std::sync::Arc;

use clap::Parser;
use tracing::{error, Level};

use pwa_push::{
    cli::{init_config, run_gen_vapid, run_migrate, Cli, Commands},
    configuration::{AppState, Config, State},
    error::Error,
    provider::{DatabasePool, HTTP},
    push::WebPush,
    server,
};

#[tokio::main]
async fn main() -> Result<(), Error> {
    let result = app_main().await;

    if let Err(err) = &result {
        error!("{}", err);
    }

    result
}

async fn app_main() -> Result<(), Error> {
    let subscriber = tracing_subscriber::fmt()
        .compact()
        .with_level(true)
        .with_max_level({
            #[cfg(debug_assertions)]
            {
                Level::INFO
            }

            #[cfg(not(debug_assertions))]
            {
                Level::INFO
            }
        })
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_server().await,
        Commands::Migrate => run_migrate().await,
        Commands::GenVapid { subject } => {
            println!("{}", run_gen_vapid(&subject)?);
            Ok(())
        },
    }
}

async fn run_server() -> Result<(), Error> {
    let (config, database) = match init().await {
        Ok((config, database)) => (config, database),
        Err(e) => return Err(Error::ConfigurationError(e.to_string())),
    };

    let http = HTTP::new(&config)?;
    let push = WebPush::new(http, config.vapid_keys()?, config.push_header());

    let state = State::new(config, database, Arc::new(push)).await?;
    let app_state = AppState::new(state);

    server::server_task(&app_state).await
}

async fn init() -> Result<(Config, DatabasePool), Error> {
    let config = init_config()?;
    let database = DatabasePool::new(&config).await?;
    Ok((config, database))
}
