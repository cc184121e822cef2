#![allow(clippy::result_large_err)]

use dotenvy::dotenv;
use std::{env, sync::Arc};
use tesorero::{
    bot,
    config::{database, settings},
    core::forma_pago,
    errors::{Error, Result},
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load settings
    let settings = settings::load_default_settings()
        .inspect_err(|e| error!("Failed to load settings: {e}"))?;
    info!(
        sucursal_id = settings.sucursal_id,
        formas_pago = settings.formas_pago.len(),
        "Settings loaded"
    );

    // 4. Initialize database
    std::fs::create_dir_all("data")?;
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {e}"))?;
    database::create_tables(&db).await?;

    // 5. Seed the forma de pago catalog
    forma_pago::seed_formas_pago(&db, &settings.formas_pago)
        .await
        .inspect_err(|e| error!("Failed to seed formas de pago: {e}"))?;

    // 6. Run the bot; the token is read right before use
    let token = env::var("DISCORD_BOT_TOKEN")
        .inspect_err(|e| error!("DISCORD_BOT_TOKEN not found: {e}"))
        .map_err(Error::EnvVar)?;

    bot::run_bot(token, Arc::new(settings), db).await?;

    Ok(())
}
