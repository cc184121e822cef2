//! Bot layer - Discord-specific interface and command handlers
//!
//! This module provides the Discord interface for Tesorero, including all
//! slash commands, autocomplete handlers, and bot context management.

/// Discord command implementations (general, caja, cobranza, rinde)
pub mod commands;
/// Discord interaction handlers (autocomplete, etc.)
pub mod handlers;

use crate::{
    config::settings::Settings,
    errors::{Error, Result},
};
use chrono::NaiveDate;
use poise::serenity_prelude as serenity;
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Shared data available to all bot commands.
/// This structure holds the database connection and the loaded settings.
pub struct BotData {
    /// Database connection for all database operations
    pub database: DatabaseConnection,
    /// Settings loaded at startup
    pub settings: Arc<Settings>,
}

impl BotData {
    /// Creates a new `BotData` instance.
    #[must_use]
    pub const fn new(database: DatabaseConnection, settings: Arc<Settings>) -> Self {
        Self { database, settings }
    }
}

/// Converts a slash-command number to a money amount.
///
/// Discord only hands us floats; the value is rounded to cents.
pub fn amount_from_f64(amount: f64) -> Result<Decimal> {
    if !amount.is_finite() {
        return Err(Error::InvalidAmount { amount });
    }
    Decimal::try_from(amount)
        .map(|d| d.round_dp(2))
        .map_err(|_| Error::InvalidAmount { amount })
}

/// Parses an optional `YYYY-MM-DD` argument.
pub fn parse_fecha(value: Option<&str>) -> Result<Option<NaiveDate>> {
    value
        .map(|s| {
            NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .map_err(|_| Error::rejected(format!("Invalid date '{s}', expected YYYY-MM-DD")))
        })
        .transpose()
}

async fn on_error(error: poise::FrameworkError<'_, BotData, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            error!("Failed to start bot: {error:?}");
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!("Error in command `{}`: {error:?}", ctx.command().name);
            if let Err(e) = ctx.say(format!("❌ {error}")).await {
                error!("Failed to send error message: {e}");
            }
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {e}");
            }
        }
    }
}

/// Builds the poise framework and runs the Discord client until it stops.
#[instrument(skip(token, settings, database))]
pub async fn run_bot(
    token: String,
    settings: Arc<Settings>,
    database: DatabaseConnection,
) -> Result<()> {
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                commands::ping(),
                commands::help(),
                commands::caja(),
                commands::saldos(),
                commands::cobrar(),
                commands::pagar(),
                commands::aplicar_anticipo(),
                commands::rinde(),
            ],
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(|ctx, ready, framework| {
            Box::pin(async move {
                info!("Logged in as {}", ready.user.name);
                info!("Registering commands globally...");
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                Ok(BotData::new(database, settings))
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged();

    info!("Setting up Serenity client for Poise framework...");
    let mut client = serenity::Client::builder(&token, intents)
        .framework(framework)
        .await
        .inspect_err(|e| error!("Error creating client: {e:?}"))?;

    info!("Starting bot client...");
    client
        .start()
        .await
        .inspect_err(|e| error!("Client error: {e:?}"))?;
    Ok(())
}

pub use commands::*;
pub use handlers::*;
