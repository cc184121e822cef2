//! Shared test utilities for `Tesorero`.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    config::settings::FormaPagoConfig,
    core::{
        forma_pago,
        medio::Counterparty,
        tesoreria::{self, NewObligation},
    },
    entities,
    errors::{Error, Result},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;

/// Names of the formas de pago created by [`setup_seeded_db`]
pub const SEEDED_FORMAS_PAGO: [&str; 5] = [
    "Efectivo",
    "Transferencia",
    "Echeq",
    "Tarjeta",
    "Cuenta Corriente",
];

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Like [`setup_test_db`], with one forma de pago per medio.
pub async fn setup_seeded_db() -> Result<DatabaseConnection> {
    let db = setup_test_db().await?;
    let configs: Vec<FormaPagoConfig> = SEEDED_FORMAS_PAGO
        .iter()
        .map(|nombre| FormaPagoConfig {
            nombre: (*nombre).to_string(),
            medio: None,
        })
        .collect();
    forma_pago::seed_formas_pago(&db, &configs).await?;
    Ok(db)
}

/// Id of a seeded forma de pago.
pub async fn forma_pago_id(db: &DatabaseConnection, nombre: &str) -> Result<i64> {
    forma_pago::get_by_nombre(db, nombre)
        .await?
        .map(|fp| fp.id)
        .ok_or_else(|| Error::rejected(format!("Forma de pago '{nombre}' not seeded")))
}

/// A date in March 2024.
///
/// # Panics
/// Panics if `day` is not a valid day of March.
#[allow(clippy::expect_used)]
pub fn test_date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, day).expect("valid March date")
}

/// Creates a test obligation with sensible defaults.
///
/// # Arguments
/// * `db` - Database connection
/// * `counterparty` - Owner of the obligation
/// * `day` - Day of March 2024 used as issue date
/// * `total` - Amount, also the initial saldo
///
/// # Defaults
/// * `sucursal_id`: 1
/// * `descripcion`: "Factura de prueba"
/// * `ordenpago_id` and `formapago_id`: None
pub async fn create_test_obligation(
    db: &DatabaseConnection,
    counterparty: Counterparty,
    day: u32,
    total: Decimal,
) -> Result<entities::obligacion::Model> {
    tesoreria::register_obligation(
        db,
        NewObligation {
            counterparty,
            sucursal_id: 1,
            fecha: test_date(day),
            descripcion: "Factura de prueba".to_string(),
            total,
            ordenpago_id: None,
            formapago_id: None,
        },
    )
    .await
}

/// Installs a test subscriber so `tracing` output shows up with `--nocapture`.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("tesorero=debug")
        .with_test_writer()
        .try_init();
}
