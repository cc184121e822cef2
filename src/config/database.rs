//! Database configuration module.
//!
//! This module handles the `SQLite` connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`, so the schema always matches the Rust
//! structs without hand-written SQL.

use crate::entities::{
    Anticipo, Aplicacion, Caja, FormaPago, Movimiento, Obligacion, Operacion, OrdenPago, Rinde,
    RindeAjuste, RindeColumn,
};
use crate::errors::Result;
use sea_orm::{
    ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema, sea_query::Index,
};
use tracing::{debug, info};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/tesorero.sqlite?mode=rwc";

/// Gets the database URL from the `DATABASE_URL` environment variable, or the
/// default local `SQLite` file.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by [`get_database_url`].
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    debug!("Connecting to {database_url}");
    Database::connect(&database_url).await.map_err(Into::into)
}

async fn create_table<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<()>
where
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

/// Creates all tables that do not exist yet.
///
/// Referenced tables are created before the tables that point at them.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let schema = Schema::new(db.get_database_backend());

    create_table(db, &schema, FormaPago).await?;
    create_table(db, &schema, Caja).await?;
    create_table(db, &schema, OrdenPago).await?;
    create_table(db, &schema, Obligacion).await?;
    create_table(db, &schema, Anticipo).await?;
    create_table(db, &schema, Operacion).await?;
    create_table(db, &schema, Movimiento).await?;
    create_table(db, &schema, Aplicacion).await?;
    create_table(db, &schema, Rinde).await?;
    create_table(db, &schema, RindeAjuste).await?;

    // One rinde per branch and month
    let periodo_index = Index::create()
        .if_not_exists()
        .name("idx_rindes_periodo")
        .table(Rinde)
        .col(RindeColumn::SucursalId)
        .col(RindeColumn::Mes)
        .col(RindeColumn::Anio)
        .unique()
        .to_owned();
    db.execute(db.get_database_backend().build(&periodo_index)).await?;

    info!("Database tables ensured");
    Ok(())
}
