//! Caja session business logic.
//!
//! A branch has at most one open caja session at a time. Cash instruments are
//! tied to the session that is open when they are applied.

use crate::{
    entities::{Caja, caja},
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::{info, instrument};

/// Returns the open session for a branch, if any.
pub async fn current_open_session<C>(db: &C, sucursal_id: i64) -> Result<Option<caja::Model>>
where
    C: ConnectionTrait,
{
    Caja::find()
        .filter(caja::Column::SucursalId.eq(sucursal_id))
        .filter(caja::Column::CerradaEn.is_null())
        .order_by_desc(caja::Column::AbiertaEn)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Opens a new session for a branch.
///
/// Fails with [`Error::CajaAlreadyOpen`] if the branch already has one.
#[instrument(skip(db))]
pub async fn open_session(
    db: &DatabaseConnection,
    sucursal_id: i64,
    usuario: String,
    monto_inicial: Decimal,
) -> Result<caja::Model> {
    if monto_inicial < Decimal::ZERO {
        return Err(Error::rejected("Opening float cannot be negative"));
    }

    if let Some(open) = current_open_session(db, sucursal_id).await? {
        return Err(Error::CajaAlreadyOpen {
            caja_id: open.id,
            sucursal_id,
        });
    }

    let session = caja::ActiveModel {
        sucursal_id: Set(sucursal_id),
        usuario: Set(usuario),
        monto_inicial: Set(monto_inicial),
        abierta_en: Set(chrono::Utc::now()),
        cerrada_en: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(caja_id = session.id, sucursal_id, "Caja opened");
    Ok(session)
}

/// Closes a session.
#[instrument(skip(db))]
pub async fn close_session(db: &DatabaseConnection, caja_id: i64) -> Result<caja::Model> {
    let session = Caja::find_by_id(caja_id)
        .one(db)
        .await?
        .ok_or(Error::NotFound {
            entity: "caja",
            id: caja_id,
        })?;

    if !session.is_open() {
        return Err(Error::CajaClosed { caja_id });
    }

    let mut active: caja::ActiveModel = session.into();
    active.cerrada_en = Set(Some(chrono::Utc::now()));
    let closed = active.update(db).await?;

    info!(caja_id, "Caja closed");
    Ok(closed)
}
