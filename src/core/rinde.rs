//! Yield ("rinde") calculation and persistence.
//!
//! The calculation is pure: it combines the month's sales, internal
//! movements, inventory delta and manual adjustments into the amount actually
//! sold, compares it with what the processed kilograms were expected to yield,
//! and reports the gap as a percentage. Saving is a separate step that refuses
//! a second record for the same branch and month.

use crate::{
    entities::{Rinde, RindeAjuste, rinde, rinde_ajuste},
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

/// A manual correction to the sold amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ajuste {
    /// What the correction is for
    pub descripcion: String,
    /// Signed amount
    pub importe: Decimal,
}

/// Kilograms and expected price for one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Categoria {
    /// Kilograms processed
    pub kg: Decimal,
    /// Expected price per kilogram
    pub precio: Decimal,
}

impl Categoria {
    /// Shorthand constructor.
    #[must_use]
    pub const fn new(kg: Decimal, precio: Decimal) -> Self {
        Self { kg, precio }
    }

    fn esperado(self) -> Option<Decimal> {
        self.kg.checked_mul(self.precio)
    }
}

fn too_large(what: &str) -> Error {
    Error::rejected(format!("{what} is too large"))
}

/// Everything the calculation needs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RindeInputs {
    /// Sales total
    pub ventas: Decimal,
    /// Internal movements total
    pub movimientos: Decimal,
    /// Opening inventory value
    pub inventario_inicial: Decimal,
    /// Closing inventory value
    pub inventario_final: Decimal,
    /// Manual corrections
    pub ajustes: Vec<Ajuste>,
    /// Novillo at its price
    pub novillo: Categoria,
    /// Vaca at export price
    pub vaca: Categoria,
    /// Cerdo at its price
    pub cerdo: Categoria,
}

/// Branch and month a rinde belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Periodo {
    /// Branch
    pub sucursal_id: i64,
    /// Month, 1-12
    pub mes: u32,
    /// Year
    pub anio: i32,
}

impl Periodo {
    /// Builds a period, rejecting months outside 1-12.
    pub fn new(sucursal_id: i64, mes: u32, anio: i32) -> Result<Self> {
        if !(1..=12).contains(&mes) {
            return Err(Error::rejected(format!(
                "Month must be between 1 and 12, got {mes}"
            )));
        }
        Ok(Self {
            sucursal_id,
            mes,
            anio,
        })
    }
}

/// Outcome of a calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RindeResult {
    /// What was actually sold
    pub monto_vendido: Decimal,
    /// What the kilograms should have produced
    pub monto_esperado: Decimal,
    /// Gap as a percentage of the expected amount, two decimals
    pub rinde: Decimal,
    /// Set when the expected amount is zero; `rinde` is then 0 but meaningless
    pub incompleto: bool,
}

impl RindeInputs {
    /// Σ adjustments.
    pub fn total_ajustes(&self) -> Result<Decimal> {
        self.ajustes
            .iter()
            .try_fold(Decimal::ZERO, |acc, a| acc.checked_add(a.importe))
            .ok_or_else(|| too_large("Adjustments total"))
    }

    /// `ventas + movimientos + inventario_final - inventario_inicial + Σ ajustes`
    pub fn monto_vendido(&self) -> Result<Decimal> {
        let ajustes = self.total_ajustes()?;
        self.ventas
            .checked_add(self.movimientos)
            .and_then(|v| v.checked_add(self.inventario_final))
            .and_then(|v| v.checked_sub(self.inventario_inicial))
            .and_then(|v| v.checked_add(ajustes))
            .ok_or_else(|| too_large("Sold amount"))
    }

    /// `kg·precio` summed over the three categories
    pub fn monto_esperado(&self) -> Result<Decimal> {
        [self.novillo, self.vaca, self.cerdo]
            .into_iter()
            .try_fold(Decimal::ZERO, |acc, c| {
                c.esperado().and_then(|e| acc.checked_add(e))
            })
            .ok_or_else(|| too_large("Expected amount"))
    }

    /// Rejects negative kilograms or prices.
    pub fn validate(&self) -> Result<()> {
        for (nombre, categoria) in [
            ("novillo", self.novillo),
            ("vaca", self.vaca),
            ("cerdo", self.cerdo),
        ] {
            if categoria.kg < Decimal::ZERO || categoria.precio < Decimal::ZERO {
                return Err(Error::rejected(format!(
                    "Kilograms and price for {nombre} cannot be negative"
                )));
            }
        }
        Ok(())
    }

    /// Computes the rinde.
    pub fn calculate(&self) -> Result<RindeResult> {
        self.validate()?;
        let monto_vendido = self.monto_vendido()?;
        let monto_esperado = self.monto_esperado()?;

        if monto_esperado.is_zero() {
            return Ok(RindeResult {
                monto_vendido,
                monto_esperado,
                rinde: Decimal::ZERO,
                incompleto: true,
            });
        }

        let rinde = monto_esperado
            .checked_sub(monto_vendido)
            .and_then(|gap| gap.checked_div(monto_esperado))
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .ok_or_else(|| too_large("Rinde gap"))?
            .round_dp(2);
        Ok(RindeResult {
            monto_vendido,
            monto_esperado,
            rinde,
            incompleto: false,
        })
    }
}

/// Looks up the saved rinde for a period.
pub async fn find_rinde<C>(db: &C, periodo: Periodo) -> Result<Option<rinde::Model>>
where
    C: ConnectionTrait,
{
    Rinde::find()
        .filter(rinde::Column::SucursalId.eq(periodo.sucursal_id))
        .filter(rinde::Column::Mes.eq(mes_column(periodo.mes)))
        .filter(rinde::Column::Anio.eq(periodo.anio))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Saved rindes for a branch, newest period first.
pub async fn list_rindes(db: &DatabaseConnection, sucursal_id: i64) -> Result<Vec<rinde::Model>> {
    Rinde::find()
        .filter(rinde::Column::SucursalId.eq(sucursal_id))
        .order_by_desc(rinde::Column::Anio)
        .order_by_desc(rinde::Column::Mes)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Adjustments saved with a rinde.
pub async fn get_ajustes(db: &DatabaseConnection, rinde_id: i64) -> Result<Vec<rinde_ajuste::Model>> {
    RindeAjuste::find()
        .filter(rinde_ajuste::Column::RindeId.eq(rinde_id))
        .order_by_asc(rinde_ajuste::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

fn mes_column(mes: u32) -> i32 {
    i32::try_from(mes).unwrap_or(i32::MAX)
}

/// Calculates and saves a rinde for a period.
///
/// The duplicate check runs inside the insert transaction, and the unique
/// `(sucursal_id, mes, anio)` index rejects any insert that races past it.
/// Incomplete inputs (expected amount of zero) are not saved.
#[instrument(skip(db, inputs))]
pub async fn save_rinde(
    db: &DatabaseConnection,
    periodo: Periodo,
    inputs: &RindeInputs,
) -> Result<rinde::Model> {
    let result = inputs.calculate()?;
    if result.incompleto {
        return Err(Error::IncompleteRinde);
    }

    let txn = db.begin().await?;

    if find_rinde(&txn, periodo).await?.is_some() {
        warn!("Rinde already recorded for this period");
        return Err(Error::DuplicateRinde {
            sucursal_id: periodo.sucursal_id,
            mes: periodo.mes,
            anio: periodo.anio,
        });
    }

    let saved = rinde::ActiveModel {
        sucursal_id: Set(periodo.sucursal_id),
        mes: Set(mes_column(periodo.mes)),
        anio: Set(periodo.anio),
        ventas: Set(inputs.ventas),
        movimientos: Set(inputs.movimientos),
        inventario_inicial: Set(inputs.inventario_inicial),
        inventario_final: Set(inputs.inventario_final),
        kg_novillo: Set(inputs.novillo.kg),
        precio_novillo: Set(inputs.novillo.precio),
        kg_vaca: Set(inputs.vaca.kg),
        precio_exportacion: Set(inputs.vaca.precio),
        kg_cerdo: Set(inputs.cerdo.kg),
        precio_cerdo: Set(inputs.cerdo.precio),
        monto_vendido: Set(result.monto_vendido),
        monto_esperado: Set(result.monto_esperado),
        rinde: Set(result.rinde),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    for ajuste in &inputs.ajustes {
        rinde_ajuste::ActiveModel {
            rinde_id: Set(saved.id),
            descripcion: Set(ajuste.descripcion.clone()),
            importe: Set(ajuste.importe),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }

    txn.commit().await?;

    info!(rinde_id = saved.id, rinde = %result.rinde, "Rinde saved");
    Ok(saved)
}
