//! Anticipo entity - Unapplied credit held for a counterparty.
//!
//! `saldo` is not stored; it is always `importe - aplicado`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Advance database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "anticipos")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// `"cliente"` or `"proveedor"`
    pub contraparte_tipo: String,
    /// Counterparty id
    pub contraparte_id: i64,
    /// When the advance was received or paid
    pub fecha: Date,
    /// Original amount
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub importe: Decimal,
    /// Portion already applied to obligations
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub aplicado: Decimal,
    /// Operation that produced this advance, when it came from overpayment
    pub operacion_id: Option<i64>,
}

impl Model {
    /// Remaining credit.
    #[must_use]
    pub fn saldo(&self) -> Decimal {
        self.importe - self.aplicado
    }
}

/// `Anticipo` has no navigable relations
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
