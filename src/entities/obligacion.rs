//! Obligacion entity - An outstanding invoice ("comprobante") or ledger charge ("cargo").
//!
//! Obligations belong to a counterparty, either a `cliente` (receivable) or a
//! `proveedor` (payable). `saldo` is what remains to be settled; it only ever
//! decreases as applications are recorded against it.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Obligation database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "obligaciones")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// `"cliente"` or `"proveedor"`
    pub contraparte_tipo: String,
    /// Counterparty id
    pub contraparte_id: i64,
    /// Branch the obligation was issued from
    pub sucursal_id: i64,
    /// Issue date
    pub fecha: Date,
    /// Free-form description (comprobante number, concept)
    pub descripcion: String,
    /// Original amount
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub total: Decimal,
    /// Remaining balance
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub saldo: Decimal,
    /// Payment order this obligation originated from, if any
    pub ordenpago_id: Option<i64>,
    /// Agreed forma de pago, if any
    pub formapago_id: Option<i64>,
}

/// Defines relationships between Obligacion and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One obligation is settled by many applications
    #[sea_orm(has_many = "super::aplicacion::Entity")]
    Aplicaciones,
}

impl Related<super::aplicacion::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Aplicaciones.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
