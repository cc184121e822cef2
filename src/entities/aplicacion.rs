//! Aplicacion entity - One ledger line settling part of an obligation.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Application database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "aplicaciones")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Operation that wrote this line
    pub operacion_id: i64,
    /// Obligation being settled
    pub obligacion_id: i64,
    /// Amount applied
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub monto: Decimal,
    /// Application date
    pub fecha: Date,
    /// Payment order the line was issued under
    pub ordenpago_id: Option<i64>,
    /// Advance consumed by this line, if any
    pub anticipo_id: Option<i64>,
}

/// Defines relationships between Aplicacion and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each line settles one obligation
    #[sea_orm(
        belongs_to = "super::obligacion::Entity",
        from = "Column::ObligacionId",
        to = "super::obligacion::Column::Id"
    )]
    Obligacion,
    /// Each line belongs to one operation
    #[sea_orm(
        belongs_to = "super::operacion::Entity",
        from = "Column::OperacionId",
        to = "super::operacion::Column::Id"
    )]
    Operacion,
}

impl Related<super::obligacion::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Obligacion.def()
    }
}

impl Related<super::operacion::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Operacion.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
