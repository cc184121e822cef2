//! Operacion entity - Header for one applied allocation request.
//!
//! Every successful `apply` creates one operation; the application lines and
//! movements it produced point back to it.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Operation database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "operaciones")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// `"cobro"`, `"pago"` or `"anticipo"`
    pub tipo: String,
    /// `"cliente"` or `"proveedor"`
    pub contraparte_tipo: String,
    /// Counterparty id
    pub contraparte_id: i64,
    /// Operation date
    pub fecha: Date,
    /// Operator notes
    pub observaciones: Option<String>,
    /// Total applied to obligations
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub total_aplicado: Decimal,
    /// When the operation was recorded
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Operacion and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One operation writes many application lines
    #[sea_orm(has_many = "super::aplicacion::Entity")]
    Aplicaciones,
}

impl Related<super::aplicacion::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Aplicaciones.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
