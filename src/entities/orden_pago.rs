//! Orden de pago entity - Groups the settlements issued to a proveedor in one go.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Payment order database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ordenes_pago")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Proveedor being paid
    pub proveedor_id: i64,
    /// Issue date
    pub fecha: Date,
    /// Sum of the lines issued under this order
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub total: Decimal,
    /// Operator notes
    pub observaciones: Option<String>,
    /// When the order was recorded
    pub created_at: DateTimeUtc,
}

/// `OrdenPago` has no navigable relations
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
