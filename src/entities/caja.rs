//! Caja entity - A cash-register session for one branch.
//!
//! A session is open while `cerrada_en` is `None`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Caja session database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cajas")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Branch
    pub sucursal_id: i64,
    /// Operator who opened the session
    pub usuario: String,
    /// Opening float
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub monto_inicial: Decimal,
    /// When the session was opened
    pub abierta_en: DateTimeUtc,
    /// When the session was closed
    pub cerrada_en: Option<DateTimeUtc>,
}

impl Model {
    /// Whether the session still accepts movements.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.cerrada_en.is_none()
    }
}

/// `Caja` has no navigable relations
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
