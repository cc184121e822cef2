//! Forma de pago entity - The catalog of payment methods an operator can pick.
//!
//! Each forma de pago has a display name and the `medio` it resolves to
//! (`caja`, `transferencia`, `echeq`, `tarjeta` or `ctacte`). The catalog is
//! seeded from `config.toml`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Forma de pago database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "formas_pago")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name (e.g. "Efectivo", "Echeq Banco Nación")
    #[sea_orm(unique)]
    pub nombre: String,
    /// Medio this forma de pago resolves to
    pub medio: String,
    /// Inactive entries are hidden from pickers
    pub activa: bool,
}

/// `FormaPago` has no navigable relations
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
