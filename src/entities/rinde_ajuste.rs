//! Rinde ajuste entity - A manual correction entered alongside a rinde.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Adjustment database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "rinde_ajustes")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Rinde this adjustment belongs to
    pub rinde_id: i64,
    /// What the correction is for
    pub descripcion: String,
    /// Signed amount added to the sold total
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub importe: Decimal,
}

/// Defines relationships between `RindeAjuste` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each adjustment belongs to one rinde
    #[sea_orm(
        belongs_to = "super::rinde::Entity",
        from = "Column::RindeId",
        to = "super::rinde::Column::Id"
    )]
    Rinde,
}

impl Related<super::rinde::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Rinde.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
