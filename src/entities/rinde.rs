//! Rinde entity - A saved yield calculation for one branch and month.
//!
//! At most one record exists per `(sucursal_id, mes, anio)`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Rinde database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "rindes")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Branch
    pub sucursal_id: i64,
    /// Month (1-12)
    pub mes: i32,
    /// Year
    pub anio: i32,
    /// Sales total
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub ventas: Decimal,
    /// Internal movements total
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub movimientos: Decimal,
    /// Opening inventory value
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub inventario_inicial: Decimal,
    /// Closing inventory value
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub inventario_final: Decimal,
    /// Kilograms of novillo
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub kg_novillo: Decimal,
    /// Expected price per kg of novillo
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub precio_novillo: Decimal,
    /// Kilograms of vaca
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub kg_vaca: Decimal,
    /// Expected export price per kg of vaca
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub precio_exportacion: Decimal,
    /// Kilograms of cerdo
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub kg_cerdo: Decimal,
    /// Expected price per kg of cerdo
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub precio_cerdo: Decimal,
    /// Computed sold amount
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub monto_vendido: Decimal,
    /// Computed expected amount
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub monto_esperado: Decimal,
    /// Yield percentage, two decimals
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub rinde: Decimal,
    /// When the record was saved
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Rinde and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One rinde has many manual adjustments
    #[sea_orm(has_many = "super::rinde_ajuste::Entity")]
    Ajustes,
}

impl Related<super::rinde_ajuste::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ajustes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
