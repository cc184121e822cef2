//! Movimiento entity - A treasury movement (money in or out through one medio).
//!
//! Movements are created when a payment instrument is applied. A movement can
//! also be recorded ahead of time and left unapplied (`aplicado = false`), in
//! which case a later allocation may reference it instead of creating a new one.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Treasury movement database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "movimientos")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// `"ingreso"` (collection) or `"egreso"` (payment)
    pub tipo: String,
    /// Forma de pago used
    pub formapago_id: i64,
    /// Medio the forma de pago resolved to when recorded
    pub medio: String,
    /// `"cliente"` or `"proveedor"`
    pub contraparte_tipo: String,
    /// Counterparty id
    pub contraparte_id: i64,
    /// Value date
    pub fecha: Date,
    /// Amount, always positive
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub monto: Decimal,
    /// Free-form detail
    pub detalle: Option<String>,
    /// Bank (transferencia, echeq)
    pub banco: Option<String>,
    /// Bank reference or check number
    pub referencia: Option<String>,
    /// Due date (echeq)
    pub vencimiento: Option<Date>,
    /// Card type, e.g. credito/debito
    pub tarjeta_tipo: Option<String>,
    /// Card brand
    pub tarjeta_marca: Option<String>,
    /// Card voucher number
    pub cupon: Option<String>,
    /// Installment plan
    pub plan: Option<String>,
    /// Caja session a cash movement belongs to
    pub caja_id: Option<i64>,
    /// Payment order this movement was issued under
    pub ordenpago_id: Option<i64>,
    /// Operation that applied this movement
    pub operacion_id: Option<i64>,
    /// Whether the movement has been applied to obligations
    pub aplicado: bool,
    /// When the row was recorded
    pub created_at: DateTimeUtc,
}

/// `Movimiento` has no navigable relations
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
