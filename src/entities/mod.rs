//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the treasury, caja and rinde tables.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod anticipo;
pub mod aplicacion;
pub mod caja;
pub mod forma_pago;
pub mod movimiento;
pub mod obligacion;
pub mod operacion;
pub mod orden_pago;
pub mod rinde;
pub mod rinde_ajuste;

// Re-export specific types to avoid conflicts
pub use anticipo::{Column as AnticipoColumn, Entity as Anticipo, Model as AnticipoModel};
pub use aplicacion::{Column as AplicacionColumn, Entity as Aplicacion, Model as AplicacionModel};
pub use caja::{Column as CajaColumn, Entity as Caja, Model as CajaModel};
pub use forma_pago::{Column as FormaPagoColumn, Entity as FormaPago, Model as FormaPagoModel};
pub use movimiento::{
    Column as MovimientoColumn, Entity as Movimiento, Model as MovimientoModel,
};
pub use obligacion::{
    Column as ObligacionColumn, Entity as Obligacion, Model as ObligacionModel,
};
pub use operacion::{Column as OperacionColumn, Entity as Operacion, Model as OperacionModel};
pub use orden_pago::{Column as OrdenPagoColumn, Entity as OrdenPago, Model as OrdenPagoModel};
pub use rinde::{Column as RindeColumn, Entity as Rinde, Model as RindeModel};
pub use rinde_ajuste::{
    Column as RindeAjusteColumn, Entity as RindeAjuste, Model as RindeAjusteModel,
};
