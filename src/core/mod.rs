//! Core business logic, independent of the Discord surface.

/// Payment allocation view-model
pub mod allocation;
/// Caja sessions
pub mod caja;
/// Forma de pago catalog
pub mod forma_pago;
/// Payment media and counterparties
pub mod medio;
/// Monthly yield calculator
pub mod rinde;
/// Treasury service: listings and settlement application
pub mod tesoreria;
