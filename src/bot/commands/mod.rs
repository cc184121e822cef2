//! Discord command implementations organized by category.

#![allow(clippy::too_long_first_doc_paragraph)]

/// Caja session commands
pub mod caja;

/// Collection, payment and advance commands
pub mod cobranza;

/// General utility commands
pub mod general;

/// Rinde commands
pub mod rinde;

// Export commands
pub use caja::*;
pub use cobranza::*;
pub use general::*;
pub use rinde::*;
