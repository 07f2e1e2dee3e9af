//! Domain models for the rx-ledger system.

mod family_member;
mod import;
mod medication_log;
mod medicine;

pub use family_member::*;
pub use import::*;
pub use medication_log::*;
pub use medicine::*;
