//! Encryption of stored exchange credentials

pub mod vault;

pub use vault::{mask, Vault};
