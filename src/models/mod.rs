pub mod account;
pub mod webhook;

pub use account::*;
pub use webhook::*;
