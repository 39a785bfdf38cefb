//! API middleware

mod cors;
mod session;

pub use cors::cors_layer;
pub use session::{cookie_value, AuthenticatedUser, SessionAuth, SessionClaims};
