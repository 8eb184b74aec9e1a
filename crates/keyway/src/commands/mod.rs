//! Command handlers for the keyway CLI.

pub mod auth;
pub mod fetch;
pub mod logging;

pub use auth::*;
pub use fetch::*;
pub use logging::*;
