pub mod common;
pub mod consumables;
pub mod health;
pub mod readings;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;
