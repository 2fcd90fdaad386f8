//! kate/crates/kate-core/src/lib.rs
//!
//! Domain models and interface definitions for the Kate insult board.

pub mod error;
pub mod models;
pub mod traits;

pub use error::*;
pub use models::*;
pub use traits::*;
