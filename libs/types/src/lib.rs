//! Types library for the funds-custody engine
//!
//! Shared identifiers and project records used by the contract crate.
//!
//! # Modules
//! - `ids`: Party addresses and deterministic project ids
//! - `project`: Project snapshot and lifecycle status
//! - `errors`: Identifier parse errors

pub mod errors;
pub mod ids;
pub mod project;

// Library version constant
pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::errors::*;
    pub use crate::ids::*;
    pub use crate::project::*;
}
