//! SQL construction.
//!
//! - `builder`: export/preview SELECT with optional chained joins
//! - `identifier`: whitelist for names interpolated into SQL

pub mod builder;
pub mod identifier;

pub use builder::{SelectBuilder, build_preview, build_select};
pub use identifier::{quote_identifier, quote_name, validate_identifier, validate_identifiers};
