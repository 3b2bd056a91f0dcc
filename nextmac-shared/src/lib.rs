//! nextmac shared - Common code for the allocator library and CLI
//!
//! This crate contains the error taxonomy and the constants that must stay
//! identical between the library and the command-line front end.

pub mod constants;
pub mod errors;

pub use errors::{MacError, MacResult};
