//! Data models module
//!
//! Defines the coefficient catalog, estimation results and the wire types of the HTTP API

pub mod api;
pub mod coefficient;
pub mod result;

pub use api::*;
pub use coefficient::*;
pub use result::*;
