//! Read-only data sources
//!
//! The import half of the provider surface: lookups by platform id or by
//! name within a parent, reusing the same probe strategy as the resources
//! but never mutating anything.

pub mod account;
pub mod compute;
pub mod image;
pub mod lb;
pub mod rg;
pub mod vins;
