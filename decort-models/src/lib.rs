//! Decort Models
//!
//! Plain data shapes for every platform entity, with serde mappings to the
//! API's wire field names. Handlers parse raw response bodies into these
//! records; nothing here issues API calls.

pub mod account;
pub mod bservice;
pub mod compute;
pub mod disk;
pub mod image;
pub mod k8s;
pub mod lb;
pub mod rg;
pub mod vins;
