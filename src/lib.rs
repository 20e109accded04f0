//! TigerBeagle: account, transfer, migration and connectivity commands for a
//! TigerBeetle ledger cluster.

pub mod args;
pub mod client;
pub mod config;
pub mod doctor;
pub mod engine;
pub mod errors;
pub mod models;
pub mod sample;
