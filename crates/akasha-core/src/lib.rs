//! # akasha-core
//!
//! Core types, traits, configuration, and error handling for the Akasha gateway.

pub mod config;
pub mod error;
pub mod jid;
pub mod message;
pub mod track;
pub mod traits;
