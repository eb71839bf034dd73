//! # akasha-bridge
//!
//! HTTP client for the GoWA WhatsApp bridge, implementing the
//! `MessagingGateway` trait.

pub mod client;

pub use client::BridgeClient;
