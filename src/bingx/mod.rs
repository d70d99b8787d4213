//! BingX module - Broker connection for BingX perpetual swaps

pub mod auth;
pub mod messages;
pub mod rest;

pub use rest::{BingxClient, DEMO_BASE_URL, LIVE_BASE_URL};
