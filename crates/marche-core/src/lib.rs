//! Ambient plumbing shared by Marche services: configuration, tracing,
//! middleware, health probes and serde helpers.

pub mod config;
pub mod health;
pub mod middleware;
pub mod sea_ext;
pub mod serde;
pub mod tracing;
