//! Back-office API access for cleandesk.
//!
//! [`gateway::GatewayClient`] is the one outbound path to the API: it adds
//! auth and JSON headers, runs interceptor chains, caches reads for a short
//! TTL, and invalidates related reads after writes. The remaining modules
//! make up the `cleandesk` command line front end.

pub mod app;
pub mod cache;
pub mod commands;
pub mod config;
pub mod gateway;
