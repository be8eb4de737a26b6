//! # Zonevault
//!
//! A two-tier spatial entity service: a zone-partitioned versioned entity
//! store fronted by an authenticated edge gateway.
//!
//! ## Architecture
//!
//! - `token`: AEAD-sealed bearer tokens (C1)
//! - `ratelimit`: named sliding-window rate limiters (C2)
//! - `zone`: deterministic genesis synthesis plus the opaque palette/tarot
//!   tables it draws from (C3)
//! - `blacklist`: crash-safe banned-principal set (C4)
//! - `store`: the versioned entity storage engine (C5)
//! - `registry`: zone-id to store lookup and lifecycle (C6)
//! - `sanitize`: text scrubbing applied to user-supplied name/description fields
//! - `storage_service`: authenticated HTTP surface over the store (C7)
//! - `gateway`: edge HTTP surface with auth, rate limiting, and genesis fill (C8)
//! - `config`: environment-driven configuration for both binaries

pub mod blacklist;
pub mod config;
pub mod gateway;
pub mod ratelimit;
pub mod registry;
pub mod sanitize;
pub mod storage_service;
pub mod store;
pub mod token;
pub mod zone;

/// Re-export version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
