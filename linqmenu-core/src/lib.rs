//! Core types and service wiring for the linqmenu school menu adapter.

/// Menu client running identifier, district, and menu lookups.
pub mod client;
/// Configuration constants and menu URL validation.
pub mod config;
/// Domain models and identifiers.
pub mod model;
/// Best-effort normalization of the menu response.
pub mod parse;
/// Thumbnail selection, download, and storage.
pub mod pictures;
/// Traits describing the backend and storage interfaces.
pub mod ports;
/// Fixed-interval polling.
pub mod scheduler;
/// Published sensor state.
pub mod sensor;
/// High-level service facade used by hosts.
pub mod service;

#[cfg(test)]
mod testing;

pub use client::*;
pub use config::*;
pub use model::*;
pub use ports::*;
pub use scheduler::*;
pub use sensor::*;
pub use service::*;
