//! Parlor Common - Shared configuration, errors, and logging for Parlor services.
//!
//! This crate provides:
//! - Configuration types and loading
//! - Error types with HTTP status mapping
//! - Logging setup with noise filtering

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod logging;

pub use config::{
    Config, InferenceConfig, MemoryConfig, NetworkConfig, ObservabilityConfig, SessionConfig,
};
pub use error::Error;
