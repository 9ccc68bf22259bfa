//! # Core Engine Module
//!
//! Shared abstractions that the subsystems depend on.
//!
//! ## Organization
//!
//! - **Config**: configuration for the engine and each collider group

pub mod config;

// Re-export commonly used config types
pub use config::{ColliderGroupConfig, Config, ConfigError, EngineConfig, SimulationConfig};
