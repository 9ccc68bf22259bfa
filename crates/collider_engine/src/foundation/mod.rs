//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the engine:
//! - Math types and angles
//! - Time sources and the pausable stopwatch
//! - Logging utilities

pub mod logging;
pub mod math;
pub mod time;
