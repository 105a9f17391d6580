//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the crate:
//! - Math types and operations
//! - Tuning constants
//! - Logging utilities

pub mod constants;
pub mod logging;
pub mod math;
