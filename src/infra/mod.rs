//! Infrastructure layer for cross-cutting concerns.
//!
//! Provides foundational infrastructure including:
//! - Error handling and result types
//! - Configuration file management and validation

pub mod config;
pub mod error;
