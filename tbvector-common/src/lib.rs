//! Shared library for TBVector services
//!
//! Provides the error taxonomy, configuration resolution, database
//! initialization, data models, and the event bus used by the monitoring
//! backend.

pub mod config;
pub mod db;
pub mod error;
pub mod events;

pub use error::{Error, Result};
