//! Data-access layer for tbvector-mon
//!
//! Thin query modules over the shared schema; one module per collection.

pub mod cough_events;
pub mod devices;
pub mod notifications;
pub mod users;
