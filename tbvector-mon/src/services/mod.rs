//! Service layer for tbvector-mon
//!
//! Business logic between the HTTP handlers and the data-access layer.

pub mod classifier;
pub mod dashboard;
pub mod devices;
pub mod lifecycle;
pub mod notifications;
pub mod storage;
