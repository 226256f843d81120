//! HTTP API handlers for tbvector-mon

pub mod auth;
pub mod coughs;
pub mod dashboard;
pub mod devices;
pub mod health;
pub mod notifications;
pub mod sse;
