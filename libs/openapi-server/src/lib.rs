//! HTTP API models exposed by the deployment monitor.

pub mod models;
