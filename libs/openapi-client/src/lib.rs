//! Control-plane API models consumed by the deployment monitor.

pub mod models;
