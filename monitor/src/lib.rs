//! Deployment monitor library
//!
//! Triggers deployments on a remote control plane, polls their status in the
//! background and exposes their progress as replayable event streams.

pub mod app;
pub mod errors;
pub mod http;
pub mod logs;
pub mod models;
pub mod monitor;
pub mod server;
pub mod settings;
pub mod utils;
