//! Deployment monitoring

pub mod cleanup;
pub mod control_plane;
pub mod poller;
pub mod registry;
pub mod service;
pub mod stream;
