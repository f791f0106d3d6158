//! Support modules shared by the database layer and the command line.
//!
//! - [`config`]: startup configuration and the process-wide installed copy
//! - [`data_storage`]: platform data directory
//! - [`messages`]: typed user-facing messages and the `msg_*` macros
//! - [`password`]: salted password digests

pub mod config;
pub mod data_storage;
pub mod messages;
pub mod password;
