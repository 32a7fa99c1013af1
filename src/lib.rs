//! Construction project progress tracker.
//!
//! Projects and their weekly updates live in a versioned JSON store. An
//! administrator manages them; clients get read-only access to the active
//! projects whose access code they know.

pub mod config;
pub mod models;
pub mod secrets;
pub mod services;
pub mod storage;
