//! Session engine for restyle: format a file into a throwaway copy, show the
//! difference, and apply, fix or dismiss it.

pub mod artifacts;
pub mod config;
pub mod db;
pub mod diff;
pub mod error;
pub mod explain;
pub mod formatter;
pub mod lifecycle;
pub mod presenter;
pub mod schema;
pub mod store;
pub mod telemetry;
pub mod types;
