//! maintrack: turns maintenance templates into asset-bound jobs and drives
//! them through their lifecycle, with an audit comment for every change.

pub mod config;
pub mod engine;
pub mod error;
pub mod output;
pub mod state;

pub use engine::MaintenanceEngine;
pub use error::{EngineError, ErrorKind, Result};
