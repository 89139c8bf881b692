//! Watches the cita previa booking page and tells you the moment the
//! appointment form is back.

pub mod config;
pub mod detect;
pub mod error;
pub mod fetch;
pub mod notify;
pub mod stopwatch;
pub mod tracker;
pub mod worker;

pub use config::{Args, Config};
pub use error::{Error, Result};
pub use worker::Worker;

/// The page that is polled. Not configurable.
pub const TARGET_URL: &str = "https://icp.administracionelectronica.gob.es/icpplus/index.html";
