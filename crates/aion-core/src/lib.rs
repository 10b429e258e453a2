//! AION Core — error type and process configuration shared by every crate.

pub mod config;
pub mod error;

pub use config::{AionConfig, DataPaths, ProviderSettings};
pub use error::{Error, Result};
