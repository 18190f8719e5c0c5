//! Core building blocks shared by every layer: errors and configuration

pub mod config;
pub mod error;

pub use config::Config;
pub use error::{Error, Result};
