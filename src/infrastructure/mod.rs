//! Infrastructure layer - concrete implementations of domain ports

pub mod http;
pub mod output;

pub use http::*;
pub use output::*;
