//! HTTP implementations of the generation ports

pub mod generation_client;

pub use generation_client::*;
