//! Application layer - orchestrates use cases and coordinates between domains

pub mod dto;
pub mod errors;
pub mod generate_dream;
pub mod traits;

pub use dto::*;
pub use errors::*;
pub use generate_dream::*;
pub use traits::*;
