//! Session domain module - the dream session entity and its state machine

pub mod errors;
pub mod model;
pub mod state;

pub use errors::*;
pub use model::*;
pub use state::*;
