//! Generation domain module - fans a dream prompt out to the remote services
//!
//! The orchestrator owns the session, launches one tags unit and four image
//! units per attempt, and reports progress through the event stream.

pub mod errors;
pub mod event_stream;
pub mod events;
pub mod orchestrator;
pub mod traits;
pub mod types;

pub use errors::*;
pub use event_stream::*;
pub use events::*;
pub use orchestrator::*;
pub use traits::*;
pub use types::*;
