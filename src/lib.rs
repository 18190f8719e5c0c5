//! dreamcatcher library
//!
//! Turns a free-text dream description into descriptive tags and four
//! illustrative images. The [`generation::GenerationOrchestrator`] owns a
//! [`session::Session`], fans one tags call and four image calls out to a
//! [`generation::GenerationClient`], and streams progress to subscribers as
//! [`generation::GenerationEvent`]s.
//!
//! ```no_run
//! use std::sync::Arc;
//! use dreamcatcher::core::Config;
//! use dreamcatcher::generation::GenerationOrchestrator;
//! use dreamcatcher::infrastructure::HttpGenerationClient;
//!
//! # async fn run() -> dreamcatcher::core::Result<()> {
//! let config = Config::load(None)?;
//! let client = HttpGenerationClient::new(&config.service)?;
//! let orchestrator = GenerationOrchestrator::new(Arc::new(client));
//!
//! let mut events = orchestrator.subscribe();
//! orchestrator.begin_editing()?;
//! let attempt = orchestrator.submit("i dreamt i was on antarctica and i saw flowers growing")?;
//!
//! while let Some(event) = events.recv().await {
//!     println!("{:?}", event);
//!     if event.is_terminal() {
//!         break;
//!     }
//! }
//! attempt.wait().await;
//! # Ok(())
//! # }
//! ```
#![deny(unsafe_code)]

pub mod application;
pub mod core;
pub mod generation;
pub mod infrastructure;
pub mod session;
