//! # Annota Common Library
//!
//! Shared code for the annotation workstation crates including:
//! - Error types
//! - Event types (AnnotaEvent enum) and the EventBus
//! - Key-value store abstraction backing session-scoped state
//! - Session context (session id + store + event bus)
//! - Configuration loading

pub mod config;
pub mod error;
pub mod events;
pub mod kv;
pub mod session;

pub use error::{Error, Result};
pub use session::SessionContext;
