//! Core request-chain abstractions

pub mod config;
pub mod deadline;
pub mod error;
pub mod log;
pub mod quote;

// Re-export main types for cleaner imports
pub use deadline::Deadline;
pub use error::QuoteError;
pub use quote::{PersistedQuote, Quote, QuoteResponse, QuoteSource};
