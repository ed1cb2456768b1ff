//! HTTP-facing layer: event parsing, multipart decoding and response envelopes

pub mod handler;
pub mod helpers;
pub mod multipart;
pub mod parsing;

// Re-export the main handler for convenience
pub use handler::handler;
