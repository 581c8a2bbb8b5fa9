//! Utility modules for the textblast dispatcher
//!
//! - **error**: Error types and helpers
//! - **limiter**: Outbound send pacing
//! - **validation**: Request validation and phone normalization

pub mod error;
pub mod limiter;
pub mod validation;

pub use error::{DispatchError, Result};
pub use limiter::SendPacer;
