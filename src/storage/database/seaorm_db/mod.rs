// Module declarations
mod types;
mod connection;
mod batch_ops;
mod outcome_ops;

// Re-export public types
pub use types::{DatabaseBackendType, SeaOrmDatabase};
