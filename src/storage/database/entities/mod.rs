/// Batch summary entity module
pub mod batch;
/// Recipient outcome entity module
pub mod outcome;

pub use batch::Entity as Batch;
pub use outcome::Entity as Outcome;
