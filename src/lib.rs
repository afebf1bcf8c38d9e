pub mod config;
pub mod errors;
pub mod gcp;
pub mod inventory;
pub mod models;
pub mod output;

// Re-export commonly used items for tests
pub use errors::{ApiError, ConfigurationError, CredentialError, InventoryError, InventoryResult};
pub use inventory::Aggregator;
