/// In-memory storage backend.
pub mod memory;
/// Database model definitions.
pub mod models;
/// Storage error types.
pub mod storage;
/// Storage capability traits consumed by the services.
pub mod store;
