//! Store access layer.
//! - `store::KvClient` is the seam to the external key-value engine.
//! - `store::StoreService` is the uniform async API the HTTP handlers call.
//! - Errors are surfaced as `errors::ServiceError` and never retried here.

pub mod errors;
pub mod store;

pub use errors::ServiceError;
pub use store::{KvClient, MemoryClient, RedisClient, StoreService};
