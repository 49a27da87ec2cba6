pub mod database;
pub mod memory_store;
pub mod redis_store;

pub use database::postgres::{PostgresJobRepository, PostgresNodeRepository};
pub use memory_store::MemoryKvStore;
pub use redis_store::RedisKvStore;
