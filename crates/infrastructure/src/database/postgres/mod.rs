//! PostgreSQL仓储实现

pub mod job_repository;
pub mod node_repository;

pub use job_repository::PostgresJobRepository;
pub use node_repository::PostgresNodeRepository;
