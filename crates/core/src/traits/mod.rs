pub mod kv_store;
pub mod notifier;
pub mod repository;
pub mod scheduler;

pub use kv_store::KvStore;
pub use notifier::AdminNotifier;
pub use repository::{JobRepository, NodeRepository};
pub use scheduler::RecoveryScheduler;
