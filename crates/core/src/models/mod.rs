pub mod job;
pub mod node;
pub mod progress;

pub use job::{JobStatus, StreamJob};
pub use node::{NodeStatus, ResourceSample, VpsNode};
pub use progress::ProgressRecord;
