// Background research jobs: job store, result cache, progress estimation

pub mod cache;
pub mod jobs;
pub mod progress;
pub mod workers;

pub use cache::{normalize_topic, ResultCache};
pub use jobs::{JobStatus, JobStore, ResearchJob};
pub use progress::ProgressEstimator;
pub use workers::{JobManager, SweepReport};
