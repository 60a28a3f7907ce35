pub mod config;
pub mod diff;
pub mod error;
pub mod last_rank;
pub mod metric;
pub mod models;
pub mod reconciler;
pub mod scheduler;
pub mod throttle;
pub mod traits;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::Config;
pub use error::AppError;
pub use metric::Metric;
pub use models::{LeaderSnapshot, PlayerRankEntry};
pub use reconciler::{CycleReport, Reconciler};
pub use scheduler::{Scheduler, SchedulerConfig};
pub use traits::{HiscoreClient, LeaderboardClient, SubmissionReceipt};
