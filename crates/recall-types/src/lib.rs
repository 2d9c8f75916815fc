//! Shared data-model types for the Recall command-history store.

mod cache;
mod history;
mod machine;
mod mode;
mod session;
mod stats;
mod user;

pub use cache::CachedCommand;
pub use history::{HistoryRecord, Partition, SaveOptions, SearchOptions, WriteReceipt};
pub use machine::MachineInfo;
pub use mode::Mode;
pub use session::SessionRecord;
pub use stats::{CommandFrequency, StatsReport};
pub use user::User;
