pub mod accounts;
pub mod session_manager;
pub mod sync_scheduler;

pub use accounts::Accounts;
pub use session_manager::{Clock, SessionManager, SystemClock};
pub use sync_scheduler::{SyncScheduler, SyncState};
