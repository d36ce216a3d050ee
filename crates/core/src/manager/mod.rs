//! Directory lifecycle management.
//!
//! Every file moves through a fixed set of directories on the source
//! filesystem: inbound, work, then complete or error. The manager owns
//! those transitions; workers never rename pipeline files themselves.

mod error;
mod state;
mod types;

pub use error::ManagerError;
pub use state::DirManager;
pub use types::{ClaimedFile, ManagedDirs};
