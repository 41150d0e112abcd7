//! Host registry and settings storage
//!
//! Both stores implement [`HostRegistry`](crate::traits::HostRegistry) and
//! [`SettingsStore`](crate::traits::SettingsStore) over the same host table:
//!
//! - [`MemoryStore`]: in-process only
//! - [`FileStore`]: JSON file with atomic writes and backup recovery

mod file;
mod memory;
mod table;

pub use file::FileStore;
pub use memory::MemoryStore;
