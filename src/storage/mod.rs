//! Byte storage backends
//!
//! A cache keeps its bytes in a [`StorageBackend`] under flat string keys.
//! Two backends ship with the crate:
//! - **filesystem** ([`FileSystemStorage`]): tokio::fs rooted at a directory
//! - **memory** ([`MemoryStorage`]): in-process map, used by tests and
//!   ephemeral caches
//!
//! Backends are looked up by logical name through the [`StorageRegistry`].

mod backend;
mod error;
mod filesystem;
mod memory;
mod registry;

pub use self::backend::{OpenMode, StorageBackend, StorageObject};
pub use self::error::StorageError;
pub use self::filesystem::FileSystemStorage;
pub use self::memory::MemoryStorage;
pub use self::registry::{DefinedStorage, StorageRegistry, UNKNOWN_STORAGE_LABEL};
