// Kura size-bounded file cache library

pub mod cache;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod lock;
pub mod logging;
pub mod service;
pub mod storage;
pub mod store;

pub use cache::{Cache, CacheContext, CacheFile, CacheUsage, FileWriter, Partition};
pub use error::CacheError;
pub use service::CacheService;
