//! Mempool and fee market.

pub mod config;
pub mod entry;
pub mod error;
pub mod pool;

pub use config::MempoolConfig;
pub use entry::{Entry, EntryState};
pub use error::MempoolError;
pub use pool::{MemPool, TxPool};
