//! # Blocks API Runtime
//!
//! Process-level concerns for the Blocks API binary.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (file, then `BLOCKS_API_*` environment overrides)
//! 2. Initialize logging
//! 3. Connect the Ledger Store and the Counter Store
//! 4. Serve HTTP until Ctrl-C

pub mod config;
pub mod logging;
pub mod wiring;

pub use config::{load, LoadError, LoadedConfig};
pub use wiring::{connect_stores, run, Stores};
