//! Engine configuration
//!
//! Settings are merged from, lowest priority first:
//!
//! 1. built-in defaults
//! 2. `foldpool.toml` in the working directory
//! 3. a custom TOML file (`--config <file>`)
//! 4. `FOLDPOOL_*` environment variables (`FOLDPOOL_WORKERS=4`)
//! 5. command line overrides

pub mod core;

pub use self::core::{ConfigOverrides, EngineConfig};
