//! envboot configuration system
//!
//! Configures the profile loader itself: which optional profiles are
//! sourced, how deep `source` may nest, the output shell dialect and logging.
//!
//! # Configuration Loading Priority
//!
//! 1. Compiled-in defaults
//! 2. `/etc/envboot/envboot.yaml` (system-wide)
//! 3. `~/.config/envboot/envboot.yaml` (user)
//! 4. `./envboot.yaml` (project-local)
//! 5. `ENVBOOT_CONFIG=/path/to/config.yaml` (explicit)
//! 6. Environment variables (highest priority)
//!
//! # Example Configuration
//!
//! ```yaml
//! profiles:
//!   distribution: /usr/share/defaults/etc/profile
//!   admin: /etc/profile
//!   max_source_depth: 8
//!   strict: false
//! output:
//!   shell: bash
//! logging:
//!   level: warn
//! ```

#![allow(missing_docs)]

mod error;
mod loader;
mod types;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use types::*;

/// Load configuration from default locations.
///
/// Searches for config files in order and merges them.
/// Environment variables override file values.
pub fn load() -> Result<EnvbootConfig, ConfigError> {
    ConfigLoader::new().load()
}

/// Load configuration from a specific file.
pub fn load_from_file(path: &str) -> Result<EnvbootConfig, ConfigError> {
    ConfigLoader::new().with_file(path).load()
}
