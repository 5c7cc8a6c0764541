//! Automation Configuration Module
//!
//! Provides workstation configuration loaded from TOML files: where GMAT lives,
//! how the worker pool is sized, and the report pipeline policies.
//!
//! ## Loading Order
//!
//! 1. `GMAT_AUTOMATION_CONFIG` environment variable (path to TOML file)
//! 2. `gmat_automation.toml` in the current working directory
//! 3. Built-in defaults
//!
//! ## Usage
//!
//! Call `config::init()` once at startup, then `config::get()` anywhere:
//!
//! ```ignore
//! // In main():
//! config::init(AutomationConfig::load());
//!
//! // Anywhere in the codebase:
//! let timeout = config::get().batcher.timeout_secs;
//! ```

mod automation_config;
pub mod defaults;
pub mod validation;

pub use automation_config::*;

use std::sync::OnceLock;

/// Global automation configuration, initialized once at startup.
static AUTOMATION_CONFIG: OnceLock<AutomationConfig> = OnceLock::new();

/// Initialize the global automation configuration.
///
/// Later calls are ignored with a warning.
pub fn init(config: AutomationConfig) {
    if AUTOMATION_CONFIG.set(config).is_err() {
        tracing::warn!("config::init() called more than once, ignoring");
    }
}

/// Get a reference to the global automation configuration.
///
/// Panics if `init()` has not been called. A missing config is a startup bug.
#[allow(clippy::expect_used)]
pub fn get() -> &'static AutomationConfig {
    AUTOMATION_CONFIG
        .get()
        .expect("config::get() called before config::init()")
}

/// Check whether the config has been initialized.
pub fn is_initialized() -> bool {
    AUTOMATION_CONFIG.get().is_some()
}
