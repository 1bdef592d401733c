//! # planetoid-settings
//!
//! Configuration for the planetoid game-data server.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`PlanetoidSettings::default()`]
//! 2. **User file**: `~/.planetoid/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `PLANETOID_*` overrides (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use planetoid_settings::load_settings;
//!
//! let settings = load_settings().unwrap_or_default();
//! println!("listening on {}:{}", settings.server.host, settings.server.port);
//! ```

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, apply_overrides, deep_merge, load_settings, load_settings_from_path,
    settings_path,
};
pub use types::*;
