//! MapMerge Settings Crate
//!
//! Handles application configuration and its persistence.

pub mod config;
pub mod error;

pub use config::{AddressKeys, Config, ConflationSettings, HistorySettings, QuerySettings};
pub use error::{SettingsError, SettingsResult};
