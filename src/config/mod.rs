//! Settings module for the golden config deployment system.
//!
//! This module handles all settings-related functionality:
//! - Parsing and deserializing `golden-config.yaml`
//! - Environment variable overrides
//! - Validation of settings values

mod parser;
mod spec;
mod validator;

pub use parser::{DEFAULT_CONFIG_FILES, DEFAULT_STORE_PATH, SettingsParser, find_config_file};
pub use spec::{
    CredentialsSource, DeploySettings, DriverConfig, InventorySettings, RunnerSettings,
    RunnerStrategy, SecretAssociation, Settings, StoreSettings,
};
pub use validator::{SettingsValidator, ValidationError, ValidationResult};
