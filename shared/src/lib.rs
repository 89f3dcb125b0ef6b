//! Shared library for the OpenAI API Lambda functions.
//!
//! The centerpiece is the settings resolver: one immutable, fully-validated
//! configuration object per process, built from builder arguments,
//! environment variables, `terraform.tfvars`, and hardcoded defaults, with
//! lazily-constructed AWS clients and a diagnostic dump.

pub mod config;
pub mod environment;
pub mod error;
pub mod project;
pub mod secret;
pub mod tfvars;
pub mod version;

pub use config::{DynamoDbTable, Settings, SettingsBuilder, SettingsDefaults};
pub use environment::Environment;
pub use error::{Error, Result};
pub use secret::{SecretSource, SecretString};
pub use tfvars::{TfValue, TfVars};
