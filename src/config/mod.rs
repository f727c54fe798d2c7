//! Inventory module for junos-ops.
//!
//! This module handles the host descriptor store:
//! - Parsing and deserializing `junos-ops.yaml`
//! - Validation of inventory values
//! - Resolving command-line targets by name and tag

mod spec;
mod parser;
mod validator;
mod targets;

pub use spec::{
    ConnectionParams, DEFAULT_DISPLAY_STYLE, DEFAULT_NETCONF_PORT, DEFAULT_REMOTE_PATH,
    HashAlgorithm, HostDescriptor, HostEntry, HostSettings, Inventory, PackageSpec,
};
pub use parser::{DEFAULT_CONFIG_FILES, InventoryParser, find_config_file, load_commands};
pub use validator::{ConfigValidator, ValidationResult};
pub use targets::{parse_tags, resolve_targets};
