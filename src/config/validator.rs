//! Inventory validation.
//!
//! Catches inventory mistakes before any device is contacted.

use crate::error::{ConfigError, JunosOpsError, Result};
use std::collections::HashSet;
use tracing::debug;

use super::spec::{HostSettings, Inventory};

/// Validator for inventories.
#[derive(Debug, Default)]
pub struct ConfigValidator;

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates an inventory.
    ///
    /// # Errors
    ///
    /// Returns the first validation error if any were found.
    pub fn validate(&self, inventory: &Inventory) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();

        if inventory.hosts.is_empty() {
            result.warnings.push(String::from("Inventory defines no hosts"));
        }

        Self::validate_settings("defaults", &inventory.defaults, &mut result);

        let mut seen = HashSet::new();
        for (i, host) in inventory.hosts.iter().enumerate() {
            let prefix = format!("hosts[{i}]");

            if host.name.trim().is_empty() {
                result.errors.push(ValidationError {
                    field: format!("{prefix}.name"),
                    message: String::from("Host name cannot be empty"),
                });
            } else if !seen.insert(host.name.as_str()) {
                return Err(JunosOpsError::Config(ConfigError::DuplicateHost {
                    name: host.name.clone(),
                }));
            }

            Self::validate_settings(&prefix, &host.settings, &mut result);

            let merged = host.settings.merged_over(&inventory.defaults);
            if merged.packages.is_empty() {
                result
                    .warnings
                    .push(format!("{}: no packages configured, upgrade commands will fail", host.name));
            }
        }

        if let Some(first_error) = result.errors.first() {
            return Err(JunosOpsError::Config(ConfigError::ValidationError {
                message: first_error.message.clone(),
                field: Some(first_error.field.clone()),
            }));
        }

        debug!("Inventory validation passed");
        Ok(result)
    }

    /// Validates one settings block.
    fn validate_settings(prefix: &str, settings: &HostSettings, result: &mut ValidationResult) {
        if settings.port == Some(0) {
            result.errors.push(ValidationError {
                field: format!("{prefix}.port"),
                message: String::from("Port cannot be 0"),
            });
        }

        if settings.confirm_timeout == Some(0) {
            result.errors.push(ValidationError {
                field: format!("{prefix}.confirm_timeout"),
                message: String::from("Commit confirm timeout must be at least 1 minute"),
            });
        }

        for (model, package) in &settings.packages {
            if !package.file.ends_with(".tgz") {
                result.errors.push(ValidationError {
                    field: format!("{prefix}.packages.{model}.file"),
                    message: format!("Package file '{}' must be a .tgz archive", package.file),
                });
            }
            if package.hash.trim().is_empty() {
                result
                    .warnings
                    .push(format!("{prefix}.packages.{model}: empty hash, package checks will report missing"));
            }
        }
    }
}

impl ValidationResult {
    /// Returns true if no errors were found.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}
