//! Settings validation.
//!
//! Field-level rules are declared on the settings structs with the
//! `validator` derive; this module flattens those results and adds the
//! checks that span several sections of the file.

use crate::error::{ConfigError, GoldenConfigError, Result};
use std::collections::HashSet;
use tracing::debug;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use super::spec::{RunnerStrategy, Settings};

/// Validator for deployment settings.
#[derive(Debug, Default)]
pub struct SettingsValidator;

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

impl SettingsValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates the settings.
    ///
    /// # Errors
    ///
    /// Returns the first validation error if any rule fails.
    pub fn validate(&self, settings: &Settings) -> Result<ValidationResult> {
        let mut result = Self::collect(settings);

        if result.errors.is_empty() {
            debug!("Settings validation passed");
            Ok(result)
        } else {
            let first_error = result.errors.remove(0);
            Err(GoldenConfigError::Config(ConfigError::ValidationError {
                message: first_error.message,
                field: Some(first_error.field),
            }))
        }
    }

    /// Runs every rule and returns the full result without failing.
    #[must_use]
    pub fn collect(settings: &Settings) -> ValidationResult {
        let mut result = ValidationResult::default();

        if let Err(errors) = settings.validate() {
            flatten_errors("", &errors, &mut result);
        }
        Self::validate_drivers(settings, &mut result);
        Self::validate_secrets_groups(settings, &mut result);
        Self::validate_runner(settings, &mut result);

        result.errors.sort_by(|a, b| a.field.cmp(&b.field));
        result
    }

    /// Checks that the platform map only targets registered drivers.
    fn validate_drivers(settings: &Settings, result: &mut ValidationResult) {
        if settings.drivers.is_empty() {
            result
                .warnings
                .push(String::from("No drivers configured; every deployment will fail inventory"));
        }

        let mut platforms: Vec<_> = settings.platform_network_driver_map.iter().collect();
        platforms.sort();
        for (platform, driver) in platforms {
            if !settings.drivers.contains_key(driver) {
                result.errors.push(ValidationError {
                    field: format!("platform_network_driver_map.{platform}"),
                    message: format!("Platform '{platform}' maps to unregistered driver '{driver}'"),
                });
            }
        }

        for (name, driver) in &settings.drivers {
            if driver.scheme != "http" && driver.scheme != "https" {
                result.errors.push(ValidationError {
                    field: format!("drivers.{name}.scheme"),
                    message: format!("Unsupported scheme '{}'", driver.scheme),
                });
            }
            if !driver.path.starts_with('/') {
                result.errors.push(ValidationError {
                    field: format!("drivers.{name}.path"),
                    message: format!("Endpoint path must be absolute: {}", driver.path),
                });
            }
            if !driver.verify_tls {
                result
                    .warnings
                    .push(format!("drivers.{name}: TLS verification is disabled"));
            }
        }
    }

    /// Checks secrets group associations and repository references.
    fn validate_secrets_groups(settings: &Settings, result: &mut ValidationResult) {
        for (group, associations) in &settings.secrets_groups {
            let mut seen = HashSet::new();
            for (i, association) in associations.iter().enumerate() {
                if !seen.insert((association.access_type, association.secret_type)) {
                    result.errors.push(ValidationError {
                        field: format!("secrets_groups.{group}[{i}]"),
                        message: format!(
                            "Duplicate {}/{} association",
                            association.access_type, association.secret_type
                        ),
                    });
                }
                if association.env.is_empty() {
                    result.errors.push(ValidationError {
                        field: format!("secrets_groups.{group}[{i}].env"),
                        message: String::from("Environment variable name cannot be empty"),
                    });
                }
            }
        }

        for (i, repository) in settings.repositories.iter().enumerate() {
            if let Some(group) = &repository.secrets_group
                && !settings.secrets_groups.contains_key(group)
            {
                result.errors.push(ValidationError {
                    field: format!("repositories[{i}].secrets_group"),
                    message: format!(
                        "Repository '{}' references unknown secrets group '{group}'",
                        repository.name
                    ),
                });
            }
        }
    }

    /// Flags runner settings that have no effect.
    fn validate_runner(settings: &Settings, result: &mut ValidationResult) {
        if settings.runner.strategy == RunnerStrategy::Serial && settings.runner.num_workers != 1 {
            result.warnings.push(format!(
                "runner.num_workers: {} is ignored by the serial strategy",
                settings.runner.num_workers
            ));
        }
    }
}

/// Flattens nested derive errors into dotted field paths.
fn flatten_errors(prefix: &str, errors: &ValidationErrors, result: &mut ValidationResult) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(failures) => {
                for failure in failures {
                    let message = failure
                        .message
                        .as_ref()
                        .map_or_else(|| format!("failed '{}' check", failure.code), ToString::to_string);
                    result.errors.push(ValidationError {
                        field: path.clone(),
                        message,
                    });
                }
            }
            ValidationErrorsKind::Struct(nested) => flatten_errors(&path, nested, result),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    flatten_errors(&format!("{path}[{index}]"), nested, result);
                }
            }
        }
    }
}

impl ValidationResult {
    /// Returns true if validation passed (no errors).
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of errors.
    #[must_use]
    pub const fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Returns the number of warnings.
    #[must_use]
    pub const fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}
