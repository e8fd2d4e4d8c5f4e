//! Configuration parsing and structural validation.
//!
//! Parses portico.yaml and validates the constraints that don't need the
//! assembled stacks: version literal, slug/email/domain shapes, feature
//! combinations that cannot synthesize, tag key shapes.

use super::types::{Environment, SiteConfig};
use regex::Regex;
use std::path::Path;

/// Validation error.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub message: String,
}

impl ValidationError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Parse a portico.yaml file from disk.
pub fn parse_config_file(path: &Path) -> Result<SiteConfig, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
    parse_config(&content)
}

/// Parse a portico.yaml from a string.
pub fn parse_config(yaml: &str) -> Result<SiteConfig, String> {
    serde_yaml_ng::from_str(yaml).map_err(|e| format!("YAML parse error: {}", e))
}

/// Validate a parsed config. Returns a list of errors (empty = valid).
pub fn validate_config(config: &SiteConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.version != "1.0" {
        errors.push(ValidationError::new(format!(
            "version must be \"1.0\", got \"{}\"",
            config.version
        )));
    }

    let slug = Regex::new(r"^[a-z][a-z0-9-]{1,30}$").expect("valid literal regex");
    if !slug.is_match(&config.site) || config.site.ends_with('-') {
        errors.push(ValidationError::new(format!(
            "site must be a lowercase slug (got \"{}\")",
            config.site
        )));
    }

    let email = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid literal regex");
    if !email.is_match(&config.alert_email) {
        errors.push(ValidationError::new(format!(
            "alert_email \"{}\" is not an email address",
            config.alert_email
        )));
    }

    if let Some(ref domain) = config.domain {
        let name = Regex::new(r"^[a-z0-9][a-z0-9.-]*\.[a-z]{2,}$").expect("valid literal regex");
        if !name.is_match(&domain.root) {
            errors.push(ValidationError::new(format!(
                "domain root \"{}\" is not a domain name",
                domain.root
            )));
        }
        if domain.hosted_zone.is_empty() {
            errors.push(ValidationError::new("domain hosted_zone must not be empty"));
        }
    }

    if config.features.simple_dev && config.environment != Environment::Dev {
        errors.push(ValidationError::new(format!(
            "simple_dev is a dev-only variant (environment is {})",
            config.environment
        )));
    }

    if config.features.amplify_hosting {
        if config.amplify.is_none() {
            errors.push(ValidationError::new(
                "amplify_hosting is enabled but the amplify block is missing",
            ));
        }
        if config.features.simple_dev {
            errors.push(ValidationError::new(
                "amplify_hosting needs the backend stack, which simple_dev replaces",
            ));
        }
    }

    if config.features.enhanced_waf
        && config.phase == crate::core::types::DeploymentPhase::Minimal
    {
        errors.push(ValidationError::new(
            "enhanced_waf requires the enhanced or enterprise phase",
        ));
    }

    let country = Regex::new(r"^[A-Z]{2}$").expect("valid literal regex");
    for code in &config.geo_block {
        if !country.is_match(code) {
            errors.push(ValidationError::new(format!(
                "geo_block entry \"{}\" is not a two-letter country code",
                code
            )));
        }
    }

    let tag_key = Regex::new(r"^[A-Za-z][A-Za-z0-9_.:/+@-]{0,127}$").expect("valid literal regex");
    for key in config.tags.keys() {
        if !tag_key.is_match(key) {
            errors.push(ValidationError::new(format!(
                "tag key \"{}\" is not a valid tag key",
                key
            )));
        }
    }

    errors
}
