//! Environment and phase parameterization.
//!
//! `EnvContext` is the single place where an environment string turns into
//! concrete settings: derived resource/export names, retention policy,
//! cache TTLs, throttling limits, log retention, and the phase budget
//! mapping. Stack builders never branch on the environment directly.

use super::types::{DeploymentPhase, Environment, SiteConfig};
use indexmap::IndexMap;
use std::fmt;

/// What the provisioning engine does with a resource when its stack is
/// deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalPolicy {
    Retain,
    Destroy,
}

impl RemovalPolicy {
    /// The template `DeletionPolicy` value.
    pub fn deletion_policy(self) -> &'static str {
        match self {
            Self::Retain => "Retain",
            Self::Destroy => "Delete",
        }
    }
}

impl fmt::Display for RemovalPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.deletion_policy())
    }
}

/// Gateway throttling limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttle {
    pub rate_limit: u32,
    pub burst_limit: u32,
}

/// Resolved per-environment settings for one site deployment.
#[derive(Debug, Clone)]
pub struct EnvContext {
    pub site: String,
    pub environment: Environment,
    pub phase: DeploymentPhase,
    pub region: String,
    pub tags: IndexMap<String, String>,
}

impl EnvContext {
    pub fn from_config(config: &SiteConfig) -> Self {
        Self {
            site: config.site.clone(),
            environment: config.environment,
            phase: config.phase,
            region: config.region.clone(),
            tags: config.tags.clone(),
        }
    }

    /// Same site/phase, different environment. Used by cross-environment
    /// name-collision checks.
    pub fn for_environment(&self, environment: Environment) -> Self {
        Self {
            environment,
            ..self.clone()
        }
    }

    /// Derived physical name: `{site}-{stack}-{base}-{environment}`.
    pub fn resource_name(&self, stack: &str, base: &str) -> String {
        format!("{}-{}-{}-{}", self.site, stack, base, self.environment)
    }

    /// Export name for a stack output: `{site}-{stack}-{output}-{environment}`.
    pub fn export_name(&self, stack: &str, output: &str) -> String {
        format!("{}-{}-{}-{}", self.site, stack, output, self.environment)
    }

    /// Storage resources survive stack deletion only in production.
    pub fn removal_policy(&self) -> RemovalPolicy {
        if self.environment.is_production() {
            RemovalPolicy::Retain
        } else {
            RemovalPolicy::Destroy
        }
    }

    /// Default CDN cache TTL. Long in production, short everywhere else so
    /// iteration doesn't fight the cache.
    pub fn cache_ttl_secs(&self) -> u64 {
        if self.environment.is_production() {
            86_400
        } else {
            300
        }
    }

    /// Gateway throttling limits per environment.
    pub fn api_throttle(&self) -> Throttle {
        match self.environment {
            Environment::Production => Throttle {
                rate_limit: 50,
                burst_limit: 100,
            },
            Environment::Staging => Throttle {
                rate_limit: 20,
                burst_limit: 40,
            },
            Environment::Dev => Throttle {
                rate_limit: 10,
                burst_limit: 20,
            },
        }
    }

    /// Access-log retention in days.
    pub fn log_retention_days(&self) -> u32 {
        if self.environment.is_production() {
            365
        } else {
            30
        }
    }

    /// Point-in-time recovery for the key-value table.
    pub fn point_in_time_recovery(&self) -> bool {
        self.environment.is_production()
    }

    /// Baseline WAF rate limit (requests per 5 minutes per IP).
    pub fn rate_limit_per_5min(&self) -> u64 {
        if self.environment.is_production() {
            2_000
        } else {
            500
        }
    }

    /// Monthly budget ceiling for the configured phase.
    pub fn budget_limit_usd(&self) -> u32 {
        self.phase.budget_limit_usd()
    }

    /// Operator-managed bucket that CI uploads handler artifacts to.
    /// A deployment convention, not a synthesized resource.
    pub fn artifacts_bucket(&self) -> String {
        format!("{}-artifacts-{}", self.site, self.environment)
    }
}
