//! Deployment configuration and shared types.
//!
//! Defines the `portico.yaml` schema, the environment/phase enums, the
//! cross-stack reference model, and the plan/lock/manifest types shared by
//! the synthesis pipeline. Config types derive Serialize/Deserialize for
//! YAML roundtripping and JsonSchema for the `schema` subcommand.

use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Top-level portico.yaml
// ============================================================================

/// Root configuration — the deployment settings for one site.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SiteConfig {
    /// Schema version (must be "1.0")
    pub version: String,

    /// Site slug, used as the prefix of every derived resource name
    pub site: String,

    /// Optional description
    #[serde(default)]
    pub description: Option<String>,

    /// Target environment
    pub environment: Environment,

    /// Deployment phase — controls budget limits and WAF depth
    #[serde(default)]
    pub phase: DeploymentPhase,

    /// Provisioning region
    #[serde(default = "default_region")]
    pub region: String,

    /// Address for budget and alarm notifications
    pub alert_email: String,

    /// Custom domain settings (omit to stay on generated domains)
    #[serde(default)]
    pub domain: Option<DomainConfig>,

    /// Feature toggles per auxiliary stack
    #[serde(default)]
    pub features: Features,

    /// Managed-hosting settings, required when `features.amplify_hosting`
    #[serde(default)]
    pub amplify: Option<AmplifyConfig>,

    /// Country codes the enhanced WAF blocks outright
    #[serde(default)]
    pub geo_block: Vec<String>,

    /// Tags applied to every synthesized resource (order-preserving)
    #[serde(default)]
    pub tags: IndexMap<String, String>,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

/// Custom-domain settings for the delivery stack.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DomainConfig {
    /// Apex domain, e.g. "jane-doe.photos"
    pub root: String,

    /// Also serve www.<root> from the distribution
    #[serde(default)]
    pub www_alias: bool,

    /// Hosted zone that owns the alias records
    pub hosted_zone: String,
}

/// Feature toggles. Each gate enables one auxiliary stack.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Features {
    /// Dedicated image-optimization distribution
    #[serde(default = "default_true")]
    pub image_cdn: bool,

    /// Metadata/sitemap/robots generation stack
    #[serde(default = "default_true")]
    pub seo: bool,

    /// Media replication stack
    #[serde(default)]
    pub backup: bool,

    /// Access-log bucket and data-event trail
    #[serde(default)]
    pub security_logging: bool,

    /// Budget and weekly cost-report stack
    #[serde(default = "default_true")]
    pub cost_controls: bool,

    /// Enhanced WAF stack (enhanced/enterprise phases)
    #[serde(default)]
    pub enhanced_waf: bool,

    /// Managed hosting via an Amplify app
    #[serde(default)]
    pub amplify_hosting: bool,

    /// Collapse the delivery stacks into one low-cost dev stack
    #[serde(default)]
    pub simple_dev: bool,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            image_cdn: true,
            seo: true,
            backup: false,
            security_logging: false,
            cost_controls: true,
            enhanced_waf: false,
            amplify_hosting: false,
            simple_dev: false,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Managed-hosting app settings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AmplifyConfig {
    /// Repository URL the app builds from
    pub repository: String,

    /// Branch to deploy
    #[serde(default = "default_branch")]
    pub branch: String,
}

fn default_branch() -> String {
    "main".to_string()
}

// ============================================================================
// Environment and phase
// ============================================================================

/// Target environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Dev,
    Staging,
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }

    /// All environments, for cross-environment validation.
    pub fn all() -> [Environment; 3] {
        [Self::Dev, Self::Staging, Self::Production]
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dev => write!(f, "dev"),
            Self::Staging => write!(f, "staging"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// Deployment phase — the cost/protection tier of the rollout.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentPhase {
    #[default]
    Minimal,
    Enhanced,
    Enterprise,
}

impl DeploymentPhase {
    /// Monthly budget ceiling in USD. Fixed mapping, not configurable.
    pub fn budget_limit_usd(self) -> u32 {
        match self {
            Self::Minimal => 20,
            Self::Enhanced => 60,
            Self::Enterprise => 120,
        }
    }
}

impl fmt::Display for DeploymentPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Minimal => write!(f, "minimal"),
            Self::Enhanced => write!(f, "enhanced"),
            Self::Enterprise => write!(f, "enterprise"),
        }
    }
}

// ============================================================================
// References and outputs
// ============================================================================

/// A resource attribute value — literal or reference.
///
/// Same-stack references resolve to `Ref`/`Fn::GetAtt` at synthesis time;
/// cross-stack references resolve to `Fn::ImportValue` of the upstream
/// stack's export. References never own their target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueRef {
    /// A plain string value
    Literal(String),
    /// `Ref` to a logical id in the same stack
    LogicalRef(String),
    /// `Fn::GetAtt` on a logical id in the same stack
    Attr { resource: String, attr: String },
    /// `Fn::ImportValue` of an upstream stack output
    Import { stack: String, output: String },
    /// `Fn::Sub` template; `${Name}` tokens reference same-stack logical
    /// ids or `AWS::*` pseudo parameters
    Sub(String),
}

impl ValueRef {
    pub fn literal(s: impl Into<String>) -> Self {
        Self::Literal(s.into())
    }

    pub fn sub(template: impl Into<String>) -> Self {
        Self::Sub(template.into())
    }

    pub fn logical(id: impl Into<String>) -> Self {
        Self::LogicalRef(id.into())
    }

    pub fn attr(resource: impl Into<String>, attr: impl Into<String>) -> Self {
        Self::Attr {
            resource: resource.into(),
            attr: attr.into(),
        }
    }

    pub fn import(stack: impl Into<String>, output: impl Into<String>) -> Self {
        Self::Import {
            stack: stack.into(),
            output: output.into(),
        }
    }
}

/// A named stack output, exported for downstream stacks and operators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Output {
    pub value: ValueRef,
    pub description: String,
}

impl Output {
    pub fn new(value: ValueRef, description: impl Into<String>) -> Self {
        Self {
            value,
            description: description.into(),
        }
    }
}

// ============================================================================
// Plan
// ============================================================================

/// Action the provisioning engine would take on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanAction {
    Create,
    Update,
    Destroy,
    NoOp,
}

impl fmt::Display for PlanAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "CREATE"),
            Self::Update => write!(f, "UPDATE"),
            Self::Destroy => write!(f, "DESTROY"),
            Self::NoOp => write!(f, "NO-OP"),
        }
    }
}

/// A single planned change.
#[derive(Debug, Clone)]
pub struct PlannedChange {
    /// Stack the resource belongs to
    pub stack: String,

    /// Logical id within the stack
    pub logical_id: String,

    /// Provisioning type string (e.g. "AWS::S3::Bucket")
    pub resource_type: String,

    /// Action to take
    pub action: PlanAction,

    /// Human-readable description
    pub description: String,
}

/// Full synthesis plan for a site.
#[derive(Debug, Clone)]
pub struct SynthPlan {
    /// Site slug
    pub site: String,

    /// Planned changes grouped by stack, in stack order
    pub changes: Vec<PlannedChange>,

    /// Topological stack order
    pub stack_order: Vec<String>,

    /// Summary counts
    pub to_create: u32,
    pub to_update: u32,
    pub to_destroy: u32,
    pub unchanged: u32,
}

// ============================================================================
// Synthesis lock
// ============================================================================

/// Per-site synthesis lock — the hashed record of the last synth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthLock {
    /// Schema version
    pub schema: String,

    /// Site slug
    pub site: String,

    /// Environment the templates were synthesized for
    pub environment: Environment,

    /// When the lock was generated
    pub generated_at: String,

    /// Generator version
    pub generator: String,

    /// Per-stack state, in stack order
    pub stacks: IndexMap<String, StackLock>,
}

/// Per-stack lock entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackLock {
    /// BLAKE3 hash of the rendered template
    pub template_hash: String,

    /// Per-resource hashes, in declaration order
    pub resources: IndexMap<String, ResourceEntry>,
}

/// Per-resource lock entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceEntry {
    /// Provisioning type string
    #[serde(rename = "type")]
    pub resource_type: String,

    /// BLAKE3 hash of the resource node (type + properties + policies)
    pub hash: String,
}

// ============================================================================
// Synthesis manifest
// ============================================================================

/// Manifest written next to the synthesized templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub site: String,
    pub environment: Environment,
    pub generated_at: String,
    pub stack_order: Vec<String>,
    pub templates: IndexMap<String, TemplateEntry>,
}

/// One template in the manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateEntry {
    /// File name relative to the output directory
    pub file: String,

    /// BLAKE3 hash of the file contents
    pub hash: String,

    /// Number of resources declared in the template
    pub resources: usize,
}

// ============================================================================
// Tests
// ============================================================================
