//! Compute resources — handler functions, data bindings, schedules.
//!
//! A `DataBinding` is the single declaration from which BOTH the injected
//! environment variable and the execution-role grant are derived, so the
//! role can never be broader than what the handler is configured to reach.

use crate::core::context::EnvContext;
use crate::core::types::ValueRef;
use crate::resources::identity::{ArnPattern, PolicyStatement, RoleSpec, TrustPolicy};
use crate::resources::ref_json;
use indexmap::IndexMap;
use serde_json::{json, Value};
use std::fmt;

/// Handler runtime identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Runtime {
    Node20,
    Python312,
}

impl fmt::Display for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node20 => write!(f, "nodejs20.x"),
            Self::Python312 => write!(f, "python3.12"),
        }
    }
}

/// Where the handler code comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeSource {
    /// Inline stub source, for placeholder and report handlers
    Inline(String),
    /// A packaged artifact key in the site's artifacts bucket
    Artifact { key: String },
}

/// What a binding lets the handler do with its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Read,
    Write,
    ReadWrite,
}

impl AccessMode {
    pub fn reads(self) -> bool {
        matches!(self, Self::Read | Self::ReadWrite)
    }

    pub fn writes(self) -> bool {
        matches!(self, Self::Write | Self::ReadWrite)
    }
}

/// The kind of resource a binding targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingService {
    Table,
    Bucket,
}

/// One data dependency of a handler: env var + derived grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataBinding {
    /// Environment variable the handler reads the target's name from
    pub env_name: String,
    pub service: BindingService,
    /// Value injected into the environment (a name)
    pub name_ref: ValueRef,
    /// ARN the grant is scoped to
    pub arn_ref: ValueRef,
    pub access: AccessMode,
}

impl DataBinding {
    pub fn table(
        env_name: impl Into<String>,
        name_ref: ValueRef,
        arn_ref: ValueRef,
        access: AccessMode,
    ) -> Self {
        Self {
            env_name: env_name.into(),
            service: BindingService::Table,
            name_ref,
            arn_ref,
            access,
        }
    }

    pub fn bucket(
        env_name: impl Into<String>,
        name_ref: ValueRef,
        arn_ref: ValueRef,
        access: AccessMode,
    ) -> Self {
        Self {
            env_name: env_name.into(),
            service: BindingService::Bucket,
            name_ref,
            arn_ref,
            access,
        }
    }

    /// The statements this binding grants. Table access is one statement;
    /// bucket access splits object actions from the bucket listing.
    pub fn statements(&self) -> Vec<PolicyStatement> {
        match self.service {
            BindingService::Table => {
                let mut actions: Vec<&str> = Vec::new();
                if self.access.reads() {
                    actions.extend(["dynamodb:GetItem", "dynamodb:Query", "dynamodb:Scan"]);
                }
                if self.access.writes() {
                    actions.extend([
                        "dynamodb:PutItem",
                        "dynamodb:UpdateItem",
                        "dynamodb:DeleteItem",
                    ]);
                }
                vec![PolicyStatement::new(
                    &actions,
                    vec![ArnPattern::of(self.arn_ref.clone())],
                )]
            }
            BindingService::Bucket => {
                let mut statements = Vec::new();
                let mut object_actions: Vec<&str> = Vec::new();
                if self.access.reads() {
                    object_actions.push("s3:GetObject");
                }
                if self.access.writes() {
                    object_actions.extend(["s3:PutObject", "s3:DeleteObject"]);
                }
                statements.push(PolicyStatement::new(
                    &object_actions,
                    vec![ArnPattern::objects(self.arn_ref.clone())],
                ));
                if self.access.reads() {
                    statements.push(PolicyStatement::new(
                        &["s3:ListBucket"],
                        vec![ArnPattern::of(self.arn_ref.clone())],
                    ));
                }
                statements
            }
        }
    }
}

/// A deployable handler function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSpec {
    pub function_name: String,
    pub description: String,
    pub runtime: Runtime,
    pub handler: String,
    pub memory_mb: u32,
    pub timeout_secs: u32,
    pub code: CodeSource,
    /// Data dependencies; each injects one env var and scopes the role
    pub bindings: Vec<DataBinding>,
    /// Service-API grants that have no data target (e.g. cost explorer
    /// queries); declared explicitly, never inferred
    pub service_grants: Vec<PolicyStatement>,
    /// Additional plain env vars (site URL, feature flags)
    pub env: IndexMap<String, ValueRef>,
    /// Execution-role reference, filled in when the function is added to
    /// a stack
    pub role: ValueRef,
}

impl FunctionSpec {
    /// The statements the execution role must carry: log delivery plus
    /// exactly the binding grants and declared service grants, nothing
    /// else.
    pub fn role_statements(&self) -> Vec<PolicyStatement> {
        let mut statements = vec![log_statement()];
        for binding in &self.bindings {
            statements.extend(binding.statements());
        }
        statements.extend(self.service_grants.iter().cloned());
        statements
    }

    /// Derive the least-privilege execution role for this function.
    pub fn execution_role(&self, role_name: String) -> RoleSpec {
        RoleSpec {
            role_name,
            trust: TrustPolicy::Service("lambda.amazonaws.com".to_string()),
            policy_name: "handler-access".to_string(),
            statements: self.role_statements(),
        }
    }
}

/// The baseline log-delivery statement every handler role carries.
pub fn log_statement() -> PolicyStatement {
    PolicyStatement::new(
        &[
            "logs:CreateLogGroup",
            "logs:CreateLogStream",
            "logs:PutLogEvents",
        ],
        vec![ArnPattern::of(ValueRef::literal("arn:aws:logs:*:*:*"))],
    )
    .with_sid("Logs")
}

pub fn function_properties(spec: &FunctionSpec, ctx: &EnvContext) -> Value {
    let mut variables = serde_json::Map::new();
    for binding in &spec.bindings {
        variables.insert(binding.env_name.clone(), ref_json(&binding.name_ref, ctx));
    }
    for (name, value) in &spec.env {
        variables.insert(name.clone(), ref_json(value, ctx));
    }

    let code = match &spec.code {
        CodeSource::Inline(source) => json!({ "ZipFile": source }),
        CodeSource::Artifact { key } => json!({
            "S3Bucket": ctx.artifacts_bucket(),
            "S3Key": key
        }),
    };

    json!({
        "FunctionName": spec.function_name,
        "Description": spec.description,
        "Runtime": spec.runtime.to_string(),
        "Handler": spec.handler,
        "MemorySize": spec.memory_mb,
        "Timeout": spec.timeout_secs,
        "Role": ref_json(&spec.role, ctx),
        "Code": code,
        "Environment": { "Variables": Value::Object(variables) }
    })
}

/// A time-based trigger for a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleSpec {
    pub rule_name: String,
    /// `cron(...)` or `rate(...)` expression
    pub expression: String,
    /// Logical id of the target function in the same stack
    pub target_function: String,
    pub enabled: bool,
}

pub fn schedule_properties(spec: &ScheduleSpec, _ctx: &EnvContext) -> Value {
    let state = if spec.enabled { "ENABLED" } else { "DISABLED" };
    json!({
        "Name": spec.rule_name,
        "ScheduleExpression": spec.expression,
        "State": state,
        "Targets": [{
            "Arn": { "Fn::GetAtt": [spec.target_function, "Arn"] },
            "Id": format!("{}-target", spec.rule_name)
        }]
    })
}
