//! Identity resources — IAM roles/policies and the identity pool.
//!
//! Policy statements are always built from `ArnPattern`s so a grant can
//! target either a whole resource or an object path beneath it, without
//! ever widening to `*`.

use crate::core::context::EnvContext;
use crate::core::types::ValueRef;
use crate::resources::ref_json;
use serde_json::{json, Value};

/// An ARN reference plus an optional path suffix (e.g. `/*` for bucket
/// objects).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArnPattern {
    pub base: ValueRef,
    pub suffix: String,
}

impl ArnPattern {
    /// The resource itself.
    pub fn of(base: ValueRef) -> Self {
        Self {
            base,
            suffix: String::new(),
        }
    }

    /// Every object under the resource.
    pub fn objects(base: ValueRef) -> Self {
        Self {
            base,
            suffix: "/*".to_string(),
        }
    }

    pub fn to_json(&self, ctx: &EnvContext) -> Value {
        if self.suffix.is_empty() {
            return ref_json(&self.base, ctx);
        }
        match &self.base {
            ValueRef::Literal(s) => json!(format!("{}{}", s, self.suffix)),
            other => json!({ "Fn::Join": ["", [ref_json(other, ctx), self.suffix]] }),
        }
    }
}

/// A single Allow statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyStatement {
    pub sid: Option<String>,
    pub actions: Vec<String>,
    pub resources: Vec<ArnPattern>,
}

impl PolicyStatement {
    pub fn new(actions: &[&str], resources: Vec<ArnPattern>) -> Self {
        Self {
            sid: None,
            actions: actions.iter().map(|a| a.to_string()).collect(),
            resources,
        }
    }

    pub fn with_sid(mut self, sid: impl Into<String>) -> Self {
        self.sid = Some(sid.into());
        self
    }

    pub fn to_json(&self, ctx: &EnvContext) -> Value {
        let mut stmt = serde_json::Map::new();
        if let Some(ref sid) = self.sid {
            stmt.insert("Sid".to_string(), json!(sid));
        }
        stmt.insert("Effect".to_string(), json!("Allow"));
        stmt.insert("Action".to_string(), json!(self.actions));
        let resources: Vec<Value> = self.resources.iter().map(|r| r.to_json(ctx)).collect();
        stmt.insert("Resource".to_string(), json!(resources));
        Value::Object(stmt)
    }
}

/// Who may assume a role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrustPolicy {
    /// A service principal, e.g. "lambda.amazonaws.com"
    Service(String),
    /// Unauthenticated web-identity federation through an identity pool
    WebIdentity { pool: ValueRef },
}

/// A least-privilege role scoped to one consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSpec {
    pub role_name: String,
    pub trust: TrustPolicy,
    /// Name of the single inline policy
    pub policy_name: String,
    pub statements: Vec<PolicyStatement>,
}

pub fn role_properties(spec: &RoleSpec, ctx: &EnvContext) -> Value {
    let trust = match &spec.trust {
        TrustPolicy::Service(service) => json!({
            "Version": "2012-10-17",
            "Statement": [{
                "Effect": "Allow",
                "Principal": { "Service": service },
                "Action": "sts:AssumeRole"
            }]
        }),
        TrustPolicy::WebIdentity { pool } => json!({
            "Version": "2012-10-17",
            "Statement": [{
                "Effect": "Allow",
                "Principal": { "Federated": "cognito-identity.amazonaws.com" },
                "Action": "sts:AssumeRoleWithWebIdentity",
                "Condition": {
                    "StringEquals": {
                        "cognito-identity.amazonaws.com:aud": ref_json(pool, ctx)
                    },
                    "ForAnyValue:StringLike": {
                        "cognito-identity.amazonaws.com:amr": "unauthenticated"
                    }
                }
            }]
        }),
    };

    let statements: Vec<Value> = spec.statements.iter().map(|s| s.to_json(ctx)).collect();
    json!({
        "RoleName": spec.role_name,
        "AssumeRolePolicyDocument": trust,
        "Policies": [{
            "PolicyName": spec.policy_name,
            "PolicyDocument": {
                "Version": "2012-10-17",
                "Statement": statements
            }
        }]
    })
}

/// The identity pool — unauthenticated browsing of the public gallery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityPoolSpec {
    pub pool_name: String,
    pub allow_unauthenticated: bool,
}

pub fn identity_pool_properties(spec: &IdentityPoolSpec, _ctx: &EnvContext) -> Value {
    json!({
        "IdentityPoolName": spec.pool_name,
        "AllowUnauthenticatedIdentities": spec.allow_unauthenticated
    })
}

/// Binds the unauthenticated role to the pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolRoleAttachmentSpec {
    pub pool: ValueRef,
    pub unauthenticated_role: ValueRef,
}

pub fn pool_role_attachment_properties(spec: &PoolRoleAttachmentSpec, ctx: &EnvContext) -> Value {
    json!({
        "IdentityPoolId": ref_json(&spec.pool, ctx),
        "Roles": {
            "unauthenticated": ref_json(&spec.unauthenticated_role, ctx)
        }
    })
}
