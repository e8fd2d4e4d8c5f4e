//! Managed-hosting resources — the Amplify app, branch, and domain.

use crate::core::context::EnvContext;
use crate::core::types::ValueRef;
use crate::resources::ref_json;
use indexmap::IndexMap;
use serde_json::{json, Value};

/// A managed-hosting app bound to a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmplifyAppSpec {
    pub app_name: String,
    pub repository: String,
    /// Build-time environment variables (upstream names and endpoints)
    pub environment_variables: IndexMap<String, ValueRef>,
}

pub fn amplify_app_properties(spec: &AmplifyAppSpec, ctx: &EnvContext) -> Value {
    let variables: Vec<Value> = spec
        .environment_variables
        .iter()
        .map(|(name, value)| json!({ "Name": name, "Value": ref_json(value, ctx) }))
        .collect();
    json!({
        "Name": spec.app_name,
        "Repository": spec.repository,
        "EnvironmentVariables": variables,
        "CustomRules": [{
            "Source": "/<*>",
            "Target": "/index.html",
            "Status": "404-200"
        }]
    })
}

/// The deployed branch of an app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmplifyBranchSpec {
    /// Logical id of the app in the same stack
    pub app: String,
    pub branch_name: String,
}

pub fn amplify_branch_properties(spec: &AmplifyBranchSpec, _ctx: &EnvContext) -> Value {
    json!({
        "AppId": { "Fn::GetAtt": [spec.app, "AppId"] },
        "BranchName": spec.branch_name,
        "EnableAutoBuild": true,
        "Stage": "PRODUCTION"
    })
}

/// A custom domain attached to an app branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmplifyDomainSpec {
    pub app: String,
    pub domain_name: String,
    /// Branch the root of the domain maps to
    pub branch: String,
}

pub fn amplify_domain_properties(spec: &AmplifyDomainSpec, _ctx: &EnvContext) -> Value {
    json!({
        "AppId": { "Fn::GetAtt": [spec.app, "AppId"] },
        "DomainName": spec.domain_name,
        "SubDomainSettings": [{
            "Prefix": "",
            "BranchName": spec.branch
        }]
    })
}
