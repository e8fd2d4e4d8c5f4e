//! Resource descriptors — one module per concern.
//!
//! Each module defines the typed descriptors for its resource family and a
//! `*_properties` function that renders a descriptor into template
//! property JSON. The `ResourceSpec` enum is the closed set of everything
//! a stack can declare.

pub mod compute;
pub mod hosting;
pub mod identity;
pub mod network;
pub mod protection;
pub mod storage;

use crate::core::context::{EnvContext, RemovalPolicy};
use crate::core::types::ValueRef;
use serde_json::{json, Value};

/// Everything a stack can declare.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceSpec {
    Table(storage::TableSpec),
    Bucket(storage::BucketSpec),
    Function(compute::FunctionSpec),
    Schedule(compute::ScheduleSpec),
    Role(identity::RoleSpec),
    IdentityPool(identity::IdentityPoolSpec),
    PoolRoleAttachment(identity::PoolRoleAttachmentSpec),
    HttpApi(network::HttpApiSpec),
    ApiStage(network::ApiStageSpec),
    ApiIntegration(network::ApiIntegrationSpec),
    ApiRoute(network::ApiRouteSpec),
    Distribution(network::DistributionSpec),
    CachePolicy(network::CachePolicySpec),
    HeadersPolicy(network::HeadersPolicySpec),
    Certificate(network::CertificateSpec),
    DnsRecord(network::DnsRecordSpec),
    WebAcl(protection::WebAclSpec),
    Budget(protection::BudgetSpec),
    Alarm(protection::AlarmSpec),
    Trail(protection::TrailSpec),
    AmplifyApp(hosting::AmplifyAppSpec),
    AmplifyBranch(hosting::AmplifyBranchSpec),
    AmplifyDomain(hosting::AmplifyDomainSpec),
}

impl ResourceSpec {
    /// The provisioning type string for the template node.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Table(_) => "AWS::DynamoDB::Table",
            Self::Bucket(_) => "AWS::S3::Bucket",
            Self::Function(_) => "AWS::Lambda::Function",
            Self::Schedule(_) => "AWS::Events::Rule",
            Self::Role(_) => "AWS::IAM::Role",
            Self::IdentityPool(_) => "AWS::Cognito::IdentityPool",
            Self::PoolRoleAttachment(_) => "AWS::Cognito::IdentityPoolRoleAttachment",
            Self::HttpApi(_) => "AWS::ApiGatewayV2::Api",
            Self::ApiStage(_) => "AWS::ApiGatewayV2::Stage",
            Self::ApiIntegration(_) => "AWS::ApiGatewayV2::Integration",
            Self::ApiRoute(_) => "AWS::ApiGatewayV2::Route",
            Self::Distribution(_) => "AWS::CloudFront::Distribution",
            Self::CachePolicy(_) => "AWS::CloudFront::CachePolicy",
            Self::HeadersPolicy(_) => "AWS::CloudFront::ResponseHeadersPolicy",
            Self::Certificate(_) => "AWS::CertificateManager::Certificate",
            Self::DnsRecord(_) => "AWS::Route53::RecordSet",
            Self::WebAcl(_) => "AWS::WAFv2::WebACL",
            Self::Budget(_) => "AWS::Budgets::Budget",
            Self::Alarm(_) => "AWS::CloudWatch::Alarm",
            Self::Trail(_) => "AWS::CloudTrail::Trail",
            Self::AmplifyApp(_) => "AWS::Amplify::App",
            Self::AmplifyBranch(_) => "AWS::Amplify::Branch",
            Self::AmplifyDomain(_) => "AWS::Amplify::Domain",
        }
    }

    /// The derived physical name, for resources that carry one. Used by
    /// the cross-stack uniqueness check.
    pub fn physical_name(&self) -> Option<&str> {
        match self {
            Self::Table(t) => Some(&t.table_name),
            Self::Bucket(b) => Some(&b.bucket_name),
            Self::Function(f) => Some(&f.function_name),
            Self::Schedule(s) => Some(&s.rule_name),
            Self::Role(r) => Some(&r.role_name),
            Self::IdentityPool(p) => Some(&p.pool_name),
            Self::HttpApi(a) => Some(&a.api_name),
            Self::CachePolicy(c) => Some(&c.name),
            Self::HeadersPolicy(h) => Some(&h.name),
            Self::WebAcl(w) => Some(&w.acl_name),
            Self::Budget(b) => Some(&b.budget_name),
            Self::Alarm(a) => Some(&a.alarm_name),
            Self::Trail(t) => Some(&t.trail_name),
            Self::AmplifyApp(a) => Some(&a.app_name),
            _ => None,
        }
    }

    /// Removal policy, for the storage resources that carry one.
    pub fn removal_policy(&self) -> Option<RemovalPolicy> {
        match self {
            Self::Table(t) => Some(t.removal_policy),
            Self::Bucket(b) => Some(b.removal_policy),
            _ => None,
        }
    }

    /// Visit every reference value this descriptor carries.
    pub fn walk_refs(&self, visit: &mut dyn FnMut(&ValueRef)) {
        match self {
            Self::Function(f) => {
                visit(&f.role);
                for b in &f.bindings {
                    visit(&b.name_ref);
                    visit(&b.arn_ref);
                }
                for v in f.env.values() {
                    visit(v);
                }
            }
            Self::PoolRoleAttachment(a) => {
                visit(&a.pool);
                visit(&a.unauthenticated_role);
            }
            Self::Distribution(d) => {
                for origin in &d.origins {
                    visit(&origin.domain);
                }
                if let Some(ref cert) = d.certificate {
                    visit(cert);
                }
                if let Some(ref acl) = d.web_acl {
                    visit(acl);
                }
            }
            Self::DnsRecord(r) => visit(&r.target),
            Self::Bucket(b) => {
                if let Some(ref replication) = b.replication {
                    visit(&replication.bucket);
                    visit(&replication.role);
                }
                if let Some(ref logging) = b.logging {
                    visit(&logging.bucket);
                }
            }
            Self::Role(r) => {
                if let identity::TrustPolicy::WebIdentity { ref pool } = r.trust {
                    visit(pool);
                }
                for stmt in &r.statements {
                    for arn in &stmt.resources {
                        visit(&arn.base);
                    }
                }
            }
            Self::Alarm(a) => {
                if let Some((_, ref value)) = a.dimension {
                    visit(value);
                }
            }
            Self::Trail(t) => {
                visit(&t.log_bucket);
                for bucket in &t.watched_buckets {
                    visit(bucket);
                }
            }
            Self::AmplifyApp(a) => {
                for v in a.environment_variables.values() {
                    visit(v);
                }
            }
            _ => {}
        }
    }

    /// Logical ids carried as plain fields rather than references
    /// (routing tables, stage/branch wiring).
    fn structural_ids(&self) -> Vec<String> {
        match self {
            Self::Schedule(s) => vec![s.target_function.clone()],
            Self::ApiStage(s) => vec![s.api.clone()],
            Self::ApiIntegration(i) => vec![i.api.clone(), i.function.clone()],
            Self::ApiRoute(r) => vec![r.api.clone(), r.integration.clone()],
            Self::Distribution(d) => {
                let mut ids = vec![d.default_cache_policy.clone()];
                if let Some(ref headers) = d.headers_policy {
                    ids.push(headers.clone());
                }
                for behavior in &d.behaviors {
                    ids.push(behavior.cache_policy.clone());
                }
                ids
            }
            Self::AmplifyBranch(b) => vec![b.app.clone()],
            Self::AmplifyDomain(d) => vec![d.app.clone()],
            _ => Vec::new(),
        }
    }

    /// Same-stack logical ids this descriptor points at. Used by the
    /// reference checks; cross-stack imports are collected separately.
    /// Pseudo parameters (`AWS::*`) are not local ids.
    pub fn local_refs(&self) -> Vec<String> {
        let mut refs = self.structural_ids();
        self.walk_refs(&mut |v| match v {
            ValueRef::LogicalRef(id) => refs.push(id.clone()),
            ValueRef::Attr { resource, .. } => refs.push(resource.clone()),
            ValueRef::Sub(template) => refs.extend(sub_references(template)),
            _ => {}
        });
        refs
    }

    /// Cross-stack imports this descriptor consumes, as (stack, output)
    /// pairs.
    pub fn imports(&self) -> Vec<(String, String)> {
        let mut imports = Vec::new();
        self.walk_refs(&mut |v| {
            if let ValueRef::Import { stack, output } = v {
                imports.push((stack.clone(), output.clone()));
            }
        });
        imports
    }
}

/// Resolve a reference into template JSON.
pub fn ref_json(value: &ValueRef, ctx: &EnvContext) -> Value {
    match value {
        ValueRef::Literal(s) => json!(s),
        ValueRef::LogicalRef(id) => json!({ "Ref": id }),
        ValueRef::Attr { resource, attr } => json!({ "Fn::GetAtt": [resource, attr] }),
        ValueRef::Import { stack, output } => {
            json!({ "Fn::ImportValue": ctx.export_name(stack, output) })
        }
        ValueRef::Sub(template) => json!({ "Fn::Sub": template }),
    }
}

/// Logical ids referenced by a `Fn::Sub` template. Pseudo parameters and
/// attribute references (`Name.Attr`) resolve to the bare resource name;
/// `AWS::*` tokens are excluded.
pub fn sub_references(template: &str) -> Vec<String> {
    let re = regex::Regex::new(r"\$\{([A-Za-z0-9:.]+)\}").expect("valid literal regex");
    re.captures_iter(template)
        .filter_map(|cap| {
            let token = cap.get(1).map(|m| m.as_str())?;
            if token.starts_with("AWS::") {
                return None;
            }
            Some(token.split('.').next().unwrap_or(token).to_string())
        })
        .collect()
}
