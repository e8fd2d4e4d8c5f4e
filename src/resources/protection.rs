//! Protection resources — WAF policies, budgets, alarms, audit trails.

use crate::core::context::EnvContext;
use crate::core::types::ValueRef;
use crate::resources::identity::ArnPattern;
use serde_json::{json, Value};

use crate::resources::ref_json;

/// WAF attachment scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WafScope {
    Cloudfront,
    Regional,
}

impl WafScope {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cloudfront => "CLOUDFRONT",
            Self::Regional => "REGIONAL",
        }
    }
}

/// A rate rule: requests per 5 minutes per source address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateRule {
    pub limit: u64,
}

/// A web ACL built from managed rule groups plus a rate rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebAclSpec {
    pub acl_name: String,
    pub scope: WafScope,
    /// Managed rule group names, attached in priority order
    pub managed_rule_groups: Vec<String>,
    pub rate_rule: Option<RateRule>,
    /// Country codes to block outright
    pub geo_block: Vec<String>,
}

pub fn web_acl_properties(spec: &WebAclSpec, _ctx: &EnvContext) -> Value {
    let mut rules = Vec::new();
    let mut priority = 0u32;

    for group in &spec.managed_rule_groups {
        rules.push(json!({
            "Name": group,
            "Priority": priority,
            "OverrideAction": { "None": {} },
            "Statement": {
                "ManagedRuleGroupStatement": {
                    "VendorName": "AWS",
                    "Name": group
                }
            },
            "VisibilityConfig": {
                "SampledRequestsEnabled": true,
                "CloudWatchMetricsEnabled": true,
                "MetricName": group
            }
        }));
        priority += 1;
    }

    if let Some(ref rate) = spec.rate_rule {
        rules.push(json!({
            "Name": "RateLimit",
            "Priority": priority,
            "Action": { "Block": {} },
            "Statement": {
                "RateBasedStatement": {
                    "Limit": rate.limit,
                    "AggregateKeyType": "IP"
                }
            },
            "VisibilityConfig": {
                "SampledRequestsEnabled": true,
                "CloudWatchMetricsEnabled": true,
                "MetricName": "RateLimit"
            }
        }));
        priority += 1;
    }

    if !spec.geo_block.is_empty() {
        rules.push(json!({
            "Name": "GeoBlock",
            "Priority": priority,
            "Action": { "Block": {} },
            "Statement": {
                "GeoMatchStatement": { "CountryCodes": spec.geo_block }
            },
            "VisibilityConfig": {
                "SampledRequestsEnabled": true,
                "CloudWatchMetricsEnabled": true,
                "MetricName": "GeoBlock"
            }
        }));
    }

    json!({
        "Name": spec.acl_name,
        "Scope": spec.scope.as_str(),
        "DefaultAction": { "Allow": {} },
        "Rules": rules,
        "VisibilityConfig": {
            "SampledRequestsEnabled": true,
            "CloudWatchMetricsEnabled": true,
            "MetricName": spec.acl_name
        }
    })
}

/// A monthly cost budget with email notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BudgetSpec {
    pub budget_name: String,
    pub limit_usd: u32,
    /// Percent-of-budget thresholds that trigger a notification
    pub notify_at_percent: Vec<u8>,
    pub email: String,
}

pub fn budget_properties(spec: &BudgetSpec, _ctx: &EnvContext) -> Value {
    let notifications: Vec<Value> = spec
        .notify_at_percent
        .iter()
        .map(|threshold| {
            json!({
                "Notification": {
                    "NotificationType": "ACTUAL",
                    "ComparisonOperator": "GREATER_THAN",
                    "Threshold": threshold,
                    "ThresholdType": "PERCENTAGE"
                },
                "Subscribers": [{
                    "SubscriptionType": "EMAIL",
                    "Address": spec.email
                }]
            })
        })
        .collect();

    json!({
        "Budget": {
            "BudgetName": spec.budget_name,
            "BudgetType": "COST",
            "TimeUnit": "MONTHLY",
            "BudgetLimit": {
                "Amount": spec.limit_usd,
                "Unit": "USD"
            }
        },
        "NotificationsWithSubscribers": notifications
    })
}

/// An invocation-error (or billing) alarm on one metric.
#[derive(Debug, Clone, PartialEq)]
pub struct AlarmSpec {
    pub alarm_name: String,
    pub namespace: String,
    pub metric_name: String,
    /// Dimension name/value, e.g. ("FunctionName", <ref>)
    pub dimension: Option<(String, ValueRef)>,
    pub statistic: String,
    pub period_secs: u32,
    pub evaluation_periods: u32,
    pub threshold: f64,
}

impl AlarmSpec {
    /// Standard invocation-error alarm for a handler function.
    pub fn function_errors(alarm_name: String, function: ValueRef) -> Self {
        Self {
            alarm_name,
            namespace: "AWS/Lambda".to_string(),
            metric_name: "Errors".to_string(),
            dimension: Some(("FunctionName".to_string(), function)),
            statistic: "Sum".to_string(),
            period_secs: 300,
            evaluation_periods: 1,
            threshold: 5.0,
        }
    }
}

pub fn alarm_properties(spec: &AlarmSpec, ctx: &EnvContext) -> Value {
    let mut props = serde_json::Map::new();
    props.insert("AlarmName".to_string(), json!(spec.alarm_name));
    props.insert("Namespace".to_string(), json!(spec.namespace));
    props.insert("MetricName".to_string(), json!(spec.metric_name));
    if let Some((ref name, ref value)) = spec.dimension {
        props.insert(
            "Dimensions".to_string(),
            json!([{ "Name": name, "Value": ref_json(value, ctx) }]),
        );
    }
    props.insert("Statistic".to_string(), json!(spec.statistic));
    props.insert("Period".to_string(), json!(spec.period_secs));
    props.insert(
        "EvaluationPeriods".to_string(),
        json!(spec.evaluation_periods),
    );
    props.insert("Threshold".to_string(), json!(spec.threshold));
    props.insert(
        "ComparisonOperator".to_string(),
        json!("GreaterThanThreshold"),
    );
    props.insert("TreatMissingData".to_string(), json!("notBreaching"));
    Value::Object(props)
}

/// An audit trail recording object-level access into a log bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrailSpec {
    pub trail_name: String,
    pub log_bucket: ValueRef,
    /// Bucket ARNs whose object events are recorded
    pub watched_buckets: Vec<ValueRef>,
}

pub fn trail_properties(spec: &TrailSpec, ctx: &EnvContext) -> Value {
    let data_resources: Vec<Value> = spec
        .watched_buckets
        .iter()
        .map(|bucket| {
            json!({
                "Type": "AWS::S3::Object",
                "Values": [ArnPattern::objects(bucket.clone()).to_json(ctx)]
            })
        })
        .collect();

    json!({
        "TrailName": spec.trail_name,
        "S3BucketName": ref_json(&spec.log_bucket, ctx),
        "IsLogging": true,
        "IncludeGlobalServiceEvents": false,
        "EventSelectors": [{
            "ReadWriteType": "All",
            "IncludeManagementEvents": false,
            "DataResources": data_resources
        }]
    })
}
