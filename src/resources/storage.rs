//! Storage resources — the key-value table and object buckets.

use crate::core::context::{EnvContext, RemovalPolicy};
use crate::core::types::ValueRef;
use crate::resources::ref_json;
use serde_json::{json, Value};

/// Key attribute type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    S,
    N,
}

impl KeyType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::S => "S",
            Self::N => "N",
        }
    }
}

/// One key attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDef {
    pub name: String,
    pub key_type: KeyType,
}

impl KeyDef {
    pub fn string(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key_type: KeyType::S,
        }
    }
}

/// Capacity-provisioning model for the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingMode {
    PayPerRequest,
    Provisioned { read: u32, write: u32 },
}

/// The key-value table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    pub table_name: String,
    pub partition_key: KeyDef,
    pub sort_key: Option<KeyDef>,
    pub billing: BillingMode,
    pub point_in_time_recovery: bool,
    pub removal_policy: RemovalPolicy,
}

pub fn table_properties(spec: &TableSpec, _ctx: &EnvContext) -> Value {
    let mut attributes = vec![json!({
        "AttributeName": spec.partition_key.name,
        "AttributeType": spec.partition_key.key_type.as_str()
    })];
    let mut key_schema = vec![json!({
        "AttributeName": spec.partition_key.name,
        "KeyType": "HASH"
    })];
    if let Some(ref sk) = spec.sort_key {
        attributes.push(json!({
            "AttributeName": sk.name,
            "AttributeType": sk.key_type.as_str()
        }));
        key_schema.push(json!({
            "AttributeName": sk.name,
            "KeyType": "RANGE"
        }));
    }

    let mut props = serde_json::Map::new();
    props.insert("TableName".to_string(), json!(spec.table_name));
    props.insert("AttributeDefinitions".to_string(), json!(attributes));
    props.insert("KeySchema".to_string(), json!(key_schema));
    match spec.billing {
        BillingMode::PayPerRequest => {
            props.insert("BillingMode".to_string(), json!("PAY_PER_REQUEST"));
        }
        BillingMode::Provisioned { read, write } => {
            props.insert("BillingMode".to_string(), json!("PROVISIONED"));
            props.insert(
                "ProvisionedThroughput".to_string(),
                json!({ "ReadCapacityUnits": read, "WriteCapacityUnits": write }),
            );
        }
    }
    if spec.point_in_time_recovery {
        props.insert(
            "PointInTimeRecoverySpecification".to_string(),
            json!({ "PointInTimeRecoveryEnabled": true }),
        );
    }
    Value::Object(props)
}

/// One lifecycle rule. Unset fields are omitted from the template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LifecycleRule {
    pub id: String,
    pub expiration_days: Option<u32>,
    pub abort_incomplete_upload_days: Option<u32>,
    pub noncurrent_expiration_days: Option<u32>,
}

/// CORS rule for browser uploads/reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsRule {
    pub origins: Vec<String>,
    pub methods: Vec<String>,
}

/// Static-website hosting settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebsiteConfig {
    pub index_document: String,
    pub error_document: String,
}

/// Replication wiring to a replica bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicationTarget {
    pub bucket: ValueRef,
    pub role: ValueRef,
}

/// Server-access-log delivery target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingTarget {
    pub bucket: ValueRef,
    pub prefix: String,
}

/// An object-storage bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketSpec {
    pub bucket_name: String,
    pub encrypted: bool,
    pub block_public_access: bool,
    pub versioned: bool,
    pub website: Option<WebsiteConfig>,
    pub lifecycle_rules: Vec<LifecycleRule>,
    pub cors: Option<CorsRule>,
    pub replication: Option<ReplicationTarget>,
    pub logging: Option<LoggingTarget>,
    pub removal_policy: RemovalPolicy,
}

impl BucketSpec {
    /// A private, encrypted bucket with everything else off.
    pub fn private(bucket_name: String, removal_policy: RemovalPolicy) -> Self {
        Self {
            bucket_name,
            encrypted: true,
            block_public_access: true,
            versioned: false,
            website: None,
            lifecycle_rules: Vec::new(),
            cors: None,
            replication: None,
            logging: None,
            removal_policy,
        }
    }
}

pub fn bucket_properties(spec: &BucketSpec, ctx: &EnvContext) -> Value {
    let mut props = serde_json::Map::new();
    props.insert("BucketName".to_string(), json!(spec.bucket_name));

    if spec.encrypted {
        props.insert(
            "BucketEncryption".to_string(),
            json!({
                "ServerSideEncryptionConfiguration": [{
                    "ServerSideEncryptionByDefault": { "SSEAlgorithm": "AES256" }
                }]
            }),
        );
    }
    if spec.block_public_access {
        props.insert(
            "PublicAccessBlockConfiguration".to_string(),
            json!({
                "BlockPublicAcls": true,
                "BlockPublicPolicy": true,
                "IgnorePublicAcls": true,
                "RestrictPublicBuckets": true
            }),
        );
    }
    if spec.versioned {
        props.insert(
            "VersioningConfiguration".to_string(),
            json!({ "Status": "Enabled" }),
        );
    }
    if let Some(ref website) = spec.website {
        props.insert(
            "WebsiteConfiguration".to_string(),
            json!({
                "IndexDocument": website.index_document,
                "ErrorDocument": website.error_document
            }),
        );
    }
    if !spec.lifecycle_rules.is_empty() {
        let rules: Vec<Value> = spec.lifecycle_rules.iter().map(lifecycle_rule_json).collect();
        props.insert(
            "LifecycleConfiguration".to_string(),
            json!({ "Rules": rules }),
        );
    }
    if let Some(ref cors) = spec.cors {
        props.insert(
            "CorsConfiguration".to_string(),
            json!({
                "CorsRules": [{
                    "AllowedOrigins": cors.origins,
                    "AllowedMethods": cors.methods,
                    "AllowedHeaders": ["*"],
                    "MaxAge": 3000
                }]
            }),
        );
    }
    if let Some(ref logging) = spec.logging {
        props.insert(
            "LoggingConfiguration".to_string(),
            json!({
                "DestinationBucketName": ref_json(&logging.bucket, ctx),
                "LogFilePrefix": logging.prefix
            }),
        );
    }
    if let Some(ref replication) = spec.replication {
        props.insert(
            "ReplicationConfiguration".to_string(),
            json!({
                "Role": ref_json(&replication.role, ctx),
                "Rules": [{
                    "Status": "Enabled",
                    "Destination": { "Bucket": ref_json(&replication.bucket, ctx) }
                }]
            }),
        );
    }

    Value::Object(props)
}

fn lifecycle_rule_json(rule: &LifecycleRule) -> Value {
    let mut r = serde_json::Map::new();
    r.insert("Id".to_string(), json!(rule.id));
    r.insert("Status".to_string(), json!("Enabled"));
    if let Some(days) = rule.expiration_days {
        r.insert("ExpirationInDays".to_string(), json!(days));
    }
    if let Some(days) = rule.abort_incomplete_upload_days {
        r.insert(
            "AbortIncompleteMultipartUpload".to_string(),
            json!({ "DaysAfterInitiation": days }),
        );
    }
    if let Some(days) = rule.noncurrent_expiration_days {
        r.insert(
            "NoncurrentVersionExpiration".to_string(),
            json!({ "NoncurrentDays": days }),
        );
    }
    Value::Object(r)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{DeploymentPhase, Environment};
    use indexmap::IndexMap;

    fn ctx() -> EnvContext {
        EnvContext {
            site: "jane-doe".to_string(),
            environment: Environment::Production,
            phase: DeploymentPhase::Minimal,
            region: "us-east-1".to_string(),
            tags: IndexMap::new(),
        }
    }

    fn make_table() -> TableSpec {
        TableSpec {
            table_name: "jane-doe-core-content-production".to_string(),
            partition_key: KeyDef::string("pk"),
            sort_key: Some(KeyDef::string("sk")),
            billing: BillingMode::PayPerRequest,
            point_in_time_recovery: true,
            removal_policy: RemovalPolicy::Retain,
        }
    }

    #[test]
    fn test_table_properties_on_demand() {
        let v = table_properties(&make_table(), &ctx());
        assert_eq!(v["TableName"], "jane-doe-core-content-production");
        assert_eq!(v["BillingMode"], "PAY_PER_REQUEST");
        assert!(v.get("ProvisionedThroughput").is_none());
        assert_eq!(v["KeySchema"][0]["KeyType"], "HASH");
        assert_eq!(v["KeySchema"][1]["AttributeName"], "sk");
        assert_eq!(v["KeySchema"][1]["KeyType"], "RANGE");
        assert_eq!(
            v["PointInTimeRecoverySpecification"]["PointInTimeRecoveryEnabled"],
            true
        );
    }

    #[test]
    fn test_table_properties_provisioned() {
        let mut t = make_table();
        t.billing = BillingMode::Provisioned { read: 1, write: 1 };
        t.point_in_time_recovery = false;
        let v = table_properties(&t, &ctx());
        assert_eq!(v["BillingMode"], "PROVISIONED");
        assert_eq!(v["ProvisionedThroughput"]["ReadCapacityUnits"], 1);
        assert!(v.get("PointInTimeRecoverySpecification").is_none());
    }

    #[test]
    fn test_table_without_sort_key() {
        let mut t = make_table();
        t.sort_key = None;
        let v = table_properties(&t, &ctx());
        assert_eq!(v["AttributeDefinitions"].as_array().unwrap().len(), 1);
        assert_eq!(v["KeySchema"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_private_bucket_defaults() {
        let b = BucketSpec::private(
            "jane-doe-core-media-production".to_string(),
            RemovalPolicy::Retain,
        );
        let v = bucket_properties(&b, &ctx());
        assert_eq!(v["BucketName"], "jane-doe-core-media-production");
        assert_eq!(
            v["BucketEncryption"]["ServerSideEncryptionConfiguration"][0]
                ["ServerSideEncryptionByDefault"]["SSEAlgorithm"],
            "AES256"
        );
        assert_eq!(
            v["PublicAccessBlockConfiguration"]["BlockPublicAcls"],
            true
        );
        assert!(v.get("VersioningConfiguration").is_none());
        assert!(v.get("LifecycleConfiguration").is_none());
    }

    #[test]
    fn test_bucket_lifecycle_rules() {
        let mut b = BucketSpec::private("b".to_string(), RemovalPolicy::Destroy);
        b.lifecycle_rules.push(LifecycleRule {
            id: "abort-stale-uploads".to_string(),
            abort_incomplete_upload_days: Some(7),
            ..LifecycleRule::default()
        });
        b.lifecycle_rules.push(LifecycleRule {
            id: "expire-logs".to_string(),
            expiration_days: Some(30),
            ..LifecycleRule::default()
        });
        let v = bucket_properties(&b, &ctx());
        let rules = v["LifecycleConfiguration"]["Rules"].as_array().unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(
            rules[0]["AbortIncompleteMultipartUpload"]["DaysAfterInitiation"],
            7
        );
        assert_eq!(rules[1]["ExpirationInDays"], 30);
        assert!(rules[1].get("AbortIncompleteMultipartUpload").is_none());
    }

    #[test]
    fn test_bucket_cors_and_website() {
        let mut b = BucketSpec::private("b".to_string(), RemovalPolicy::Destroy);
        b.cors = Some(CorsRule {
            origins: vec!["https://jane-doe.photos".to_string()],
            methods: vec!["GET".to_string(), "PUT".to_string()],
        });
        b.website = Some(WebsiteConfig {
            index_document: "index.html".to_string(),
            error_document: "error.html".to_string(),
        });
        let v = bucket_properties(&b, &ctx());
        assert_eq!(
            v["CorsConfiguration"]["CorsRules"][0]["AllowedOrigins"][0],
            "https://jane-doe.photos"
        );
        assert_eq!(v["WebsiteConfiguration"]["IndexDocument"], "index.html");
    }

    #[test]
    fn test_bucket_replication_and_logging() {
        let mut b = BucketSpec::private("b".to_string(), RemovalPolicy::Retain);
        b.versioned = true;
        b.replication = Some(ReplicationTarget {
            bucket: ValueRef::attr("ReplicaBucket", "Arn"),
            role: ValueRef::attr("ReplicationRole", "Arn"),
        });
        b.logging = Some(LoggingTarget {
            bucket: ValueRef::import("security", "LogBucketName"),
            prefix: "media/".to_string(),
        });
        let v = bucket_properties(&b, &ctx());
        assert_eq!(v["VersioningConfiguration"]["Status"], "Enabled");
        assert_eq!(
            v["ReplicationConfiguration"]["Rules"][0]["Destination"]["Bucket"],
            json!({ "Fn::GetAtt": ["ReplicaBucket", "Arn"] })
        );
        assert_eq!(
            v["LoggingConfiguration"]["DestinationBucketName"],
            json!({ "Fn::ImportValue": "jane-doe-security-LogBucketName-production" })
        );
    }
}
