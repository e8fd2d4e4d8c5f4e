//! Core resource stack — the shared table, media bucket, identity pool,
//! and baseline WAF consumed by every other stack.

use crate::core::context::EnvContext;
use crate::core::types::{SiteConfig, ValueRef};
use crate::resources::identity::{
    ArnPattern, IdentityPoolSpec, PolicyStatement, PoolRoleAttachmentSpec, RoleSpec, TrustPolicy,
};
use crate::resources::protection::{RateRule, WafScope, WebAclSpec};
use crate::resources::storage::{
    BillingMode, BucketSpec, CorsRule, KeyDef, LifecycleRule, LoggingTarget, ReplicationTarget,
    TableSpec,
};
use crate::resources::ResourceSpec;
use crate::stacks::{cors_origins, Stack};

pub fn stack(config: &SiteConfig, ctx: &EnvContext) -> Result<Stack, String> {
    let mut stack = Stack::new(
        "core",
        format!("{} shared content, media, and identity resources", ctx.site),
    );

    stack.add(
        "ContentTable",
        ResourceSpec::Table(TableSpec {
            table_name: ctx.resource_name("core", "content"),
            partition_key: KeyDef::string("pk"),
            sort_key: Some(KeyDef::string("sk")),
            billing: BillingMode::PayPerRequest,
            point_in_time_recovery: ctx.point_in_time_recovery(),
            removal_policy: ctx.removal_policy(),
        }),
    )?;

    let mut media = BucketSpec::private(ctx.resource_name("core", "media"), ctx.removal_policy());
    media.cors = Some(CorsRule {
        origins: cors_origins(config),
        methods: vec!["GET".to_string(), "PUT".to_string(), "HEAD".to_string()],
    });
    media.lifecycle_rules.push(LifecycleRule {
        id: "abort-stale-uploads".to_string(),
        abort_incomplete_upload_days: Some(7),
        ..LifecycleRule::default()
    });
    if config.features.backup {
        // Replication references the backup stack's bucket and role by
        // naming convention; a Ref either way would make the two stacks
        // mutually dependent.
        media.versioned = true;
        media.lifecycle_rules.push(LifecycleRule {
            id: "expire-noncurrent".to_string(),
            noncurrent_expiration_days: Some(30),
            ..LifecycleRule::default()
        });
        media.replication = Some(ReplicationTarget {
            bucket: ValueRef::literal(format!(
                "arn:aws:s3:::{}",
                ctx.resource_name("backup", "replica")
            )),
            role: ValueRef::sub(format!(
                "arn:aws:iam::${{AWS::AccountId}}:role/{}",
                ctx.resource_name("backup", "replication-role")
            )),
        });
    }
    if config.features.security_logging {
        media.logging = Some(LoggingTarget {
            bucket: ValueRef::literal(ctx.resource_name("security", "logs")),
            prefix: "media/".to_string(),
        });
    }
    stack.add("MediaBucket", ResourceSpec::Bucket(media))?;

    stack.add(
        "IdentityPool",
        ResourceSpec::IdentityPool(IdentityPoolSpec {
            pool_name: ctx.resource_name("core", "visitors"),
            allow_unauthenticated: true,
        }),
    )?;
    stack.add(
        "UnauthRole",
        ResourceSpec::Role(RoleSpec {
            role_name: ctx.resource_name("core", "unauth-role"),
            trust: TrustPolicy::WebIdentity {
                pool: ValueRef::logical("IdentityPool"),
            },
            policy_name: "public-read".to_string(),
            statements: vec![PolicyStatement::new(
                &["s3:GetObject"],
                vec![ArnPattern::objects(ValueRef::attr("MediaBucket", "Arn"))],
            )],
        }),
    )?;
    stack.add(
        "PoolRoles",
        ResourceSpec::PoolRoleAttachment(PoolRoleAttachmentSpec {
            pool: ValueRef::logical("IdentityPool"),
            unauthenticated_role: ValueRef::attr("UnauthRole", "Arn"),
        }),
    )?;

    stack.add(
        "BaselineWaf",
        ResourceSpec::WebAcl(WebAclSpec {
            acl_name: ctx.resource_name("core", "waf"),
            scope: WafScope::Cloudfront,
            managed_rule_groups: vec!["AWSManagedRulesCommonRuleSet".to_string()],
            rate_rule: Some(RateRule {
                limit: ctx.rate_limit_per_5min(),
            }),
            geo_block: vec![],
        }),
    )?;

    stack.output(
        "TableName",
        ValueRef::logical("ContentTable"),
        "Shared key-value table name",
    );
    stack.output(
        "TableArn",
        ValueRef::attr("ContentTable", "Arn"),
        "Shared key-value table ARN",
    );
    stack.output(
        "MediaBucketName",
        ValueRef::logical("MediaBucket"),
        "Original-media bucket name",
    );
    stack.output(
        "MediaBucketArn",
        ValueRef::attr("MediaBucket", "Arn"),
        "Original-media bucket ARN",
    );
    stack.output(
        "IdentityPoolId",
        ValueRef::logical("IdentityPool"),
        "Visitor identity pool id",
    );
    stack.output(
        "WebAclArn",
        ValueRef::attr("BaselineWaf", "Arn"),
        "Baseline web ACL ARN",
    );

    Ok(stack)
}
