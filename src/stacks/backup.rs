//! Backup/recovery stack — the versioned replica bucket and the
//! replication role the media bucket's replication rule assumes.
//!
//! The core stack references both by naming convention (see core), so the
//! names declared here must stay derivable from the same context calls.

use crate::core::context::EnvContext;
use crate::core::types::{SiteConfig, ValueRef};
use crate::resources::identity::{ArnPattern, PolicyStatement, RoleSpec, TrustPolicy};
use crate::resources::storage::{BucketSpec, LifecycleRule};
use crate::resources::ResourceSpec;
use crate::stacks::Stack;

pub fn stack(_config: &SiteConfig, ctx: &EnvContext) -> Result<Stack, String> {
    let mut stack = Stack::new("backup", format!("{} media replication", ctx.site));

    let mut replica =
        BucketSpec::private(ctx.resource_name("backup", "replica"), ctx.removal_policy());
    replica.versioned = true;
    replica.lifecycle_rules.push(LifecycleRule {
        id: "expire-noncurrent".to_string(),
        noncurrent_expiration_days: Some(90),
        ..LifecycleRule::default()
    });
    stack.add("ReplicaBucket", ResourceSpec::Bucket(replica))?;

    stack.add(
        "ReplicationRole",
        ResourceSpec::Role(RoleSpec {
            role_name: ctx.resource_name("backup", "replication-role"),
            trust: TrustPolicy::Service("s3.amazonaws.com".to_string()),
            policy_name: "replication".to_string(),
            statements: vec![
                PolicyStatement::new(
                    &["s3:GetReplicationConfiguration", "s3:ListBucket"],
                    vec![ArnPattern::of(ValueRef::import("core", "MediaBucketArn"))],
                )
                .with_sid("Source"),
                PolicyStatement::new(
                    &[
                        "s3:GetObjectVersionForReplication",
                        "s3:GetObjectVersionAcl",
                        "s3:GetObjectVersionTagging",
                    ],
                    vec![ArnPattern::objects(ValueRef::import(
                        "core",
                        "MediaBucketArn",
                    ))],
                )
                .with_sid("SourceObjects"),
                PolicyStatement::new(
                    &[
                        "s3:ReplicateObject",
                        "s3:ReplicateDelete",
                        "s3:ReplicateTags",
                    ],
                    vec![ArnPattern::objects(ValueRef::attr("ReplicaBucket", "Arn"))],
                )
                .with_sid("Destination"),
            ],
        }),
    )?;

    stack.output(
        "BackupBucketName",
        ValueRef::logical("ReplicaBucket"),
        "Replica bucket name",
    );
    stack.output(
        "BackupBucketArn",
        ValueRef::attr("ReplicaBucket", "Arn"),
        "Replica bucket ARN",
    );

    Ok(stack)
}
