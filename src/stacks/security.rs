//! Security-logging stack — the access-log bucket and the data-event
//! trail watching the media bucket.

use crate::core::context::EnvContext;
use crate::core::types::{SiteConfig, ValueRef};
use crate::resources::protection::TrailSpec;
use crate::resources::storage::{BucketSpec, LifecycleRule};
use crate::resources::ResourceSpec;
use crate::stacks::Stack;

pub fn stack(_config: &SiteConfig, ctx: &EnvContext) -> Result<Stack, String> {
    let mut stack = Stack::new("security", format!("{} access logging", ctx.site));

    let mut logs =
        BucketSpec::private(ctx.resource_name("security", "logs"), ctx.removal_policy());
    logs.lifecycle_rules.push(LifecycleRule {
        id: "expire-logs".to_string(),
        expiration_days: Some(ctx.log_retention_days()),
        ..LifecycleRule::default()
    });
    stack.add("LogBucket", ResourceSpec::Bucket(logs))?;

    stack.add(
        "AccessTrail",
        ResourceSpec::Trail(TrailSpec {
            trail_name: ctx.resource_name("security", "trail"),
            log_bucket: ValueRef::logical("LogBucket"),
            watched_buckets: vec![ValueRef::import("core", "MediaBucketArn")],
        }),
    )?;

    stack.output(
        "LogBucketName",
        ValueRef::logical("LogBucket"),
        "Access-log bucket name",
    );
    stack.output(
        "LogBucketArn",
        ValueRef::attr("LogBucket", "Arn"),
        "Access-log bucket ARN",
    );

    Ok(stack)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Environment;
    use crate::stacks::test_support::production_config;

    fn build(config: &SiteConfig) -> Stack {
        let ctx = EnvContext::from_config(config);
        stack(config, &ctx).unwrap()
    }

    #[test]
    fn test_log_retention_per_environment() {
        let config = production_config();
        let s = build(&config);
        let bucket = match &s.resources["LogBucket"] {
            ResourceSpec::Bucket(b) => b,
            _ => panic!("expected bucket"),
        };
        assert_eq!(bucket.lifecycle_rules[0].expiration_days, Some(365));

        let mut config = production_config();
        config.environment = Environment::Staging;
        let s = build(&config);
        let bucket = match &s.resources["LogBucket"] {
            ResourceSpec::Bucket(b) => b,
            _ => panic!("expected bucket"),
        };
        assert_eq!(bucket.lifecycle_rules[0].expiration_days, Some(30));
    }

    #[test]
    fn test_log_bucket_name_matches_core_convention() {
        // Core's media bucket delivers access logs to this name.
        let config = production_config();
        let ctx = EnvContext::from_config(&config);
        let s = stack(&config, &ctx).unwrap();
        let bucket = match &s.resources["LogBucket"] {
            ResourceSpec::Bucket(b) => b,
            _ => panic!("expected bucket"),
        };
        assert_eq!(bucket.bucket_name, ctx.resource_name("security", "logs"));
    }

    #[test]
    fn test_trail_watches_media_bucket() {
        let s = build(&production_config());
        let trail = match &s.resources["AccessTrail"] {
            ResourceSpec::Trail(t) => t,
            _ => panic!("expected trail"),
        };
        assert_eq!(trail.log_bucket, ValueRef::logical("LogBucket"));
        assert_eq!(
            trail.watched_buckets,
            vec![ValueRef::import("core", "MediaBucketArn")]
        );
    }
}
